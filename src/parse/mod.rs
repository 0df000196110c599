//! Parsers for the text formats around exemplar generation.

pub mod image_header;

pub use image_header::{
    DataFileLocation, DataType, Endianness, HeaderError, HeaderResult, ImageHeader, ScalarKind,
    parse_key_values, read_header, resolve_data_file, write_header,
};
