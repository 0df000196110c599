//! Reader and writer for plain-text `key: value` image headers.
//!
//! Parcellation images carry their geometry (dimensions, voxel sizes, axis
//! layout, voxel-to-scanner transform) in a small text header. Node centroids
//! are computed in scanner space, so the exemplar pipeline needs this header
//! to place the curves it anchors on.
//!
//! ```text
//! mrtrix image
//! dim: 96,114,96
//! vox: 2,2,2
//! layout: +0,+1,+2
//! datatype: UInt32LE
//! transform: 1,0,0,-90
//! transform: 0,1,0,-126
//! transform: 0,0,1,-72
//! file: parc.dat
//! END
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geom::{Point3, Transform};

/// Magic first line of a header file.
pub const HEADER_MAGIC: &str = "mrtrix image";

/// Result type for header parsing.
pub type HeaderResult<T> = Result<T, HeaderError>;

/// Errors raised while reading an image header. Every variant names the image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("missing \"{key}\" specification for image \"{name}\"")]
    MissingKey { name: String, key: String },
    #[error("invalid dimensions for image \"{name}\"")]
    InvalidDimensions { name: String },
    #[error("invalid voxel size for image \"{name}\"")]
    InvalidVoxelSize { name: String },
    #[error("invalid datatype \"{value}\" for image \"{name}\"")]
    InvalidDataType { name: String, value: String },
    #[error("invalid layout \"{value}\" for image \"{name}\"")]
    InvalidLayout { name: String, value: String },
    #[error("invalid transform for image \"{name}\": expected 12 values, got {count}")]
    InvalidTransform { name: String, count: usize },
    #[error("invalid scaling for image \"{name}\": expected 2 values, got {count}")]
    InvalidScaling { name: String, count: usize },
    #[error("invalid offset specified for file \"{file}\" in image \"{name}\"")]
    InvalidOffset { name: String, file: String },
    #[error("invalid number \"{value}\" for key \"{key}\" in image \"{name}\"")]
    InvalidNumber {
        name: String,
        key: String,
        value: String,
    },
}

// ============================================================================
// Data types
// ============================================================================

/// Byte order of multi-byte voxel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endianness {
    Little,
    Big,
}

/// Scalar kind of the stored voxel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Bit,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    CFloat32,
    CFloat64,
}

impl ScalarKind {
    const ALL: [Self; 13] = [
        Self::Bit,
        Self::Int8,
        Self::UInt8,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
        Self::CFloat32,
        Self::CFloat64,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bit => "Bit",
            Self::Int8 => "Int8",
            Self::UInt8 => "UInt8",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::CFloat32 => "CFloat32",
            Self::CFloat64 => "CFloat64",
        }
    }

    /// Whether values of this kind span more than one byte.
    #[must_use]
    pub const fn is_multi_byte(self) -> bool {
        !matches!(self, Self::Bit | Self::Int8 | Self::UInt8)
    }
}

/// Voxel data type, e.g. `Float32LE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType {
    pub kind: ScalarKind,
    /// `None` means native byte order (or not applicable).
    pub endianness: Option<Endianness>,
}

impl DataType {
    #[must_use]
    pub const fn new(kind: ScalarKind, endianness: Option<Endianness>) -> Self {
        Self { kind, endianness }
    }
}

impl FromStr for DataType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let lookup = |name: &str| {
            ScalarKind::ALL
                .into_iter()
                .find(|kind| kind.name().eq_ignore_ascii_case(name))
        };

        if let Some(kind) = lookup(&lower) {
            return Ok(Self::new(kind, None));
        }
        let (base, endianness) = if let Some(base) = lower.strip_suffix("le") {
            (base, Endianness::Little)
        } else if let Some(base) = lower.strip_suffix("be") {
            (base, Endianness::Big)
        } else {
            return Err(());
        };
        match lookup(base) {
            Some(kind) if kind.is_multi_byte() => Ok(Self::new(kind, Some(endianness))),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.name())?;
        match self.endianness {
            Some(Endianness::Little) => f.write_str("LE"),
            Some(Endianness::Big) => f.write_str("BE"),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Header
// ============================================================================

/// Parsed image header.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHeader {
    /// Path of the header file; also used in error messages.
    pub name: String,
    pub dimensions: Vec<usize>,
    pub voxel_sizes: Vec<f64>,
    /// Symbolic strides: `sign * (order + 1)` per axis.
    pub strides: Vec<isize>,
    pub data_type: DataType,
    /// Voxel-to-scanner transform, when present.
    pub transform: Option<Transform>,
    /// Diffusion gradient table, one `[x, y, z, b]` row per volume.
    pub dw_scheme: Option<Vec<[f64; 4]>>,
    pub intensity_offset: f64,
    pub intensity_scale: f64,
    pub comments: Vec<String>,
    pub units: Vec<String>,
    pub labels: Vec<String>,
    /// Every other key, with repeated values joined by `\n`.
    pub properties: BTreeMap<String, String>,
}

impl ImageHeader {
    /// A header for `dimensions` with unit voxels, default layout and no
    /// transform.
    #[must_use]
    pub fn new(name: impl Into<String>, dimensions: Vec<usize>, data_type: DataType) -> Self {
        let ndim = dimensions.len();
        Self {
            name: name.into(),
            voxel_sizes: vec![1.0; ndim],
            strides: (1..=ndim)
                .map(|order| isize::try_from(order).unwrap_or(isize::MAX))
                .collect(),
            dimensions,
            data_type,
            transform: None,
            dw_scheme: None,
            intensity_offset: 0.0,
            intensity_scale: 1.0,
            comments: Vec::new(),
            units: Vec::new(),
            labels: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.dimensions.len()
    }

    /// Maps a (fractional) voxel index to scanner coordinates: the index is
    /// scaled by the voxel sizes, then passed through the transform.
    #[must_use]
    pub fn voxel_to_scanner(&self, voxel: [f64; 3]) -> Point3 {
        let scaled = Point3::new(
            voxel[0] * self.voxel_sizes.first().copied().unwrap_or(1.0),
            voxel[1] * self.voxel_sizes.get(1).copied().unwrap_or(1.0),
            voxel[2] * self.voxel_sizes.get(2).copied().unwrap_or(1.0),
        );
        self.transform.unwrap_or_default().apply_point(scaled)
    }
}

/// Location of the voxel data referenced by a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFileLocation {
    pub path: PathBuf,
    pub offset: u64,
}

// ============================================================================
// Reading
// ============================================================================

/// Splits header text into `(key, value)` entries, in order.
///
/// An optional magic first line is skipped, reading stops at `END`, and
/// anything after `#` is a comment.
#[must_use]
pub fn parse_key_values(text: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    for (line_number, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line_number == 0 && line.eq_ignore_ascii_case(HEADER_MAGIC) {
            continue;
        }
        if line.is_empty() {
            continue;
        }
        if line == "END" {
            break;
        }
        match line.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                entries.push((key.trim().to_owned(), value.trim().to_owned()));
            }
            _ => log::warn!(
                "ignoring malformed header line {}: \"{}\"",
                line_number + 1,
                line
            ),
        }
    }
    entries
}

#[derive(Default)]
struct RawFields {
    dim: Option<String>,
    vox: Option<String>,
    layout: Option<String>,
    datatype: Option<String>,
    scaling: Option<String>,
    transform: Vec<f64>,
    dw_scheme: Vec<f64>,
}

/// Parses header text into an [`ImageHeader`]. `name` is the header's path.
///
/// # Errors
/// A [`HeaderError`] for missing mandatory keys or malformed values.
pub fn read_header(name: &str, text: &str) -> HeaderResult<ImageHeader> {
    let mut raw = RawFields::default();
    let mut comments = Vec::new();
    let mut units = Vec::new();
    let mut labels = Vec::new();
    let mut properties: BTreeMap<String, String> = BTreeMap::new();

    for (key, value) in parse_key_values(text) {
        let key = key.to_lowercase();
        match key.as_str() {
            "dim" => raw.dim = Some(value),
            "vox" => raw.vox = Some(value),
            "layout" => raw.layout = Some(value),
            "datatype" => raw.datatype = Some(value),
            "scaling" => raw.scaling = Some(value),
            "comments" => comments.push(value),
            "units" => units = value.split('\\').map(str::to_owned).collect(),
            "labels" => labels = value.split('\\').map(str::to_owned).collect(),
            "transform" => raw.transform.extend(parse_floats(name, &key, &value)?),
            "dw_scheme" => raw.dw_scheme.extend(parse_floats(name, &key, &value)?),
            _ => {
                let entry = properties.entry(key).or_default();
                if !entry.is_empty() {
                    entry.push('\n');
                }
                entry.push_str(&value);
            }
        }
    }

    let missing = |key: &str| HeaderError::MissingKey {
        name: name.to_owned(),
        key: key.to_owned(),
    };

    let dim_text = raw.dim.ok_or_else(|| missing("dim"))?;
    let dimensions = parse_ints(name, "dim", &dim_text)?
        .into_iter()
        .map(|d| usize::try_from(d).ok().filter(|&d| d >= 1))
        .collect::<Option<Vec<_>>>()
        .filter(|dims| !dims.is_empty())
        .ok_or_else(|| HeaderError::InvalidDimensions {
            name: name.to_owned(),
        })?;
    let ndim = dimensions.len();

    let vox_text = raw.vox.ok_or_else(|| missing("vox"))?;
    let mut voxel_sizes = parse_floats(name, "vox", &vox_text)?;
    if voxel_sizes.len() < ndim || voxel_sizes[..ndim].iter().any(|v| *v < 0.0) {
        return Err(HeaderError::InvalidVoxelSize {
            name: name.to_owned(),
        });
    }
    voxel_sizes.truncate(ndim);

    let datatype_text = raw.datatype.ok_or_else(|| missing("datatype"))?;
    let data_type = datatype_text
        .parse::<DataType>()
        .map_err(|()| HeaderError::InvalidDataType {
            name: name.to_owned(),
            value: datatype_text.clone(),
        })?;

    let layout_text = raw.layout.ok_or_else(|| missing("layout"))?;
    let strides = parse_layout(ndim, &layout_text).ok_or_else(|| HeaderError::InvalidLayout {
        name: name.to_owned(),
        value: layout_text.clone(),
    })?;

    let transform = if raw.transform.is_empty() {
        None
    } else {
        Some(transform_from_values(name, &raw.transform)?)
    };

    let dw_scheme = if raw.dw_scheme.is_empty() {
        None
    } else if raw.dw_scheme.len() % 4 != 0 {
        log::info!(
            "invalid \"dw_scheme\" specification for image \"{}\" ({} values), ignored",
            name,
            raw.dw_scheme.len()
        );
        None
    } else {
        Some(
            raw.dw_scheme
                .chunks_exact(4)
                .map(|row| [row[0], row[1], row[2], row[3]])
                .collect(),
        )
    };

    let (intensity_offset, intensity_scale) = match raw.scaling {
        None => (0.0, 1.0),
        Some(text) => match parse_floats(name, "scaling", &text)?.as_slice() {
            [offset, scale] => (*offset, *scale),
            other => {
                return Err(HeaderError::InvalidScaling {
                    name: name.to_owned(),
                    count: other.len(),
                });
            }
        },
    };

    log::debug!(
        "read header \"{}\": dim {:?}, vox {:?}, datatype {}",
        name,
        dimensions,
        voxel_sizes,
        data_type
    );

    Ok(ImageHeader {
        name: name.to_owned(),
        dimensions,
        voxel_sizes,
        strides,
        data_type,
        transform,
        dw_scheme,
        intensity_offset,
        intensity_scale,
        comments,
        units,
        labels,
        properties,
    })
}

/// Removes `key` from the header properties and resolves the data file it
/// names, as `path [offset]`.
///
/// A path of `.` refers to the header file itself and then needs a nonzero
/// offset. Other paths are relative to the header file's directory.
///
/// # Errors
/// [`HeaderError::MissingKey`] when `key` is absent and
/// [`HeaderError::InvalidOffset`] for a malformed or missing offset.
pub fn resolve_data_file(header: &mut ImageHeader, key: &str) -> HeaderResult<DataFileLocation> {
    let value = header
        .properties
        .remove(key)
        .ok_or_else(|| HeaderError::MissingKey {
            name: header.name.clone(),
            key: key.to_owned(),
        })?;

    let mut tokens = value.split_whitespace();
    let file = tokens.next().unwrap_or_default().to_owned();
    let invalid_offset = || HeaderError::InvalidOffset {
        name: header.name.clone(),
        file: file.clone(),
    };
    let offset = match tokens.next() {
        None => 0,
        Some(token) => token.parse::<u64>().map_err(|_| invalid_offset())?,
    };
    if file.is_empty() || tokens.next().is_some() {
        return Err(invalid_offset());
    }

    let path = if file == "." {
        if offset == 0 {
            return Err(invalid_offset());
        }
        PathBuf::from(&header.name)
    } else {
        Path::new(&header.name)
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(&file)
    };
    Ok(DataFileLocation { path, offset })
}

fn parse_numbers<T: FromStr>(name: &str, key: &str, value: &str) -> HeaderResult<Vec<T>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.parse::<T>().map_err(|_| HeaderError::InvalidNumber {
                name: name.to_owned(),
                key: key.to_owned(),
                value: token.to_owned(),
            })
        })
        .collect()
}

fn parse_ints(name: &str, key: &str, value: &str) -> HeaderResult<Vec<i64>> {
    parse_numbers(name, key, value)
}

fn parse_floats(name: &str, key: &str, value: &str) -> HeaderResult<Vec<f64>> {
    parse_numbers(name, key, value)
}

/// Parses `+0,-1,+2` style layouts into symbolic strides.
fn parse_layout(ndim: usize, layout: &str) -> Option<Vec<isize>> {
    let mut used = vec![false; ndim];
    let mut strides = Vec::with_capacity(ndim);
    for entry in layout.split(',').map(str::trim) {
        let (sign, order) = if let Some(order) = entry.strip_prefix('+') {
            (1, order)
        } else if let Some(order) = entry.strip_prefix('-') {
            (-1, order)
        } else {
            return None;
        };
        let order: usize = order.parse().ok()?;
        if order >= ndim || std::mem::replace(&mut used[order], true) {
            return None;
        }
        strides.push(sign * isize::try_from(order + 1).ok()?);
    }
    (strides.len() == ndim).then_some(strides)
}

fn transform_from_values(name: &str, values: &[f64]) -> HeaderResult<Transform> {
    if values.len() < 12 {
        return Err(HeaderError::InvalidTransform {
            name: name.to_owned(),
            count: values.len(),
        });
    }
    let row = |r: usize| [values[4 * r], values[4 * r + 1], values[4 * r + 2], values[4 * r + 3]];
    Ok(Transform::from_rows([row(0), row(1), row(2)]))
}

// ============================================================================
// Writing
// ============================================================================

fn join_values<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Serializes `header` to text that [`read_header`] accepts.
///
/// The data file key (if still present in `properties`) is written as-is.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn write_header(header: &ImageHeader) -> String {
    let mut out = String::from(HEADER_MAGIC);
    let layout = header
        .strides
        .iter()
        .map(|stride| {
            let sign = if *stride > 0 { '+' } else { '-' };
            format!("{sign}{}", stride.unsigned_abs().saturating_sub(1))
        })
        .collect::<Vec<_>>()
        .join(",");

    let _ = write!(out, "\ndim: {}", join_values(&header.dimensions));
    let _ = write!(out, "\nvox: {}", join_values(&header.voxel_sizes));
    let _ = write!(out, "\nlayout: {layout}");
    let _ = write!(out, "\ndatatype: {}", header.data_type);

    for (key, value) in &header.properties {
        for line in value.split('\n').filter(|line| !line.is_empty()) {
            let _ = write!(out, "\n{key}: {line}");
        }
    }
    for comment in &header.comments {
        let _ = write!(out, "\ncomments: {comment}");
    }
    if let Some(transform) = header.transform {
        for row in transform.rows() {
            let _ = write!(out, "\ntransform: {}", join_values(&row));
        }
    }
    if header.intensity_offset != 0.0 || header.intensity_scale != 1.0 {
        let _ = write!(
            out,
            "\nscaling: {},{}",
            header.intensity_offset, header.intensity_scale
        );
    }
    if let Some(scheme) = &header.dw_scheme {
        for row in scheme {
            let _ = write!(out, "\ndw_scheme: {}", join_values(row));
        }
    }
    out.push_str("\nEND\n");
    out
}
