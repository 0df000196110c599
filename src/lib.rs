#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Representative streamlines ("exemplars") for connectome edges.
//!
//! Tractography produces many streamlines per pair of brain regions. This
//! crate condenses all streamlines of one edge into a single weighted-mean
//! polyline, anchored on the two region centroids and resampled to a fixed
//! step:
//!
//! - [`connectome`]: exemplar accumulation, finalization and the per-connectome
//!   [`ExemplarBank`].
//! - [`geom`]: points, transforms and the polyline sampling/resampling
//!   primitives.
//! - [`parse`]: the plain-text image header format used for parcellations.
//!
//! ```
//! use connectome_exemplar::{Exemplar, InputStreamline, NodePair, Point3};
//!
//! let nodes = NodePair::new(1, 2);
//! let coms = (Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0));
//! let exemplar = Exemplar::new(nodes, coms, 16).unwrap();
//!
//! let track = (0..=10).map(|x| Point3::new(f64::from(x), 1.0, 0.0)).collect();
//! exemplar.add(&InputStreamline::new(track, 1.0, nodes).unwrap()).unwrap();
//! exemplar.finalize(1.0).unwrap();
//!
//! let curve = exemplar.curve().unwrap();
//! assert_eq!(curve.points().first(), Some(&coms.0));
//! assert_eq!(curve.points().last(), Some(&coms.1));
//! ```
//!
//! Finalizing a whole bank runs on rayon when the `parallel` feature (on by
//! default) is enabled. The crate logs through the `log` facade and never
//! installs a logger itself.

pub mod connectome;
pub mod geom;
pub mod parse;

pub use connectome::{
    EdgeAccumulator, Exemplar, ExemplarBank, ExemplarError, ExemplarOptions, FinalizeDiagnostics,
    FinalizedCurve, InputStreamline, NodeId, NodePair,
};
pub use geom::{Point3, Tolerance, Transform};
pub use parse::{HeaderError, ImageHeader};
