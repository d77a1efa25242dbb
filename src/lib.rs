//! **Constructive Solid Geometry (CSG)** on triangle meshes by slicing:
//! *union*, *subtraction* and *intersection* of any number of meshes that need
//! not be closed or manifold.
//!
//! Each face is clipped in the 2D frame of its plane against cross-sections
//! of the other meshes taken infinitesimally behind that plane. Faces that
//! several meshes share on one plane are reconciled in a second pass, so flush
//! and overlapping contacts do not leave internal walls or doubled skins.
//!
//! # Features
//! #### Default
//! - [**stl-io**](https://en.wikipedia.org/wiki/STL_(file_format)): `.stl` import/export
//!
//! #### Optional
//! - **parallel**: use rayon for per-mesh setup work
//!
//! # Example
//! ```
//! use slicecsg::{mesh::Mesh, traits::CSGOps};
//!
//! let a = Mesh::cube(1.0);
//! let b = Mesh::cube(1.0).translate(0.5, 0.0, 0.0);
//! let merged = a.union(&b).unwrap();
//! assert!((merged.signed_volume() - 1.5).abs() < 1e-6);
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::approx_constant, clippy::all)]

pub mod csg;
pub mod errors;
pub mod float_types;
pub mod mesh;
pub mod sketch;
pub mod traits;

#[cfg(feature = "stl-io")]
pub mod io;

pub use csg::{CancellationToken, CsgBySlicing, CsgInput, CsgOperation, CsgOutcome, SlicingSettings};
pub use errors::{CsgError, ValidationError};
pub use mesh::{Face, Mesh, plane::Plane};
pub use traits::CSGOps;
