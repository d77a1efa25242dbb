//! Error types

use crate::float_types::Real;
use nalgebra::Point3;

/// Problems found while validating a mesh handed to the engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A face refers to a vertex that does not exist
    #[error("(FaceIndexOutOfRange) face {face} references vertex {index}, but the mesh has {len} vertices")]
    FaceIndexOutOfRange { face: usize, index: usize, len: usize },
    /// A vertex has a NaN or infinite coordinate
    #[error("(InvalidCoordinate) vertex {vertex} ({point}) has a NaN or infinite coordinate")]
    InvalidCoordinate { vertex: usize, point: Point3<Real> },
    /// A face uses the same vertex more than once
    #[error("(DegenerateFace) face {face} uses vertex {index} twice")]
    DegenerateFace { face: usize, index: usize },
}

/// Errors that stop a boolean operation before it produces a result.
///
/// Cancellation is not an error; see [`crate::csg::CsgOutcome`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CsgError {
    /// The operation was handed an empty list of meshes
    #[error("no input meshes were supplied")]
    NoInputMeshes,
    /// One of the input meshes failed validation
    #[error("input mesh {mesh} is invalid: {source}")]
    InvalidInput {
        mesh: usize,
        #[source]
        source: ValidationError,
    },
    /// The transform of an input mesh contains NaN or infinite values
    #[error("transform of input mesh {mesh} contains NaN or infinite values")]
    NonFiniteTransform { mesh: usize },
}
