//! Boolean operations on triangle meshes by slicing.
//!
//! Every face is cut down, in the 2D frame of its plane, to the part that
//! survives the operation, using cross-sections of the other meshes taken
//! just behind that plane. Faces shared by several meshes on one plane are
//! reconciled afterwards. No closedness or manifoldness of the inputs is
//! assumed.
//!
//! ```no_run
//! use slicecsg::csg::{CsgBySlicing, CsgInput, CsgOperation};
//! use slicecsg::mesh::Mesh;
//! use nalgebra::Matrix4;
//!
//! let a = Mesh::cube(1.0);
//! let b = Mesh::cube(1.0);
//! let shifted = Matrix4::new_translation(&nalgebra::Vector3::new(0.5, 0.0, 0.0));
//! let outcome = CsgBySlicing::new(CsgOperation::Union)
//!     .run(&[CsgInput::new(&a), CsgInput::new(&b).with_transform(shifted)])
//!     .unwrap();
//! let merged = outcome.into_mesh().unwrap();
//! assert_eq!(merged.faces.len(), 12);
//! ```

use crate::float_types::Real;
use crate::mesh::Mesh;
use nalgebra::Matrix4;

pub mod coplanar;
pub mod progress;
pub(crate) mod scene;
pub mod settings;
pub mod similar_planes;
pub mod slicing;

pub use coplanar::{CoPlanarFaces, FaceRecord};
pub use progress::{CancellationToken, ProgressCallback};
pub use settings::{PlaneTolerance, SlicingSettings};
pub use similar_planes::{PlaneId, SimilarPlaneFinder};
pub use slicing::CsgBySlicing;

/// Boolean operation over an ordered list of meshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsgOperation {
    /// Everything inside at least one mesh.
    Union,
    /// Mesh 0 minus every other mesh.
    Subtract,
    /// Everything inside all meshes.
    Intersect,
}

/// One operand: a borrowed mesh placed by an affine transform.
#[derive(Debug, Clone, Copy)]
pub struct CsgInput<'m> {
    pub mesh: &'m Mesh,
    pub transform: Matrix4<Real>,
}

impl<'m> CsgInput<'m> {
    pub fn new(mesh: &'m Mesh) -> Self {
        CsgInput {
            mesh,
            transform: Matrix4::identity(),
        }
    }

    pub fn with_transform(mut self, transform: Matrix4<Real>) -> Self {
        self.transform = transform;
        self
    }
}

/// Result of a run that did not fail.
#[derive(Debug, Clone)]
pub enum CsgOutcome {
    Complete(Mesh),
    /// The cancellation token was triggered; no partial result is returned.
    Cancelled,
}

impl CsgOutcome {
    pub fn into_mesh(self) -> Option<Mesh> {
        match self {
            CsgOutcome::Complete(mesh) => Some(mesh),
            CsgOutcome::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CsgOutcome::Cancelled)
    }
}
