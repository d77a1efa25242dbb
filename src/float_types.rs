// Re-export parry for the f64 build
pub use parry3d_f64 as parry3d;

// Our Real scalar type:
pub type Real = f64;

use core::str::FromStr;
use std::sync::OnceLock;

/// Generic degeneracy threshold for lengths and areas.
pub const EPSILON: Real = 1e-10;

/// Archimedes' constant (π)
pub const PI: Real = core::f64::consts::PI;

// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// Plane equality
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

/// Largest euclidean distance between two unit normals for the planes to be
/// considered the same.
pub const PLANE_NORMAL_TOLERANCE: Real = 1e-4;

/// Largest difference between two plane offsets for the planes to be
/// considered the same.
pub const PLANE_DISTANCE_TOLERANCE: Real = 1e-4;

/// A plane is only indexed on an axis when the magnitude of its normal
/// component on that axis exceeds this value.
pub const PLANE_AXIS_THRESHOLD: Real = 0.2;

// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// Slicing
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

/// Vertices closer than this to a cutting plane are treated as lying in front
/// of it, so a section taken at a face plane describes the material just
/// behind that plane.
pub const SLICE_ON_PLANE_EPSILON: Real = 1e-5;

/// Maximum distance between two segment endpoints that are chained together.
pub const LOOP_JOIN_TOLERANCE: Real = 1e-6;

/// Maximum gap closed while stitching open chains into loops.
pub const LOOP_STITCH_DISTANCE: Real = 0.02;

/// Loops with a shorter perimeter are discarded as numerical noise.
pub const MIN_LOOP_PERIMETER: Real = 1e-4;

/// Amount the pairwise mesh-bounds intersection is grown by before faces are
/// classified against it.
pub const ACTIVE_BOUNDS_EXPANSION: Real = 0.01;

/// Offset along the plane normal of the section used to decide whether a
/// coplanar region is enclosed by another body.
pub const CONTAINMENT_BIAS: Real = 1e-3;

// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// Vertices
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

/// Half size of the box used to look up input triangles near a new vertex.
pub const VERTEX_TOUCH_EPSILON: Real = 1e-2;

/// Squared distance below which a new vertex already coincides with an input
/// vertex.
pub const VERTEX_EXACT_DISTANCE_SQ: Real = 1e-20;

/// Squared distance below which a new vertex is moved onto an input vertex.
pub const VERTEX_SNAP_DISTANCE_SQ: Real = 1e-5;

/// Vertices of the result closer than this are merged.
pub const WELD_TOLERANCE: Real = 1e-5;

// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
// Fixed-point clipping
// ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~

/// Lazily-initialized scale from model units to clipper integer units.
/// Defaults to `1e6`, but can be overridden:
///  1) **Build-time**: set env var `SLICECSG_CLIP_SCALE` (e.g. `SLICECSG_CLIP_SCALE=1e5 cargo build`)
///  2) **Runtime**: call [`set_clip_scale`] once before using the library
static CLIP_SCALE_CELL: OnceLock<Real> = OnceLock::new();

pub const DEFAULT_CLIP_SCALE: Real = 1e6;

/// Returns the current model-to-integer scale of the polygon clipper.
pub fn clip_scale() -> Real {
    *CLIP_SCALE_CELL.get_or_init(|| {
        if let Some(environment_variable) = option_env!("SLICECSG_CLIP_SCALE") {
            if let Ok(value) = Real::from_str(environment_variable) {
                if value.is_finite() && value >= 1.0 {
                    return value;
                }
            }
        }
        DEFAULT_CLIP_SCALE
    })
}

/// Set the clipper scale programmatically once (subsequent calls are ignored).
/// Call near program start: `slicecsg::float_types::set_clip_scale(1e5);`
pub fn set_clip_scale(value: Real) {
    if value.is_finite() && value >= 1.0 {
        let _ = CLIP_SCALE_CELL.set(value);
    }
}
