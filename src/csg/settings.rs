//! Per-run tolerances of the slicing engine.

use crate::float_types::{
    ACTIVE_BOUNDS_EXPANSION, CONTAINMENT_BIAS, PLANE_DISTANCE_TOLERANCE, PLANE_NORMAL_TOLERANCE,
    Real, VERTEX_EXACT_DISTANCE_SQ, VERTEX_SNAP_DISTANCE_SQ, VERTEX_TOUCH_EPSILON, WELD_TOLERANCE,
};
use crate::mesh::bvh::BvhSettings;

/// Tolerance pair under which two planes are the same plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneTolerance {
    /// Largest distance between the unit normals.
    pub normal: Real,
    /// Largest difference between the offsets.
    pub distance: Real,
}

impl Default for PlaneTolerance {
    fn default() -> Self {
        PlaneTolerance {
            normal: PLANE_NORMAL_TOLERANCE,
            distance: PLANE_DISTANCE_TOLERANCE,
        }
    }
}

/// Tolerances and tuning of one [`CsgBySlicing`](super::CsgBySlicing) run.
///
/// The defaults come from the named constants in [`crate::float_types`]; each
/// serves a different purpose and they are not interchangeable.
#[derive(Debug, Clone, PartialEq)]
pub struct SlicingSettings {
    pub plane_tolerance: PlaneTolerance,
    /// Growth of the pairwise bounds intersection used to find faces that may
    /// change.
    pub active_bounds_expansion: Real,
    /// Half size of the lookup box around a new vertex.
    pub vertex_touch_epsilon: Real,
    /// Squared distance at which a new vertex already matches an input vertex.
    pub vertex_exact_distance_sq: Real,
    /// Squared distance at which a new vertex is moved onto an input vertex.
    pub vertex_snap_distance_sq: Real,
    /// Offset of the section that tells whether a coplanar region is enclosed
    /// by another body.
    pub containment_bias: Real,
    /// Result vertices closer than this are merged.
    pub weld_tolerance: Real,
    pub bvh: BvhSettings,
}

impl Default for SlicingSettings {
    fn default() -> Self {
        SlicingSettings {
            plane_tolerance: PlaneTolerance::default(),
            active_bounds_expansion: ACTIVE_BOUNDS_EXPANSION,
            vertex_touch_epsilon: VERTEX_TOUCH_EPSILON,
            vertex_exact_distance_sq: VERTEX_EXACT_DISTANCE_SQ,
            vertex_snap_distance_sq: VERTEX_SNAP_DISTANCE_SQ,
            containment_bias: CONTAINMENT_BIAS,
            weld_tolerance: WELD_TOLERANCE,
            bvh: BvhSettings::default(),
        }
    }
}

impl SlicingSettings {
    pub fn with_plane_tolerance(mut self, normal: Real, distance: Real) -> Self {
        self.plane_tolerance = PlaneTolerance { normal, distance };
        self
    }

    pub fn with_active_bounds_expansion(mut self, expansion: Real) -> Self {
        self.active_bounds_expansion = expansion;
        self
    }

    pub fn with_vertex_snapping(mut self, touch_epsilon: Real, snap_distance_sq: Real) -> Self {
        self.vertex_touch_epsilon = touch_epsilon;
        self.vertex_snap_distance_sq = snap_distance_sq;
        self
    }

    pub fn with_containment_bias(mut self, bias: Real) -> Self {
        self.containment_bias = bias;
        self
    }

    pub fn with_weld_tolerance(mut self, tolerance: Real) -> Self {
        self.weld_tolerance = tolerance;
        self
    }

    pub fn with_bvh(mut self, bvh: BvhSettings) -> Self {
        self.bvh = bvh;
        self
    }
}
