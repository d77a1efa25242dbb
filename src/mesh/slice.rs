//! Planar cross-sections of triangle meshes.

use crate::float_types::{LOOP_JOIN_TOLERANCE, Real, SLICE_ON_PLANE_EPSILON};
use crate::mesh::{Mesh, bvh::Bvh, plane::{Plane, PlaneFrame}};
use crate::sketch::{Polygons, loops::LoopBuilder};
use nalgebra::{Point2, Point3};

/// Segment where face `face` crosses `plane`, directed so that the material
/// behind the face lies to its left when seen from the front of the plane.
///
/// Vertices within `on_plane` of the plane count as being in front of it, so
/// faces lying in the plane produce nothing and a face touching it only from
/// behind contributes its touching edge.
pub fn face_segment(
    mesh: &Mesh,
    face: usize,
    plane: &Plane,
    frame: &PlaneFrame,
    on_plane: Real,
) -> Option<(Point2<Real>, Point2<Real>)> {
    let normal = mesh.faces[face].normal;
    if !normal.iter().all(|c| c.is_finite()) {
        return None;
    }
    let points = mesh.face_points(face);
    let d = points.map(|p| plane.signed_distance(&p));
    let front = d.map(|v| v >= -on_plane);
    if front.iter().all(|&f| f) || front.iter().all(|&f| !f) {
        return None;
    }

    let mut crossings: Vec<Point3<Real>> = Vec::with_capacity(2);
    for (i, j) in [(0, 1), (1, 2), (2, 0)] {
        if front[i] != front[j] {
            let t = (d[i] / (d[i] - d[j])).clamp(0.0, 1.0);
            crossings.push(points[i] + (points[j] - points[i]) * t);
        }
    }
    let [a, b] = crossings.as_slice() else {
        return None;
    };

    let (a2, b2) = (frame.project(a), frame.project(b));
    let direction = frame.to_xy.transform_vector(&plane.normal.cross(&normal));
    if (b2 - a2).dot(&direction.xy()) >= 0.0 {
        Some((a2, b2))
    } else {
        Some((b2, a2))
    }
}

fn section_from_faces(
    mesh: &Mesh,
    faces: impl IntoIterator<Item = usize>,
    plane: &Plane,
    frame: &PlaneFrame,
) -> Polygons {
    let mut builder = LoopBuilder::new(LOOP_JOIN_TOLERANCE);
    for face in faces {
        if let Some((a, b)) = face_segment(mesh, face, plane, frame, SLICE_ON_PLANE_EPSILON) {
            builder.add_segment(a, b);
        }
    }
    let loops = builder.build();
    Polygons::from_loops(loops.iter().map(|l| l.as_slice()))
}

/// Cross-section of `mesh` just behind `plane`, in the coordinates of `frame`.
///
/// Only faces reported by `bvh` near the plane are visited. Material loops
/// run counter-clockwise and holes clockwise.
pub fn cross_section(mesh: &Mesh, bvh: &Bvh, plane: &Plane, frame: &PlaneFrame) -> Polygons {
    if !plane.is_finite() {
        return Polygons::new();
    }
    let faces = bvh.query_plane(plane, SLICE_ON_PLANE_EPSILON);
    section_from_faces(mesh, faces, plane, frame)
}

impl Mesh {
    /// Cross-section just behind `plane`, in the plane's own XY frame.
    pub fn slice(&self, plane: &Plane) -> Polygons {
        if !plane.is_finite() {
            return Polygons::new();
        }
        section_from_faces(self, 0..self.faces.len(), plane, &plane.frame())
    }
}
