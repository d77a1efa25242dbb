//! Test support library
//! Provides various helper functions & utilities for tests.
#![allow(dead_code)]

use hashbrown::HashMap;
use nalgebra::{Matrix4, Point3, Vector3};
use slicecsg::{
    CsgBySlicing, CsgInput, CsgOperation, Mesh,
    float_types::{Real, parry3d::bounding_volume::Aabb},
    traits::CSGOps,
};

/// Quick helper to compare floating-point results with an acceptable tolerance.
pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}

pub fn shifted(x: Real, y: Real, z: Real) -> Matrix4<Real> {
    Matrix4::new_translation(&Vector3::new(x, y, z))
}

/// Run `operation` over `meshes`, each placed by its transform, and expect a
/// complete result.
pub fn boolean(operation: CsgOperation, meshes: &[(&Mesh, Matrix4<Real>)]) -> Mesh {
    let inputs: Vec<CsgInput<'_>> = meshes
        .iter()
        .map(|(mesh, transform)| CsgInput::new(mesh).with_transform(*transform))
        .collect();
    CsgBySlicing::new(operation)
        .run(&inputs)
        .expect("valid input")
        .into_mesh()
        .expect("not cancelled")
}

/// Unit cube at the origin and a second one shifted along x by `dx`.
pub fn offset_cubes(operation: CsgOperation, dx: Real) -> Mesh {
    let cube = Mesh::cube(1.0);
    boolean(
        operation,
        &[(&cube, Matrix4::identity()), (&cube, shifted(dx, 0.0, 0.0))],
    )
}

fn position_key(p: &Point3<Real>) -> (i64, i64, i64) {
    let q = |v: Real| (v * 1e6).round() as i64;
    (q(p.x), q(p.y), q(p.z))
}

/// Edges used by exactly one face, matching vertices by position rather than
/// index.
pub fn open_edges_by_position(mesh: &Mesh) -> usize {
    let mut uses: HashMap<((i64, i64, i64), (i64, i64, i64)), usize> = HashMap::new();
    for face in &mesh.faces {
        let keys = face.indices.map(|i| position_key(&mesh.vertices[i]));
        for (a, b) in [(0, 1), (1, 2), (2, 0)] {
            let (a, b) = (keys[a], keys[b]);
            *uses.entry((a.min(b), a.max(b))).or_default() += 1;
        }
    }
    uses.values().filter(|&&n| n == 1).count()
}

/// Total area of faces lying on the plane `normal · p = w` whose normal points
/// along `normal`.
pub fn area_on_plane(mesh: &Mesh, normal: Vector3<Real>, w: Real) -> Real {
    (0..mesh.faces.len())
        .filter(|&f| mesh.faces[f].normal.dot(&normal) > 0.999)
        .filter(|&f| {
            mesh.face_points(f)
                .iter()
                .all(|p| (p.coords.dot(&normal) - w).abs() < 1e-6)
        })
        .map(|f| {
            let [a, b, c] = mesh.face_points(f);
            (b - a).cross(&(c - a)).norm() * 0.5
        })
        .sum()
}

/// Bounds of a non-empty mesh.
pub fn bounds(mesh: &Mesh) -> Aabb {
    mesh.bounding_box()
}
