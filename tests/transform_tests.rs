mod support;

use nalgebra::{Matrix4, Point3, Vector3};
use slicecsg::{Mesh, float_types::Real, traits::CSGOps};

use crate::support::approx_eq;

/// Every face normal points away from `inside`.
fn faces_point_away_from(mesh: &Mesh, inside: Point3<Real>) -> bool {
    (0..mesh.faces.len()).all(|f| {
        let [a, b, c] = mesh.face_points(f);
        let centroid = Point3::from((a.coords + b.coords + c.coords) / 3.0);
        mesh.faces[f].normal.dot(&(centroid - inside)) > 0.0
    })
}

#[test]
fn rotate_about_z() {
    let rotated = Mesh::cube(1.0).rotate(0.0, 0.0, 90.0);
    let bb = rotated.bounding_box();
    assert!(approx_eq(bb.mins.x, -1.0, 1e-9));
    assert!(approx_eq(bb.maxs.x, 0.0, 1e-9));
    assert!(approx_eq(bb.mins.y, 0.0, 1e-9));
    assert!(approx_eq(bb.maxs.y, 1.0, 1e-9));
    assert!(approx_eq(rotated.signed_volume(), 1.0, 1e-9));
    assert!(faces_point_away_from(&rotated, Point3::new(-0.5, 0.5, 0.5)));
}

#[test]
fn scale_changes_volume() {
    let stretched = Mesh::cube(1.0).scale(2.0, 1.0, 3.0);
    assert!(approx_eq(stretched.signed_volume(), 6.0, 1e-9));
    assert!(approx_eq(stretched.bounding_box().maxs.z, 3.0, 1e-9));
}

#[test]
fn negative_scale_keeps_faces_outward() {
    let mirrored = Mesh::cube(1.0).scale(-1.0, 1.0, 1.0);
    assert!(approx_eq(mirrored.bounding_box().mins.x, -1.0, 1e-9));
    assert!(approx_eq(mirrored.signed_volume(), 1.0, 1e-9));
    assert!(mirrored.is_closed());
    assert!(faces_point_away_from(&mirrored, Point3::new(-0.5, 0.5, 0.5)));
}

#[test]
fn mirroring_transform_restores_winding() {
    let flip_yz = Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, -1.0, -1.0));
    let mirror = Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 1.0, -1.0));
    let octahedron = Mesh::octahedron(1.0);

    // a rotation by 180 degrees has a positive determinant and keeps winding
    let turned = octahedron.transform(&flip_yz);
    assert!(approx_eq(turned.signed_volume(), 4.0 / 3.0, 1e-9));

    let mirrored = octahedron.translate(0.0, 0.0, 2.0).transform(&mirror);
    assert!(approx_eq(mirrored.signed_volume(), 4.0 / 3.0, 1e-9));
    assert!(faces_point_away_from(&mirrored, Point3::new(0.0, 0.0, -2.0)));
}

#[test]
fn center_moves_bounds_to_the_origin() {
    let centered = Mesh::cuboid(2.0, 4.0, 6.0).translate(5.0, -3.0, 1.0).center();
    let bb = centered.bounding_box();
    assert!(approx_eq(bb.mins.x, -1.0, 1e-9));
    assert!(approx_eq(bb.mins.y, -2.0, 1e-9));
    assert!(approx_eq(bb.mins.z, -3.0, 1e-9));
    assert!(approx_eq(bb.maxs.z, 3.0, 1e-9));
}

#[test]
fn translate_vector_matches_translate() {
    let a = Mesh::cube(1.0).translate(1.0, 2.0, 3.0);
    let b = Mesh::cube(1.0).translate_vector(Vector3::new(1.0, 2.0, 3.0));
    assert_eq!(a.vertices, b.vertices);
    assert!(approx_eq(a.float().bounding_box().mins.z, 0.0, 1e-12));
}
