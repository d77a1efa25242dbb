mod support;

use nalgebra::{Matrix4, Vector3};
use slicecsg::{CsgOperation, Mesh, Plane, mesh::bvh::Bvh};

use crate::support::{approx_eq, boolean, shifted};

#[test]
fn cube_section_is_one_square() {
    let cube = Mesh::cube(2.0);
    let section = cube.slice(&Plane::from_normal(Vector3::z(), 1.0));
    assert_eq!(section.len(), 1);
    assert!(approx_eq(section.signed_area(), 4.0, 1e-9));
}

#[test]
fn section_through_a_hole_has_an_inner_loop() {
    let cube = Mesh::cube(1.0);
    let drill = Mesh::cuboid(0.5, 0.5, 2.0);
    let ring = boolean(
        CsgOperation::Subtract,
        &[(&cube, Matrix4::identity()), (&drill, shifted(0.25, 0.25, -0.5))],
    );
    let section = ring.slice(&Plane::from_normal(Vector3::z(), 0.5));
    assert_eq!(section.len(), 2);
    assert!(approx_eq(section.signed_area(), 0.75, 1e-6));
    // one loop of material, one clockwise hole
    let areas: Vec<i128> = section
        .paths
        .iter()
        .map(|p| slicecsg::sketch::path_area2(p))
        .collect();
    assert_eq!(areas.iter().filter(|&&a| a > 0).count(), 1);
    assert_eq!(areas.iter().filter(|&&a| a < 0).count(), 1);
}

#[test]
fn section_on_a_face_only_sees_material_behind() {
    let cube = Mesh::cube(1.0);
    // top face: the material lies behind the upward plane
    let top = cube.slice(&Plane::from_normal(Vector3::z(), 1.0));
    assert!(approx_eq(top.area(), 1.0, 1e-9));
    // facing down at the top there is nothing behind
    let above = cube.slice(&Plane::from_normal(-Vector3::z(), -1.0));
    assert!(above.is_empty());
}

#[test]
fn octahedron_equator() {
    let octahedron = Mesh::octahedron(1.0);
    let section = octahedron.slice(&Plane::from_normal(Vector3::z(), 0.0));
    assert_eq!(section.len(), 1);
    assert!(approx_eq(section.area(), 2.0, 1e-6));
}

#[test]
fn bvh_finds_faces_near_a_plane() {
    let cube = Mesh::cube(1.0);
    let bvh = Bvh::build(&cube);
    assert_eq!(bvh.len(), 12);
    let mut faces = bvh.query_plane(&Plane::from_normal(Vector3::x(), 1.0), 1e-6);
    faces.sort_unstable();
    // the two +X faces and the eight side faces touching x = 1
    assert_eq!(faces.len(), 10);
    assert!(faces.contains(&10) && faces.contains(&11));
}
