// main.rs
//
// Runs the basic slicing booleans on unit cubes and an octahedron, prints a
// summary of each result and, with the `stl-io` feature, writes them to stl/.

use nalgebra::{Matrix4, Vector3};
use slicecsg::{CsgBySlicing, CsgInput, CsgOperation, Mesh};
use std::fs;

fn shifted(x: f64, y: f64, z: f64) -> Matrix4<f64> {
    Matrix4::new_translation(&Vector3::new(x, y, z))
}

fn run(name: &str, operation: CsgOperation, inputs: &[CsgInput<'_>]) {
    let outcome = CsgBySlicing::new(operation)
        .with_progress(|ratio, stage| println!("  [{name}] {:>5.1}% {stage}", ratio * 100.0))
        .run(inputs);
    match outcome.map(|o| o.into_mesh()) {
        Ok(Some(mesh)) => {
            println!(
                "{name}: {} faces, {} vertices, volume {:.6}, area {:.6}, open edges {}",
                mesh.faces.len(),
                mesh.vertices.len(),
                mesh.signed_volume(),
                mesh.surface_area(),
                mesh.open_edge_count(),
            );
            write_stl(name, &mesh);
        },
        Ok(None) => println!("{name}: cancelled"),
        Err(err) => eprintln!("{name}: {err}"),
    }
}

#[cfg(feature = "stl-io")]
fn write_stl(name: &str, mesh: &Mesh) {
    let _ = fs::write(format!("stl/{name}.stl"), mesh.to_stl_ascii(name));
}

#[cfg(not(feature = "stl-io"))]
fn write_stl(_name: &str, _mesh: &Mesh) {}

fn main() {
    // Ensure the /stls folder exists
    let _ = fs::create_dir_all("stl");

    let cube = Mesh::cube(1.0);
    let half = shifted(0.5, 0.0, 0.0);

    run("union", CsgOperation::Union, &[CsgInput::new(&cube), CsgInput::new(&cube).with_transform(half)]);
    run("subtract", CsgOperation::Subtract, &[CsgInput::new(&cube), CsgInput::new(&cube).with_transform(half)]);
    run("intersect", CsgOperation::Intersect, &[CsgInput::new(&cube), CsgInput::new(&cube).with_transform(half)]);

    // flush contact leaves no wall at x = 1
    run(
        "flush_union",
        CsgOperation::Union,
        &[CsgInput::new(&cube), CsgInput::new(&cube).with_transform(shifted(1.0, 0.0, 0.0))],
    );

    let octahedron = Mesh::octahedron(0.4);
    let corner = shifted(0.9, 0.45, 0.55);
    for (name, operation) in [
        ("octahedron_union", CsgOperation::Union),
        ("octahedron_subtract", CsgOperation::Subtract),
        ("octahedron_intersect", CsgOperation::Intersect),
    ] {
        run(name, operation, &[CsgInput::new(&cube), CsgInput::new(&octahedron).with_transform(corner)]);
    }

    // three bodies at once
    run(
        "triple_union",
        CsgOperation::Union,
        &[
            CsgInput::new(&cube),
            CsgInput::new(&cube).with_transform(shifted(0.5, 0.5, 0.0)),
            CsgInput::new(&cube).with_transform(shifted(0.25, 0.25, 0.5)),
        ],
    );
}
