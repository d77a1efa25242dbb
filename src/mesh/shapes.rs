//! 3D Shapes as `Mesh`s

use crate::errors::ValidationError;
use crate::float_types::Real;
use crate::mesh::Mesh;
use nalgebra::Point3;

impl Mesh {
    /// Create a right prism (a box) that spans from (0, 0, 0)
    /// to (width, length, height). All dimensions must be >= 0.
    pub fn cuboid(width: Real, length: Real, height: Real) -> Mesh {
        let p = |x: Real, y: Real, z: Real| Point3::new(x * width, y * length, z * height);
        let vertices = vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
            p(0.0, 0.0, 1.0),
            p(1.0, 0.0, 1.0),
            p(1.0, 1.0, 1.0),
            p(0.0, 1.0, 1.0),
        ];
        let faces = [
            // bottom (-Z)
            [0, 2, 1],
            [0, 3, 2],
            // top (+Z)
            [4, 5, 6],
            [4, 6, 7],
            // front (-Y)
            [0, 1, 5],
            [0, 5, 4],
            // back (+Y)
            [3, 7, 6],
            [3, 6, 2],
            // left (-X)
            [0, 4, 7],
            [0, 7, 3],
            // right (+X)
            [1, 2, 6],
            [1, 6, 5],
        ];
        let mut mesh = Mesh::new();
        mesh.vertices = vertices;
        for indices in faces {
            mesh.add_face(indices);
        }
        mesh
    }

    pub fn cube(size: Real) -> Mesh {
        Self::cuboid(size, size, size)
    }

    /// Regular octahedron centred at the origin with its vertices on the axes
    /// at distance `radius`.
    pub fn octahedron(radius: Real) -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices = vec![
            Point3::new(radius, 0.0, 0.0),
            Point3::new(-radius, 0.0, 0.0),
            Point3::new(0.0, radius, 0.0),
            Point3::new(0.0, -radius, 0.0),
            Point3::new(0.0, 0.0, radius),
            Point3::new(0.0, 0.0, -radius),
        ];
        for x in [0, 1] {
            for y in [2, 3] {
                for z in [4, 5] {
                    // (+x, +y, +z) winds outwards; each negated axis mirrors it
                    let negatives = (x == 1) as u8 + (y == 3) as u8 + (z == 5) as u8;
                    if negatives % 2 == 0 {
                        mesh.add_face([x, y, z]);
                    } else {
                        mesh.add_face([x, z, y]);
                    }
                }
            }
        }
        mesh
    }

    /// Build a mesh from raw points and triangle index triples.
    ///
    /// # Errors
    /// [`ValidationError::FaceIndexOutOfRange`] when a face references a point
    /// that does not exist.
    pub fn polyhedron(points: &[[Real; 3]], faces: &[[usize; 3]]) -> Result<Mesh, ValidationError> {
        let vertices = points
            .iter()
            .map(|&[x, y, z]| Point3::new(x, y, z))
            .collect();
        Mesh::from_parts(vertices, faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cuboid_is_closed_with_outward_faces() {
        let mesh = Mesh::cuboid(2.0, 3.0, 4.0);
        assert_eq!(mesh.faces.len(), 12);
        assert!(mesh.is_closed());
        assert_relative_eq!(mesh.signed_volume(), 24.0, epsilon = 1e-12);
    }

    #[test]
    fn octahedron_volume() {
        let mesh = Mesh::octahedron(1.0);
        assert_eq!(mesh.faces.len(), 8);
        assert!(mesh.is_closed());
        assert_relative_eq!(mesh.signed_volume(), 4.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn polyhedron_rejects_bad_indices() {
        let err = Mesh::polyhedron(&[[0.0; 3], [1.0, 0.0, 0.0]], &[[0, 1, 2]]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::FaceIndexOutOfRange { face: 0, index: 2, len: 2 }
        ));
    }
}
