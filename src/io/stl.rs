use crate::float_types::Real;
use crate::io::IoError;
use crate::mesh::Mesh;
use nalgebra::Point3;
use std::io::Cursor;

impl Mesh {
    /// Convert this mesh to an **ASCII STL** string with the given `name`.
    ///
    /// ```rust
    /// # use slicecsg::mesh::Mesh;
    /// let stl = Mesh::cube(1.0).to_stl_ascii("my_solid");
    /// assert!(stl.starts_with("solid my_solid"));
    /// ```
    pub fn to_stl_ascii(&self, name: &str) -> String {
        let mut out = String::new();
        out.push_str(&format!("solid {name}\n"));
        for face in &self.faces {
            let n = face.normal;
            out.push_str(&format!("  facet normal {:.6} {:.6} {:.6}\n", n.x, n.y, n.z));
            out.push_str("    outer loop\n");
            for &i in &face.indices {
                let p = self.vertices[i];
                out.push_str(&format!("      vertex {:.6} {:.6} {:.6}\n", p.x, p.y, p.z));
            }
            out.push_str("    endloop\n");
            out.push_str("  endfacet\n");
        }
        out.push_str(&format!("endsolid {name}\n"));
        out
    }

    /// Convert this mesh to a **binary STL** byte vector.
    ///
    /// Binary STL has no solid name; `_name` is accepted for symmetry with
    /// [`Mesh::to_stl_ascii`].
    pub fn to_stl_binary(&self, _name: &str) -> std::io::Result<Vec<u8>> {
        use stl_io::{Normal, Triangle, Vertex, write_stl};

        let triangles: Vec<Triangle> = self
            .faces
            .iter()
            .map(|face| {
                let n = face.normal;
                Triangle {
                    normal: Normal::new([n.x as f32, n.y as f32, n.z as f32]),
                    vertices: face.indices.map(|i| {
                        let p = self.vertices[i];
                        Vertex::new([p.x as f32, p.y as f32, p.z as f32])
                    }),
                }
            })
            .collect();

        let mut cursor = Cursor::new(Vec::new());
        write_stl(&mut cursor, triangles.iter())?;
        Ok(cursor.into_inner())
    }

    /// Read an ASCII or binary STL. Identical vertices are shared.
    pub fn from_stl(bytes: &[u8]) -> Result<Mesh, IoError> {
        let mut cursor = Cursor::new(bytes);
        let stl = stl_io::read_stl(&mut cursor)?;
        let vertices = stl
            .vertices
            .iter()
            .map(|v| Point3::new(v[0] as Real, v[1] as Real, v[2] as Real))
            .collect();
        let faces: Vec<[usize; 3]> = stl.faces.iter().map(|f| f.vertices).collect();
        Ok(Mesh::from_parts(vertices, &faces)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_stl_keeps_the_solid() {
        let cube = Mesh::cube(2.0);
        let bytes = cube.to_stl_binary("cube").unwrap();
        let back = Mesh::from_stl(&bytes).unwrap();
        assert_eq!(back.faces.len(), 12);
        assert_eq!(back.vertices.len(), 8);
        assert!((back.signed_volume() - 8.0).abs() < 1e-6);
        assert!(back.is_closed());
    }

    #[test]
    fn ascii_stl_lists_every_facet() {
        let stl = Mesh::cube(1.0).to_stl_ascii("c");
        assert_eq!(stl.matches("facet normal").count(), 12);
        assert!(stl.trim_end().ends_with("endsolid c"));
    }
}
