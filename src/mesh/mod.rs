//! `Mesh` struct and implementations of the `CSGOps` trait for `Mesh`

use crate::csg::{CsgBySlicing, CsgInput, CsgOperation};
use crate::errors::{CsgError, ValidationError};
use crate::float_types::{
    EPSILON, Real,
    parry3d::bounding_volume::Aabb,
};
use crate::traits::CSGOps;
use hashbrown::{HashMap, HashSet};
use nalgebra::{Matrix4, Point3, Vector3};
use std::sync::OnceLock;

pub mod bvh;
pub mod plane;
pub mod shapes;
pub mod slice;

use plane::Plane;

/// A triangle referencing three vertices of its [`Mesh`], with its cached
/// unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    pub indices: [usize; 3],
    pub normal: Vector3<Real>,
}

impl Face {
    /// Reverse the winding of this face.
    pub fn flip(&mut self) {
        self.indices.swap(1, 2);
        self.normal = -self.normal;
    }
}

/// Unit normal of a counter-clockwise triangle; NaN for degenerate input.
pub fn triangle_normal(points: &[Point3<Real>; 3]) -> Vector3<Real> {
    (points[1] - points[0])
        .cross(&(points[2] - points[0]))
        .normalize()
}

/// Indexed triangle mesh.
///
/// No closedness or manifoldness is assumed: boolean operations tolerate open
/// and non-manifold input.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<Point3<Real>>,
    pub faces: Vec<Face>,

    /// Lazily calculated AABB that spans `vertices`.
    bounding_box: OnceLock<Aabb>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from vertices and index triples, computing face normals.
    pub fn from_parts(
        vertices: Vec<Point3<Real>>,
        faces: &[[usize; 3]],
    ) -> Result<Self, ValidationError> {
        let mut mesh = Mesh {
            vertices,
            ..Default::default()
        };
        for (face, indices) in faces.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i >= mesh.vertices.len()) {
                return Err(ValidationError::FaceIndexOutOfRange {
                    face,
                    index,
                    len: mesh.vertices.len(),
                });
            }
            mesh.add_face(*indices);
        }
        Ok(mesh)
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn add_vertex(&mut self, point: Point3<Real>) -> usize {
        self.vertices.push(point);
        self.bounding_box = OnceLock::new();
        self.vertices.len() - 1
    }

    pub fn set_vertex(&mut self, index: usize, point: Point3<Real>) {
        self.vertices[index] = point;
        self.bounding_box = OnceLock::new();
    }

    /// Append a face over existing vertices and return its index.
    pub fn add_face(&mut self, indices: [usize; 3]) -> usize {
        let normal = triangle_normal(&indices.map(|i| self.vertices[i]));
        self.faces.push(Face { indices, normal });
        self.faces.len() - 1
    }

    /// Append a triangle with its own three vertices and return the face index.
    pub fn add_triangle(&mut self, points: [Point3<Real>; 3]) -> usize {
        let base = self.vertices.len();
        self.vertices.extend_from_slice(&points);
        self.bounding_box = OnceLock::new();
        self.faces.push(Face {
            indices: [base, base + 1, base + 2],
            normal: triangle_normal(&points),
        });
        self.faces.len() - 1
    }

    pub fn face_points(&self, face: usize) -> [Point3<Real>; 3] {
        self.faces[face].indices.map(|i| self.vertices[i])
    }

    /// Plane of a face, NaN for degenerate triangles.
    pub fn face_plane(&self, face: usize) -> Plane {
        let [a, b, c] = self.face_points(face);
        Plane::from_points(&a, &b, &c)
    }

    pub fn face_bounding_box(&self, face: usize) -> Aabb {
        let [a, b, c] = self.face_points(face);
        Aabb::new(a.inf(&b).inf(&c), a.sup(&b).sup(&c))
    }

    /// Recompute the cached normal of a face from its current vertices.
    pub fn refresh_normal(&mut self, face: usize) {
        self.faces[face].normal = triangle_normal(&self.face_points(face));
    }

    pub fn flip_face(&mut self, face: usize) {
        self.faces[face].flip();
    }

    /// Append all faces of `other`, keeping its vertices separate.
    pub fn merge(&mut self, other: &Mesh) {
        let base = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(other.faces.iter().map(|face| Face {
            indices: face.indices.map(|i| i + base),
            normal: face.normal,
        }));
        self.bounding_box = OnceLock::new();
    }

    /// Check that every face references existing, finite vertices.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some((vertex, point)) = self
            .vertices
            .iter()
            .enumerate()
            .find(|(_, p)| !p.coords.iter().all(|c| c.is_finite()))
        {
            return Err(ValidationError::InvalidCoordinate { vertex, point: *point });
        }
        let len = self.vertices.len();
        for (face, f) in self.faces.iter().enumerate() {
            if let Some(&index) = f.indices.iter().find(|&&i| i >= len) {
                return Err(ValidationError::FaceIndexOutOfRange { face, index, len });
            }
        }
        Ok(())
    }

    /// Like [`Mesh::validate`], additionally rejecting faces that repeat a vertex.
    pub fn validate_strict(&self) -> Result<(), ValidationError> {
        self.validate()?;
        for (face, f) in self.faces.iter().enumerate() {
            let [a, b, c] = f.indices;
            if a == b || a == c {
                return Err(ValidationError::DegenerateFace { face, index: a });
            }
            if b == c {
                return Err(ValidationError::DegenerateFace { face, index: b });
            }
        }
        Ok(())
    }

    /// Copy of this mesh with `matrix` applied to every vertex.
    ///
    /// Mirroring transforms (negative determinant) reverse the winding so
    /// faces keep pointing outwards.
    pub fn transformed(&self, matrix: &Matrix4<Real>) -> Mesh {
        let mirror = matrix.fixed_view::<3, 3>(0, 0).determinant() < 0.0;
        let mut mesh = Mesh {
            vertices: self
                .vertices
                .iter()
                .map(|p| matrix.transform_point(p))
                .collect(),
            faces: self.faces.clone(),
            bounding_box: OnceLock::new(),
        };
        for face in 0..mesh.faces.len() {
            if mirror {
                mesh.faces[face].indices.swap(1, 2);
            }
            mesh.refresh_normal(face);
        }
        mesh
    }

    /// Drop every face whose index is in `tombstones`, preserving order.
    pub fn remove_faces(&mut self, tombstones: &HashSet<usize>) {
        if tombstones.is_empty() {
            return;
        }
        let mut index = 0;
        self.faces.retain(|_| {
            let keep = !tombstones.contains(&index);
            index += 1;
            keep
        });
    }

    /// Merge vertices closer than `tolerance` and drop faces that collapse.
    ///
    /// Uses a spatial hash with cells of size `tolerance`; each vertex is
    /// compared with the already-kept vertices of the 27 surrounding cells.
    pub fn weld_vertices(&mut self, tolerance: Real) {
        let cell = tolerance.max(EPSILON);
        let key = |p: &Point3<Real>| {
            (
                (p.x / cell).floor() as i64,
                (p.y / cell).floor() as i64,
                (p.z / cell).floor() as i64,
            )
        };
        let tol_sq = tolerance * tolerance;

        let mut grid: HashMap<(i64, i64, i64), Vec<usize>> = HashMap::new();
        let mut welded: Vec<Point3<Real>> = Vec::with_capacity(self.vertices.len());
        let mut remap = Vec::with_capacity(self.vertices.len());

        for p in &self.vertices {
            let (kx, ky, kz) = key(p);
            let mut found = None;
            'search: for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        if let Some(bucket) = grid.get(&(kx + dx, ky + dy, kz + dz)) {
                            if let Some(&i) =
                                bucket.iter().find(|&&i| (welded[i] - p).norm_squared() <= tol_sq)
                            {
                                found = Some(i);
                                break 'search;
                            }
                        }
                    }
                }
            }
            let index = found.unwrap_or_else(|| {
                welded.push(*p);
                grid.entry((kx, ky, kz)).or_default().push(welded.len() - 1);
                welded.len() - 1
            });
            remap.push(index);
        }

        self.vertices = welded;
        for face in &mut self.faces {
            face.indices = face.indices.map(|i| remap[i]);
        }
        self.faces.retain(|f| {
            let [a, b, c] = f.indices;
            a != b && b != c && a != c
        });
        self.bounding_box = OnceLock::new();
    }

    /// Split faces at every vertex lying on one of their edges within
    /// `tolerance`, so neighbouring faces meet at whole edges.
    ///
    /// Expects welded vertices with no unused ones; a stray vertex near an
    /// edge would split it too.
    pub fn split_edges_at_vertices(&mut self, tolerance: Real) {
        let vertices = &self.vertices;
        let mut by_x: Vec<usize> = (0..vertices.len()).collect();
        by_x.sort_by(|&a, &b| vertices[a].x.total_cmp(&vertices[b].x));
        let tol_sq = tolerance * tolerance;
        let pad = Vector3::repeat(tolerance);

        // vertex strictly inside edge a-b nearest to a
        let on_edge = |a: usize, b: usize| -> Option<usize> {
            let (pa, pb) = (vertices[a], vertices[b]);
            let dir = pb - pa;
            let len_sq = dir.norm_squared();
            if len_sq <= tol_sq {
                return None;
            }
            let (lo, hi) = (pa.inf(&pb) - pad, pa.sup(&pb) + pad);
            let start = by_x.partition_point(|&i| vertices[i].x < lo.x);
            let mut best: Option<(Real, usize)> = None;
            for &i in &by_x[start..] {
                let p = vertices[i];
                if p.x > hi.x {
                    break;
                }
                if i == a || i == b || (0..3).any(|k| p[k] < lo[k] || p[k] > hi[k]) {
                    continue;
                }
                let t = (p - pa).dot(&dir) / len_sq;
                if t <= 0.0 || t >= 1.0 || (pa + dir * t - p).norm_squared() > tol_sq {
                    continue;
                }
                if best.is_none_or(|(bt, _)| t < bt) {
                    best = Some((t, i));
                }
            }
            best.map(|(_, i)| i)
        };

        let mut faces = Vec::with_capacity(self.faces.len());
        let mut splits = 0usize;
        for face in &self.faces {
            let mut pending = vec![face.indices];
            while let Some(tri) = pending.pop() {
                let hit = (0..3).find_map(|e| on_edge(tri[e], tri[(e + 1) % 3]).map(|v| (e, v)));
                match hit {
                    Some((e, v)) => {
                        let (a, b, c) = (tri[e], tri[(e + 1) % 3], tri[(e + 2) % 3]);
                        pending.push([a, v, c]);
                        pending.push([v, b, c]);
                        splits += 1;
                    },
                    None => faces.push(Face {
                        indices: tri,
                        normal: face.normal,
                    }),
                }
            }
        }
        if splits > 0 {
            log::trace!("split {splits} edges at vertices lying on them");
        }
        self.faces = faces;
    }

    /// Drop vertices that no face references.
    pub fn remove_unused_vertices(&mut self) {
        let mut remap = vec![usize::MAX; self.vertices.len()];
        let mut kept = Vec::new();
        for face in &mut self.faces {
            for i in face.indices.iter_mut() {
                if remap[*i] == usize::MAX {
                    remap[*i] = kept.len();
                    kept.push(self.vertices[*i]);
                }
                *i = remap[*i];
            }
        }
        self.vertices = kept;
        self.bounding_box = OnceLock::new();
    }

    /// Volume enclosed by the faces (divergence theorem). Only meaningful for
    /// closed, consistently oriented meshes.
    pub fn signed_volume(&self) -> Real {
        self.faces
            .iter()
            .map(|f| {
                let [a, b, c] = f.indices.map(|i| self.vertices[i].coords);
                a.dot(&b.cross(&c))
            })
            .sum::<Real>()
            / 6.0
    }

    pub fn surface_area(&self) -> Real {
        (0..self.faces.len())
            .map(|f| {
                let [a, b, c] = self.face_points(f);
                (b - a).cross(&(c - a)).norm() * 0.5
            })
            .sum()
    }

    /// How many faces use each undirected edge.
    pub fn edge_use_counts(&self) -> HashMap<(usize, usize), usize> {
        let mut counts = HashMap::new();
        for face in &self.faces {
            let [a, b, c] = face.indices;
            for (i, j) in [(a, b), (b, c), (c, a)] {
                *counts.entry((i.min(j), i.max(j))).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Number of edges not shared by exactly two faces.
    pub fn open_edge_count(&self) -> usize {
        self.edge_use_counts().values().filter(|&&n| n != 2).count()
    }

    /// `true` when every edge is shared by exactly two faces.
    pub fn is_closed(&self) -> bool {
        self.open_edge_count() == 0
    }
}

impl CSGOps for Mesh {
    fn new() -> Self {
        Mesh::new()
    }

    fn union(&self, other: &Mesh) -> Result<Mesh, CsgError> {
        boolean(CsgOperation::Union, self, other)
    }

    fn difference(&self, other: &Mesh) -> Result<Mesh, CsgError> {
        boolean(CsgOperation::Subtract, self, other)
    }

    fn intersection(&self, other: &Mesh) -> Result<Mesh, CsgError> {
        boolean(CsgOperation::Intersect, self, other)
    }

    fn transform(&self, matrix: &Matrix4<Real>) -> Mesh {
        self.transformed(matrix)
    }

    /// Returns a [`parry3d::bounding_volume::Aabb`] indicating the 3D bounds of all `vertices`.
    fn bounding_box(&self) -> Aabb {
        *self.bounding_box.get_or_init(|| {
            let mut vertices = self.vertices.iter();
            let Some(first) = vertices.next() else {
                return Aabb::new(Point3::origin(), Point3::origin());
            };
            let (mins, maxs) = vertices.fold((*first, *first), |(lo, hi), p| {
                (lo.inf(p), hi.sup(p))
            });
            Aabb::new(mins, maxs)
        })
    }
}

fn boolean(operation: CsgOperation, a: &Mesh, b: &Mesh) -> Result<Mesh, CsgError> {
    let outcome = CsgBySlicing::new(operation).run(&[CsgInput::new(a), CsgInput::new(b)])?;
    // no cancellation token is attached, so the run always completes
    Ok(outcome.into_mesh().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weld_merges_nearby_vertices_and_drops_collapsed_faces() {
        let mut mesh = Mesh::new();
        mesh.add_triangle([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]);
        mesh.add_triangle([
            Point3::new(1.0, 0.0, 1e-7),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, -1e-7),
        ]);
        mesh.add_triangle([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1e-9),
            Point3::new(0.0, 1.0, 0.0),
        ]);
        mesh.weld_vertices(1e-5);
        mesh.remove_unused_vertices();
        assert_eq!(mesh.faces.len(), 2);
        assert_eq!(mesh.vertices.len(), 4);
    }

    #[test]
    fn edge_with_a_vertex_on_it_is_split() {
        // one triangle above the x axis, two below meeting at (1, 0, 0)
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(1.0, -1.0, 0.0),
            Point3::new(1.0, 1e-7, 0.0),
        ];
        let mut mesh = Mesh::from_parts(vertices, &[[0, 1, 2], [0, 3, 4], [4, 3, 1]]).unwrap();
        assert_eq!(mesh.open_edge_count(), 6);

        mesh.split_edges_at_vertices(1e-5);
        assert_eq!(mesh.faces.len(), 4);
        // only the outer rim stays open
        assert_eq!(mesh.open_edge_count(), 4);
        assert!((mesh.surface_area() - 2.0).abs() < 1e-6);
        assert!(mesh.faces.iter().all(|f| f.normal.z > 0.0));
        assert!(mesh.faces.iter().all(|f| triangle_normal(&f.indices.map(|i| mesh.vertices[i])).z > 0.0));
    }

    #[test]
    fn remove_faces_keeps_order() {
        let mut mesh = Mesh::new();
        for i in 0..4 {
            let x = i as Real;
            mesh.add_triangle([
                Point3::new(x, 0.0, 0.0),
                Point3::new(x + 1.0, 0.0, 0.0),
                Point3::new(x, 1.0, 0.0),
            ]);
        }
        let tombstones: HashSet<usize> = [1, 2].into_iter().collect();
        mesh.remove_faces(&tombstones);
        assert_eq!(mesh.faces.len(), 2);
        assert_eq!(mesh.face_points(1)[0].x, 3.0);
    }
}
