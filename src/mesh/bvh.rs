//! Bounding volume hierarchy over the triangles of a [`Mesh`].
//!
//! The tree is built top-down once and never updated. Splits are chosen with
//! a surface-area heuristic; above [`BvhSettings::sah_face_limit`] faces the
//! build falls back to median splits on a round-robin axis to bound the build
//! time.

use crate::float_types::{
    Real,
    parry3d::{
        bounding_volume::{Aabb, BoundingVolume},
        query::{Ray, RayCast},
    },
};
use crate::mesh::{Mesh, plane::Plane};
use nalgebra::{Point3, Vector3};

/// Tuning knobs of the BVH build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhSettings {
    /// Nodes with at most this many faces always become leaves.
    pub max_leaf_size: usize,
    /// Above this many faces a node is split at the median of a round-robin
    /// axis instead of evaluating the SAH.
    pub sah_face_limit: usize,
    /// Relative cost of testing a ray or box against one AABB.
    pub aabb_test_cost: Real,
    /// Relative cost of testing against one triangle.
    pub intersect_cost: Real,
    /// Hard depth limit.
    pub max_depth: usize,
}

impl Default for BvhSettings {
    fn default() -> Self {
        BvhSettings {
            max_leaf_size: 4,
            sah_face_limit: 50_000,
            aabb_test_cost: 1.0,
            intersect_cost: 2.0,
            max_depth: 48,
        }
    }
}

#[derive(Debug, Clone)]
struct BvhNode {
    bounds: Aabb,
    /// Left child (None for leaf)
    left: Option<Box<BvhNode>>,
    /// Right child (None for leaf)
    right: Option<Box<BvhNode>>,
    /// Faces and their bounds (only for leaf nodes)
    faces: Vec<(usize, Aabb)>,
}

impl BvhNode {
    fn leaf(bounds: Aabb, faces: Vec<(usize, Aabb)>) -> Self {
        BvhNode {
            bounds,
            left: None,
            right: None,
            faces,
        }
    }

    fn branch(left: BvhNode, right: BvhNode) -> Self {
        BvhNode {
            bounds: left.bounds.merged(&right.bounds),
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
            faces: Vec::new(),
        }
    }

    fn depth(&self) -> usize {
        let left = self.left.as_ref().map_or(0, |n| n.depth());
        let right = self.right.as_ref().map_or(0, |n| n.depth());
        1 + left.max(right)
    }
}

/// A face with its bounds, as handled during the build.
#[derive(Debug, Clone, Copy)]
struct Item {
    face: usize,
    bounds: Aabb,
    centroid: Point3<Real>,
}

/// Immutable BVH over triangle bounding boxes.
#[derive(Debug, Clone)]
pub struct Bvh {
    root: Option<BvhNode>,
    len: usize,
}

fn surface_area(aabb: &Aabb) -> Real {
    let e = aabb.extents();
    2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
}

fn enclose(items: &[Item]) -> Option<Aabb> {
    let (first, rest) = items.split_first()?;
    Some(rest.iter().fold(first.bounds, |acc, item| acc.merged(&item.bounds)))
}

impl Bvh {
    /// Build a BVH over all faces of `mesh` with default settings.
    pub fn build(mesh: &Mesh) -> Self {
        Self::build_with(mesh, &BvhSettings::default())
    }

    pub fn build_with(mesh: &Mesh, settings: &BvhSettings) -> Self {
        let bounds = (0..mesh.faces.len())
            .map(|face| (face, mesh.face_bounding_box(face)))
            .collect();
        Self::from_bounds(bounds, settings)
    }

    /// Build a BVH over arbitrary `(id, bounds)` pairs.
    pub fn from_bounds(bounds: Vec<(usize, Aabb)>, settings: &BvhSettings) -> Self {
        let items: Vec<Item> = bounds
            .into_iter()
            .filter(|(_, b)| b.mins.coords.iter().chain(b.maxs.coords.iter()).all(|c| c.is_finite()))
            .map(|(face, bounds)| Item {
                face,
                bounds,
                centroid: bounds.center(),
            })
            .collect();
        let len = items.len();
        let root = (!items.is_empty()).then(|| Self::build_recursive(items, 0, settings));
        Bvh { root, len }
    }

    fn build_recursive(mut items: Vec<Item>, depth: usize, settings: &BvhSettings) -> BvhNode {
        let Some(bounds) = enclose(&items) else {
            return BvhNode::leaf(Aabb::new(Point3::origin(), Point3::origin()), Vec::new());
        };
        if items.len() <= settings.max_leaf_size || depth >= settings.max_depth {
            return BvhNode::leaf(bounds, items.iter().map(|i| (i.face, i.bounds)).collect());
        }

        let split = if items.len() > settings.sah_face_limit {
            let axis = depth % 3;
            let mid = items.len() / 2;
            items.select_nth_unstable_by(mid, |a, b| {
                a.centroid[axis].total_cmp(&b.centroid[axis])
            });
            Some(mid)
        } else {
            Self::sah_split(&mut items, &bounds, settings)
        };

        match split {
            Some(mid) if mid > 0 && mid < items.len() => {
                let right = items.split_off(mid);
                let left = Self::build_recursive(items, depth + 1, settings);
                let right = Self::build_recursive(right, depth + 1, settings);
                BvhNode::branch(left, right)
            },
            _ => BvhNode::leaf(bounds, items.iter().map(|i| (i.face, i.bounds)).collect()),
        }
    }

    /// Sort `items` along the cheapest axis and return the split position, or
    /// `None` when keeping a leaf is cheaper than any split.
    fn sah_split(items: &mut [Item], bounds: &Aabb, settings: &BvhSettings) -> Option<usize> {
        let n = items.len();
        let parent_area = surface_area(bounds);
        let leaf_cost = n as Real * settings.intersect_cost;

        let mut best: Option<(Real, usize, usize)> = None;
        let mut suffix = vec![0.0; n];
        for axis in 0..3 {
            items.sort_by(|a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));

            // suffix[i] = surface area of items[i..]
            let mut acc = items[n - 1].bounds;
            for i in (0..n).rev() {
                acc = acc.merged(&items[i].bounds);
                suffix[i] = surface_area(&acc);
            }

            let mut prefix = items[0].bounds;
            for i in 1..n {
                let left_area = surface_area(&prefix);
                let (p_left, p_right) = if parent_area > 0.0 {
                    (left_area / parent_area, suffix[i] / parent_area)
                } else {
                    (1.0, 1.0)
                };
                let cost = 2.0 * settings.aabb_test_cost
                    + p_left * i as Real * settings.intersect_cost
                    + p_right * (n - i) as Real * settings.intersect_cost;
                if best.is_none_or(|(c, _, _)| cost < c) {
                    best = Some((cost, axis, i));
                }
                prefix = prefix.merged(&items[i].bounds);
            }
        }

        let (cost, axis, split) = best?;
        if cost >= leaf_cost && n <= 4 * settings.max_leaf_size {
            return None;
        }
        if axis != 2 {
            items.sort_by(|a, b| a.centroid[axis].total_cmp(&b.centroid[axis]));
        }
        Some(split)
    }

    /// Number of indexed faces.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Depth of the tree, 0 when empty.
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, BvhNode::depth)
    }

    /// Bounds of everything in the tree.
    pub fn bounds(&self) -> Option<Aabb> {
        self.root.as_ref().map(|n| n.bounds)
    }

    /// Faces whose bounds contain `point` grown by `epsilon` on every side.
    pub fn touching(&self, point: &Point3<Real>, epsilon: Real) -> Vec<usize> {
        let e = Vector3::repeat(epsilon);
        self.query_aabb(&Aabb::new(point - e, point + e))
    }

    /// Faces whose bounds intersect `aabb`.
    pub fn query_aabb(&self, aabb: &Aabb) -> Vec<usize> {
        let mut result = Vec::new();
        self.visit(|bounds| bounds.intersects(aabb), &mut result);
        result
    }

    /// Faces whose bounds reach within `epsilon` of `plane`.
    pub fn query_plane(&self, plane: &Plane, epsilon: Real) -> Vec<usize> {
        let mut result = Vec::new();
        self.visit(
            |bounds| {
                let h = bounds.half_extents();
                let radius = plane.normal.x.abs() * h.x
                    + plane.normal.y.abs() * h.y
                    + plane.normal.z.abs() * h.z;
                plane.signed_distance(&bounds.center()).abs() <= radius + epsilon
            },
            &mut result,
        );
        result
    }

    /// Faces whose bounds are hit by `ray` before `max_toi`.
    pub fn cast_ray(&self, ray: &Ray, max_toi: Real) -> Vec<usize> {
        let mut result = Vec::new();
        self.visit(
            |bounds| bounds.cast_local_ray(ray, max_toi, true).is_some(),
            &mut result,
        );
        result
    }

    /// Depth-first walk collecting faces whose own bounds pass `accept`,
    /// pruning subtrees whose node bounds fail it.
    fn visit(&self, accept: impl Fn(&Aabb) -> bool, result: &mut Vec<usize>) {
        let Some(root) = &self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if !accept(&node.bounds) {
                continue;
            }
            result.extend(
                node.faces
                    .iter()
                    .filter(|(_, bounds)| accept(bounds))
                    .map(|(face, _)| *face),
            );
            if let Some(left) = &node.left {
                stack.push(left);
            }
            if let Some(right) = &node.right {
                stack.push(right);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_mesh(n: usize) -> Mesh {
        let mut mesh = Mesh::new();
        for i in 0..n {
            for j in 0..n {
                let (x, y) = (i as Real, j as Real);
                mesh.add_triangle([
                    Point3::new(x, y, 0.0),
                    Point3::new(x + 1.0, y, 0.0),
                    Point3::new(x, y + 1.0, 0.0),
                ]);
            }
        }
        mesh
    }

    #[test]
    fn touching_matches_brute_force() {
        let mesh = grid_mesh(12);
        let bvh = Bvh::build(&mesh);
        assert_eq!(bvh.len(), 144);
        let point = Point3::new(3.5, 7.25, 0.0);
        let mut found = bvh.touching(&point, 1e-3);
        found.sort_unstable();
        let expected: Vec<usize> = (0..mesh.faces.len())
            .filter(|&f| {
                let b = mesh.face_bounding_box(f).loosened(1e-3);
                (0..3).all(|i| b.mins[i] <= point[i] && point[i] <= b.maxs[i])
            })
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn round_robin_build_indexes_every_face() {
        let mesh = grid_mesh(10);
        let settings = BvhSettings {
            sah_face_limit: 8,
            ..Default::default()
        };
        let bvh = Bvh::build_with(&mesh, &settings);
        let mut all = bvh.query_aabb(&bvh.bounds().unwrap());
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
        assert!(bvh.depth() > 1);
    }

    #[test]
    fn plane_and_ray_queries() {
        let mesh = grid_mesh(4);
        let bvh = Bvh::build(&mesh);
        let plane = Plane::from_normal(Vector3::x(), 2.5);
        let hits = bvh.query_plane(&plane, 0.0);
        assert!(hits.iter().all(|&f| {
            let b = mesh.face_bounding_box(f);
            b.mins.x <= 2.5 && b.maxs.x >= 2.5
        }));
        assert!(!hits.is_empty());

        let ray = Ray::new(Point3::new(0.5, 0.25, 5.0), -Vector3::z());
        let hits = bvh.cast_ray(&ray, 10.0);
        assert!(hits.contains(&0));
        assert!(bvh.cast_ray(&ray, 1.0).is_empty());
    }

    #[test]
    fn empty_mesh() {
        let bvh = Bvh::build(&Mesh::new());
        assert!(bvh.is_empty());
        assert!(bvh.touching(&Point3::origin(), 1.0).is_empty());
    }
}
