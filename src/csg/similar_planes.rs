//! Canonicalization of planes under a tolerance.
//!
//! Plane equality within a tolerance is not transitive, so planes cannot be
//! hashed. Instead every plane is kept in three indexes sorted by one normal
//! component each, and a query walks outward from its binary-search position
//! on its dominant axis. Matches are resolved to a representative plane;
//! existing representatives always win over promoting a new one, so a plane
//! keeps resolving to the same representative for the lifetime of the finder.

use crate::csg::settings::PlaneTolerance;
use crate::float_types::{PLANE_AXIS_THRESHOLD, Real};
use crate::mesh::plane::Plane;
use hashbrown::HashMap;
use std::ops::Range;

/// Index of a plane registered with a [`SimilarPlaneFinder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaneId(usize);

impl PlaneId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Bit pattern of a plane, for memoizing repeated identical queries.
fn exact_key(plane: &Plane) -> [u64; 4] {
    [
        plane.normal.x.to_bits(),
        plane.normal.y.to_bits(),
        plane.normal.z.to_bits(),
        plane.w.to_bits(),
    ]
}

fn dominant_axis(plane: &Plane) -> usize {
    let n = plane.normal.map(Real::abs);
    if n.x >= n.y && n.x >= n.z {
        0
    } else if n.y >= n.z {
        1
    } else {
        2
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimilarPlaneFinder {
    planes: Vec<Plane>,
    /// Plane indices sorted by normal x, y and z.
    sorted: [Vec<usize>; 3],
    /// Representative each plane has been resolved to, if any.
    resolved_to: Vec<Option<PlaneId>>,
    /// Representative -> planes resolved to it.
    members: HashMap<PlaneId, Vec<PlaneId>>,
    /// Exact query -> representative.
    memo: HashMap<[u64; 4], PlaneId>,
}

impl SimilarPlaneFinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn plane(&self, id: PlaneId) -> &Plane {
        &self.planes[id.0]
    }

    /// Add a plane to the indexes without resolving it.
    pub fn register(&mut self, plane: Plane) -> PlaneId {
        let index = self.planes.len();
        self.planes.push(plane);
        self.resolved_to.push(None);
        for axis in 0..3 {
            let key = plane.normal[axis];
            let planes = &self.planes;
            let at = self.sorted[axis].partition_point(|&i| planes[i].normal[axis] < key);
            self.sorted[axis].insert(at, index);
        }
        PlaneId(index)
    }

    /// Add many planes at once, sorting the indexes a single time.
    pub fn register_all(&mut self, planes: impl IntoIterator<Item = Plane>) -> Range<usize> {
        let first = self.planes.len();
        for plane in planes {
            self.planes.push(plane);
            self.resolved_to.push(None);
        }
        let added = first..self.planes.len();
        if !added.is_empty() {
            for axis in 0..3 {
                let planes = &self.planes;
                let index = &mut self.sorted[axis];
                index.extend(added.clone());
                index.sort_by(|&a, &b| planes[a].normal[axis].total_cmp(&planes[b].normal[axis]));
            }
        }
        added
    }

    pub fn is_representative(&self, id: PlaneId) -> bool {
        self.members.contains_key(&id)
    }

    /// Planes resolved to the representative `id`.
    pub fn members(&self, id: PlaneId) -> &[PlaneId] {
        self.members.get(&id).map_or(&[], Vec::as_slice)
    }

    /// All representatives, in registration order.
    pub fn representatives(&self) -> Vec<PlaneId> {
        let mut ids: Vec<PlaneId> = self.members.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Registered planes within `tolerance` of `plane`, best match first.
    fn candidates(&self, plane: &Plane, tolerance: &PlaneTolerance) -> Vec<(Real, PlaneId)> {
        if !plane.is_finite() {
            return Vec::new();
        }
        let axis = dominant_axis(plane);
        let key = plane.normal[axis];
        if key.abs() <= PLANE_AXIS_THRESHOLD {
            return Vec::new();
        }

        let index = &self.sorted[axis];
        let start = index.partition_point(|&i| self.planes[i].normal[axis] < key);
        let mut found = Vec::new();
        let mut check = |i: usize| {
            let other = &self.planes[i];
            let normal_delta = (other.normal - plane.normal).norm();
            let distance_delta = (other.w - plane.w).abs();
            if normal_delta <= tolerance.normal && distance_delta <= tolerance.distance {
                found.push((normal_delta + distance_delta, PlaneId(i)));
            }
        };
        for &i in index[..start].iter().rev() {
            if key - self.planes[i].normal[axis] > tolerance.normal {
                break;
            }
            check(i);
        }
        for &i in &index[start..] {
            if self.planes[i].normal[axis] - key > tolerance.normal {
                break;
            }
            check(i);
        }
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found
    }

    /// Best existing representative for `plane`, without changing anything.
    pub fn lookup(&self, plane: &Plane, tolerance: &PlaneTolerance) -> Option<PlaneId> {
        if let Some(&id) = self.memo.get(&exact_key(plane)) {
            return Some(id);
        }
        self.candidates(plane, tolerance)
            .into_iter()
            .map(|(_, id)| id)
            .find(|id| self.is_representative(*id))
    }

    /// Resolve `plane` to its representative.
    ///
    /// Prefers an existing representative within tolerance; otherwise the
    /// closest registered plane becomes a new representative. `None` when no
    /// registered plane matches.
    pub fn find(&mut self, plane: &Plane, tolerance: &PlaneTolerance) -> Option<PlaneId> {
        let key = exact_key(plane);
        if let Some(&id) = self.memo.get(&key) {
            return Some(id);
        }
        let candidates = self.candidates(plane, tolerance);
        let representative = candidates
            .iter()
            .map(|&(_, id)| id)
            .find(|id| self.is_representative(*id))
            .or_else(|| candidates.first().map(|&(_, id)| id))?;

        if !self.is_representative(representative) {
            self.members.insert(representative, vec![representative]);
            self.resolved_to[representative.0].get_or_insert(representative);
        }
        // exact duplicates of the query share its resolution
        for &(score, id) in &candidates {
            if score == 0.0 && self.resolved_to[id.0].is_none() {
                self.resolved_to[id.0] = Some(representative);
                if id != representative {
                    self.members.entry(representative).or_default().push(id);
                }
            }
        }
        self.memo.insert(key, representative);
        Some(representative)
    }

    /// Register `plane` if needed and resolve it. `None` only for NaN planes.
    pub fn find_or_register(&mut self, plane: &Plane, tolerance: &PlaneTolerance) -> Option<PlaneId> {
        if !plane.is_finite() {
            return None;
        }
        if let Some(id) = self.find(plane, tolerance) {
            return Some(id);
        }
        self.register(*plane);
        self.find(plane, tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[test]
    fn nearby_planes_share_a_representative() {
        let tol = PlaneTolerance::default();
        let mut finder = SimilarPlaneFinder::new();
        let a = Plane::from_normal(Vector3::x(), 1.0);
        let b = Plane::from_normal(Vector3::new(1.0, 1e-6, 0.0), 1.00001);
        let c = Plane::from_normal(Vector3::x(), 1.5);
        for p in [a, b, c] {
            finder.register(p);
        }
        let ra = finder.find(&a, &tol).unwrap();
        let rb = finder.find(&b, &tol).unwrap();
        let rc = finder.find(&c, &tol).unwrap();
        assert_eq!(ra, rb);
        assert_ne!(ra, rc);
        assert_eq!(finder.representatives().len(), 2);
    }

    #[test]
    fn opposite_planes_do_not_match() {
        let tol = PlaneTolerance::default();
        let mut finder = SimilarPlaneFinder::new();
        let a = Plane::from_normal(Vector3::z(), 0.5);
        finder.register(a);
        assert!(finder.find(&a.flipped(), &tol).is_none());
        assert!(finder.lookup(&a, &tol).is_none());
        let id = finder.find(&a, &tol).unwrap();
        assert_eq!(finder.lookup(&a, &tol), Some(id));
    }

    #[test]
    fn bulk_registration_matches_one_by_one() {
        let tol = PlaneTolerance::default();
        let planes: Vec<Plane> = (0..40)
            .map(|i| {
                let t = i as Real * 0.37;
                Plane::from_normal(Vector3::new(t.cos(), t.sin(), 0.5), (i % 5) as Real)
            })
            .collect();

        let mut single = SimilarPlaneFinder::new();
        for plane in &planes {
            single.register(*plane);
        }
        let mut bulk = SimilarPlaneFinder::new();
        assert_eq!(bulk.register_all(planes.iter().copied()), 0..planes.len());

        for axis in 0..3 {
            let keys = |f: &SimilarPlaneFinder| -> Vec<Real> {
                f.sorted[axis].iter().map(|&i| f.planes[i].normal[axis]).collect()
            };
            assert_eq!(keys(&single), keys(&bulk));
        }
        for plane in &planes {
            assert_eq!(single.find(plane, &tol), bulk.find(plane, &tol));
        }
    }

    #[test]
    fn nan_planes_are_rejected() {
        let mut finder = SimilarPlaneFinder::new();
        let nan = Plane::from_normal(Vector3::zeros(), 1.0);
        assert!(finder.find_or_register(&nan, &PlaneTolerance::default()).is_none());
        assert!(finder.is_empty());
    }
}
