//! Bookkeeping and reconciliation of faces that share a plane across meshes.
//!
//! The per-face pass clips every face against the other meshes' sections
//! taken just behind its plane. Where faces of several meshes lie on the same
//! plane (or on the same place facing the other way) that view is ambiguous,
//! so the faces recorded here are replaced afterwards by one combined,
//! non-overlapping region per plane.

use crate::csg::{
    scene::{Scene, SectionCache},
    similar_planes::PlaneId,
};
use crate::mesh::{Mesh, plane::PlaneFrame};
use crate::sketch::{
    Polygons,
    clip::{ClipMode, FillRule, clip, clip_with_fill_rule, union_all},
};
use hashbrown::HashSet;
use std::collections::{BTreeMap, BTreeSet};

/// Provenance of one evaluated face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRecord {
    pub mesh: usize,
    pub source_face: usize,
    /// Face of the result it produced; `None` when it was clipped away.
    pub dest_face: Option<usize>,
}

/// Face provenance grouped by canonical plane.
#[derive(Debug, Clone, Default)]
pub struct CoPlanarFaces {
    records: BTreeMap<PlaneId, Vec<FaceRecord>>,
}

impl CoPlanarFaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_face(
        &mut self,
        plane: PlaneId,
        mesh: usize,
        source_face: usize,
        dest_face: Option<usize>,
    ) {
        self.records.entry(plane).or_default().push(FaceRecord {
            mesh,
            source_face,
            dest_face,
        });
    }

    /// Planes with at least one record, in ascending order.
    pub fn planes(&self) -> impl Iterator<Item = PlaneId> + '_ {
        self.records.keys().copied()
    }

    pub fn contains_plane(&self, plane: PlaneId) -> bool {
        self.records.contains_key(&plane)
    }

    pub fn records(&self, plane: PlaneId) -> &[FaceRecord] {
        self.records.get(&plane).map_or(&[], Vec::as_slice)
    }

    /// Meshes with faces recorded on `plane`, ascending.
    pub fn faces_for_plane(&self, plane: PlaneId) -> Vec<usize> {
        let meshes: BTreeSet<usize> = self.records(plane).iter().map(|r| r.mesh).collect();
        meshes.into_iter().collect()
    }

    /// `(source_face, dest_face)` pairs recorded for one mesh on `plane`.
    pub fn faces_for_plane_and_mesh(&self, plane: PlaneId, mesh: usize) -> Vec<(usize, Option<usize>)> {
        self.records(plane)
            .iter()
            .filter(|r| r.mesh == mesh)
            .map(|r| (r.source_face, r.dest_face))
            .collect()
    }

    fn mark_deleted(&self, plane: PlaneId, deleted: &mut HashSet<usize>) {
        deleted.extend(self.records(plane).iter().filter_map(|r| r.dest_face));
    }

    /// Union of the source triangles of `mesh` recorded on `plane`, projected
    /// into `frame`. Each source face counts once; overlapping faces of the
    /// same mesh still cover their overlap.
    fn footprint(&self, scene: &Scene, plane: PlaneId, mesh: usize, frame: &PlaneFrame) -> Polygons {
        let sources: BTreeSet<usize> = self
            .faces_for_plane_and_mesh(plane, mesh)
            .into_iter()
            .map(|(source, _)| source)
            .collect();
        let mut triangles = Polygons::new();
        for source in sources {
            let points = scene.meshes[mesh].face_points(source).map(|p| frame.project(&p));
            triangles.extend(&Polygons::triangle(points));
        }
        // duplicated or overlapping faces must not cancel out
        clip_with_fill_rule(&triangles, &Polygons::new(), ClipMode::Union, FillRule::NonZero)
    }

    fn footprints(
        &self,
        scene: &Scene,
        plane: PlaneId,
        meshes: impl IntoIterator<Item = usize>,
        frame: &PlaneFrame,
    ) -> Polygons {
        let each: Vec<Polygons> = meshes
            .into_iter()
            .map(|m| self.footprint(scene, plane, m, frame))
            .collect();
        union_all(&each)
    }

    /// Merge all coplanar contributions on `plane` into one region, minus
    /// faces pressed against it from the other side and anything enclosed by
    /// a body.
    pub(crate) fn union_faces(
        &self,
        scene: &Scene,
        cache: &mut SectionCache,
        plane: PlaneId,
        opposite: Option<PlaneId>,
        result: &mut Mesh,
        deleted: &mut HashSet<usize>,
    ) {
        let frame = scene.frame(plane);
        let mut merged = self.footprints(scene, plane, self.faces_for_plane(plane), &frame);
        if let Some(opposite) = opposite {
            let facing = self.footprints(scene, opposite, self.faces_for_plane(opposite), &frame);
            merged = clip(&merged, &facing, ClipMode::Difference);
        }

        let bias = scene.settings.containment_bias;
        let covered: Vec<Polygons> = (0..scene.meshes.len())
            .map(|m| cache.section(scene, m, plane, bias))
            .collect();
        merged = clip(&merged, &union_all(&covered), ClipMode::Difference);

        self.mark_deleted(plane, deleted);
        scene.emit(&merged, plane, false, result);
    }

    /// Keep the part of each mesh's footprint that lies on the boundary of
    /// every other mesh.
    pub(crate) fn intersect_faces(
        &self,
        scene: &Scene,
        cache: &mut SectionCache,
        plane: PlaneId,
        result: &mut Mesh,
        deleted: &mut HashSet<usize>,
    ) {
        let frame = scene.frame(plane);
        let mut kept = Polygons::new();
        for mesh in self.faces_for_plane(plane) {
            let footprint = self.footprint(scene, plane, mesh, &frame);
            let total = cache.total_slice(scene, mesh, plane);
            let part = clip(&footprint, &total, ClipMode::Intersection);
            kept = clip(&kept, &part, ClipMode::Union);
        }

        self.mark_deleted(plane, deleted);
        scene.emit(&kept, plane, false, result);
    }

    /// Mesh 0's footprint minus the subtrahends, plus the walls the
    /// subtrahends cut into mesh 0 (facing against the plane).
    pub(crate) fn subtract_faces(
        &self,
        scene: &Scene,
        cache: &mut SectionCache,
        plane: PlaneId,
        opposite: Option<PlaneId>,
        result: &mut Mesh,
        deleted: &mut HashSet<usize>,
    ) {
        let frame = scene.frame(plane);
        let here = self.faces_for_plane(plane);
        let there = opposite.map(|o| self.faces_for_plane(o)).unwrap_or_default();
        let has_base = here.contains(&0);

        let base = if has_base {
            self.footprint(scene, plane, 0, &frame)
        } else {
            Polygons::new()
        };
        let kept = if has_base {
            clip(&base, &cache.total_slice(scene, 0, plane), ClipMode::Difference)
        } else {
            Polygons::new()
        };

        let cutters: Vec<usize> = here.iter().copied().filter(|&m| m != 0).collect();
        let mut walls = Polygons::new();
        if !cutters.is_empty() {
            walls = self.footprints(scene, plane, cutters, &frame);
            walls = clip(&walls, &cache.section(scene, 0, plane, 0.0), ClipMode::Intersection);
            if has_base {
                walls = clip(&walls, &base, ClipMode::Difference);
            }
            if let Some(opposite) = opposite {
                let facing = self.footprints(
                    scene,
                    opposite,
                    there.iter().copied().filter(|&m| m != 0),
                    &frame,
                );
                walls = clip(&walls, &facing, ClipMode::Difference);
            }
            for other in 1..scene.meshes.len() {
                if walls.is_empty() {
                    break;
                }
                if here.contains(&other) || there.contains(&other) {
                    continue;
                }
                walls = clip(&walls, &cache.section(scene, other, plane, 0.0), ClipMode::Difference);
            }
        }

        self.mark_deleted(plane, deleted);
        scene.emit(&kept, plane, false, result);
        scene.emit(&walls, plane, true, result);
    }
}
