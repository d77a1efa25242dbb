//! Per-run state of a slicing boolean: transformed meshes, their BVHs, the
//! canonical plane of every face and the cross-section caches.

use crate::csg::{
    CsgInput, CsgOperation,
    progress::{Cancelled, Progress},
    settings::SlicingSettings,
    similar_planes::{PlaneId, SimilarPlaneFinder},
};
use crate::float_types::{
    Real,
    parry3d::bounding_volume::{Aabb, BoundingVolume},
};
use crate::mesh::{
    Mesh,
    bvh::Bvh,
    plane::{Plane, PlaneFrame},
    slice::cross_section,
};
use crate::sketch::{
    Polygons,
    clip::{ClipMode, clip, union_all},
    triangulate::triangulate_into,
};
use crate::traits::CSGOps;
use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use std::ops::Range;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Immutable setup of one run.
pub(crate) struct Scene {
    pub operation: CsgOperation,
    pub settings: SlicingSettings,
    pub meshes: Vec<Mesh>,
    pub bvhs: Vec<Bvh>,
    pub finder: SimilarPlaneFinder,
    frames: HashMap<PlaneId, PlaneFrame>,
    /// Canonical plane of every face, `None` for degenerate faces.
    pub face_planes: Vec<Vec<Option<PlaneId>>>,
    /// Whether a face touches the region where the operation can change it.
    pub face_in_region: Vec<Vec<bool>>,
}

fn intersect_aabb(a: &Aabb, b: &Aabb) -> Option<Aabb> {
    let mins = a.mins.sup(&b.mins);
    let maxs = a.maxs.inf(&b.maxs);
    (0..3).all(|i| mins[i] <= maxs[i]).then(|| Aabb::new(mins, maxs))
}

impl Scene {
    pub fn build(
        operation: CsgOperation,
        settings: &SlicingSettings,
        inputs: &[CsgInput<'_>],
        progress: &mut Progress<'_>,
    ) -> Result<Scene, Cancelled> {
        let mut meshes = Vec::with_capacity(inputs.len());
        for input in inputs {
            progress.check()?;
            meshes.push(input.mesh.transformed(&input.transform));
        }

        #[cfg(feature = "parallel")]
        let bvhs: Vec<Bvh> = meshes
            .par_iter()
            .map(|m| Bvh::build_with(m, &settings.bvh))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let bvhs: Vec<Bvh> = meshes
            .iter()
            .map(|m| Bvh::build_with(m, &settings.bvh))
            .collect();
        progress.check()?;

        // union of all pairwise bounds intersections
        let bounds: Vec<Option<Aabb>> = meshes
            .iter()
            .map(|m| (!m.is_empty()).then(|| m.bounding_box()))
            .collect();
        let mut active_bounds: Option<Aabb> = None;
        for i in 0..bounds.len() {
            for j in i + 1..bounds.len() {
                let (Some(a), Some(b)) = (&bounds[i], &bounds[j]) else {
                    continue;
                };
                if let Some(overlap) = intersect_aabb(&a.loosened(settings.active_bounds_expansion), b) {
                    active_bounds = Some(match active_bounds {
                        Some(acc) => acc.merged(&overlap),
                        None => overlap,
                    });
                }
            }
        }
        let active_bounds = active_bounds.map(|b| b.loosened(settings.active_bounds_expansion));

        let face_in_region = meshes
            .iter()
            .map(|mesh| {
                (0..mesh.faces.len())
                    .map(|f| {
                        active_bounds
                            .as_ref()
                            .is_some_and(|region| mesh.face_bounding_box(f).intersects(region))
                    })
                    .collect()
            })
            .collect();

        // register every face plane, then resolve them all
        let mut raw_planes: Vec<Vec<Plane>> = Vec::with_capacity(meshes.len());
        for mesh in &meshes {
            progress.check()?;
            raw_planes.push((0..mesh.faces.len()).map(|f| mesh.face_plane(f)).collect());
        }
        let mut finder = SimilarPlaneFinder::new();
        finder.register_all(raw_planes.iter().flatten().filter(|p| p.is_finite()).copied());
        let mut face_planes = Vec::with_capacity(meshes.len());
        for planes in &raw_planes {
            progress.check()?;
            face_planes.push(
                planes
                    .iter()
                    .map(|p| finder.find(p, &settings.plane_tolerance))
                    .collect::<Vec<_>>(),
            );
        }

        let frames = finder
            .representatives()
            .into_iter()
            .map(|id| (id, finder.plane(id).frame()))
            .collect();

        log::debug!(
            "slicing {:?} of {} meshes: {} faces, {} canonical planes, active bounds {:?}",
            operation,
            meshes.len(),
            meshes.iter().map(|m| m.faces.len()).sum::<usize>(),
            finder.representatives().len(),
            active_bounds.map(|b| (b.mins, b.maxs)),
        );

        Ok(Scene {
            operation,
            settings: settings.clone(),
            meshes,
            bvhs,
            finder,
            frames,
            face_planes,
            face_in_region,
        })
    }

    pub fn plane(&self, id: PlaneId) -> &Plane {
        self.finder.plane(id)
    }

    pub fn frame(&self, id: PlaneId) -> PlaneFrame {
        self.frames
            .get(&id)
            .copied()
            .unwrap_or_else(|| self.finder.plane(id).frame())
    }

    /// Representative of the plane facing the other way at the same place.
    pub fn opposite(&self, id: PlaneId) -> Option<PlaneId> {
        let flipped = self.plane(id).flipped();
        self.finder
            .lookup(&flipped, &self.settings.plane_tolerance)
            .filter(|&other| other != id)
    }

    /// Move a newly created vertex onto a nearby input vertex, or else onto
    /// `plane`.
    pub fn snap_vertex(&self, point: &Point3<Real>, plane: &Plane) -> Point3<Real> {
        let mut best: Option<(Real, Point3<Real>)> = None;
        for (mesh, bvh) in self.meshes.iter().zip(&self.bvhs) {
            for face in bvh.touching(point, self.settings.vertex_touch_epsilon) {
                for corner in mesh.face_points(face) {
                    let d = (corner - point).norm_squared();
                    if best.is_none_or(|(b, _)| d < b) {
                        best = Some((d, corner));
                    }
                }
            }
        }
        match best {
            Some((d, _)) if d <= self.settings.vertex_exact_distance_sq => *point,
            Some((d, corner)) if d <= self.settings.vertex_snap_distance_sq => corner,
            _ if plane.is_finite() => plane.project_point(point),
            _ => *point,
        }
    }

    /// Triangulate `polygons`, drawn in the frame of canonical plane `plane`,
    /// into `result` facing along the plane normal, or against it when
    /// `reversed`.
    pub fn emit(&self, polygons: &Polygons, plane: PlaneId, reversed: bool, result: &mut Mesh) -> Range<usize> {
        let canonical = *self.plane(plane);
        let expected = if reversed {
            -canonical.normal
        } else {
            canonical.normal
        };
        self.emit_on(polygons, &self.frame(plane), &canonical, &expected, result)
    }

    /// Triangulate `polygons` drawn in `frame`, snap the new vertices (onto
    /// `snap_plane` when no input vertex is close) and orient the new faces
    /// along `expected`.
    pub fn emit_on(
        &self,
        polygons: &Polygons,
        frame: &PlaneFrame,
        snap_plane: &Plane,
        expected: &Vector3<Real>,
        result: &mut Mesh,
    ) -> Range<usize> {
        if polygons.is_empty() {
            return result.faces.len()..result.faces.len();
        }
        let first_vertex = result.vertices.len();
        let faces = triangulate_into(polygons, &frame.from_xy, result);
        for v in first_vertex..result.vertices.len() {
            let snapped = self.snap_vertex(&result.vertices[v], snap_plane);
            result.set_vertex(v, snapped);
        }
        for face in faces.clone() {
            result.refresh_normal(face);
            if result.faces[face].normal.dot(expected) < 0.0 {
                result.flip_face(face);
            }
        }
        faces
    }
}

/// Cross-sections computed during one run, keyed by mesh, canonical plane
/// and offset along the plane normal.
#[derive(Default)]
pub(crate) struct SectionCache {
    sections: HashMap<(usize, PlaneId, u64), Polygons>,
    totals: HashMap<(usize, PlaneId), Polygons>,
}

impl SectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Section of mesh `mesh` just behind the canonical plane `plane` moved by
    /// `offset` along its normal, in the frame of `plane`.
    pub fn section(&mut self, scene: &Scene, mesh: usize, plane: PlaneId, offset: Real) -> Polygons {
        self.sections
            .entry((mesh, plane, offset.to_bits()))
            .or_insert_with(|| {
                let cut = scene.plane(plane).offset_by(offset);
                cross_section(&scene.meshes[mesh], &scene.bvhs[mesh], &cut, &scene.frame(plane))
            })
            .clone()
    }

    /// The region of the other meshes a face of mesh `excluded` lying on
    /// `plane` is clipped against.
    ///
    /// - Union: union of the other sections.
    /// - Intersect: intersection of the other sections.
    /// - Subtract: for mesh 0 the union of the subtrahends; for a subtrahend,
    ///   mesh 0's section minus the other subtrahends.
    pub fn total_slice(&mut self, scene: &Scene, excluded: usize, plane: PlaneId) -> Polygons {
        if let Some(total) = self.totals.get(&(excluded, plane)) {
            return total.clone();
        }
        let others: Vec<usize> = (0..scene.meshes.len()).filter(|&m| m != excluded).collect();
        let total = match scene.operation {
            CsgOperation::Union => {
                let sections: Vec<Polygons> =
                    others.iter().map(|&m| self.section(scene, m, plane, 0.0)).collect();
                union_all(&sections)
            },
            CsgOperation::Intersect => {
                let mut acc: Option<Polygons> = None;
                for &m in &others {
                    let section = self.section(scene, m, plane, 0.0);
                    acc = Some(match acc {
                        None => section,
                        Some(acc) => clip(&acc, &section, ClipMode::Intersection),
                    });
                    if acc.as_ref().is_some_and(Polygons::is_empty) {
                        break;
                    }
                }
                acc.unwrap_or_default()
            },
            CsgOperation::Subtract if excluded == 0 => {
                let sections: Vec<Polygons> =
                    others.iter().map(|&m| self.section(scene, m, plane, 0.0)).collect();
                union_all(&sections)
            },
            CsgOperation::Subtract => {
                let base = self.section(scene, 0, plane, 0.0);
                let sections: Vec<Polygons> = others
                    .iter()
                    .filter(|&&m| m != 0)
                    .map(|&m| self.section(scene, m, plane, 0.0))
                    .collect();
                clip(&base, &union_all(&sections), ClipMode::Difference)
            },
        };
        self.totals.insert((excluded, plane), total.clone());
        total
    }
}
