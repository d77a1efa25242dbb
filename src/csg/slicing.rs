//! The slicing boolean driver.

use crate::csg::{
    CsgInput, CsgOperation, CsgOutcome,
    coplanar::CoPlanarFaces,
    progress::{CancellationToken, Cancelled, Progress, ProgressCallback},
    scene::{Scene, SectionCache},
    settings::SlicingSettings,
    similar_planes::PlaneId,
};
use crate::errors::CsgError;
use crate::float_types::Real;
use crate::mesh::Mesh;
use crate::sketch::{
    IntPoint, Polygons,
    clip::{ClipMode, clip},
    path_area2,
};
use hashbrown::HashSet;
use nalgebra::Point2;
use std::collections::BTreeSet;

/// Share of the progress range spent on the per-face pass.
const SLICING_SHARE: Real = 0.8;

/// Boolean operation over any number of meshes, evaluated by slicing.
///
/// Faces of each mesh are clipped against the cross-sections of the other
/// meshes taken just behind their plane; faces that lie on a shared plane are
/// rebuilt afterwards from the combined footprints.
pub struct CsgBySlicing<'a> {
    operation: CsgOperation,
    settings: SlicingSettings,
    progress: Option<ProgressCallback<'a>>,
    token: Option<CancellationToken>,
}

impl<'a> CsgBySlicing<'a> {
    pub fn new(operation: CsgOperation) -> Self {
        CsgBySlicing {
            operation,
            settings: SlicingSettings::default(),
            progress: None,
            token: None,
        }
    }

    pub fn with_settings(mut self, settings: SlicingSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Receive `(ratio, stage)` updates while running. Purely advisory.
    pub fn with_progress(mut self, callback: impl FnMut(Real, &str) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    pub const fn operation(&self) -> CsgOperation {
        self.operation
    }

    pub const fn settings(&self) -> &SlicingSettings {
        &self.settings
    }

    /// Evaluate the operation over `inputs`, mesh 0 first.
    ///
    /// Inputs are not modified. A triggered cancellation token yields
    /// [`CsgOutcome::Cancelled`] rather than an error.
    pub fn run(&mut self, inputs: &[CsgInput<'_>]) -> Result<CsgOutcome, CsgError> {
        if inputs.is_empty() {
            return Err(CsgError::NoInputMeshes);
        }
        for (mesh, input) in inputs.iter().enumerate() {
            if !input.transform.iter().all(|c| c.is_finite()) {
                return Err(CsgError::NonFiniteTransform { mesh });
            }
            input
                .mesh
                .validate()
                .map_err(|source| CsgError::InvalidInput { mesh, source })?;
        }

        let mut progress = Progress::new(self.progress.take(), self.token.clone());
        let outcome = match self.evaluate(inputs, &mut progress) {
            Ok(mesh) => CsgOutcome::Complete(mesh),
            Err(Cancelled) => {
                log::info!("{:?} of {} meshes cancelled", self.operation, inputs.len());
                CsgOutcome::Cancelled
            },
        };
        self.progress = progress.into_callback();
        Ok(outcome)
    }

    fn evaluate(&self, inputs: &[CsgInput<'_>], progress: &mut Progress<'_>) -> Result<Mesh, Cancelled> {
        progress.report(0.0, "Preparing meshes");
        let scene = Scene::build(self.operation, &self.settings, inputs, progress)?;

        if let [only] = scene.meshes.as_slice() {
            let mut mesh = only.clone();
            self.compact(&mut mesh, &HashSet::new());
            progress.report(1.0, "Finished");
            return Ok(mesh);
        }

        let mut result = Mesh::new();
        let mut cache = SectionCache::new();
        let mut coplanar = CoPlanarFaces::new();

        let total_faces: usize = scene.meshes.iter().map(|m| m.faces.len()).sum::<usize>().max(1);
        let mut done = 0;
        progress.report(0.0, "Slicing faces");
        for mesh in 0..scene.meshes.len() {
            progress.check()?;
            for face in 0..scene.meshes[mesh].faces.len() {
                progress.check()?;
                self.slice_face(&scene, &mut cache, &mut coplanar, mesh, face, &mut result);
                done += 1;
                progress.report(SLICING_SHARE * done as Real / total_faces as Real, "Slicing faces");
            }
        }

        progress.report(SLICING_SHARE, "Reconciling coplanar faces");
        let deleted = self.reconcile(&scene, &mut cache, &coplanar, &mut result, progress)?;
        self.compact(&mut result, &deleted);

        log::debug!(
            "{:?} result: {} vertices, {} faces ({} replaced by coplanar repair), {} open edges",
            self.operation,
            result.vertices.len(),
            result.faces.len(),
            deleted.len(),
            result.open_edge_count(),
        );
        progress.report(1.0, "Finished");
        Ok(result)
    }

    fn compact(&self, mesh: &mut Mesh, deleted: &HashSet<usize>) {
        mesh.remove_faces(deleted);
        mesh.weld_vertices(self.settings.weld_tolerance);
        mesh.remove_unused_vertices();
        // faces split next to an unsplit neighbour leave T-junctions
        mesh.split_edges_at_vertices(self.settings.weld_tolerance);
    }

    /// Clip one face of mesh `mesh` against the rest of the scene and append
    /// what survives to `result`.
    fn slice_face(
        &self,
        scene: &Scene,
        cache: &mut SectionCache,
        coplanar: &mut CoPlanarFaces,
        mesh: usize,
        face: usize,
        result: &mut Mesh,
    ) {
        let source = &scene.meshes[mesh];
        let keeps_outside = match self.operation {
            CsgOperation::Union => true,
            CsgOperation::Subtract => mesh == 0,
            CsgOperation::Intersect => false,
        };
        let Some(plane) = scene.face_planes[mesh][face] else {
            log::trace!("mesh {mesh} face {face}: degenerate, skipped");
            return;
        };
        if !scene.face_in_region[mesh][face] {
            if keeps_outside {
                copy_face(source, face, false, result);
            }
            return;
        }

        // subtrahend faces inside mesh 0 become walls facing into the cut
        let (mode, flip) = match self.operation {
            CsgOperation::Union => (ClipMode::Difference, false),
            CsgOperation::Intersect => (ClipMode::Intersection, false),
            CsgOperation::Subtract if mesh == 0 => (ClipMode::Difference, false),
            CsgOperation::Subtract => (ClipMode::Intersection, true),
        };

        let frame = scene.frame(plane);
        let total = cache.total_slice(scene, mesh, plane);
        let corners = source.face_points(face).map(|p| frame.project(&p));
        let triangle = Polygons::triangle(corners);
        let path = &triangle.paths[0];

        if path_area2(path) == 0 {
            let centroid = Point2::from((corners[0].coords + corners[1].coords + corners[2].coords) / 3.0);
            let inside = total.contains_point(IntPoint::from_point(&centroid));
            let keep = match mode {
                ClipMode::Intersection => inside,
                _ => !inside,
            };
            let dest = keep.then(|| copy_face(source, face, flip, result));
            coplanar.record_face(plane, mesh, face, dest);
            return;
        }

        let clipped = clip(&triangle, &total, mode);
        if clipped.is_empty() {
            log::trace!("mesh {mesh} face {face}: clipped away");
            coplanar.record_face(plane, mesh, face, None);
            return;
        }
        if clipped.is_same_loop(path) {
            let dest = copy_face(source, face, flip, result);
            coplanar.record_face(plane, mesh, face, Some(dest));
            return;
        }

        let normal = source.faces[face].normal;
        let expected = if flip { -normal } else { normal };
        let faces = scene.emit_on(&clipped, &frame, &source.face_plane(face), &expected, result);
        log::trace!("mesh {mesh} face {face}: split into {} faces", faces.len());
        if faces.is_empty() {
            coplanar.record_face(plane, mesh, face, None);
        }
        for dest in faces {
            coplanar.record_face(plane, mesh, face, Some(dest));
        }
    }

    /// Rebuild the faces of every plane shared by two or more meshes, either
    /// facing the same way or pressed against each other. Returns the result
    /// faces they replace.
    fn reconcile(
        &self,
        scene: &Scene,
        cache: &mut SectionCache,
        coplanar: &CoPlanarFaces,
        result: &mut Mesh,
        progress: &mut Progress<'_>,
    ) -> Result<HashSet<usize>, Cancelled> {
        let mut deleted = HashSet::new();
        let mut handled: HashSet<PlaneId> = HashSet::new();
        let planes: Vec<PlaneId> = coplanar.planes().collect();
        let mut groups = 0;

        for (i, &plane) in planes.iter().enumerate() {
            progress.check()?;
            let ratio = SLICING_SHARE + (1.0 - SLICING_SHARE) * i as Real / planes.len() as Real;
            progress.report(ratio, "Reconciling coplanar faces");
            if !handled.insert(plane) {
                continue;
            }
            let opposite = scene.opposite(plane);
            if let Some(opposite) = opposite {
                handled.insert(opposite);
            }

            let mut meshes: BTreeSet<usize> = coplanar.faces_for_plane(plane).into_iter().collect();
            if let Some(opposite) = opposite {
                meshes.extend(coplanar.faces_for_plane(opposite));
            }
            if meshes.len() < 2 {
                continue;
            }
            groups += 1;
            log::trace!("reconciling plane {:?} (opposite {:?}) across meshes {:?}", plane, opposite, meshes);

            let sides = std::iter::once((plane, opposite)).chain(
                opposite
                    .filter(|&o| coplanar.contains_plane(o))
                    .map(|o| (o, Some(plane))),
            );
            for (side, facing) in sides {
                match self.operation {
                    CsgOperation::Union => {
                        coplanar.union_faces(scene, cache, side, facing, result, &mut deleted)
                    },
                    CsgOperation::Intersect => {
                        coplanar.intersect_faces(scene, cache, side, result, &mut deleted)
                    },
                    CsgOperation::Subtract => {
                        coplanar.subtract_faces(scene, cache, side, facing, result, &mut deleted)
                    },
                }
            }
        }

        log::debug!("reconciled {groups} coplanar plane groups out of {} planes", planes.len());
        Ok(deleted)
    }
}

/// Append face `face` of `source` unchanged, or reversed when `flip`.
fn copy_face(source: &Mesh, face: usize, flip: bool, result: &mut Mesh) -> usize {
    let [a, b, c] = source.face_points(face);
    if flip {
        result.add_triangle([a, c, b])
    } else {
        result.add_triangle([a, b, c])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix4, Vector3};

    fn shifted(x: Real, y: Real, z: Real) -> Matrix4<Real> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = CsgBySlicing::new(CsgOperation::Union).run(&[]).unwrap_err();
        assert!(matches!(err, CsgError::NoInputMeshes));
    }

    #[test]
    fn non_finite_transform_is_rejected() {
        let cube = Mesh::cube(1.0);
        let inputs = [
            CsgInput::new(&cube),
            CsgInput::new(&cube).with_transform(shifted(Real::NAN, 0.0, 0.0)),
        ];
        let err = CsgBySlicing::new(CsgOperation::Union).run(&inputs).unwrap_err();
        assert!(matches!(err, CsgError::NonFiniteTransform { mesh: 1 }));
    }

    #[test]
    fn single_input_is_transformed_copy() {
        let cube = Mesh::cube(1.0);
        let outcome = CsgBySlicing::new(CsgOperation::Subtract)
            .run(&[CsgInput::new(&cube).with_transform(shifted(2.0, 0.0, 0.0))])
            .unwrap();
        let mesh = outcome.into_mesh().unwrap();
        assert_eq!(mesh.faces.len(), 12);
        assert_eq!(mesh.vertices.len(), 8);
        assert!(mesh.vertices.iter().all(|p| p.x >= 2.0 - 1e-12));
    }

    #[test]
    fn far_apart_intersection_is_empty() {
        let cube = Mesh::cube(1.0);
        let outcome = CsgBySlicing::new(CsgOperation::Intersect)
            .run(&[
                CsgInput::new(&cube),
                CsgInput::new(&cube).with_transform(shifted(5.0, 0.0, 0.0)),
            ])
            .unwrap();
        assert!(outcome.into_mesh().unwrap().is_empty());
    }

    #[test]
    fn progress_ends_finished() {
        let cube = Mesh::cube(1.0);
        let mut labels: Vec<(Real, String)> = Vec::new();
        let outcome = CsgBySlicing::new(CsgOperation::Union)
            .with_progress(|ratio, label| labels.push((ratio, label.to_string())))
            .run(&[
                CsgInput::new(&cube),
                CsgInput::new(&cube).with_transform(shifted(0.5, 0.0, 0.0)),
            ])
            .unwrap();
        assert!(!outcome.is_cancelled());
        assert_eq!(labels.first().map(|l| l.1.as_str()), Some("Preparing meshes"));
        assert_eq!(labels.last().map(|l| l.1.as_str()), Some("Finished"));
        assert!(labels.iter().all(|(ratio, _)| (0.0..=1.0).contains(ratio)));
        assert!(labels.iter().any(|(_, label)| label == "Slicing faces"));
    }
}
