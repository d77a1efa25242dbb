//! Ear-cut triangulation of planar polygon sets back into 3D faces.

use crate::float_types::Real;
use crate::mesh::Mesh;
use crate::sketch::{IntPoint, Path, Polygons, path_area2, winding_number};
use geo::{Coord, LineString, Polygon as GeoPolygon, TriangulateEarcut};
use nalgebra::{Matrix4, Point3};
use std::ops::Range;

/// Group a normalized set into outer loops with their holes. Each hole goes
/// to the smallest outer loop that contains it.
fn nest(polygons: &Polygons) -> Vec<(&Path, Vec<&Path>)> {
    let mut outers: Vec<(&Path, i128, Vec<&Path>)> = polygons
        .paths
        .iter()
        .map(|p| (p, path_area2(p)))
        .filter(|(_, area)| *area > 0)
        .map(|(p, area)| (p, area, Vec::new()))
        .collect();
    outers.sort_by_key(|(_, area, _)| *area);

    for hole in polygons.paths.iter().filter(|p| path_area2(p) < 0) {
        let owner = outers.iter().position(|(outer, _, _)| {
            hole.iter()
                .any(|&point| winding_number(point, outer) != 0 && !on_boundary(point, outer))
        });
        if let Some(owner) = owner {
            outers[owner].2.push(hole);
        }
    }

    outers.into_iter().map(|(outer, _, holes)| (outer, holes)).collect()
}

fn on_boundary(point: IntPoint, path: &[IntPoint]) -> bool {
    let n = path.len();
    (0..n).any(|i| {
        let (a, b) = (path[i], path[(i + 1) % n]);
        let cross = (b.x - a.x) as i128 * (point.y - a.y) as i128
            - (point.x - a.x) as i128 * (b.y - a.y) as i128;
        cross == 0
            && point.x >= a.x.min(b.x)
            && point.x <= a.x.max(b.x)
            && point.y >= a.y.min(b.y)
            && point.y <= a.y.max(b.y)
    })
}

fn ring(path: &[IntPoint]) -> LineString<Real> {
    let mut coords: Vec<Coord<Real>> = path
        .iter()
        .map(|p| {
            let q = p.to_point();
            Coord { x: q.x, y: q.y }
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

/// Triangulate `polygons` (in the XY frame) and append the triangles to
/// `target`, mapped back to 3D with `from_xy`.
///
/// Faces wind counter-clockwise in XY, which is the +Z side of the frame.
/// Returns the indices of the new faces.
pub fn triangulate_into(
    polygons: &Polygons,
    from_xy: &Matrix4<Real>,
    target: &mut Mesh,
) -> Range<usize> {
    let first_face = target.faces.len();
    for (outer, holes) in nest(polygons) {
        let polygon = GeoPolygon::new(ring(outer), holes.iter().map(|h| ring(h)).collect());
        let triangulation = polygon.earcut_triangles_raw();
        let vertices = triangulation.vertices;
        if triangulation.triangle_indices.is_empty() {
            log::warn!("earcut produced no triangles for a loop of {} points", outer.len());
            continue;
        }

        let base = target.vertices.len();
        for xy in vertices.chunks_exact(2) {
            target.add_vertex(from_xy.transform_point(&Point3::new(xy[0], xy[1], 0.0)));
        }
        for tri in triangulation.triangle_indices.chunks_exact(3) {
            let (a, b, c) = (
                Point3::new(vertices[2 * tri[0]], vertices[2 * tri[0] + 1], 0.0),
                Point3::new(vertices[2 * tri[1]], vertices[2 * tri[1] + 1], 0.0),
                Point3::new(vertices[2 * tri[2]], vertices[2 * tri[2] + 1], 0.0),
            );
            let ccw = (b - a).cross(&(c - a)).z;
            if ccw == 0.0 {
                continue;
            }
            let indices = if ccw > 0.0 {
                [base + tri[0], base + tri[1], base + tri[2]]
            } else {
                [base + tri[0], base + tri[2], base + tri[1]]
            };
            target.add_face(indices);
        }
    }
    first_face..target.faces.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::clip::{ClipMode, clip};
    use approx::assert_relative_eq;
    use nalgebra::Point2;

    fn square(x0: Real, y0: Real, size: Real) -> Polygons {
        let pts = [
            Point2::new(x0, y0),
            Point2::new(x0 + size, y0),
            Point2::new(x0 + size, y0 + size),
            Point2::new(x0, y0 + size),
        ];
        Polygons::from_loops([pts.as_slice()])
    }

    #[test]
    fn square_with_hole_keeps_its_area() {
        let holed = clip(&square(0.0, 0.0, 4.0), &square(1.0, 1.0, 1.0), ClipMode::Difference);
        let mut mesh = Mesh::new();
        let faces = triangulate_into(&holed, &Matrix4::identity(), &mut mesh);
        assert!(!faces.is_empty());
        assert_relative_eq!(mesh.surface_area(), 15.0, epsilon = 1e-9);
        for f in faces {
            assert!(mesh.faces[f].normal.z > 0.0);
        }
    }

    #[test]
    fn separate_islands_are_triangulated_independently() {
        let mut two = square(0.0, 0.0, 1.0);
        two.extend(&square(3.0, 0.0, 2.0));
        let mut mesh = Mesh::new();
        let faces = triangulate_into(&two, &Matrix4::new_translation(&nalgebra::Vector3::new(0.0, 0.0, 2.0)), &mut mesh);
        assert_eq!(faces.len(), 4);
        assert_relative_eq!(mesh.surface_area(), 5.0, epsilon = 1e-9);
        assert!(mesh.vertices.iter().all(|v| (v.z - 2.0).abs() < 1e-12));
    }
}
