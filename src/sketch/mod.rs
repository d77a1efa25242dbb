//! Planar polygon sets in fixed-point coordinates.
//!
//! Cross-sections and face footprints live in the XY frame of their plane and
//! are stored as closed integer loops at [`clip_scale`] units per model unit,
//! the representation consumed by the polygon clipper in [`clip`].

use crate::float_types::{Real, clip_scale};
use nalgebra::Point2;

pub mod clip;
pub mod loops;
pub mod triangulate;

/// Integer coordinate of the polygon clipper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntPoint {
    pub x: i64,
    pub y: i64,
}

impl IntPoint {
    pub const fn new(x: i64, y: i64) -> Self {
        IntPoint { x, y }
    }

    /// Quantize a model-space point.
    pub fn from_point(p: &Point2<Real>) -> Self {
        let scale = clip_scale();
        IntPoint {
            x: (p.x * scale).round() as i64,
            y: (p.y * scale).round() as i64,
        }
    }

    /// Back to model units.
    pub fn to_point(self) -> Point2<Real> {
        let scale = clip_scale();
        Point2::new(self.x as Real / scale, self.y as Real / scale)
    }
}

/// A closed loop; the first point is not repeated at the end.
pub type Path = Vec<IntPoint>;

/// Twice the signed area of a loop, positive for counter-clockwise loops.
pub fn path_area2(path: &[IntPoint]) -> i128 {
    let n = path.len();
    (0..n)
        .map(|i| {
            let (a, b) = (path[i], path[(i + 1) % n]);
            a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128
        })
        .sum()
}

/// Non-zero winding number of `point` with respect to `path`.
pub fn winding_number(point: IntPoint, path: &[IntPoint]) -> i32 {
    let n = path.len();
    let mut winding = 0;
    for i in 0..n {
        let (a, b) = (path[i], path[(i + 1) % n]);
        let side = (b.x - a.x) as i128 * (point.y - a.y) as i128
            - (point.x - a.x) as i128 * (b.y - a.y) as i128;
        if a.y <= point.y {
            if b.y > point.y && side > 0 {
                winding += 1;
            }
        } else if b.y <= point.y && side < 0 {
            winding -= 1;
        }
    }
    winding
}

/// A set of closed loops. Outer boundaries run counter-clockwise and holes
/// clockwise once the set has been through the clipper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Polygons {
    pub paths: Vec<Path>,
}

impl Polygons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paths(paths: Vec<Path>) -> Self {
        Polygons { paths }
    }

    /// Quantize model-space loops, dropping loops with fewer than three
    /// distinct points.
    pub fn from_loops<'a>(loops: impl IntoIterator<Item = &'a [Point2<Real>]>) -> Self {
        let mut polygons = Polygons::new();
        for points in loops {
            let mut path: Path = points.iter().map(IntPoint::from_point).collect();
            path.dedup();
            while path.len() > 1 && path.first() == path.last() {
                path.pop();
            }
            if path.len() >= 3 {
                polygons.paths.push(path);
            }
        }
        polygons
    }

    /// A single counter-clockwise triangle.
    pub fn triangle(points: [Point2<Real>; 3]) -> Self {
        let mut path: Path = points.iter().map(IntPoint::from_point).collect();
        if path_area2(&path) < 0 {
            path.reverse();
        }
        Polygons { paths: vec![path] }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn push(&mut self, path: Path) {
        self.paths.push(path);
    }

    /// Add every loop of `other` without resolving overlaps.
    pub fn extend(&mut self, other: &Polygons) {
        self.paths.extend(other.paths.iter().cloned());
    }

    /// Model-space loops.
    pub fn to_loops(&self) -> Vec<Vec<Point2<Real>>> {
        self.paths
            .iter()
            .map(|p| p.iter().map(|q| q.to_point()).collect())
            .collect()
    }

    /// Net signed area in model units, holes subtracted.
    pub fn signed_area(&self) -> Real {
        let scale = clip_scale();
        let twice: i128 = self.paths.iter().map(|p| path_area2(p)).sum();
        twice as Real / (2.0 * scale * scale)
    }

    pub fn area(&self) -> Real {
        self.signed_area().abs()
    }

    /// Non-zero fill test of a point against all loops.
    pub fn contains_point(&self, point: IntPoint) -> bool {
        self.paths.iter().map(|p| winding_number(point, p)).sum::<i32>() != 0
    }

    /// `true` when this set is exactly the single loop `path`, up to the
    /// starting point.
    pub fn is_same_loop(&self, path: &[IntPoint]) -> bool {
        let [only] = self.paths.as_slice() else {
            return false;
        };
        if only.len() != path.len() {
            return false;
        }
        let Some(start) = only.iter().position(|p| *p == path[0]) else {
            return false;
        };
        (0..path.len()).all(|i| only[(start + i) % only.len()] == path[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: i64, y0: i64, size: i64) -> Path {
        vec![
            IntPoint::new(x0, y0),
            IntPoint::new(x0 + size, y0),
            IntPoint::new(x0 + size, y0 + size),
            IntPoint::new(x0, y0 + size),
        ]
    }

    #[test]
    fn winding_and_area() {
        let outer = square(0, 0, 10);
        let mut hole = square(2, 2, 4);
        hole.reverse();
        let set = Polygons::from_paths(vec![outer.clone(), hole]);
        assert!(set.contains_point(IntPoint::new(1, 1)));
        assert!(!set.contains_point(IntPoint::new(3, 3)));
        assert!(!set.contains_point(IntPoint::new(11, 3)));
        assert_eq!(path_area2(&outer), 200);
    }

    #[test]
    fn same_loop_ignores_start() {
        let path = square(0, 0, 5);
        let mut rotated = path.clone();
        rotated.rotate_left(2);
        assert!(Polygons::from_paths(vec![rotated]).is_same_loop(&path));
        let mut reversed = path.clone();
        reversed.reverse();
        assert!(!Polygons::from_paths(vec![reversed]).is_same_loop(&path));
    }
}
