//! Boolean operations on fixed-point polygon sets.
//!
//! Loops are resolved into regions according to a [`FillRule`], combined with
//! `geo`'s [`BooleanOps`], and converted back to integer loops. Results are
//! normalized: outer boundaries counter-clockwise, holes clockwise, duplicate
//! and exactly collinear points removed.

use crate::float_types::Real;
use crate::sketch::{IntPoint, Path, Polygons, path_area2};
use geo::{BooleanOps, Coord, LineString, MultiPolygon, Orient, Polygon as GeoPolygon, orient::Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipMode {
    Union,
    Difference,
    Intersection,
}

/// How a set of possibly overlapping loops is turned into a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    /// Counter-clockwise loops add area and clockwise loops remove it, larger
    /// loops first. Overlapping loops of the same orientation stay filled.
    #[default]
    NonZero,
    /// Every overlap toggles between filled and empty.
    EvenOdd,
}

fn to_line_string(path: &[IntPoint]) -> LineString<Real> {
    let mut coords: Vec<Coord<Real>> = path
        .iter()
        .map(|p| Coord {
            x: p.x as Real,
            y: p.y as Real,
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

/// Resolve loops into a region.
fn to_region(polygons: &Polygons, fill_rule: FillRule) -> MultiPolygon<Real> {
    let mut loops: Vec<(&Path, i128)> = polygons
        .paths
        .iter()
        .map(|p| (p, path_area2(p)))
        .filter(|(_, area)| *area != 0)
        .collect();
    loops.sort_by_key(|(_, area)| std::cmp::Reverse(area.abs()));

    let mut region = MultiPolygon::new(Vec::new());
    for (path, area) in loops {
        let mut ring = to_line_string(path);
        if area < 0 {
            ring.0.reverse();
        }
        let single = MultiPolygon::new(vec![GeoPolygon::new(ring, Vec::new())]);
        region = if region.0.is_empty() {
            match (fill_rule, area > 0) {
                (FillRule::NonZero, false) => region,
                _ => single,
            }
        } else {
            match fill_rule {
                FillRule::NonZero if area > 0 => region.union(&single),
                FillRule::NonZero => region.difference(&single),
                FillRule::EvenOdd => region.xor(&single),
            }
        };
    }
    region
}

/// Drop repeated and exactly collinear points until the loop is stable.
fn clean_path(mut path: Path) -> Option<Path> {
    loop {
        path.dedup();
        while path.len() > 1 && path.first() == path.last() {
            path.pop();
        }
        let n = path.len();
        if n < 3 {
            return None;
        }
        let keep: Vec<bool> = (0..n)
            .map(|i| {
                let (a, b, c) = (path[(i + n - 1) % n], path[i], path[(i + 1) % n]);
                let cross = (b.x - a.x) as i128 * (c.y - b.y) as i128
                    - (b.y - a.y) as i128 * (c.x - b.x) as i128;
                cross != 0
            })
            .collect();
        if keep.iter().all(|&k| k) {
            return Some(path);
        }
        let mut i = 0;
        path.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
    }
}

fn ring_to_path(ring: &LineString<Real>) -> Option<Path> {
    let path = ring
        .0
        .iter()
        .map(|c| IntPoint::new(c.x.round() as i64, c.y.round() as i64))
        .collect();
    clean_path(path)
}

fn from_region(region: &MultiPolygon<Real>) -> Polygons {
    let oriented = region.orient(Direction::Default);
    let mut result = Polygons::new();
    for polygon in &oriented.0 {
        let Some(exterior) = ring_to_path(polygon.exterior()) else {
            continue;
        };
        if path_area2(&exterior) <= 0 {
            continue;
        }
        result.push(exterior);
        for interior in polygon.interiors() {
            if let Some(hole) = ring_to_path(interior) {
                if path_area2(&hole) < 0 {
                    result.push(hole);
                }
            }
        }
    }
    result
}

/// Combine two polygon sets under the default [`FillRule::NonZero`].
pub fn clip(subject: &Polygons, clip: &Polygons, mode: ClipMode) -> Polygons {
    clip_with_fill_rule(subject, clip, mode, FillRule::NonZero)
}

/// Combine two polygon sets, resolving each operand's loops with `fill_rule`.
pub fn clip_with_fill_rule(
    subject: &Polygons,
    clip: &Polygons,
    mode: ClipMode,
    fill_rule: FillRule,
) -> Polygons {
    let a = to_region(subject, fill_rule);
    let b = to_region(clip, fill_rule);
    let combined = match mode {
        ClipMode::Union if b.0.is_empty() => a,
        ClipMode::Union if a.0.is_empty() => b,
        ClipMode::Union => a.union(&b),
        ClipMode::Difference if a.0.is_empty() || b.0.is_empty() => a,
        ClipMode::Difference => a.difference(&b),
        ClipMode::Intersection if a.0.is_empty() || b.0.is_empty() => MultiPolygon::new(Vec::new()),
        ClipMode::Intersection => a.intersection(&b),
    };
    from_region(&combined)
}

/// Resolve the loops of a single set into a normalized set.
pub fn normalize(polygons: &Polygons, fill_rule: FillRule) -> Polygons {
    from_region(&to_region(polygons, fill_rule))
}

/// Union of many sets.
pub fn union_all<'a>(sets: impl IntoIterator<Item = &'a Polygons>) -> Polygons {
    let mut all = Polygons::new();
    for set in sets {
        let set = normalize(set, FillRule::NonZero);
        all = if all.is_empty() {
            set
        } else {
            clip(&all, &set, ClipMode::Union)
        };
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: i64, y0: i64, x1: i64, y1: i64) -> Polygons {
        Polygons::from_paths(vec![vec![
            IntPoint::new(x0, y0),
            IntPoint::new(x1, y0),
            IntPoint::new(x1, y1),
            IntPoint::new(x0, y1),
        ]])
    }

    fn area2(p: &Polygons) -> i128 {
        p.paths.iter().map(|q| path_area2(q)).sum()
    }

    #[test]
    fn union_of_adjacent_rectangles_is_one_clean_loop() {
        let merged = clip(&rect(0, 0, 10, 10), &rect(10, 0, 20, 10), ClipMode::Union);
        assert_eq!(merged.len(), 1);
        // collinear seam points are gone
        assert_eq!(merged.paths[0].len(), 4);
        assert_eq!(area2(&merged), 400);
    }

    #[test]
    fn difference_creates_clockwise_hole() {
        let holed = clip(&rect(0, 0, 10, 10), &rect(3, 3, 6, 6), ClipMode::Difference);
        assert_eq!(holed.len(), 2);
        assert!(path_area2(&holed.paths[0]) > 0);
        assert!(path_area2(&holed.paths[1]) < 0);
        assert_eq!(area2(&holed), 2 * (100 - 9));
    }

    #[test]
    fn intersection_and_empty_operands() {
        let a = rect(0, 0, 10, 10);
        let b = rect(5, 5, 15, 15);
        assert_eq!(area2(&clip(&a, &b, ClipMode::Intersection)), 50);
        assert!(clip(&a, &Polygons::new(), ClipMode::Intersection).is_empty());
        assert!(clip(&a, &Polygons::new(), ClipMode::Difference).is_same_loop(&a.paths[0]));
        assert!(clip(&Polygons::new(), &b, ClipMode::Difference).is_empty());
    }

    #[test]
    fn fill_rules_differ_on_overlap() {
        let mut overlapping = rect(0, 0, 10, 10);
        overlapping.extend(&rect(5, 0, 15, 10));
        let nonzero = normalize(&overlapping, FillRule::NonZero);
        let even_odd = normalize(&overlapping, FillRule::EvenOdd);
        assert_eq!(area2(&nonzero), 300);
        assert_eq!(area2(&even_odd), 200);
    }

    #[test]
    fn clockwise_loop_inside_counter_clockwise_one_is_a_hole() {
        let mut set = rect(0, 0, 10, 10);
        let mut hole = rect(2, 2, 4, 4).paths.remove(0);
        hole.reverse();
        set.push(hole);
        assert_eq!(area2(&normalize(&set, FillRule::NonZero)), 200 - 8);
    }
}
