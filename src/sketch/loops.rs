//! Chaining unordered 2D segments into closed loops.

use crate::float_types::{LOOP_JOIN_TOLERANCE, LOOP_STITCH_DISTANCE, MIN_LOOP_PERIMETER, Real};
use hashbrown::HashMap;
use nalgebra::Point2;

type Chain = Vec<Point2<Real>>;

/// Collects directed segments and turns them into closed loops.
///
/// Segments are followed end to start through a spatial hash of their start
/// points. Chains that cannot be closed that way are stitched afterwards by
/// repeatedly joining the globally closest pair of open ends.
#[derive(Debug, Clone)]
pub struct LoopBuilder {
    segments: Vec<(Point2<Real>, Point2<Real>)>,
    join_tolerance: Real,
    stitch_distance: Real,
    min_perimeter: Real,
}

impl Default for LoopBuilder {
    fn default() -> Self {
        LoopBuilder::new(LOOP_JOIN_TOLERANCE)
    }
}

impl LoopBuilder {
    pub fn new(join_tolerance: Real) -> Self {
        LoopBuilder {
            segments: Vec::new(),
            join_tolerance: join_tolerance.max(Real::EPSILON),
            stitch_distance: LOOP_STITCH_DISTANCE,
            min_perimeter: MIN_LOOP_PERIMETER,
        }
    }

    pub fn with_stitch_distance(mut self, distance: Real) -> Self {
        self.stitch_distance = distance;
        self
    }

    pub fn with_min_perimeter(mut self, perimeter: Real) -> Self {
        self.min_perimeter = perimeter;
        self
    }

    pub fn add_segment(&mut self, start: Point2<Real>, end: Point2<Real>) {
        if (end - start).norm_squared() > 0.0 {
            self.segments.push((start, end));
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn cell(&self, p: &Point2<Real>) -> (i64, i64) {
        (
            (p.x / self.join_tolerance).floor() as i64,
            (p.y / self.join_tolerance).floor() as i64,
        )
    }

    /// Closed loops, each without a repeated closing point.
    pub fn build(self) -> Vec<Vec<Point2<Real>>> {
        let mut starts: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, (start, _)) in self.segments.iter().enumerate() {
            starts.entry(self.cell(start)).or_default().push(i);
        }

        let tol_sq = self.join_tolerance * self.join_tolerance;
        let mut used = vec![false; self.segments.len()];
        let mut closed: Vec<Chain> = Vec::new();
        let mut open: Vec<Chain> = Vec::new();

        let next_from = |point: &Point2<Real>, used: &[bool]| -> Option<usize> {
            let (cx, cy) = self.cell(point);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    let Some(bucket) = starts.get(&(cx + dx, cy + dy)) else {
                        continue;
                    };
                    if let Some(&i) = bucket.iter().find(|&&i| {
                        !used[i] && (self.segments[i].0 - point).norm_squared() <= tol_sq
                    }) {
                        return Some(i);
                    }
                }
            }
            None
        };

        for first in 0..self.segments.len() {
            if used[first] {
                continue;
            }
            used[first] = true;
            let (start, end) = self.segments[first];
            let mut chain = vec![start, end];
            loop {
                let tail = chain[chain.len() - 1];
                if chain.len() > 2 && (tail - chain[0]).norm_squared() <= tol_sq {
                    chain.pop();
                    closed.push(chain);
                    break;
                }
                match next_from(&tail, &used) {
                    Some(i) => {
                        used[i] = true;
                        chain.push(self.segments[i].1);
                    },
                    None => {
                        open.push(chain);
                        break;
                    },
                }
            }
        }

        closed.extend(self.stitch(open));
        closed.retain(|chain| self.keep(chain));
        closed
    }

    /// Greedy nearest-end stitching of open chains.
    fn stitch(&self, mut open: Vec<Chain>) -> Vec<Chain> {
        let max_sq = self.stitch_distance * self.stitch_distance;
        let mut closed = Vec::new();

        loop {
            // (distance², i, j, reverse j) where i == j closes chain i
            let mut best: Option<(Real, usize, usize, bool)> = None;
            let mut consider = |d: Real, i: usize, j: usize, reverse: bool| {
                if d <= max_sq && best.is_none_or(|(b, ..)| d < b) {
                    best = Some((d, i, j, reverse));
                }
            };
            for i in 0..open.len() {
                let (head_i, tail_i) = (open[i][0], open[i][open[i].len() - 1]);
                if open[i].len() > 2 {
                    consider((tail_i - head_i).norm_squared(), i, i, false);
                }
                for j in 0..open.len() {
                    if i == j {
                        continue;
                    }
                    let (head_j, tail_j) = (open[j][0], open[j][open[j].len() - 1]);
                    consider((head_j - tail_i).norm_squared(), i, j, false);
                    if j > i {
                        consider((tail_j - tail_i).norm_squared(), i, j, true);
                    }
                }
            }

            let Some((_, i, j, reverse)) = best else {
                break;
            };
            if i == j {
                let chain = open.swap_remove(i);
                closed.push(chain);
                continue;
            }
            let mut appended = open[j].clone();
            if reverse {
                appended.reverse();
            }
            let tail_i = open[i][open[i].len() - 1];
            if (appended[0] - tail_i).norm_squared() <= self.join_tolerance * self.join_tolerance {
                appended.remove(0);
            }
            open[i].extend(appended);
            open.swap_remove(j);
        }

        for chain in &mut closed {
            if chain.len() > 1 {
                let (head, tail) = (chain[0], chain[chain.len() - 1]);
                if (tail - head).norm_squared() <= self.join_tolerance * self.join_tolerance {
                    chain.pop();
                }
            }
        }
        closed
    }

    fn keep(&self, chain: &Chain) -> bool {
        let n = chain.len();
        if n < 3 {
            return false;
        }
        let mut perimeter = 0.0;
        let mut area2 = 0.0;
        for i in 0..n {
            let (a, b) = (chain[i], chain[(i + 1) % n]);
            perimeter += (b - a).norm();
            area2 += a.x * b.y - b.x * a.y;
        }
        perimeter >= self.min_perimeter && area2.abs() > self.min_perimeter * self.min_perimeter
    }
}

/// Twice the signed area of a model-space loop.
pub fn loop_area2(points: &[Point2<Real>]) -> Real {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            a.x * b.y - b.x * a.y
        })
        .sum()
}
