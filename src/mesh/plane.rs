//! Oriented planes and the rigid frames that flatten them onto XY.

use crate::float_types::{EPSILON, PI, Real};
use nalgebra::{Isometry3, Matrix4, Point2, Point3, Rotation3, Translation3, Vector3};

/// A plane `n · p = w` with a unit normal `n`.
///
/// Degenerate input produces a plane whose components are NaN; callers check
/// [`Plane::is_finite`] instead of handling an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal vector of the plane
    pub normal: Vector3<Real>,
    /// Distance from origin along normal (plane equation: n·p = w)
    pub w: Real,
}

impl Plane {
    /// Create a plane from a normal (normalized here) and an offset measured
    /// along the unnormalized normal.
    pub fn from_normal(normal: Vector3<Real>, w: Real) -> Self {
        let len = normal.norm();
        if len < EPSILON {
            return Self::degenerate();
        }
        Plane {
            normal: normal / len,
            w: w / len,
        }
    }

    /// Plane through three points, oriented counter-clockwise around its
    /// normal. Collinear points yield a NaN plane.
    pub fn from_points(a: &Point3<Real>, b: &Point3<Real>, c: &Point3<Real>) -> Self {
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if !(len > EPSILON * EPSILON) {
            return Self::degenerate();
        }
        let normal = n / len;
        Plane {
            normal,
            w: normal.dot(&a.coords),
        }
    }

    fn degenerate() -> Self {
        Plane {
            normal: Vector3::new(Real::NAN, Real::NAN, Real::NAN),
            w: Real::NAN,
        }
    }

    pub fn normal(&self) -> Vector3<Real> {
        self.normal
    }

    pub fn offset(&self) -> Real {
        self.w
    }

    /// `false` for planes built from degenerate triangles.
    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.normal.iter().all(|c| c.is_finite())
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }

    pub fn flipped(&self) -> Self {
        let mut plane = *self;
        plane.flip();
        plane
    }

    /// Same orientation, moved by `distance` along the normal.
    pub fn offset_by(&self, distance: Real) -> Self {
        Plane {
            normal: self.normal,
            w: self.w + distance,
        }
    }

    /// Positive in front of the plane, negative behind it.
    #[inline]
    pub fn signed_distance(&self, point: &Point3<Real>) -> Real {
        self.normal.dot(&point.coords) - self.w
    }

    /// Orthogonal projection of `point` onto the plane.
    pub fn project_point(&self, point: &Point3<Real>) -> Point3<Real> {
        point - self.normal * self.signed_distance(point)
    }

    /// Returns (T, T_inv), where
    /// - `T`   maps a point on this plane into XY (its Z-coordinate becomes 0)
    /// - `T_inv` is the inverse transform, mapping XY back to this plane
    ///
    /// The plane normal maps onto +Z, so a loop that runs counter-clockwise
    /// around the normal is counter-clockwise in XY.
    pub fn to_xy_transform(&self) -> (Matrix4<Real>, Matrix4<Real>) {
        if !self.is_finite() {
            return (Matrix4::identity(), Matrix4::identity());
        }

        // Rotate plane.normal -> +Z; `rotation_between` has no answer for -Z
        let rot = Rotation3::rotation_between(&self.normal, &Vector3::z()).unwrap_or_else(|| {
            Rotation3::from_axis_angle(&Vector3::x_axis(), PI)
        });

        // The plane's reference point w·n must land at z = 0
        let p0 = Point3::from(self.normal * self.w);
        let shift = -(rot * p0).z;
        let iso = Isometry3::from_parts(Translation3::new(0.0, 0.0, shift), rot.into());

        (iso.to_homogeneous(), iso.inverse().to_homogeneous())
    }

    /// The [`PlaneFrame`] of this plane.
    pub fn frame(&self) -> PlaneFrame {
        let (to_xy, from_xy) = self.to_xy_transform();
        PlaneFrame { to_xy, from_xy }
    }
}

/// Cached pair of transforms between a plane and the XY plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneFrame {
    pub to_xy: Matrix4<Real>,
    pub from_xy: Matrix4<Real>,
}

impl PlaneFrame {
    /// 2D coordinates of `point` in the frame, dropping its height.
    #[inline]
    pub fn project(&self, point: &Point3<Real>) -> Point2<Real> {
        let p = self.to_xy.transform_point(point);
        Point2::new(p.x, p.y)
    }

    /// Lift a 2D frame coordinate back onto the plane.
    #[inline]
    pub fn lift(&self, x: Real, y: Real) -> Point3<Real> {
        self.from_xy.transform_point(&Point3::new(x, y, 0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn to_xy_round_trips_for_negative_z() {
        let plane = Plane::from_normal(-Vector3::z(), 2.0);
        let frame = plane.frame();
        let p = Point3::new(0.25, -0.75, -2.0);
        let flat = frame.to_xy.transform_point(&p);
        assert_relative_eq!(flat.z, 0.0, epsilon = 1e-12);
        let back = frame.lift(flat.x, flat.y);
        assert_relative_eq!(back, p, epsilon = 1e-12);
        // normal maps onto +Z
        let n = frame.to_xy.transform_vector(&plane.normal);
        assert_relative_eq!(n, Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn collinear_points_give_nan_plane() {
        let plane = Plane::from_points(
            &Point3::origin(),
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(2.0, 0.0, 0.0),
        );
        assert!(!plane.is_finite());
    }
}
