use crate::errors::CsgError;
use crate::float_types::Real;
use crate::float_types::parry3d::bounding_volume::Aabb;
use nalgebra::{Matrix4, Rotation3, Translation3, Vector3};

/// Boolean operations + transformations
pub trait CSGOps: Sized + Clone {
    fn new() -> Self;
    fn union(&self, other: &Self) -> Result<Self, CsgError>;
    fn difference(&self, other: &Self) -> Result<Self, CsgError>;
    fn intersection(&self, other: &Self) -> Result<Self, CsgError>;

    /// Apply an affine `matrix`. Mirroring matrices keep faces pointing
    /// outwards.
    fn transform(&self, matrix: &Matrix4<Real>) -> Self;
    fn bounding_box(&self) -> Aabb;

    /// Returns a new Self translated by vector.
    fn translate_vector(&self, vector: Vector3<Real>) -> Self {
        self.transform(&Translation3::from(vector).to_homogeneous())
    }

    /// Returns a new Self translated by x, y, and z.
    fn translate(&self, x: Real, y: Real, z: Real) -> Self {
        self.translate_vector(Vector3::new(x, y, z))
    }

    /// Returns a new Self whose bounding-box center is at the origin.
    fn center(&self) -> Self {
        let aabb = self.bounding_box();
        self.translate_vector(-aabb.center().coords)
    }

    /// Translates the object so that its bottommost point(s) sit exactly at z=0.
    ///
    /// # Example
    /// ```
    /// # use slicecsg::{mesh::Mesh, traits::CSGOps};
    /// let mesh = Mesh::cuboid(1.0, 1.0, 3.0).translate(2.0, 1.0, -2.0);
    /// let floated = mesh.float();
    /// assert_eq!(floated.bounding_box().mins.z, 0.0);
    /// ```
    fn float(&self) -> Self {
        let min_z = self.bounding_box().mins.z;
        self.translate(0.0, 0.0, -min_z)
    }

    /// Rotates about x, then y, then z, in degrees.
    fn rotate(&self, x_deg: Real, y_deg: Real, z_deg: Real) -> Self {
        let rotation = Rotation3::from_euler_angles(
            x_deg.to_radians(),
            y_deg.to_radians(),
            z_deg.to_radians(),
        );
        self.transform(&rotation.to_homogeneous())
    }

    /// Scales along each axis. Negative factors mirror.
    fn scale(&self, sx: Real, sy: Real, sz: Real) -> Self {
        self.transform(&Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz)))
    }
}
