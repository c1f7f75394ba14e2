//! Transform parameters and their homogeneous 3x3 matrix form.

/// Parameters of the conformal-plus-skew transform family.
///
/// The linear part `[[a+1, b], [-b, a+1]]` is always conformal (rotation plus
/// uniform scale); independent axis scaling or shear is not representable.
/// `skew_x` and `skew_y` are first-order perspective corrections applied in
/// the homogeneous third row. All parameters measure deviation from the
/// identity: [`TransformParams::identity`] is the all-zero vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformParams {
    /// Conformal coefficient shared by both diagonal entries (as `a + 1`).
    pub a: f64,
    /// Conformal off-diagonal coefficient (rotation part).
    pub b: f64,
    /// Translation along X.
    pub tx: f64,
    /// Translation along Y.
    pub ty: f64,
    /// First-order perspective term along X.
    pub skew_x: f64,
    /// First-order perspective term along Y.
    pub skew_y: f64,
}

impl TransformParams {
    /// The identity transform.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Parameters from a 6-element vector in the fixed solver layout
    /// `(a, b, tx, ty, skew_x, skew_y)`.
    pub fn from_vector(x: &[f64; 6]) -> Self {
        Self {
            a: x[0],
            b: x[1],
            tx: x[2],
            ty: x[3],
            skew_x: x[4],
            skew_y: x[5],
        }
    }

    /// The 6-element vector form in the fixed solver layout.
    pub fn to_vector(&self) -> [f64; 6] {
        [self.a, self.b, self.tx, self.ty, self.skew_x, self.skew_y]
    }

    /// The homogeneous 3x3 transform matrix.
    ///
    /// ```text
    /// [[a+1,    b,   tx],
    ///  [ -b,  a+1,   ty],
    ///  [skew_x, skew_y, 1]]
    /// ```
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.a + 1.0, self.b, self.tx],
            [-self.b, self.a + 1.0, self.ty],
            [self.skew_x, self.skew_y, 1.0],
        ]
    }

    /// Apply the transform to an image point, with homogeneous divide.
    pub fn apply(&self, point: [f64; 2]) -> [f64; 2] {
        let [x, y] = point;
        let w = self.skew_x * x + self.skew_y * y + 1.0;
        [
            ((self.a + 1.0) * x + self.b * y + self.tx) / w,
            (-self.b * x + (self.a + 1.0) * y + self.ty) / w,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_matrix() {
        let t = TransformParams::identity().matrix();
        let expected = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert_eq!(t, expected);
    }

    #[test]
    fn matrix_layout() {
        let p = TransformParams {
            a: 0.5,
            b: -0.25,
            tx: 3.0,
            ty: -4.0,
            skew_x: 0.01,
            skew_y: 0.02,
        };
        let t = p.matrix();
        assert_eq!(t[0], [1.5, -0.25, 3.0]);
        assert_eq!(t[1], [0.25, 1.5, -4.0]);
        assert_eq!(t[2], [0.01, 0.02, 1.0]);
    }

    #[test]
    fn vector_round_trip() {
        let x = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        assert_eq!(TransformParams::from_vector(&x).to_vector(), x);
    }

    #[test]
    fn apply_pure_translation() {
        let p = TransformParams {
            tx: 5.0,
            ty: -2.0,
            ..Default::default()
        };
        let out = p.apply([10.0, 20.0]);
        assert_relative_eq!(out[0], 15.0);
        assert_relative_eq!(out[1], 18.0);
    }

    #[test]
    fn apply_divides_by_homogeneous_coordinate() {
        let p = TransformParams {
            skew_x: 0.1,
            ..Default::default()
        };
        // w = 1 + 0.1 * 10 = 2
        let out = p.apply([10.0, 4.0]);
        assert_relative_eq!(out[0], 5.0);
        assert_relative_eq!(out[1], 2.0);
    }
}
