use std::ops::Mul;

pub use glam::Vec2;

/// Box2D-style helpers that glam's `Vec2` does not spell the same way.
pub trait Vec2Ext {
    /// Perform the cross product on two vectors. In 2D this produces a scalar.
    fn cross(self, other: Vec2) -> f32;

    /// Perform the cross product on a vector and a scalar. In 2D this produces
    /// a vector.
    fn cross_scalar(self, scalar: f32) -> Vec2;

    /// Convert this vector into a unit vector. Returns the length, or zero
    /// (leaving the vector untouched) when the length is below epsilon.
    fn normalize_len(&mut self) -> f32;
}

impl Vec2Ext for Vec2 {
    #[inline]
    fn cross(self, other: Vec2) -> f32 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    fn cross_scalar(self, scalar: f32) -> Vec2 {
        Vec2::new(scalar * self.y, -scalar * self.x)
    }

    #[inline]
    fn normalize_len(&mut self) -> f32 {
        let length = self.length();
        if length < f32::EPSILON {
            return 0.0;
        }
        *self *= length.recip();
        length
    }
}

/// Perform the cross product on a scalar and a vector. In 2D this produces
/// a vector.
#[inline]
pub fn scalar_cross(scalar: f32, vec: Vec2) -> Vec2 {
    Vec2::new(-scalar * vec.y, scalar * vec.x)
}

/// Rotation
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rot {
    /// Sine
    pub s: f32,
    /// Cosine
    pub c: f32,
}

impl Rot {
    pub const IDENTITY: Self = Self { s: 0.0, c: 1.0 };

    /// Construct a new rotation from an angle in radians.
    #[inline(always)]
    pub fn new(angle: f32) -> Self {
        Self {
            s: angle.sin(),
            c: angle.cos(),
        }
    }

    /// Get the angle in radians.
    #[inline]
    pub fn get_angle(&self) -> f32 {
        self.s.atan2(self.c)
    }

    /// Get the X-axis
    #[inline]
    pub fn get_x_axis(&self) -> Vec2 {
        Vec2::new(self.c, self.s)
    }

    /// Get the Y-axis
    #[inline]
    pub fn get_y_axis(&self) -> Vec2 {
        Vec2::new(-self.s, self.c)
    }

    /// Get the inverse of this rotation.
    #[inline]
    pub fn get_inverse(&self) -> Self {
        Self {
            s: -self.s,
            c: self.c,
        }
    }

    /// Rotate a vector
    #[inline]
    pub fn mul_vec2(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Inverse rotate a vector
    #[inline]
    pub fn mul_t_vec2(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }

    /// Transpose multiply two rotations: inv(q) * r
    #[inline]
    pub fn mul_t(&self, r: Self) -> Self {
        Self {
            s: self.c * r.s - self.s * r.c,
            c: self.c * r.c + self.s * r.s,
        }
    }
}

impl Mul for Rot {
    type Output = Self;
    #[inline]
    fn mul(self, other: Self) -> Self {
        Self {
            s: self.s * other.c + self.c * other.s,
            c: self.c * other.c - self.s * other.s,
        }
    }
}

impl Mul<Vec2> for Rot {
    type Output = Vec2;
    #[inline]
    fn mul(self, other: Vec2) -> Vec2 {
        self.mul_vec2(other)
    }
}

impl Default for Rot {
    #[inline(always)]
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A transform contains translation and rotation. It is used to represent
/// the position and orientation of rigid frames.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub p: Vec2,
    pub q: Rot,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        p: Vec2::ZERO,
        q: Rot::IDENTITY,
    };

    /// Set this based on the position and angle.
    #[inline(always)]
    pub fn new(p: Vec2, angle: f32) -> Self {
        Self {
            p,
            q: Rot::new(angle),
        }
    }

    /// Get the angle in radians.
    #[inline]
    pub fn get_angle(&self) -> f32 {
        self.q.get_angle()
    }

    /// Get the inverse of this transform: q' * p' = p * q
    #[inline]
    pub fn get_inverse(&self) -> Self {
        let q_inv = self.q.get_inverse();
        Self {
            p: q_inv * -self.p,
            q: q_inv,
        }
    }

    /// Multiply a vector by this matrix.
    #[inline]
    pub fn mul_vec2(&self, v: Vec2) -> Vec2 {
        self.q * v + self.p
    }

    /// Multiply a vector by the inverse of this matrix.
    #[inline]
    pub fn mul_t_vec2(&self, v: Vec2) -> Vec2 {
        self.q.mul_t_vec2(v - self.p)
    }

    /// Multiply a matrix by the inverse of this matrix:
    /// v2 = A.q' * (B.q * v1 + B.p - A.p)
    #[inline]
    pub fn mul_t(&self, t: Self) -> Self {
        Self {
            p: self.q.mul_t_vec2(t.p - self.p),
            q: self.q.mul_t(t.q),
        }
    }
}

/// Compose two transforms: `(a * b).mul_vec2(v) == a.mul_vec2(b.mul_vec2(v))`.
impl Mul for Transform {
    type Output = Self;
    #[inline]
    fn mul(self, t: Self) -> Self {
        Self {
            p: self.mul_vec2(t.p),
            q: self.q * t.q,
        }
    }
}

impl Mul<Vec2> for Transform {
    type Output = Vec2;
    #[inline]
    fn mul(self, other: Vec2) -> Vec2 {
        self.mul_vec2(other)
    }
}

/// This describes the motion of a body/shape for TOI computation.
/// Shapes are defined with respect to the body origin, which may
/// no coincide with the center of mass. However, to support dynamics
/// we must interpolate the center of mass position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sweep {
    /// Local center of mass position
    pub local_center: Vec2,

    /// Center world positions
    pub c0: Vec2,
    pub c: Vec2,

    /// World angles
    pub a0: f32,
    pub a: f32,

    /// Fraction of the current time step in the range [0,1]
    /// c0 and a0 are the positions at alpha0.
    pub alpha0: f32,
}

impl Sweep {
    /// A sweep of a body whose center of mass sits on its origin, moving from
    /// (`c0`, `a0`) to (`c`, `a`) over the step.
    pub fn new(c0: Vec2, a0: f32, c: Vec2, a: f32) -> Self {
        Self {
            local_center: Vec2::ZERO,
            c0,
            c,
            a0,
            a,
            alpha0: 0.0,
        }
    }

    /// Get the interpolated transform at a specific time.
    /// `beta` is a factor in [0,1], where 0 indicates alpha0.
    pub fn get_transform(&self, beta: f32) -> Transform {
        let p = (1.0 - beta) * self.c0 + beta * self.c;
        let angle = (1.0 - beta) * self.a0 + beta * self.a;
        let q = Rot::new(angle);

        // Shift to origin
        Transform {
            p: p - q * self.local_center,
            q,
        }
    }

    /// Advance the sweep forward, yielding a new initial state.
    /// `alpha` is the new initial time.
    pub fn advance(&mut self, alpha: f32) {
        debug_assert!(self.alpha0 < 1.0);
        let beta = (alpha - self.alpha0) / (1.0 - self.alpha0);
        self.c0 += beta * (self.c - self.c0);
        self.a0 += beta * (self.a - self.a0);
        self.alpha0 = alpha;
    }

    /// Normalize the angles so that a0 lies in [0, 2pi). Both angles are
    /// shifted by the same amount, so the swept rotation is unchanged.
    pub fn normalize(&mut self) {
        let two_pi = 2.0 * std::f32::consts::PI;
        let d = two_pi * (self.a0 / two_pi).floor();
        self.a0 -= d;
        self.a -= d;
    }
}
