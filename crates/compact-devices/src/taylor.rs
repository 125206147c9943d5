//! Truncated Taylor arithmetic for device equations.
//!
//! Device equations are written once, generic over [`Real`], and evaluated
//! with three scalar types:
//! - `f64` for plain values
//! - [`Dual`] for values plus first partials with respect to the three
//!   controlling voltages (Newton load)
//! - [`Jet`] for the full third-order expansion (Volterra kernels for
//!   distortion analysis)

use std::fmt::Debug;
use std::ops::{Add, Div, Mul, Neg, Sub};

use num_complex::Complex;
use num_traits::{One, Zero};

/// Number of independent variables carried by [`Dual`] and [`Jet`].
pub const VARS: usize = 3;

/// Scalar type usable inside device equations.
pub trait Real:
    Copy
    + Debug
    + Send
    + Sync
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
{
    /// A value with no dependence on the variables.
    fn constant(value: f64) -> Self;

    /// The plain value.
    fn value(&self) -> f64;

    /// Apply a scalar function given its value and first three derivatives
    /// at `self.value()`.
    fn compose(self, f: [f64; 4]) -> Self;

    fn exp(self) -> Self {
        let e = self.value().exp();
        self.compose([e, e, e, e])
    }

    fn ln(self) -> Self {
        let x = self.value();
        let r = 1.0 / x;
        self.compose([x.ln(), r, -r * r, 2.0 * r * r * r])
    }

    fn sqrt(self) -> Self {
        let x = self.value();
        let s = x.sqrt();
        self.compose([s, 0.5 / s, -0.25 / (s * x), 0.375 / (s * x * x)])
    }

    fn powf(self, p: f64) -> Self {
        let x = self.value();
        self.compose([
            x.powf(p),
            p * x.powf(p - 1.0),
            p * (p - 1.0) * x.powf(p - 2.0),
            p * (p - 1.0) * (p - 2.0) * x.powf(p - 3.0),
        ])
    }

    fn recip(self) -> Self {
        let r = 1.0 / self.value();
        self.compose([r, -r * r, 2.0 * r * r * r, -6.0 * r * r * r * r])
    }

    fn tanh(self) -> Self {
        let t = self.value().tanh();
        let s = 1.0 - t * t;
        self.compose([t, s, -2.0 * t * s, s * (6.0 * t * t - 2.0)])
    }

    /// Larger of two values; the derivatives follow the selected branch.
    fn max(self, other: Self) -> Self {
        if self.value() >= other.value() { self } else { other }
    }

    /// Smaller of two values; the derivatives follow the selected branch.
    fn min(self, other: Self) -> Self {
        if self.value() <= other.value() { self } else { other }
    }
}

impl Real for f64 {
    fn constant(value: f64) -> Self {
        value
    }

    fn value(&self) -> f64 {
        *self
    }

    fn compose(self, f: [f64; 4]) -> Self {
        f[0]
    }
}

/// Value with first partial derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dual {
    pub v: f64,
    pub d: [f64; VARS],
}

impl Dual {
    /// The `index`-th independent variable at `value`.
    pub fn variable(index: usize, value: f64) -> Self {
        let mut d = [0.0; VARS];
        d[index] = 1.0;
        Self { v: value, d }
    }

    fn scale(self, s: f64) -> Self {
        Self {
            v: self.v * s,
            d: self.d.map(|x| x * s),
        }
    }
}

impl Add for Dual {
    type Output = Dual;
    fn add(self, rhs: Dual) -> Dual {
        Dual {
            v: self.v + rhs.v,
            d: std::array::from_fn(|i| self.d[i] + rhs.d[i]),
        }
    }
}

impl Sub for Dual {
    type Output = Dual;
    fn sub(self, rhs: Dual) -> Dual {
        Dual {
            v: self.v - rhs.v,
            d: std::array::from_fn(|i| self.d[i] - rhs.d[i]),
        }
    }
}

impl Mul for Dual {
    type Output = Dual;
    fn mul(self, rhs: Dual) -> Dual {
        Dual {
            v: self.v * rhs.v,
            d: std::array::from_fn(|i| self.d[i] * rhs.v + self.v * rhs.d[i]),
        }
    }
}

impl Div for Dual {
    type Output = Dual;
    fn div(self, rhs: Dual) -> Dual {
        let inv = 1.0 / rhs.v;
        let v = self.v * inv;
        Dual {
            v,
            d: std::array::from_fn(|i| (self.d[i] - v * rhs.d[i]) * inv),
        }
    }
}

impl Neg for Dual {
    type Output = Dual;
    fn neg(self) -> Dual {
        self.scale(-1.0)
    }
}

impl Real for Dual {
    fn constant(value: f64) -> Self {
        Self {
            v: value,
            d: [0.0; VARS],
        }
    }

    fn value(&self) -> f64 {
        self.v
    }

    fn compose(self, f: [f64; 4]) -> Self {
        Self {
            v: f[0],
            d: self.d.map(|x| x * f[1]),
        }
    }
}

type Matrix3 = [[f64; VARS]; VARS];
type Tensor3 = [[[f64; VARS]; VARS]; VARS];

/// Third-order truncated Taylor series in three variables.
///
/// Coefficients are stored as fully symmetric tensors, so the series reads
/// `c0 + Σ c1[i] h_i + Σ c2[i][j] h_i h_j + Σ c3[i][j][k] h_i h_j h_k`
/// with every index running over all variables.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Jet {
    c0: f64,
    c1: [f64; VARS],
    c2: Matrix3,
    c3: Tensor3,
}

impl Jet {
    /// The `index`-th independent variable expanded around `value`.
    pub fn variable(index: usize, value: f64) -> Self {
        let mut jet = Self::constant(value);
        jet.c1[index] = 1.0;
        jet
    }

    /// First-order coefficients (the gradient).
    pub fn linear(&self) -> [f64; VARS] {
        self.c1
    }

    /// Second-order coefficient for `h_i h_j` (half the Hessian entry).
    pub fn quadratic(&self, i: usize, j: usize) -> f64 {
        self.c2[i][j]
    }

    /// Third-order coefficient for `h_i h_j h_k`.
    pub fn cubic(&self, i: usize, j: usize, k: usize) -> f64 {
        self.c3[i][j][k]
    }

    /// Second-order form `Σ c2[i][j] u_i v_j` evaluated on phasors.
    pub fn bilinear(&self, u: &[Complex<f64>; VARS], v: &[Complex<f64>; VARS]) -> Complex<f64> {
        let mut sum = Complex::zero();
        for i in 0..VARS {
            for j in 0..VARS {
                sum += u[i] * v[j] * self.c2[i][j];
            }
        }
        sum
    }

    /// Third-order form `Σ c3[i][j][k] u_i v_j w_k` evaluated on phasors.
    pub fn trilinear(
        &self,
        u: &[Complex<f64>; VARS],
        v: &[Complex<f64>; VARS],
        w: &[Complex<f64>; VARS],
    ) -> Complex<f64> {
        let mut sum = Complex::zero();
        for i in 0..VARS {
            for j in 0..VARS {
                for k in 0..VARS {
                    sum += u[i] * v[j] * w[k] * self.c3[i][j][k];
                }
            }
        }
        sum
    }

    fn scale(mut self, s: f64) -> Self {
        self.c0 *= s;
        for i in 0..VARS {
            self.c1[i] *= s;
            for j in 0..VARS {
                self.c2[i][j] *= s;
                for k in 0..VARS {
                    self.c3[i][j][k] *= s;
                }
            }
        }
        self
    }

    fn combine(mut self, rhs: Jet, sign: f64) -> Self {
        self.c0 += sign * rhs.c0;
        for i in 0..VARS {
            self.c1[i] += sign * rhs.c1[i];
            for j in 0..VARS {
                self.c2[i][j] += sign * rhs.c2[i][j];
                for k in 0..VARS {
                    self.c3[i][j][k] += sign * rhs.c3[i][j][k];
                }
            }
        }
        self
    }
}

impl Add for Jet {
    type Output = Jet;
    fn add(self, rhs: Jet) -> Jet {
        self.combine(rhs, 1.0)
    }
}

impl Sub for Jet {
    type Output = Jet;
    fn sub(self, rhs: Jet) -> Jet {
        self.combine(rhs, -1.0)
    }
}

impl Mul for Jet {
    type Output = Jet;
    fn mul(self, b: Jet) -> Jet {
        let a = self;
        let mut r = Jet::constant(a.c0 * b.c0);
        for i in 0..VARS {
            r.c1[i] = a.c0 * b.c1[i] + a.c1[i] * b.c0;
        }
        for i in 0..VARS {
            for j in 0..VARS {
                r.c2[i][j] = a.c0 * b.c2[i][j]
                    + a.c2[i][j] * b.c0
                    + 0.5 * (a.c1[i] * b.c1[j] + a.c1[j] * b.c1[i]);
            }
        }
        for i in 0..VARS {
            for j in 0..VARS {
                for k in 0..VARS {
                    let cross = a.c1[i] * b.c2[j][k]
                        + a.c1[j] * b.c2[i][k]
                        + a.c1[k] * b.c2[i][j]
                        + a.c2[j][k] * b.c1[i]
                        + a.c2[i][k] * b.c1[j]
                        + a.c2[i][j] * b.c1[k];
                    r.c3[i][j][k] = a.c0 * b.c3[i][j][k] + a.c3[i][j][k] * b.c0 + cross / 3.0;
                }
            }
        }
        r
    }
}

impl Div for Jet {
    type Output = Jet;
    fn div(self, rhs: Jet) -> Jet {
        self * rhs.recip()
    }
}

impl Neg for Jet {
    type Output = Jet;
    fn neg(self) -> Jet {
        self.scale(-1.0)
    }
}

impl Real for Jet {
    fn constant(value: f64) -> Self {
        Self {
            c0: value,
            ..Self::default()
        }
    }

    fn value(&self) -> f64 {
        self.c0
    }

    fn compose(self, f: [f64; 4]) -> Self {
        let mut h = self;
        h.c0 = 0.0;
        let h2 = h * h;
        let h3 = h2 * h;
        Jet::constant(f[0]) + h.scale(f[1]) + h2.scale(f[2] / 2.0) + h3.scale(f[3] / 6.0)
    }
}

macro_rules! scalar_ops {
    ($t:ty) => {
        impl Add<f64> for $t {
            type Output = $t;
            fn add(self, rhs: f64) -> $t {
                self + <$t as Real>::constant(rhs)
            }
        }

        impl Sub<f64> for $t {
            type Output = $t;
            fn sub(self, rhs: f64) -> $t {
                self - <$t as Real>::constant(rhs)
            }
        }

        impl Mul<f64> for $t {
            type Output = $t;
            fn mul(self, rhs: f64) -> $t {
                self.scale(rhs)
            }
        }

        impl Div<f64> for $t {
            type Output = $t;
            fn div(self, rhs: f64) -> $t {
                self.scale(1.0 / rhs)
            }
        }

        impl Zero for $t {
            fn zero() -> Self {
                <$t as Real>::constant(0.0)
            }

            fn is_zero(&self) -> bool {
                *self == Self::zero()
            }
        }

        impl One for $t {
            fn one() -> Self {
                <$t as Real>::constant(1.0)
            }
        }
    };
}

scalar_ops!(Dual);
scalar_ops!(Jet);
