//! # Numeric Kernel
//!
//! The number tower consumed by the symbolic core: every literal in an expression tree and
//! every value flowing through a compiled function is a [`Number`].
//!
//! ## Tiers
//!
//! - **Integer**: arbitrary precision (`num::BigInt`)
//! - **Rational**: arbitrary precision, always in lowest terms (`num::BigRational`)
//! - **Real**: IEEE double
//! - **Complex**: pair of IEEE doubles (`num_complex::Complex64`)
//!
//! Integer ⊂ Rational ⊂ Real ⊂ Complex. A binary operation widens both operands to the
//! wider tier first. Values are kept canonical: a rational with denominator 1 is stored as an
//! Integer and a complex with a zero imaginary part is stored as a Real, so structural
//! equality of numbers never depends on how a value was produced.
//!
//! ## Exactness
//!
//! Arithmetic between exact operands (Integer, Rational) stays exact, with one exception:
//! division by an exact zero falls back to IEEE semantics and yields a non-finite Real.
//! Transcendental functions always produce Real or Complex values; they switch to the
//! complex branch when the real one is undefined (`arcsin(2)`, `log(-1)`, `(-8)^(1/3)`).

use num::bigint::BigInt;
use num::rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use num_complex::Complex64;
use std::f64::consts::PI;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Largest absolute integer exponent evaluated exactly; larger ones go through `f64`.
const MAX_EXACT_EXPONENT: i64 = 4096;
/// Largest argument of an exact integer factorial.
const MAX_EXACT_FACTORIAL: i64 = 2000;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

/// A value of the integer/rational/real/complex hierarchy.
#[derive(Clone, Debug)]
pub enum Number {
    Integer(BigInt),
    Rational(BigRational),
    Real(f64),
    Complex(Complex64),
}

impl Number {
    //___________________________________CONSTRUCTORS____________________________________

    pub fn int(value: i64) -> Number {
        Number::Integer(BigInt::from(value))
    }

    pub fn integer(value: BigInt) -> Number {
        Number::Integer(value)
    }

    /// `numerator / denominator` reduced to lowest terms; a zero denominator gives a
    /// non-finite Real.
    pub fn rational(numerator: i64, denominator: i64) -> Number {
        if denominator == 0 {
            return Number::Real(numerator as f64 / 0.0);
        }
        Number::from_ratio(BigRational::new(
            BigInt::from(numerator),
            BigInt::from(denominator),
        ))
    }

    pub fn from_ratio(value: BigRational) -> Number {
        if value.is_integer() {
            Number::Integer(value.to_integer())
        } else {
            Number::Rational(value)
        }
    }

    pub fn real(value: f64) -> Number {
        Number::Real(value)
    }

    pub fn complex(re: f64, im: f64) -> Number {
        Number::from_complex(Complex64::new(re, im))
    }

    pub fn from_complex(value: Complex64) -> Number {
        if value.im == 0.0 {
            Number::Real(value.re)
        } else {
            Number::Complex(value)
        }
    }

    /// The imaginary unit.
    pub fn i() -> Number {
        Number::Complex(Complex64::new(0.0, 1.0))
    }

    pub fn nan() -> Number {
        Number::Real(f64::NAN)
    }

    //___________________________________PREDICATES____________________________________

    /// Position in the tower: Integer 0, Rational 1, Real 2, Complex 3.
    pub fn tier(&self) -> u8 {
        match self {
            Number::Integer(_) => 0,
            Number::Rational(_) => 1,
            Number::Real(_) => 2,
            Number::Complex(_) => 3,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Number::Integer(_))
    }

    /// true for every tier below Complex
    pub fn is_real(&self) -> bool {
        !matches!(self, Number::Complex(_))
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Number::Integer(_) | Number::Rational(_))
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Number::Integer(_) | Number::Rational(_) => true,
            Number::Real(x) => x.is_finite(),
            Number::Complex(c) => c.re.is_finite() && c.im.is_finite(),
        }
    }

    pub fn is_nan(&self) -> bool {
        match self {
            Number::Integer(_) | Number::Rational(_) => false,
            Number::Real(x) => x.is_nan(),
            Number::Complex(c) => c.re.is_nan() || c.im.is_nan(),
        }
    }

    /// Real and strictly below zero. Complex values are never negative.
    pub fn is_negative(&self) -> bool {
        match self {
            Number::Integer(i) => i.is_negative(),
            Number::Rational(r) => r.is_negative(),
            Number::Real(x) => *x < 0.0,
            Number::Complex(_) => false,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Integer(i) => i.is_zero(),
            Number::Rational(r) => r.is_zero(),
            Number::Real(x) => *x == 0.0,
            Number::Complex(c) => c.re == 0.0 && c.im == 0.0,
        }
    }

    pub fn is_one(&self) -> bool {
        match self {
            Number::Integer(i) => i.is_one(),
            Number::Rational(r) => r.is_one(),
            Number::Real(x) => *x == 1.0,
            Number::Complex(c) => c.re == 1.0 && c.im == 0.0,
        }
    }

    /// Exact integer value that fits into `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Integer(i) => i.to_i64(),
            _ => None,
        }
    }

    //___________________________________CONVERSIONS____________________________________

    pub fn to_ratio(&self) -> Option<BigRational> {
        match self {
            Number::Integer(i) => Some(BigRational::from_integer(i.clone())),
            Number::Rational(r) => Some(r.clone()),
            _ => None,
        }
    }

    /// Value as `f64`; `None` for Complex.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Number::Integer(i) => Some(i.to_f64().unwrap_or(f64::NAN)),
            Number::Rational(r) => Some(r.to_f64().unwrap_or(f64::NAN)),
            Number::Real(x) => Some(*x),
            Number::Complex(_) => None,
        }
    }

    pub fn to_complex(&self) -> Complex64 {
        match self {
            Number::Complex(c) => *c,
            other => Complex64::new(other.to_f64().unwrap_or(f64::NAN), 0.0),
        }
    }

    //___________________________________ARITHMETIC____________________________________

    fn inexact_binary(
        &self,
        other: &Number,
        real: impl Fn(f64, f64) -> f64,
        complex: impl Fn(Complex64, Complex64) -> Complex64,
    ) -> Number {
        match (self.to_f64(), other.to_f64()) {
            (Some(a), Some(b)) => Number::Real(real(a, b)),
            _ => Number::from_complex(complex(self.to_complex(), other.to_complex())),
        }
    }

    fn exact_pair(&self, other: &Number) -> Option<(BigRational, BigRational)> {
        Some((self.to_ratio()?, other.to_ratio()?))
    }

    pub fn add(&self, other: &Number) -> Number {
        match self.exact_pair(other) {
            Some((a, b)) => Number::from_ratio(a + b),
            None => self.inexact_binary(other, |a, b| a + b, |a, b| a + b),
        }
    }

    pub fn sub(&self, other: &Number) -> Number {
        match self.exact_pair(other) {
            Some((a, b)) => Number::from_ratio(a - b),
            None => self.inexact_binary(other, |a, b| a - b, |a, b| a - b),
        }
    }

    pub fn mul(&self, other: &Number) -> Number {
        match self.exact_pair(other) {
            Some((a, b)) => Number::from_ratio(a * b),
            None => self.inexact_binary(other, |a, b| a * b, |a, b| a * b),
        }
    }

    pub fn div(&self, other: &Number) -> Number {
        match self.exact_pair(other) {
            Some((a, b)) if !b.is_zero() => Number::from_ratio(a / b),
            _ => self.inexact_binary(other, |a, b| a / b, |a, b| a / b),
        }
    }

    pub fn neg(&self) -> Number {
        match self {
            Number::Integer(i) => Number::Integer(-i),
            Number::Rational(r) => Number::Rational(-r),
            Number::Real(x) => Number::Real(-x),
            Number::Complex(c) => Number::Complex(-c),
        }
    }

    pub fn abs(&self) -> Number {
        match self {
            Number::Integer(i) => Number::Integer(i.abs()),
            Number::Rational(r) => Number::Rational(r.abs()),
            Number::Real(x) => Number::Real(x.abs()),
            Number::Complex(c) => Number::Real(c.norm()),
        }
    }

    pub fn pow(&self, exponent: &Number) -> Number {
        if let (Some(base), Some(e)) = (self.to_ratio(), exponent.as_i64())
            && e.abs() <= MAX_EXACT_EXPONENT
            && !(base.is_zero() && e < 0)
        {
            return Number::from_ratio(base.pow(e as i32));
        }
        match (self.to_f64(), exponent.to_f64()) {
            (Some(a), Some(b)) if a >= 0.0 || b.fract() == 0.0 || !b.is_finite() => {
                Number::Real(a.powf(b))
            }
            _ => Number::from_complex(self.to_complex().powc(exponent.to_complex())),
        }
    }

    //___________________________________FUNCTIONS____________________________________

    /// Applies `real` when the operand is real and the real branch is defined, `complex`
    /// otherwise.
    fn real_or_complex(
        &self,
        real: impl Fn(f64) -> Option<f64>,
        complex: impl Fn(Complex64) -> Complex64,
    ) -> Number {
        if let Some(x) = self.to_f64()
            && let Some(value) = real(x)
        {
            return Number::Real(value);
        }
        Number::from_complex(complex(self.to_complex()))
    }

    pub fn sin(&self) -> Number {
        self.real_or_complex(|x| Some(x.sin()), |z| z.sin())
    }

    pub fn cos(&self) -> Number {
        self.real_or_complex(|x| Some(x.cos()), |z| z.cos())
    }

    pub fn tan(&self) -> Number {
        self.real_or_complex(|x| Some(x.tan()), |z| z.tan())
    }

    pub fn cot(&self) -> Number {
        self.real_or_complex(|x| Some(1.0 / x.tan()), |z| z.tan().inv())
    }

    pub fn arcsin(&self) -> Number {
        self.real_or_complex(
            |x| (-1.0..=1.0).contains(&x).then(|| x.asin()),
            |z| z.asin(),
        )
    }

    pub fn arccos(&self) -> Number {
        self.real_or_complex(
            |x| (-1.0..=1.0).contains(&x).then(|| x.acos()),
            |z| z.acos(),
        )
    }

    pub fn arctan(&self) -> Number {
        self.real_or_complex(|x| Some(x.atan()), |z| z.atan())
    }

    /// `arccot(x) = π/2 − arctan(x)`, continuous on the whole real line.
    pub fn arccot(&self) -> Number {
        self.real_or_complex(
            |x| Some(PI / 2.0 - x.atan()),
            |z| Complex64::new(PI / 2.0, 0.0) - z.atan(),
        )
    }

    /// Logarithm of `self` to the given `base`.
    pub fn log(&self, base: &Number) -> Number {
        match (base.to_f64(), self.to_f64()) {
            (Some(b), Some(x)) if b > 0.0 && x > 0.0 => Number::Real(x.ln() / b.ln()),
            _ => Number::from_complex(self.to_complex().ln() / base.to_complex().ln()),
        }
    }

    /// `n!` exactly for small non-negative integers, `Γ(x + 1)` otherwise (NaN at the poles).
    pub fn factorial(&self) -> Number {
        if let Some(n) = self.as_i64() {
            if n < 0 {
                return Number::nan();
            }
            if n <= MAX_EXACT_FACTORIAL {
                let product = (2..=n).fold(BigInt::one(), |acc, k| acc * BigInt::from(k));
                return Number::Integer(product);
            }
        }
        if let Some(x) = self.to_f64()
            && x < 0.0
            && x.fract() == 0.0
        {
            return Number::nan();
        }
        Number::from_complex(lanczos_gamma(self.to_complex() + 1.0))
    }
}

/// Lanczos approximation of Γ(z), with the reflection formula for `Re z < 1/2`.
fn lanczos_gamma(z: Complex64) -> Complex64 {
    if z.re < 0.5 {
        let reflected = lanczos_gamma(Complex64::new(1.0, 0.0) - z);
        return Complex64::new(PI, 0.0) / ((z * PI).sin() * reflected);
    }
    let z = z - 1.0;
    let mut series = Complex64::new(LANCZOS_COEFFICIENTS[0], 0.0);
    for (i, coefficient) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
        series += *coefficient / (z + i as f64);
    }
    let t = z + LANCZOS_G + 0.5;
    (2.0 * PI).sqrt() * t.powc(z + 0.5) * (-t).exp() * series
}

//___________________________________EQUALITY & HASHING____________________________________

fn same_float(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn float_key(x: f64) -> u64 {
    if x == 0.0 {
        0
    } else if x.is_nan() {
        f64::NAN.to_bits()
    } else {
        x.to_bits()
    }
}

/// Structural: same tier and same value. `Integer(2)` and `Real(2.0)` differ; NaN equals NaN
/// so that equality stays reflexive.
impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => a == b,
            (Number::Rational(a), Number::Rational(b)) => a == b,
            (Number::Real(a), Number::Real(b)) => same_float(*a, *b),
            (Number::Complex(a), Number::Complex(b)) => {
                same_float(a.re, b.re) && same_float(a.im, b.im)
            }
            _ => false,
        }
    }
}

impl Eq for Number {}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tier().hash(state);
        match self {
            Number::Integer(i) => i.hash(state),
            Number::Rational(r) => r.hash(state),
            Number::Real(x) => float_key(*x).hash(state),
            Number::Complex(c) => {
                float_key(c.re).hash(state);
                float_key(c.im).hash(state);
            }
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{}", i),
            Number::Rational(r) => write!(f, "{}/{}", r.numer(), r.denom()),
            Number::Real(x) => write!(f, "{}", x),
            Number::Complex(c) if c.im < 0.0 => write!(f, "{} - {}i", c.re, -c.im),
            Number::Complex(c) => write!(f, "{} + {}i", c.re, c.im),
        }
    }
}

macro_rules! number_binary_op {
    ($trait:ident, $method:ident) => {
        impl $trait<&Number> for &Number {
            type Output = Number;
            fn $method(self, rhs: &Number) -> Number {
                Number::$method(self, rhs)
            }
        }
        impl $trait for Number {
            type Output = Number;
            fn $method(self, rhs: Number) -> Number {
                Number::$method(&self, &rhs)
            }
        }
    };
}

number_binary_op!(Add, add);
number_binary_op!(Sub, sub);
number_binary_op!(Mul, mul);
number_binary_op!(Div, div);

impl Neg for &Number {
    type Output = Number;
    fn neg(self) -> Number {
        Number::neg(self)
    }
}

impl Neg for Number {
    type Output = Number;
    fn neg(self) -> Number {
        Number::neg(&self)
    }
}
