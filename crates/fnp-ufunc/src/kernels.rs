//! Per-element kernels shared by the typed loops.
//!
//! Integer kernels wrap on overflow the way C integer loops do and report a
//! zero divisor as `None` so the caller can apply the divide policy. Float
//! and complex kernels follow IEEE 754 and never fail.

use std::cmp::Ordering;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

pub(crate) trait IntElement: Copy + Ord + Default {
    fn is_zero(self) -> bool {
        self == Self::default()
    }
    fn add_wrapping(self, rhs: Self) -> Self;
    fn sub_wrapping(self, rhs: Self) -> Self;
    fn mul_wrapping(self, rhs: Self) -> Self;
    fn neg_wrapping(self) -> Self;
    fn abs_wrapping(self) -> Self;
    fn bit_not(self) -> Self;
    fn sign(self) -> Self;
    /// Quotient rounded toward negative infinity.
    fn floor_div(self, rhs: Self) -> Option<Self>;
    /// C remainder: the result takes the sign of the dividend.
    fn fmod(self, rhs: Self) -> Option<Self>;
    /// `1 / self` truncated toward zero.
    fn reciprocal(self) -> Option<Self>;
}

macro_rules! impl_signed_element {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntElement for $t {
                fn add_wrapping(self, rhs: Self) -> Self {
                    self.wrapping_add(rhs)
                }
                fn sub_wrapping(self, rhs: Self) -> Self {
                    self.wrapping_sub(rhs)
                }
                fn mul_wrapping(self, rhs: Self) -> Self {
                    self.wrapping_mul(rhs)
                }
                fn neg_wrapping(self) -> Self {
                    self.wrapping_neg()
                }
                fn abs_wrapping(self) -> Self {
                    self.wrapping_abs()
                }
                fn bit_not(self) -> Self {
                    !self
                }
                fn sign(self) -> Self {
                    self.signum()
                }
                fn floor_div(self, rhs: Self) -> Option<Self> {
                    if rhs == 0 {
                        return None;
                    }
                    if self == <$t>::MIN && rhs == -1 {
                        return Some(<$t>::MIN);
                    }
                    let quot = self / rhs;
                    if self % rhs != 0 && ((self < 0) != (rhs < 0)) {
                        Some(quot - 1)
                    } else {
                        Some(quot)
                    }
                }
                fn fmod(self, rhs: Self) -> Option<Self> {
                    (rhs != 0).then(|| self.wrapping_rem(rhs))
                }
                fn reciprocal(self) -> Option<Self> {
                    (self != 0).then(|| 1 / self)
                }
            }
        )*
    };
}

macro_rules! impl_unsigned_element {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntElement for $t {
                fn add_wrapping(self, rhs: Self) -> Self {
                    self.wrapping_add(rhs)
                }
                fn sub_wrapping(self, rhs: Self) -> Self {
                    self.wrapping_sub(rhs)
                }
                fn mul_wrapping(self, rhs: Self) -> Self {
                    self.wrapping_mul(rhs)
                }
                fn neg_wrapping(self) -> Self {
                    self.wrapping_neg()
                }
                fn abs_wrapping(self) -> Self {
                    self
                }
                fn bit_not(self) -> Self {
                    !self
                }
                fn sign(self) -> Self {
                    Self::from(self != 0)
                }
                fn floor_div(self, rhs: Self) -> Option<Self> {
                    self.checked_div(rhs)
                }
                fn fmod(self, rhs: Self) -> Option<Self> {
                    self.checked_rem(rhs)
                }
                fn reciprocal(self) -> Option<Self> {
                    (self != 0).then(|| 1 / self)
                }
            }
        )*
    };
}

impl_signed_element!(i8, i16, i32, i64);
impl_unsigned_element!(u8, u16, u32, u64);

pub(crate) trait FloatElement:
    Copy
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Rem<Output = Self>
    + Neg<Output = Self>
{
    const ZERO: Self;
    const ONE: Self;
    const HALF: Self;
    const NAN: Self;

    fn is_nan(self) -> bool;
    fn floor(self) -> Self;
    fn abs(self) -> Self;
    fn copysign(self, sign: Self) -> Self;
    fn hypot(self, other: Self) -> Self;
}

macro_rules! impl_float_element {
    ($($t:ty),* $(,)?) => {
        $(
            impl FloatElement for $t {
                const ZERO: Self = 0.0;
                const ONE: Self = 1.0;
                const HALF: Self = 0.5;
                const NAN: Self = <$t>::NAN;

                fn is_nan(self) -> bool {
                    <$t>::is_nan(self)
                }
                fn floor(self) -> Self {
                    <$t>::floor(self)
                }
                fn abs(self) -> Self {
                    <$t>::abs(self)
                }
                fn copysign(self, sign: Self) -> Self {
                    <$t>::copysign(self, sign)
                }
                fn hypot(self, other: Self) -> Self {
                    <$t>::hypot(self, other)
                }
            }
        )*
    };
}

impl_float_element!(f32, f64);

pub(crate) fn float_sign<F: FloatElement>(x: F) -> F {
    if x.is_nan() {
        x
    } else if x > F::ZERO {
        F::ONE
    } else if x < F::ZERO {
        -F::ONE
    } else {
        F::ZERO
    }
}

pub(crate) fn float_floor_divide<F: FloatElement>(a: F, b: F) -> F {
    if b == F::ZERO {
        return a / b;
    }
    let rem = a % b;
    let mut div = (a - rem) / b;
    if rem != F::ZERO && ((b < F::ZERO) != (rem < F::ZERO)) {
        div = div - F::ONE;
    }
    if div == F::ZERO {
        return F::ZERO.copysign(a / b);
    }
    let floor = div.floor();
    if div - floor > F::HALF {
        floor + F::ONE
    } else {
        floor
    }
}

// NaN-propagating: a NaN on either side wins.
pub(crate) fn float_minimum<F: FloatElement>(a: F, b: F) -> F {
    if a <= b || a.is_nan() { a } else { b }
}

pub(crate) fn float_maximum<F: FloatElement>(a: F, b: F) -> F {
    if a >= b || a.is_nan() { a } else { b }
}

// NaN-ignoring: the other operand wins.
pub(crate) fn float_fmin<F: FloatElement>(a: F, b: F) -> F {
    if a <= b || b.is_nan() { a } else { b }
}

pub(crate) fn float_fmax<F: FloatElement>(a: F, b: F) -> F {
    if a >= b || b.is_nan() { a } else { b }
}

pub(crate) type Complex<F> = (F, F);

pub(crate) fn complex_is_nan<F: FloatElement>(z: Complex<F>) -> bool {
    z.0.is_nan() || z.1.is_nan()
}

pub(crate) fn complex_is_truthy<F: FloatElement>(z: Complex<F>) -> bool {
    z.0 != F::ZERO || z.1 != F::ZERO
}

pub(crate) fn complex_add<F: FloatElement>(a: Complex<F>, b: Complex<F>) -> Complex<F> {
    (a.0 + b.0, a.1 + b.1)
}

pub(crate) fn complex_sub<F: FloatElement>(a: Complex<F>, b: Complex<F>) -> Complex<F> {
    (a.0 - b.0, a.1 - b.1)
}

pub(crate) fn complex_mul<F: FloatElement>(a: Complex<F>, b: Complex<F>) -> Complex<F> {
    (a.0 * b.0 - a.1 * b.1, a.0 * b.1 + a.1 * b.0)
}

/// Smith's algorithm.
pub(crate) fn complex_div<F: FloatElement>(a: Complex<F>, b: Complex<F>) -> Complex<F> {
    let (ar, ai) = a;
    let (br, bi) = b;
    if br.abs() >= bi.abs() {
        if br == F::ZERO && bi == F::ZERO {
            return (ar / br.abs(), ai / br.abs());
        }
        let rat = bi / br;
        let scl = F::ONE / (br + bi * rat);
        ((ar + ai * rat) * scl, (ai - ar * rat) * scl)
    } else {
        let rat = br / bi;
        let scl = F::ONE / (bi + br * rat);
        ((ar * rat + ai) * scl, (ai * rat - ar) * scl)
    }
}

/// Exact for purely real inputs, so `1 / (1 / x)` round-trips the way the
/// real loop does. Zero maps to `inf + nan*j`.
pub(crate) fn complex_reciprocal<F: FloatElement>(z: Complex<F>) -> Complex<F> {
    let (re, im) = z;
    if re == F::ZERO && im == F::ZERO {
        return (F::ONE / re, F::NAN);
    }
    if im.abs() <= re.abs() {
        let r = im / re;
        let d = re + im * r;
        (F::ONE / d, -r / d)
    } else {
        let r = re / im;
        let d = re * r + im;
        (r / d, -F::ONE / d)
    }
}

pub(crate) fn complex_floor_divide<F: FloatElement>(a: Complex<F>, b: Complex<F>) -> Complex<F> {
    (complex_div(a, b).0.floor(), F::ZERO)
}

/// Sign of the real part, or of the imaginary part when the real part is zero.
pub(crate) fn complex_sign<F: FloatElement>(z: Complex<F>) -> Complex<F> {
    if complex_is_nan(z) {
        return (F::NAN, F::ZERO);
    }
    let sign = if z.0 != F::ZERO {
        float_sign(z.0)
    } else {
        float_sign(z.1)
    };
    (sign, F::ZERO)
}

pub(crate) fn complex_abs<F: FloatElement>(z: Complex<F>) -> F {
    z.0.hypot(z.1)
}

/// Lexicographic order: real part first, then imaginary part.
pub(crate) fn complex_partial_cmp<F: FloatElement>(
    a: &Complex<F>,
    b: &Complex<F>,
) -> Option<Ordering> {
    match a.0.partial_cmp(&b.0)? {
        Ordering::Equal => a.1.partial_cmp(&b.1),
        other => Some(other),
    }
}

fn complex_le<F: FloatElement>(a: Complex<F>, b: Complex<F>) -> bool {
    matches!(
        complex_partial_cmp(&a, &b),
        Some(Ordering::Less | Ordering::Equal)
    )
}

pub(crate) fn complex_minimum<F: FloatElement>(a: Complex<F>, b: Complex<F>) -> Complex<F> {
    if complex_le(a, b) || complex_is_nan(a) { a } else { b }
}

pub(crate) fn complex_maximum<F: FloatElement>(a: Complex<F>, b: Complex<F>) -> Complex<F> {
    if complex_le(b, a) || complex_is_nan(a) { a } else { b }
}

pub(crate) fn complex_fmin<F: FloatElement>(a: Complex<F>, b: Complex<F>) -> Complex<F> {
    if complex_le(a, b) || complex_is_nan(b) { a } else { b }
}

pub(crate) fn complex_fmax<F: FloatElement>(a: Complex<F>, b: Complex<F>) -> Complex<F> {
    if complex_le(b, a) || complex_is_nan(b) { a } else { b }
}

const F64_TWO_POW_54: u64 = 0x4350_0000_0000_0000;
const F64_TWO_POW_1023: u64 = 0x7fe0_0000_0000_0000;
// 2^-1022 * 2^53
const F64_TWO_POW_NEG_969: u64 = 0x0360_0000_0000_0000;
const F32_TWO_POW_25: u32 = 0x4c00_0000;
const F32_TWO_POW_127: u32 = 0x7f00_0000;
// 2^-126 * 2^24
const F32_TWO_POW_NEG_102: u32 = 0x0c80_0000;

/// Split `x` into a mantissa in `[0.5, 1)` and a power of two. Zeros, NaN and
/// infinities come back unchanged with exponent 0.
pub(crate) fn frexp_f64(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let raw_exp = ((bits >> 52) & 0x7ff) as i32;
    if raw_exp == 0 {
        let (mantissa, exp) = frexp_f64(x * f64::from_bits(F64_TWO_POW_54));
        return (mantissa, exp - 54);
    }
    let mantissa = (bits & !(0x7ff_u64 << 52)) | (1022_u64 << 52);
    (f64::from_bits(mantissa), raw_exp - 1022)
}

pub(crate) fn frexp_f32(x: f32) -> (f32, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let raw_exp = ((bits >> 23) & 0xff) as i32;
    if raw_exp == 0 {
        let (mantissa, exp) = frexp_f32(x * f32::from_bits(F32_TWO_POW_25));
        return (mantissa, exp - 25);
    }
    let mantissa = (bits & !(0xff_u32 << 23)) | (126_u32 << 23);
    (f32::from_bits(mantissa), raw_exp - 126)
}

/// `x * 2^exp` without intermediate overflow or double rounding.
pub(crate) fn ldexp_f64(x: f64, exp: i32) -> f64 {
    let mut y = x;
    let mut n = exp;
    if n > 1023 {
        y *= f64::from_bits(F64_TWO_POW_1023);
        n -= 1023;
        if n > 1023 {
            y *= f64::from_bits(F64_TWO_POW_1023);
            n -= 1023;
            n = n.min(1023);
        }
    } else if n < -1022 {
        y *= f64::from_bits(F64_TWO_POW_NEG_969);
        n += 1022 - 53;
        if n < -1022 {
            y *= f64::from_bits(F64_TWO_POW_NEG_969);
            n += 1022 - 53;
            n = n.max(-1022);
        }
    }
    y * f64::from_bits(((0x3ff + n) as u64) << 52)
}

pub(crate) fn ldexp_f32(x: f32, exp: i32) -> f32 {
    let mut y = x;
    let mut n = exp;
    if n > 127 {
        y *= f32::from_bits(F32_TWO_POW_127);
        n -= 127;
        if n > 127 {
            y *= f32::from_bits(F32_TWO_POW_127);
            n -= 127;
            n = n.min(127);
        }
    } else if n < -126 {
        y *= f32::from_bits(F32_TWO_POW_NEG_102);
        n += 126 - 24;
        if n < -126 {
            y *= f32::from_bits(F32_TWO_POW_NEG_102);
            n += 126 - 24;
            n = n.max(-126);
        }
    }
    y * f32::from_bits(((0x7f + n) as u32) << 23)
}
