use std::fmt;

use crate::DType;

/// A weakly typed literal, the way a Python scalar behaves next to an array:
/// it adopts the array's dtype unless its kind is wider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i128),
    Float(f64),
    Complex(f64, f64),
}

impl Scalar {
    /// Integer view. Floats truncate toward zero (NaN maps to 0), complex
    /// values keep the real part.
    #[must_use]
    pub fn to_i128(self) -> i128 {
        match self {
            Self::Bool(b) => i128::from(b),
            Self::Int(v) => v,
            Self::Float(v) | Self::Complex(v, _) => v as i128,
        }
    }

    #[must_use]
    pub fn to_f64(self) -> f64 {
        match self {
            Self::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Int(v) => v as f64,
            Self::Float(v) | Self::Complex(v, _) => v,
        }
    }

    #[must_use]
    pub fn to_complex(self) -> (f64, f64) {
        match self {
            Self::Complex(re, im) => (re, im),
            other => (other.to_f64(), 0.0),
        }
    }

    /// Non-zero values are truthy; NaN counts as non-zero.
    #[must_use]
    pub fn is_truthy(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Int(v) => v != 0,
            Self::Float(v) => v != 0.0,
            Self::Complex(re, im) => re != 0.0 || im != 0.0,
        }
    }

    /// Dtype this scalar takes when combined with an array of `dtype`.
    #[must_use]
    pub fn resolve_against(self, dtype: DType) -> DType {
        match self {
            Self::Bool(_) => dtype,
            Self::Int(_) => match dtype {
                DType::Bool => DType::I64,
                other => other,
            },
            Self::Float(_) => {
                if dtype.is_float() || dtype.is_complex() {
                    dtype
                } else {
                    DType::F64
                }
            }
            Self::Complex(..) => match dtype {
                DType::Complex64 | DType::F32 => DType::Complex64,
                _ => DType::Complex128,
            },
        }
    }

    /// Exact value equality across kinds: `Int(1) == Float(1.0) == Complex(1.0, 0.0)`,
    /// and NaN equals NaN.
    #[must_use]
    pub fn exact_eq(self, other: Self) -> bool {
        match (self.normalize_bool(), other.normalize_bool()) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (a, b) => {
                let (ar, ai) = a.to_complex();
                let (br, bi) = b.to_complex();
                nan_eq(ar, br) && nan_eq(ai, bi)
            }
        }
    }

    fn normalize_bool(self) -> Self {
        match self {
            Self::Bool(b) => Self::Int(i128::from(b)),
            other => other,
        }
    }
}

fn nan_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Complex(re, im) => {
                if im.is_sign_negative() {
                    write!(f, "({re:?}{im:?}j)")
                } else {
                    write!(f, "({re:?}+{im:?}j)")
                }
            }
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(i128::from(value))
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(i128::from(value))
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::Int(i128::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

#[cfg(test)]
mod tests {
    use super::Scalar;
    use crate::DType;

    #[test]
    fn weak_int_adopts_array_dtype() {
        assert_eq!(Scalar::Int(2).resolve_against(DType::U8), DType::U8);
        assert_eq!(Scalar::Int(2).resolve_against(DType::F32), DType::F32);
        assert_eq!(Scalar::Int(2).resolve_against(DType::Bool), DType::I64);
        assert_eq!(
            Scalar::Int(2).resolve_against(DType::DateTime64),
            DType::DateTime64
        );
    }

    #[test]
    fn weak_float_and_complex_widen_integers() {
        assert_eq!(Scalar::Float(0.5).resolve_against(DType::I8), DType::F64);
        assert_eq!(Scalar::Float(0.5).resolve_against(DType::F32), DType::F32);
        assert_eq!(
            Scalar::Complex(0.0, 1.0).resolve_against(DType::F32),
            DType::Complex64
        );
        assert_eq!(
            Scalar::Complex(0.0, 1.0).resolve_against(DType::I16),
            DType::Complex128
        );
        assert_eq!(Scalar::Bool(true).resolve_against(DType::U16), DType::U16);
    }

    #[test]
    fn exact_eq_crosses_kinds() {
        assert!(Scalar::Int(1).exact_eq(Scalar::Float(1.0)));
        assert!(Scalar::Bool(true).exact_eq(Scalar::Int(1)));
        assert!(Scalar::Complex(2.0, 0.0).exact_eq(Scalar::Int(2)));
        assert!(Scalar::Float(f64::NAN).exact_eq(Scalar::Float(f64::NAN)));
        assert!(!Scalar::Complex(2.0, 1.0).exact_eq(Scalar::Int(2)));
        assert!(!Scalar::Int(u64::MAX as i128).exact_eq(Scalar::Int(-1)));
    }

    #[test]
    fn truthiness_is_non_zero() {
        assert!(!Scalar::Int(0).is_truthy());
        assert!(Scalar::Float(f64::NAN).is_truthy());
        assert!(Scalar::Complex(0.0, -1.0).is_truthy());
        assert!(!Scalar::Bool(false).is_truthy());
    }

    #[test]
    fn display_matches_python_spelling() {
        assert_eq!(Scalar::Bool(true).to_string(), "True");
        assert_eq!(Scalar::Int(-3).to_string(), "-3");
        assert_eq!(Scalar::Float(1.0).to_string(), "1.0");
        assert_eq!(Scalar::Complex(1.0, -2.0).to_string(), "(1.0-2.0j)");
        assert_eq!(Scalar::Complex(1.0, 2.0).to_string(), "(1.0+2.0j)");
    }
}
