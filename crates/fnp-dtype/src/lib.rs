#![forbid(unsafe_code)]

pub mod catalog;
mod scalar;
mod storage;

pub use catalog::{TypeDescriptor, type_set, without_bool};
pub use scalar::Scalar;
pub use storage::{ArrayStorage, StorageError};

/// Element type of an array buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Complex64,
    Complex128,
    Str,
    DateTime64,
    TimeDelta64,
}

// Accepted spellings, canonical name first for each dtype.
const NAME_ALIASES: [(&str, DType); 36] = [
    ("bool", DType::Bool),
    ("bool_", DType::Bool),
    ("i8", DType::I8),
    ("int8", DType::I8),
    ("i16", DType::I16),
    ("int16", DType::I16),
    ("i32", DType::I32),
    ("int32", DType::I32),
    ("i64", DType::I64),
    ("int64", DType::I64),
    ("int", DType::I64),
    ("u8", DType::U8),
    ("uint8", DType::U8),
    ("u16", DType::U16),
    ("uint16", DType::U16),
    ("u32", DType::U32),
    ("uint32", DType::U32),
    ("u64", DType::U64),
    ("uint64", DType::U64),
    ("f32", DType::F32),
    ("float32", DType::F32),
    ("f64", DType::F64),
    ("float64", DType::F64),
    ("float", DType::F64),
    ("complex64", DType::Complex64),
    ("c8", DType::Complex64),
    ("complex128", DType::Complex128),
    ("c16", DType::Complex128),
    ("complex", DType::Complex128),
    ("str", DType::Str),
    ("unicode", DType::Str),
    ("U", DType::Str),
    ("datetime64", DType::DateTime64),
    ("M8", DType::DateTime64),
    ("timedelta64", DType::TimeDelta64),
    ("m8", DType::TimeDelta64),
];

impl DType {
    #[must_use]
    pub fn name(self) -> &'static str {
        NAME_ALIASES
            .iter()
            .find(|(_, dtype)| *dtype == self)
            .map_or("unknown", |&(name, _)| name)
    }

    /// Bytes per element; strings are variable length and report 0.
    #[must_use]
    pub const fn item_size(self) -> usize {
        match self {
            Self::Str => 0,
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::Complex128 => 16,
            _ => 8,
        }
    }

    /// Accepts the short and NumPy spellings. A unit suffix such as
    /// `datetime64[ns]` is ignored.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let base = name.split_once('[').map_or(name, |(head, _)| head);
        NAME_ALIASES
            .iter()
            .find(|(alias, _)| *alias == base)
            .map(|&(_, dtype)| dtype)
            .filter(|dtype| base == name || dtype.is_datetime_like())
    }

    /// Signed or unsigned integer; `Bool` is not an integer here.
    #[must_use]
    pub const fn is_integer(self) -> bool {
        self.is_signed_integer() || self.is_unsigned()
    }

    #[must_use]
    pub const fn is_signed_integer(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    #[must_use]
    pub const fn is_unsigned(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    #[must_use]
    pub const fn is_complex(self) -> bool {
        matches!(self, Self::Complex64 | Self::Complex128)
    }

    /// Datetime and timedelta share an `i64` tick representation.
    #[must_use]
    pub const fn is_datetime_like(self) -> bool {
        matches!(self, Self::DateTime64 | Self::TimeDelta64)
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float() || self.is_complex()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bool,
    Unsigned,
    Signed,
    Float,
    Complex,
}

/// Kind and width in bits; complex widths count one component.
const fn kind_of(dtype: DType) -> Option<(Kind, u32)> {
    use DType::*;
    Some(match dtype {
        Bool => (Kind::Bool, 8),
        U8 => (Kind::Unsigned, 8),
        U16 => (Kind::Unsigned, 16),
        U32 => (Kind::Unsigned, 32),
        U64 => (Kind::Unsigned, 64),
        I8 => (Kind::Signed, 8),
        I16 => (Kind::Signed, 16),
        I32 => (Kind::Signed, 32),
        I64 => (Kind::Signed, 64),
        F32 => (Kind::Float, 32),
        F64 => (Kind::Float, 64),
        Complex64 => (Kind::Complex, 32),
        Complex128 => (Kind::Complex, 64),
        Str | DateTime64 | TimeDelta64 => return None,
    })
}

const fn of_kind(kind: Kind, bits: u32) -> DType {
    use DType::*;
    match (kind, bits) {
        (Kind::Bool, _) => Bool,
        (Kind::Unsigned, 8) => U8,
        (Kind::Unsigned, 16) => U16,
        (Kind::Unsigned, 32) => U32,
        (Kind::Unsigned, _) => U64,
        (Kind::Signed, 8) => I8,
        (Kind::Signed, 16) => I16,
        (Kind::Signed, 32) => I32,
        (Kind::Signed, _) => I64,
        (Kind::Float, 32) => F32,
        (Kind::Float, _) => F64,
        (Kind::Complex, 32) => Complex64,
        (Kind::Complex, _) => Complex128,
    }
}

// Float width an integer needs to keep every value exact enough for NumPy.
const fn inexact_bits(kind: Kind, bits: u32) -> u32 {
    match kind {
        Kind::Float | Kind::Complex => bits,
        _ if bits <= 16 => 32,
        _ => 64,
    }
}

fn promote_numeric((lk, lb): (Kind, u32), (rk, rb): (Kind, u32)) -> DType {
    match (lk, rk) {
        (Kind::Bool, _) => of_kind(rk, rb),
        (_, Kind::Bool) => of_kind(lk, lb),
        _ if lk == rk => of_kind(lk, lb.max(rb)),
        (Kind::Signed, Kind::Unsigned) | (Kind::Unsigned, Kind::Signed) => {
            let (signed, unsigned) = if lk == Kind::Signed { (lb, rb) } else { (rb, lb) };
            if unsigned < signed {
                of_kind(Kind::Signed, signed)
            } else if unsigned < 64 {
                of_kind(Kind::Signed, signed.max(unsigned * 2))
            } else {
                // nothing signed holds u64::MAX
                DType::F64
            }
        }
        _ => {
            let bits = inexact_bits(lk, lb).max(inexact_bits(rk, rb));
            let kind = if lk == Kind::Complex || rk == Kind::Complex {
                Kind::Complex
            } else {
                Kind::Float
            };
            of_kind(kind, bits)
        }
    }
}

/// NumPy's promotion of two array dtypes.
///
/// `Bool` yields to anything, integers of mixed sign widen to the next
/// signed type (`u64` with a signed type goes to `f64`), and integers up to
/// 16 bits stay single precision next to `f32`/`complex64`. Timedelta
/// absorbs plain integers and offsets a datetime. Other mixes with strings
/// or datetimes fall back to `F64` and fail at cast time.
#[must_use]
pub fn promote(lhs: DType, rhs: DType) -> DType {
    use DType::*;

    if let (Some(l), Some(r)) = (kind_of(lhs), kind_of(rhs)) {
        return promote_numeric(l, r);
    }
    match (lhs, rhs) {
        (Bool, other) | (other, Bool) => other,
        _ if lhs == rhs => lhs,
        (DateTime64, TimeDelta64) | (TimeDelta64, DateTime64) => DateTime64,
        (TimeDelta64, other) | (other, TimeDelta64) if other.is_integer() => TimeDelta64,
        _ => F64,
    }
}

/// Fold `promote` over every operand dtype (np.result_type for arrays).
#[must_use]
pub fn result_type(dtypes: &[DType]) -> Option<DType> {
    let (&first, rest) = dtypes.split_first()?;
    Some(rest.iter().fold(first, |acc, &dt| promote(acc, dt)))
}

/// NumPy "safe" casting: every `src` value survives the trip to `dst`.
#[must_use]
pub fn can_cast_lossless(src: DType, dst: DType) -> bool {
    if src == dst {
        return true;
    }
    match (kind_of(src), kind_of(dst)) {
        (Some(_), Some(_)) => promote(src, dst) == dst,
        _ => dst == DType::TimeDelta64 && src.is_integer() && src != DType::U64,
    }
}

/// `np.can_cast(from, to, casting)` for the casting names `no`, `equiv`,
/// `safe`, `same_kind` and `unsafe`. Unknown names allow nothing.
#[must_use]
pub fn can_cast(from: DType, to: DType, casting: &str) -> bool {
    match casting {
        "no" | "equiv" => from == to,
        "safe" => can_cast_lossless(from, to),
        "same_kind" => {
            if can_cast_lossless(from, to) || from == DType::Bool {
                true
            } else if from.is_integer() {
                to.is_numeric()
            } else if from.is_float() {
                to.is_float() || to.is_complex()
            } else {
                from.is_complex() && to.is_complex()
            }
        }
        "unsafe" => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{DType, can_cast, can_cast_lossless, promote, result_type};

    const NUMERIC_AND_BOOL: [DType; 13] = [
        DType::Bool,
        DType::I8,
        DType::I16,
        DType::I32,
        DType::I64,
        DType::U8,
        DType::U16,
        DType::U32,
        DType::U64,
        DType::F32,
        DType::F64,
        DType::Complex64,
        DType::Complex128,
    ];

    #[test]
    fn promote_is_symmetric_and_idempotent() {
        for lhs in NUMERIC_AND_BOOL {
            assert_eq!(promote(lhs, lhs), lhs);
            for rhs in NUMERIC_AND_BOOL {
                assert_eq!(promote(lhs, rhs), promote(rhs, lhs), "{lhs:?}/{rhs:?}");
            }
        }
        for dt in [DType::Str, DType::DateTime64, DType::TimeDelta64] {
            assert_eq!(promote(dt, dt), dt);
        }
    }

    #[test]
    fn mixed_sign_integers_widen() {
        let cases = [
            (DType::U8, DType::I8, DType::I16),
            (DType::U8, DType::I16, DType::I16),
            (DType::U16, DType::I8, DType::I32),
            (DType::U16, DType::I16, DType::I32),
            (DType::U32, DType::I32, DType::I64),
            (DType::U32, DType::I64, DType::I64),
            (DType::U64, DType::I8, DType::F64),
            (DType::U64, DType::I64, DType::F64),
        ];
        for (lhs, rhs, want) in cases {
            assert_eq!(promote(lhs, rhs), want, "{lhs:?}/{rhs:?}");
        }
    }

    #[test]
    fn integers_pick_float_precision_by_width() {
        assert_eq!(promote(DType::I16, DType::F32), DType::F32);
        assert_eq!(promote(DType::U16, DType::F32), DType::F32);
        assert_eq!(promote(DType::I32, DType::F32), DType::F64);
        assert_eq!(promote(DType::U64, DType::F64), DType::F64);
        assert_eq!(promote(DType::U8, DType::Complex64), DType::Complex64);
        assert_eq!(promote(DType::I64, DType::Complex64), DType::Complex128);
        assert_eq!(promote(DType::F64, DType::Complex64), DType::Complex128);
        assert_eq!(promote(DType::F32, DType::Complex64), DType::Complex64);
    }

    #[test]
    fn datetime_promotion() {
        assert_eq!(
            promote(DType::DateTime64, DType::TimeDelta64),
            DType::DateTime64
        );
        assert_eq!(promote(DType::I32, DType::TimeDelta64), DType::TimeDelta64);
        assert_eq!(promote(DType::Bool, DType::DateTime64), DType::DateTime64);
        assert_eq!(promote(DType::Str, DType::I8), DType::F64);
    }

    #[test]
    fn result_type_folds_promotion() {
        assert_eq!(result_type(&[]), None);
        assert_eq!(result_type(&[DType::U8]), Some(DType::U8));
        assert_eq!(
            result_type(&[DType::Bool, DType::I8, DType::U8]),
            Some(DType::I16)
        );
        assert_eq!(
            result_type(&[DType::F32, DType::Complex64, DType::I64]),
            Some(DType::Complex128)
        );
    }

    #[test]
    fn safe_casts_never_lose_values() {
        assert!(can_cast_lossless(DType::U8, DType::I16));
        assert!(can_cast_lossless(DType::I16, DType::F32));
        assert!(!can_cast_lossless(DType::I32, DType::F32));
        assert!(!can_cast_lossless(DType::U8, DType::I8));
        assert!(!can_cast_lossless(DType::Complex64, DType::F64));
        assert!(can_cast_lossless(DType::I64, DType::TimeDelta64));
        assert!(!can_cast_lossless(DType::U64, DType::TimeDelta64));
        assert!(!can_cast_lossless(DType::Bool, DType::Str));
        for src in NUMERIC_AND_BOOL {
            assert!(can_cast_lossless(src, src), "{src:?}");
            for dst in NUMERIC_AND_BOOL {
                if can_cast_lossless(src, dst) {
                    assert_eq!(promote(src, dst), dst, "{src:?} -> {dst:?}");
                }
            }
        }
    }

    #[test]
    fn casting_modes() {
        assert!(can_cast(DType::I8, DType::I8, "no"));
        assert!(!can_cast(DType::I8, DType::I16, "equiv"));
        assert!(can_cast(DType::I8, DType::I64, "safe"));
        assert!(!can_cast(DType::I64, DType::I8, "safe"));
        assert!(can_cast(DType::I64, DType::I8, "same_kind"));
        assert!(can_cast(DType::U32, DType::Complex64, "same_kind"));
        assert!(!can_cast(DType::F64, DType::I64, "same_kind"));
        assert!(can_cast(DType::Complex128, DType::Bool, "unsafe"));
        assert!(!can_cast(DType::I8, DType::I16, "bogus"));
    }

    #[test]
    fn names_and_aliases() {
        assert_eq!(DType::parse("int8"), Some(DType::I8));
        assert_eq!(DType::parse("bool_"), Some(DType::Bool));
        assert_eq!(DType::parse("int"), Some(DType::I64));
        assert_eq!(DType::parse("unicode"), Some(DType::Str));
        assert_eq!(DType::parse("datetime64[ns]"), Some(DType::DateTime64));
        assert_eq!(DType::parse("m8[s]"), Some(DType::TimeDelta64));
        assert_eq!(DType::parse("int8[ns]"), None);
        assert_eq!(DType::parse("void"), None);
        assert_eq!(DType::Complex64.name(), "complex64");
        assert_eq!(DType::I64.name(), "i64");
        for dt in NUMERIC_AND_BOOL
            .into_iter()
            .chain([DType::Str, DType::DateTime64, DType::TimeDelta64])
        {
            assert_eq!(DType::parse(dt.name()), Some(dt));
        }
    }

    #[test]
    fn kind_predicates() {
        for dt in NUMERIC_AND_BOOL {
            let kinds = [dt.is_integer(), dt.is_float(), dt.is_complex()];
            assert!(kinds.iter().filter(|&&k| k).count() <= 1, "{dt:?}");
        }
        assert!(DType::U32.is_unsigned());
        assert!(DType::I32.is_signed_integer());
        assert!(!DType::I32.is_unsigned());
        assert!(DType::TimeDelta64.is_datetime_like());
        assert!(!DType::Bool.is_numeric());
        assert!(!DType::DateTime64.is_numeric());
    }

    #[test]
    fn element_widths() {
        let widths = [
            (DType::Bool, 1),
            (DType::U16, 2),
            (DType::F32, 4),
            (DType::I64, 8),
            (DType::Complex64, 8),
            (DType::Complex128, 16),
            (DType::TimeDelta64, 8),
            (DType::Str, 0),
        ];
        for (dt, bytes) in widths {
            assert_eq!(dt.item_size(), bytes, "{dt:?}");
        }
    }
}
