use crate::{DType, Scalar};

/// Polymorphic typed storage backend for array data.
///
/// Each variant holds a homogeneous typed buffer matching a NumPy dtype, so
/// integer loops keep full 64-bit fidelity and `f32` stays `f32`. Complex
/// values are `(re, im)` pairs; datetime and timedelta hold raw `i64` ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayStorage {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Complex64(Vec<(f32, f32)>),
    Complex128(Vec<(f64, f64)>),
    String(Vec<String>),
    DateTime64(Vec<i64>),
    TimeDelta64(Vec<i64>),
}

/// Error type for storage operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    IndexOutOfBounds { index: usize, len: usize },
    UnsupportedCast { from: DType, to: DType },
    NoFillFunction { dtype: DType, len: usize },
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for storage of length {len}")
            }
            Self::UnsupportedCast { from, to } => {
                write!(f, "cannot cast from {} to {}", from.name(), to.name())
            }
            Self::NoFillFunction { dtype, len } => {
                write!(
                    f,
                    "no fill-function for data-type {} (requested {len} elements)",
                    dtype.name()
                )
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl StorageError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::IndexOutOfBounds { .. } => "storage_index_out_of_bounds",
            Self::UnsupportedCast { .. } => "storage_unsupported_cast",
            Self::NoFillFunction { .. } => "storage_no_fill_function",
        }
    }
}

/// Rebuilds a storage of the same variant from `$body`, with `$v` bound to
/// the typed buffer.
macro_rules! rebuild_same_variant {
    ($storage:expr, |$v:ident| $body:expr) => {
        match $storage {
            ArrayStorage::Bool($v) => ArrayStorage::Bool($body),
            ArrayStorage::I8($v) => ArrayStorage::I8($body),
            ArrayStorage::I16($v) => ArrayStorage::I16($body),
            ArrayStorage::I32($v) => ArrayStorage::I32($body),
            ArrayStorage::I64($v) => ArrayStorage::I64($body),
            ArrayStorage::U8($v) => ArrayStorage::U8($body),
            ArrayStorage::U16($v) => ArrayStorage::U16($body),
            ArrayStorage::U32($v) => ArrayStorage::U32($body),
            ArrayStorage::U64($v) => ArrayStorage::U64($body),
            ArrayStorage::F32($v) => ArrayStorage::F32($body),
            ArrayStorage::F64($v) => ArrayStorage::F64($body),
            ArrayStorage::Complex64($v) => ArrayStorage::Complex64($body),
            ArrayStorage::Complex128($v) => ArrayStorage::Complex128($body),
            ArrayStorage::String($v) => ArrayStorage::String($body),
            ArrayStorage::DateTime64($v) => ArrayStorage::DateTime64($body),
            ArrayStorage::TimeDelta64($v) => ArrayStorage::TimeDelta64($body),
        }
    };
}

fn flip_chunks<T: Clone>(values: &[T], chunk: usize) -> Vec<T> {
    if chunk == 0 {
        return values.to_vec();
    }
    values.chunks(chunk).rev().flatten().cloned().collect()
}

impl ArrayStorage {
    /// Number of elements in the storage.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(v) => v.len(),
            Self::I8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I32(v) => v.len(),
            Self::I64(v) | Self::DateTime64(v) | Self::TimeDelta64(v) => v.len(),
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::Complex64(v) => v.len(),
            Self::Complex128(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The dtype this storage represents.
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::Bool(_) => DType::Bool,
            Self::I8(_) => DType::I8,
            Self::I16(_) => DType::I16,
            Self::I32(_) => DType::I32,
            Self::I64(_) => DType::I64,
            Self::U8(_) => DType::U8,
            Self::U16(_) => DType::U16,
            Self::U32(_) => DType::U32,
            Self::U64(_) => DType::U64,
            Self::F32(_) => DType::F32,
            Self::F64(_) => DType::F64,
            Self::Complex64(_) => DType::Complex64,
            Self::Complex128(_) => DType::Complex128,
            Self::String(_) => DType::Str,
            Self::DateTime64(_) => DType::DateTime64,
            Self::TimeDelta64(_) => DType::TimeDelta64,
        }
    }

    /// Build a storage of `dtype` from weak scalars, casting each one the way
    /// `astype(..., casting="unsafe")` would.
    pub fn from_scalars<I>(dtype: DType, values: I) -> Self
    where
        I: IntoIterator<Item = Scalar>,
    {
        let values = values.into_iter();
        match dtype {
            DType::Bool => Self::Bool(values.map(Scalar::is_truthy).collect()),
            DType::I8 => Self::I8(values.map(|s| s.to_i128() as i8).collect()),
            DType::I16 => Self::I16(values.map(|s| s.to_i128() as i16).collect()),
            DType::I32 => Self::I32(values.map(|s| s.to_i128() as i32).collect()),
            DType::I64 => Self::I64(values.map(|s| s.to_i128() as i64).collect()),
            DType::U8 => Self::U8(values.map(|s| s.to_i128() as u8).collect()),
            DType::U16 => Self::U16(values.map(|s| s.to_i128() as u16).collect()),
            DType::U32 => Self::U32(values.map(|s| s.to_i128() as u32).collect()),
            DType::U64 => Self::U64(values.map(|s| s.to_i128() as u64).collect()),
            DType::F32 => Self::F32(values.map(|s| s.to_f64() as f32).collect()),
            DType::F64 => Self::F64(values.map(Scalar::to_f64).collect()),
            DType::Complex64 => Self::Complex64(
                values
                    .map(|s| {
                        let (re, im) = s.to_complex();
                        (re as f32, im as f32)
                    })
                    .collect(),
            ),
            DType::Complex128 => Self::Complex128(values.map(Scalar::to_complex).collect()),
            DType::Str => Self::String(values.map(|s| s.to_string()).collect()),
            DType::DateTime64 => Self::DateTime64(values.map(|s| s.to_i128() as i64).collect()),
            DType::TimeDelta64 => {
                Self::TimeDelta64(values.map(|s| s.to_i128() as i64).collect())
            }
        }
    }

    /// `n` copies of `value` cast to `dtype`.
    #[must_use]
    pub fn full(dtype: DType, n: usize, value: Scalar) -> Self {
        Self::from_scalars(dtype, std::iter::repeat_n(value, n))
    }

    /// Create a new storage of the given dtype with `n` zero-valued elements.
    #[must_use]
    pub fn zeros(dtype: DType, n: usize) -> Self {
        Self::full(dtype, n, Scalar::Int(0))
    }

    #[must_use]
    pub fn ones(dtype: DType, n: usize) -> Self {
        Self::full(dtype, n, Scalar::Int(1))
    }

    /// Integers `start..stop` cast to `dtype` (np.arange with an integer step of 1).
    ///
    /// Booleans only have fill values for two elements, and strings none at all.
    pub fn arange(start: i64, stop: i64, dtype: DType) -> Result<Self, StorageError> {
        let len = usize::try_from(stop.saturating_sub(start)).unwrap_or(0);
        if dtype == DType::Str || (dtype == DType::Bool && len > 2) {
            return Err(StorageError::NoFillFunction { dtype, len });
        }
        Ok(Self::from_scalars(
            dtype,
            (start..stop).map(|v| Scalar::Int(i128::from(v))),
        ))
    }

    /// Read element at `index` as a weak scalar. String storage has no
    /// scalar view.
    pub fn get(&self, index: usize) -> Result<Scalar, StorageError> {
        let n = self.len();
        if index >= n {
            return Err(StorageError::IndexOutOfBounds { index, len: n });
        }
        Ok(match self {
            Self::Bool(v) => Scalar::Bool(v[index]),
            Self::I8(v) => Scalar::Int(i128::from(v[index])),
            Self::I16(v) => Scalar::Int(i128::from(v[index])),
            Self::I32(v) => Scalar::Int(i128::from(v[index])),
            Self::I64(v) | Self::DateTime64(v) | Self::TimeDelta64(v) => {
                Scalar::Int(i128::from(v[index]))
            }
            Self::U8(v) => Scalar::Int(i128::from(v[index])),
            Self::U16(v) => Scalar::Int(i128::from(v[index])),
            Self::U32(v) => Scalar::Int(i128::from(v[index])),
            Self::U64(v) => Scalar::Int(i128::from(v[index])),
            Self::F32(v) => Scalar::Float(f64::from(v[index])),
            Self::F64(v) => Scalar::Float(v[index]),
            Self::Complex64(v) => {
                Scalar::Complex(f64::from(v[index].0), f64::from(v[index].1))
            }
            Self::Complex128(v) => Scalar::Complex(v[index].0, v[index].1),
            Self::String(_) => {
                return Err(StorageError::UnsupportedCast {
                    from: DType::Str,
                    to: DType::F64,
                });
            }
        })
    }

    /// All elements as weak scalars.
    pub fn to_scalars(&self) -> Result<Vec<Scalar>, StorageError> {
        (0..self.len()).map(|idx| self.get(idx)).collect()
    }

    #[must_use]
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Truthiness of every element (non-zero is true).
    pub fn truthy(&self) -> Result<Vec<bool>, StorageError> {
        match self {
            Self::Bool(v) => Ok(v.clone()),
            Self::String(_) => Err(StorageError::UnsupportedCast {
                from: DType::Str,
                to: DType::Bool,
            }),
            _ => Ok(self
                .to_scalars()?
                .into_iter()
                .map(Scalar::is_truthy)
                .collect()),
        }
    }

    /// Cast this storage to a different dtype.
    ///
    /// Numeric casts wrap like C casts, complex to real keeps the real part,
    /// and anything can be formatted as a string. Strings never parse back.
    pub fn cast_to(&self, target: DType) -> Result<Self, StorageError> {
        if self.dtype() == target {
            return Ok(self.clone());
        }
        if let Self::String(_) = self {
            return Err(StorageError::UnsupportedCast {
                from: DType::Str,
                to: target,
            });
        }
        Ok(Self::from_scalars(target, self.to_scalars()?))
    }

    /// Reverse the order of consecutive `chunk`-sized runs. With
    /// `chunk == 1` this reverses the buffer.
    #[must_use]
    pub fn reversed_chunks(&self, chunk: usize) -> Self {
        rebuild_same_variant!(self, |v| flip_chunks(v, chunk))
    }
}

macro_rules! impl_from_vec {
    ($($elem:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$elem>> for ArrayStorage {
                fn from(values: Vec<$elem>) -> Self {
                    Self::$variant(values)
                }
            }
        )*
    };
}

impl_from_vec!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    (f32, f32) => Complex64,
    (f64, f64) => Complex128,
    String => String,
);

#[cfg(test)]
mod tests {
    use super::{ArrayStorage, StorageError};
    use crate::{DType, Scalar};

    #[test]
    fn arange_wraps_into_narrow_unsigned() {
        let storage = ArrayStorage::arange(-2, 3, DType::U8).expect("arange");
        assert_eq!(storage, ArrayStorage::U8(vec![254, 255, 0, 1, 2]));
    }

    #[test]
    fn arange_fills_every_kind() {
        assert_eq!(
            ArrayStorage::arange(0, 3, DType::Complex64).expect("arange"),
            ArrayStorage::Complex64(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)])
        );
        assert_eq!(
            ArrayStorage::arange(1, 3, DType::TimeDelta64).expect("arange"),
            ArrayStorage::TimeDelta64(vec![1, 2])
        );
        assert_eq!(
            ArrayStorage::arange(0, 2, DType::Bool).expect("arange"),
            ArrayStorage::Bool(vec![false, true])
        );
        assert!(
            ArrayStorage::arange(3, 0, DType::F64)
                .expect("empty arange")
                .is_empty()
        );
    }

    #[test]
    fn arange_rejects_types_without_fill_function() {
        let err = ArrayStorage::arange(0, 5, DType::Bool).expect_err("bool arange of 5");
        assert_eq!(
            err,
            StorageError::NoFillFunction {
                dtype: DType::Bool,
                len: 5
            }
        );
        assert!(ArrayStorage::arange(0, 1, DType::Str).is_err());
    }

    #[test]
    fn ones_and_zeros_are_typed() {
        assert_eq!(
            ArrayStorage::ones(DType::I16, 2),
            ArrayStorage::I16(vec![1, 1])
        );
        assert_eq!(
            ArrayStorage::zeros(DType::Complex128, 1),
            ArrayStorage::Complex128(vec![(0.0, 0.0)])
        );
        assert_eq!(
            ArrayStorage::ones(DType::DateTime64, 2).dtype(),
            DType::DateTime64
        );
    }

    #[test]
    fn cast_keeps_u64_fidelity() {
        let storage = ArrayStorage::U64(vec![u64::MAX]);
        let cast = storage.cast_to(DType::I64).expect("cast");
        assert_eq!(cast, ArrayStorage::I64(vec![-1]));
        let back = cast.cast_to(DType::U64).expect("cast back");
        assert_eq!(back, storage);
    }

    #[test]
    fn cast_complex_to_real_drops_imaginary() {
        let storage = ArrayStorage::Complex128(vec![(-1.0, 3.0), (2.5, -1.0)]);
        assert_eq!(
            storage.cast_to(DType::I64).expect("cast"),
            ArrayStorage::I64(vec![-1, 2])
        );
    }

    #[test]
    fn cast_bool_to_string_spells_python_names() {
        let storage = ArrayStorage::Bool(vec![false, true]);
        let cast = storage.cast_to(DType::Str).expect("cast");
        assert_eq!(
            cast.as_strings().expect("strings"),
            &["False".to_string(), "True".to_string()]
        );
    }

    #[test]
    fn cast_string_to_numeric_fails() {
        let storage = ArrayStorage::from(vec!["1".to_string()]);
        let err = storage.cast_to(DType::I32).expect_err("no parse");
        assert!(matches!(err, StorageError::UnsupportedCast { .. }));
    }

    #[test]
    fn get_reports_out_of_bounds() {
        let storage = ArrayStorage::from(vec![1.5f32]);
        assert_eq!(storage.get(0).expect("in bounds"), Scalar::Float(1.5));
        assert_eq!(
            storage.get(3).expect_err("oob"),
            StorageError::IndexOutOfBounds { index: 3, len: 1 }
        );
    }

    #[test]
    fn truthy_treats_nan_as_true() {
        let storage = ArrayStorage::from(vec![0.0f64, f64::NAN, -0.0, 2.0]);
        assert_eq!(
            storage.truthy().expect("truthy"),
            vec![false, true, false, true]
        );
    }

    #[test]
    fn reversed_chunks_flip_rows() {
        let storage = ArrayStorage::from(vec![1i32, 2, 3, 4, 5, 6]);
        assert_eq!(
            storage.reversed_chunks(1),
            ArrayStorage::I32(vec![6, 5, 4, 3, 2, 1])
        );
        assert_eq!(
            storage.reversed_chunks(3),
            ArrayStorage::I32(vec![4, 5, 6, 1, 2, 3])
        );
    }
}
