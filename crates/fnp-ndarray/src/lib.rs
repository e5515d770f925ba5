#![forbid(unsafe_code)]

use fnp_dtype::{ArrayStorage, DType, Scalar, StorageError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    Overflow,
    IncompatibleBroadcast { lhs: Vec<usize>, rhs: Vec<usize> },
}

impl std::fmt::Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overflow => write!(f, "size arithmetic overflow"),
            Self::IncompatibleBroadcast { lhs, rhs } => {
                write!(f, "shapes {lhs:?} and {rhs:?} do not broadcast")
            }
        }
    }
}

impl std::error::Error for ShapeError {}

impl ShapeError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Overflow => "shape_overflow",
            Self::IncompatibleBroadcast { .. } => "shape_incompatible_broadcast",
        }
    }
}

#[must_use]
pub fn can_broadcast(lhs: &[usize], rhs: &[usize]) -> bool {
    broadcast_shape(lhs, rhs).is_ok()
}

/// Right-aligned NumPy broadcast of two shapes.
pub fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>, ShapeError> {
    let ndim = lhs.len().max(rhs.len());
    let dim_at = |shape: &[usize], axis: usize| {
        (axis + shape.len())
            .checked_sub(ndim)
            .map_or(1, |idx| shape[idx])
    };

    (0..ndim)
        .map(|axis| match (dim_at(lhs, axis), dim_at(rhs, axis)) {
            (l, r) if l == r || r == 1 => Ok(l),
            (1, r) => Ok(r),
            _ => Err(ShapeError::IncompatibleBroadcast {
                lhs: lhs.to_vec(),
                rhs: rhs.to_vec(),
            }),
        })
        .collect()
}

pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<Vec<usize>, ShapeError> {
    shapes
        .iter()
        .try_fold(Vec::new(), |acc, shape| broadcast_shape(&acc, shape))
}

pub fn element_count(shape: &[usize]) -> Result<usize, ShapeError> {
    shape.iter().try_fold(1usize, |acc, &dim| {
        acc.checked_mul(dim).ok_or(ShapeError::Overflow)
    })
}

/// C-order strides counted in elements rather than bytes.
#[must_use]
pub fn contiguous_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0usize; shape.len()];
    let mut stride = 1usize;
    for (idx, &dim) in shape.iter().enumerate().rev() {
        strides[idx] = stride;
        stride = stride.saturating_mul(dim);
    }
    strides
}

/// Per-axis element steps of `src_shape` viewed through an `out_ndim`-dim
/// broadcast: leading missing axes and length-1 axes step by zero.
#[must_use]
pub fn broadcast_axis_steps(out_ndim: usize, src_shape: &[usize]) -> Vec<usize> {
    let mut axis_steps = vec![0usize; out_ndim];
    let offset = out_ndim.saturating_sub(src_shape.len());
    let src_strides = contiguous_strides(src_shape);

    for (axis, (&dim, &stride)) in src_shape.iter().zip(&src_strides).enumerate() {
        axis_steps[axis + offset] = if dim == 1 { 0 } else { stride };
    }

    axis_steps
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayError {
    Shape(ShapeError),
    Storage(StorageError),
    LengthMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for ArrayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shape(err) => write!(f, "shape error: {err}"),
            Self::Storage(err) => write!(f, "storage error: {err}"),
            Self::LengthMismatch { expected, actual } => {
                write!(f, "storage length {actual} does not fill shape of {expected} elements")
            }
        }
    }
}

impl std::error::Error for ArrayError {}

impl ArrayError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Shape(err) => err.reason_code(),
            Self::Storage(err) => err.reason_code(),
            Self::LengthMismatch { .. } => "array_length_mismatch",
        }
    }
}

impl From<ShapeError> for ArrayError {
    fn from(err: ShapeError) -> Self {
        Self::Shape(err)
    }
}

impl From<StorageError> for ArrayError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

/// A C-contiguous n-dimensional array over typed storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    storage: ArrayStorage,
}

impl NdArray {
    pub fn new(shape: Vec<usize>, storage: ArrayStorage) -> Result<Self, ArrayError> {
        let expected = element_count(&shape)?;
        if storage.len() != expected {
            return Err(ArrayError::LengthMismatch {
                expected,
                actual: storage.len(),
            });
        }
        Ok(Self { shape, storage })
    }

    /// One-dimensional array over `storage`.
    #[must_use]
    pub fn from_storage(storage: ArrayStorage) -> Self {
        Self {
            shape: vec![storage.len()],
            storage,
        }
    }

    /// One-dimensional array of weak scalars cast to `dtype`.
    #[must_use]
    pub fn from_scalars(values: &[Scalar], dtype: DType) -> Self {
        Self::from_storage(ArrayStorage::from_scalars(dtype, values.iter().copied()))
    }

    /// `np.arange(start, stop, dtype=dtype)` with unit step.
    pub fn arange(start: i64, stop: i64, dtype: DType) -> Result<Self, ArrayError> {
        Ok(Self::from_storage(ArrayStorage::arange(start, stop, dtype)?))
    }

    pub fn full(shape: Vec<usize>, dtype: DType, value: Scalar) -> Result<Self, ArrayError> {
        let count = element_count(&shape)?;
        Ok(Self {
            shape,
            storage: ArrayStorage::full(dtype, count, value),
        })
    }

    pub fn zeros(shape: Vec<usize>, dtype: DType) -> Result<Self, ArrayError> {
        Self::full(shape, dtype, Scalar::Int(0))
    }

    pub fn ones(shape: Vec<usize>, dtype: DType) -> Result<Self, ArrayError> {
        Self::full(shape, dtype, Scalar::Int(1))
    }

    #[must_use]
    pub fn full_like(&self, value: Scalar) -> Self {
        Self {
            shape: self.shape.clone(),
            storage: ArrayStorage::full(self.dtype(), self.len(), value),
        }
    }

    #[must_use]
    pub fn zeros_like(&self) -> Self {
        self.full_like(Scalar::Int(0))
    }

    #[must_use]
    pub fn ones_like(&self) -> Self {
        self.full_like(Scalar::Int(1))
    }

    /// Overwrite every element with `value` cast to this array's dtype.
    pub fn fill(&mut self, value: Scalar) {
        self.storage = ArrayStorage::full(self.dtype(), self.len(), value);
    }

    /// `a[::-1]`: flip along the first axis. Zero-dimensional arrays are
    /// returned unchanged.
    #[must_use]
    pub fn reversed(&self) -> Self {
        if self.shape.is_empty() {
            return self.clone();
        }
        let row = self.shape[1..].iter().product::<usize>();
        Self {
            shape: self.shape.clone(),
            storage: self.storage.reversed_chunks(row),
        }
    }

    pub fn astype(&self, dtype: DType) -> Result<Self, ArrayError> {
        Ok(Self {
            shape: self.shape.clone(),
            storage: self.storage.cast_to(dtype)?,
        })
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements (`a.size`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    #[must_use]
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    #[must_use]
    pub fn storage(&self) -> &ArrayStorage {
        &self.storage
    }

    #[must_use]
    pub fn into_storage(self) -> ArrayStorage {
        self.storage
    }

    /// Element at C-order flat position `index`.
    pub fn get(&self, index: usize) -> Result<Scalar, ArrayError> {
        Ok(self.storage.get(index)?)
    }
}

impl<T> From<Vec<T>> for NdArray
where
    ArrayStorage: From<Vec<T>>,
{
    fn from(values: Vec<T>) -> Self {
        Self::from_storage(ArrayStorage::from(values))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ArrayError, NdArray, ShapeError, broadcast_axis_steps, broadcast_shape, broadcast_shapes,
        can_broadcast, contiguous_strides, element_count,
    };
    use fnp_dtype::{ArrayStorage, DType, Scalar, StorageError};

    #[test]
    fn broadcast_shape_matches_numpy_style() {
        let out = broadcast_shape(&[8, 1, 6, 1], &[7, 1, 5]).expect("broadcast should succeed");
        assert_eq!(out, vec![8, 7, 6, 5]);
    }

    #[test]
    fn broadcast_shape_rejects_incompatible_shapes() {
        let err = broadcast_shape(&[4, 3], &[5, 3]).expect_err("should fail");
        assert!(matches!(err, ShapeError::IncompatibleBroadcast { .. }));
        assert_eq!(err.reason_code(), "shape_incompatible_broadcast");
        assert!(!can_broadcast(&[4, 3], &[5, 3]));
    }

    #[test]
    fn broadcast_many_shapes() {
        let shapes: [&[usize]; 3] = [&[3, 1], &[1, 7], &[5, 3, 7]];
        let out = broadcast_shapes(&shapes).expect("broadcast should succeed");
        assert_eq!(out, vec![5, 3, 7]);
        assert_eq!(broadcast_shapes(&[]).expect("empty"), Vec::<usize>::new());
    }

    #[test]
    fn element_count_detects_overflow() {
        assert_eq!(element_count(&[]).expect("scalar"), 1);
        assert_eq!(element_count(&[5, 0, 3]).expect("empty"), 0);
        assert_eq!(
            element_count(&[usize::MAX, 2]).expect_err("overflow"),
            ShapeError::Overflow
        );
    }

    #[test]
    fn strides_and_broadcast_steps() {
        assert_eq!(contiguous_strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(broadcast_axis_steps(3, &[3, 1]), vec![0, 1, 0]);
        assert_eq!(broadcast_axis_steps(2, &[2, 3]), vec![3, 1]);
        assert!(broadcast_axis_steps(0, &[]).is_empty());
    }

    #[test]
    fn new_checks_storage_length() {
        let err = NdArray::new(vec![2, 2], ArrayStorage::I32(vec![1, 2, 3])).expect_err("short");
        assert_eq!(
            err,
            ArrayError::LengthMismatch {
                expected: 4,
                actual: 3
            }
        );
        let arr = NdArray::new(vec![2, 2], ArrayStorage::I32(vec![1, 2, 3, 4])).expect("ok");
        assert_eq!(arr.ndim(), 2);
        assert_eq!(arr.len(), 4);
    }

    #[test]
    fn arange_builds_typed_vector() {
        let arr = NdArray::arange(0, 5, DType::U16).expect("arange");
        assert_eq!(arr.shape(), &[5]);
        assert_eq!(arr.dtype(), DType::U16);
        assert_eq!(arr.storage(), &ArrayStorage::U16(vec![0, 1, 2, 3, 4]));
    }

    #[test]
    fn bool_arange_past_two_elements_fails() {
        let err = NdArray::arange(0, 5, DType::Bool).expect_err("no fill function");
        assert!(matches!(
            err,
            ArrayError::Storage(StorageError::NoFillFunction { .. })
        ));
        assert_eq!(err.reason_code(), "storage_no_fill_function");
    }

    #[test]
    fn like_constructors_preserve_shape_and_dtype() {
        let arr = NdArray::new(vec![2, 3], ArrayStorage::zeros(DType::Complex64, 6)).expect("arr");
        let ones = arr.ones_like();
        assert_eq!(ones.shape(), &[2, 3]);
        assert_eq!(ones.dtype(), DType::Complex64);
        assert!((0..6).all(|idx| ones.get(idx).expect("elem").exact_eq(Scalar::Int(1))));
        assert_eq!(arr.full_like(Scalar::Int(7)).get(5).expect("elem"), Scalar::Complex(7.0, 0.0));
        assert_eq!(ones.zeros_like(), arr);
    }

    #[test]
    fn fill_casts_into_dtype() {
        let mut arr = NdArray::zeros(vec![3], DType::U8).expect("zeros");
        arr.fill(Scalar::Int(-1));
        assert_eq!(arr.storage(), &ArrayStorage::U8(vec![255, 255, 255]));
    }

    #[test]
    fn reversed_flips_first_axis() {
        let arr = NdArray::arange(0, 5, DType::I8).expect("arange");
        assert_eq!(
            arr.reversed().storage(),
            &ArrayStorage::I8(vec![4, 3, 2, 1, 0])
        );
        let grid =
            NdArray::new(vec![2, 2], ArrayStorage::F64(vec![1.0, 2.0, 3.0, 4.0])).expect("grid");
        assert_eq!(
            grid.reversed().storage(),
            &ArrayStorage::F64(vec![3.0, 4.0, 1.0, 2.0])
        );
        let scalar = NdArray::full(Vec::new(), DType::F32, Scalar::Float(1.5)).expect("0-d");
        assert_eq!(scalar.reversed(), scalar);
    }

    #[test]
    fn astype_str_on_bool_array() {
        let arr = NdArray::from(vec![false, true]);
        let strings = arr.astype(DType::Str).expect("astype str");
        assert_eq!(strings.shape(), &[2]);
        assert_eq!(
            strings.storage().as_strings().expect("strings"),
            &["False".to_string(), "True".to_string()]
        );
    }

    #[test]
    fn from_scalars_casts_literals() {
        let arr = NdArray::from_scalars(
            &[Scalar::Int(-1), Scalar::Int(0), Scalar::Int(1)],
            DType::I64,
        );
        assert_eq!(arr.storage(), &ArrayStorage::I64(vec![-1, 0, 1]));
        let arr = NdArray::from_scalars(&[Scalar::Bool(true)], DType::F32);
        assert_eq!(arr.storage(), &ArrayStorage::F32(vec![1.0]));
    }
}
