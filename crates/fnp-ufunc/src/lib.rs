#![forbid(unsafe_code)]

mod kernels;
mod loops;

use fnp_dtype::{ArrayStorage, DType, Scalar, StorageError, promote};
use fnp_ndarray::{ArrayError, NdArray, ShapeError, broadcast_shape, element_count};
use tracing::{debug, warn};

use crate::kernels::{frexp_f32, frexp_f64, ldexp_f32, ldexp_f64};
use crate::loops::LoopTally;

pub const UFUNC_REASON_CODES: [&str; 6] = [
    "ufunc_shape_contract_violation",
    "ufunc_invalid_input_length",
    "ufunc_no_matching_loop",
    "ufunc_operand_cast_failed",
    "ufunc_division_by_zero_observed",
    "ufunc_unknown_operation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Conjugate,
    Reciprocal,
    Invert,
    Square,
    Sign,
    Negative,
    Absolute,
    LogicalNot,
}

impl UnaryOp {
    pub const ALL: [Self; 8] = [
        Self::Conjugate,
        Self::Reciprocal,
        Self::Invert,
        Self::Square,
        Self::Sign,
        Self::Negative,
        Self::Absolute,
        Self::LogicalNot,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Conjugate => "conjugate",
            Self::Reciprocal => "reciprocal",
            Self::Invert => "invert",
            Self::Square => "square",
            Self::Sign => "sign",
            Self::Negative => "negative",
            Self::Absolute => "absolute",
            Self::LogicalNot => "logical_not",
        }
    }

    pub fn parse(name: &str) -> Result<Self, UFuncError> {
        match name.trim() {
            "conjugate" | "conj" => Ok(Self::Conjugate),
            "reciprocal" => Ok(Self::Reciprocal),
            "invert" | "bitwise_not" => Ok(Self::Invert),
            "square" => Ok(Self::Square),
            "sign" => Ok(Self::Sign),
            "negative" => Ok(Self::Negative),
            "absolute" | "abs" => Ok(Self::Absolute),
            "logical_not" => Ok(Self::LogicalNot),
            other => Err(UFuncError::UnknownOperation(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    FloorDivide,
    Fmod,
    Minimum,
    Maximum,
    Fmin,
    Fmax,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Equal,
    NotEqual,
    LogicalAnd,
    LogicalOr,
    LogicalXor,
}

impl BinaryOp {
    pub const ALL: [Self; 18] = [
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::FloorDivide,
        Self::Fmod,
        Self::Minimum,
        Self::Maximum,
        Self::Fmin,
        Self::Fmax,
        Self::Greater,
        Self::GreaterEqual,
        Self::Less,
        Self::LessEqual,
        Self::Equal,
        Self::NotEqual,
        Self::LogicalAnd,
        Self::LogicalOr,
        Self::LogicalXor,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::FloorDivide => "floor_divide",
            Self::Fmod => "fmod",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Fmin => "fmin",
            Self::Fmax => "fmax",
            Self::Greater => "greater",
            Self::GreaterEqual => "greater_equal",
            Self::Less => "less",
            Self::LessEqual => "less_equal",
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::LogicalAnd => "logical_and",
            Self::LogicalOr => "logical_or",
            Self::LogicalXor => "logical_xor",
        }
    }

    pub fn parse(name: &str) -> Result<Self, UFuncError> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|op| op.name() == name)
            .ok_or_else(|| UFuncError::UnknownOperation(name.to_string()))
    }

    /// Ordering and equality tests; these always produce a Bool array.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Greater
                | Self::GreaterEqual
                | Self::Less
                | Self::LessEqual
                | Self::Equal
                | Self::NotEqual
        )
    }

    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::LogicalAnd | Self::LogicalOr | Self::LogicalXor)
    }
}

/// What an integer loop does when it divides by zero. The element itself
/// always becomes 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    Ignore,
    #[default]
    Warn,
    Raise,
}

impl ErrorPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Warn => "warn",
            Self::Raise => "raise",
        }
    }
}

/// Floating-point error state for a loop call (np.errstate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopContext {
    pub divide: ErrorPolicy,
}

impl LoopContext {
    #[must_use]
    pub const fn with_divide(divide: ErrorPolicy) -> Self {
        Self { divide }
    }

    fn check_divide(&self, op: &'static str, count: usize) -> Result<(), UFuncError> {
        if count == 0 {
            return Ok(());
        }
        match self.divide {
            ErrorPolicy::Ignore => Ok(()),
            ErrorPolicy::Warn => {
                warn!(op, count, "divide by zero encountered in integer loop");
                Ok(())
            }
            ErrorPolicy::Raise => Err(UFuncError::DivideByZero { op, count }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryDispatchPlan {
    pub out_shape: Vec<usize>,
    pub out_count: usize,
    /// Dtype both operands are cast to before the loop runs.
    pub operand_dtype: DType,
    pub out_dtype: DType,
    /// Datetime arithmetic runs on raw ticks and tags the result afterwards.
    pub datetime_arithmetic: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tick {
    Date,
    Delta,
}

// Plain integers act as timedelta offsets next to datetimes.
fn tick_kind(dtype: DType) -> Option<Tick> {
    match dtype {
        DType::DateTime64 => Some(Tick::Date),
        DType::TimeDelta64 => Some(Tick::Delta),
        other if other.is_integer() || other == DType::Bool => Some(Tick::Delta),
        _ => None,
    }
}

fn datetime_arithmetic_dtype(op: BinaryOp, lhs: DType, rhs: DType) -> Option<DType> {
    match (op, tick_kind(lhs)?, tick_kind(rhs)?) {
        (BinaryOp::Add, Tick::Date, Tick::Delta)
        | (BinaryOp::Add, Tick::Delta, Tick::Date)
        | (BinaryOp::Subtract, Tick::Date, Tick::Delta) => Some(DType::DateTime64),
        (BinaryOp::Subtract, Tick::Date, Tick::Date)
        | (BinaryOp::Add | BinaryOp::Subtract, Tick::Delta, Tick::Delta) => {
            Some(DType::TimeDelta64)
        }
        _ => None,
    }
}

fn operand_dtype(lhs: DType, rhs: DType) -> DType {
    let plain_int = |dt: DType| dt.is_integer() || dt == DType::Bool;
    match (lhs.is_datetime_like(), rhs.is_datetime_like()) {
        (true, false) if plain_int(rhs) => lhs,
        (false, true) if plain_int(lhs) => rhs,
        _ => promote(lhs, rhs),
    }
}

pub fn plan_binary_dispatch(
    op: BinaryOp,
    lhs: &NdArray,
    rhs: &NdArray,
) -> Result<BinaryDispatchPlan, UFuncError> {
    let out_shape = broadcast_shape(lhs.shape(), rhs.shape()).map_err(UFuncError::Shape)?;
    let out_count = element_count(&out_shape).map_err(UFuncError::Shape)?;
    let (l, r) = (lhs.dtype(), rhs.dtype());

    if matches!(op, BinaryOp::Add | BinaryOp::Subtract)
        && (l.is_datetime_like() || r.is_datetime_like())
    {
        let out_dtype =
            datetime_arithmetic_dtype(op, l, r).ok_or_else(|| UFuncError::NoLoop {
                op: op.name(),
                dtype: if l.is_datetime_like() { l } else { r },
            })?;
        return Ok(BinaryDispatchPlan {
            out_shape,
            out_count,
            operand_dtype: DType::I64,
            out_dtype,
            datetime_arithmetic: true,
        });
    }

    let operand_dtype = operand_dtype(l, r);
    let out_dtype = if op.is_comparison() || op.is_logical() {
        DType::Bool
    } else {
        operand_dtype
    };
    Ok(BinaryDispatchPlan {
        out_shape,
        out_count,
        operand_dtype,
        out_dtype,
        datetime_arithmetic: false,
    })
}

pub fn unary(op: UnaryOp, x: &NdArray) -> Result<NdArray, UFuncError> {
    unary_with(op, x, &LoopContext::default())
}

pub fn unary_with(op: UnaryOp, x: &NdArray, ctx: &LoopContext) -> Result<NdArray, UFuncError> {
    debug!(op = op.name(), dtype = x.dtype().name(), count = x.len(), "unary loop dispatch");
    let mut tally = LoopTally::default();
    let storage =
        loops::unary_storage(op, x.storage(), &mut tally).ok_or(UFuncError::NoLoop {
            op: op.name(),
            dtype: x.dtype(),
        })?;
    ctx.check_divide(op.name(), tally.divide_by_zero)?;
    Ok(NdArray::new(x.shape().to_vec(), storage)?)
}

pub fn binary(op: BinaryOp, lhs: &NdArray, rhs: &NdArray) -> Result<NdArray, UFuncError> {
    binary_with(op, lhs, rhs, &LoopContext::default())
}

pub fn binary_with(
    op: BinaryOp,
    lhs: &NdArray,
    rhs: &NdArray,
    ctx: &LoopContext,
) -> Result<NdArray, UFuncError> {
    let plan = plan_binary_dispatch(op, lhs, rhs)?;
    debug!(
        op = op.name(),
        operand = plan.operand_dtype.name(),
        out = plan.out_dtype.name(),
        count = plan.out_count,
        "binary loop dispatch"
    );

    let lhs_cast = lhs.storage().cast_to(plan.operand_dtype)?;
    let rhs_cast = rhs.storage().cast_to(plan.operand_dtype)?;
    let pairs = loops::broadcast_pairs(&plan.out_shape, lhs.shape(), rhs.shape(), plan.out_count);

    let mut tally = LoopTally::default();
    let storage = if plan.datetime_arithmetic {
        loops::datetime_arithmetic(op, &lhs_cast, &rhs_cast, &pairs, plan.out_dtype)
    } else {
        loops::binary_storage(op, &lhs_cast, &rhs_cast, &pairs, &mut tally)
    }
    .ok_or(UFuncError::NoLoop {
        op: op.name(),
        dtype: plan.operand_dtype,
    })?;
    ctx.check_divide(op.name(), tally.divide_by_zero)?;
    Ok(NdArray::new(plan.out_shape, storage)?)
}

/// `op(lhs, scalar)` with Python-scalar promotion: the scalar adopts the
/// array's dtype unless its kind is wider.
pub fn binary_scalar(op: BinaryOp, lhs: &NdArray, scalar: Scalar) -> Result<NdArray, UFuncError> {
    binary_scalar_with(op, lhs, scalar, &LoopContext::default())
}

pub fn binary_scalar_with(
    op: BinaryOp,
    lhs: &NdArray,
    scalar: Scalar,
    ctx: &LoopContext,
) -> Result<NdArray, UFuncError> {
    let lhs_dtype = lhs.dtype();
    if lhs_dtype == DType::Str {
        return Err(UFuncError::NoLoop {
            op: op.name(),
            dtype: lhs_dtype,
        });
    }
    let offset = matches!(op, BinaryOp::Add | BinaryOp::Subtract)
        && matches!(scalar, Scalar::Int(_) | Scalar::Bool(_));
    let scalar_dtype = if offset && lhs_dtype == DType::DateTime64 {
        DType::TimeDelta64
    } else {
        scalar.resolve_against(lhs_dtype)
    };
    let rhs = NdArray::full(Vec::new(), scalar_dtype, scalar)?;
    binary_with(op, lhs, &rhs, ctx)
}

/// Decompose each element into a mantissa in `[0.5, 1)` and an `I32`
/// exponent so that `x == mantissa * 2**exponent`.
pub fn frexp(x: &NdArray) -> Result<(NdArray, NdArray), UFuncError> {
    debug!(op = "frexp", dtype = x.dtype().name(), count = x.len(), "unary loop dispatch");
    let (mantissa, exponent) = match x.storage() {
        ArrayStorage::F32(values) => {
            let (m, e): (Vec<f32>, Vec<i32>) = values.iter().map(|&v| frexp_f32(v)).unzip();
            (ArrayStorage::F32(m), ArrayStorage::I32(e))
        }
        ArrayStorage::F64(values) => {
            let (m, e): (Vec<f64>, Vec<i32>) = values.iter().map(|&v| frexp_f64(v)).unzip();
            (ArrayStorage::F64(m), ArrayStorage::I32(e))
        }
        _ => {
            return Err(UFuncError::NoLoop {
                op: "frexp",
                dtype: x.dtype(),
            });
        }
    };
    Ok((
        NdArray::new(x.shape().to_vec(), mantissa)?,
        NdArray::new(x.shape().to_vec(), exponent)?,
    ))
}

/// `mantissa * 2**exponent`, broadcasting the two operands.
pub fn ldexp(mantissa: &NdArray, exponent: &NdArray) -> Result<NdArray, UFuncError> {
    let exp_dtype = exponent.dtype();
    if !(exp_dtype.is_integer() || exp_dtype == DType::Bool) {
        return Err(UFuncError::NoLoop {
            op: "ldexp",
            dtype: exp_dtype,
        });
    }
    let out_shape =
        broadcast_shape(mantissa.shape(), exponent.shape()).map_err(UFuncError::Shape)?;
    let out_count = element_count(&out_shape).map_err(UFuncError::Shape)?;
    debug!(
        op = "ldexp",
        dtype = mantissa.dtype().name(),
        count = out_count,
        "binary loop dispatch"
    );
    let pairs = loops::broadcast_pairs(&out_shape, mantissa.shape(), exponent.shape(), out_count);

    let ArrayStorage::I64(exps) = exponent.storage().cast_to(DType::I64)? else {
        return Err(UFuncError::NoLoop {
            op: "ldexp",
            dtype: exp_dtype,
        });
    };
    let exps: Vec<i32> = exps
        .into_iter()
        .map(|e| e.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
        .collect();

    let storage = match mantissa.storage() {
        ArrayStorage::F32(m) => {
            ArrayStorage::F32(pairs.iter().map(|&(l, r)| ldexp_f32(m[l], exps[r])).collect())
        }
        ArrayStorage::F64(m) => {
            ArrayStorage::F64(pairs.iter().map(|&(l, r)| ldexp_f64(m[l], exps[r])).collect())
        }
        _ => {
            return Err(UFuncError::NoLoop {
                op: "ldexp",
                dtype: mantissa.dtype(),
            });
        }
    };
    Ok(NdArray::new(out_shape, storage)?)
}

#[derive(Debug, Clone, PartialEq)]
pub enum UFuncError {
    Shape(ShapeError),
    InvalidInputLength { expected: usize, actual: usize },
    NoLoop { op: &'static str, dtype: DType },
    Cast(StorageError),
    DivideByZero { op: &'static str, count: usize },
    UnknownOperation(String),
}

impl std::fmt::Display for UFuncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shape(err) => write!(f, "shape error: {err}"),
            Self::InvalidInputLength { expected, actual } => {
                write!(
                    f,
                    "invalid input length expected={expected} actual={actual}"
                )
            }
            Self::NoLoop { op, dtype } => {
                write!(
                    f,
                    "ufunc '{op}' not supported for the input types (dtype={})",
                    dtype.name()
                )
            }
            Self::Cast(err) => write!(f, "operand cast failed: {err}"),
            Self::DivideByZero { op, count } => {
                write!(f, "divide by zero encountered in {op} ({count} elements)")
            }
            Self::UnknownOperation(name) => write!(f, "unknown ufunc '{name}'"),
        }
    }
}

impl std::error::Error for UFuncError {}

impl UFuncError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Shape(_) => "ufunc_shape_contract_violation",
            Self::InvalidInputLength { .. } => "ufunc_invalid_input_length",
            Self::NoLoop { .. } => "ufunc_no_matching_loop",
            Self::Cast(_) => "ufunc_operand_cast_failed",
            Self::DivideByZero { .. } => "ufunc_division_by_zero_observed",
            Self::UnknownOperation(_) => "ufunc_unknown_operation",
        }
    }
}

impl From<StorageError> for UFuncError {
    fn from(err: StorageError) -> Self {
        Self::Cast(err)
    }
}

impl From<ArrayError> for UFuncError {
    fn from(err: ArrayError) -> Self {
        match err {
            ArrayError::Shape(err) => Self::Shape(err),
            ArrayError::Storage(err) => Self::Cast(err),
            ArrayError::LengthMismatch { expected, actual } => {
                Self::InvalidInputLength { expected, actual }
            }
        }
    }
}
