//! Typed inner loops. Each kind of storage gets one generic loop per arity;
//! the dispatchers at the bottom bind a storage variant to its loop and wrap
//! the result back into the same variant.

use std::cmp::Ordering;

use fnp_dtype::{ArrayStorage, DType};
use fnp_ndarray::broadcast_axis_steps;

use crate::kernels::{
    Complex, FloatElement, IntElement, complex_abs, complex_add, complex_floor_divide,
    complex_fmax, complex_fmin, complex_is_truthy, complex_maximum, complex_minimum, complex_mul,
    complex_partial_cmp, complex_reciprocal, complex_sign, complex_sub, float_floor_divide,
    float_fmax, float_fmin, float_maximum, float_minimum, float_sign,
};
use crate::{BinaryOp, UnaryOp};

/// Events observed while running a loop.
#[derive(Debug, Default)]
pub(crate) struct LoopTally {
    pub divide_by_zero: usize,
}

pub(crate) enum Output<T> {
    Same(Vec<T>),
    Bool(Vec<bool>),
}

impl<T> Output<T> {
    fn into_storage(self, wrap: fn(Vec<T>) -> ArrayStorage) -> ArrayStorage {
        match self {
            Self::Same(values) => wrap(values),
            Self::Bool(values) => ArrayStorage::Bool(values),
        }
    }
}

/// Source flat indices `(lhs, rhs)` for every output element in C order.
pub(crate) fn broadcast_pairs(
    out_shape: &[usize],
    lhs_shape: &[usize],
    rhs_shape: &[usize],
    out_count: usize,
) -> Vec<(usize, usize)> {
    if lhs_shape == rhs_shape {
        return (0..out_count).map(|idx| (idx, idx)).collect();
    }

    let lhs_axis_steps = broadcast_axis_steps(out_shape.len(), lhs_shape);
    let rhs_axis_steps = broadcast_axis_steps(out_shape.len(), rhs_shape);

    let mut out_multi = vec![0usize; out_shape.len()];
    let mut lhs_flat = 0usize;
    let mut rhs_flat = 0usize;
    let mut pairs = Vec::with_capacity(out_count);

    for flat in 0..out_count {
        pairs.push((lhs_flat, rhs_flat));

        if flat + 1 == out_count || out_shape.is_empty() {
            continue;
        }

        // Odometer step over the output index, moving both source offsets
        // incrementally.
        for axis in (0..out_shape.len()).rev() {
            out_multi[axis] += 1;
            lhs_flat += lhs_axis_steps[axis];
            rhs_flat += rhs_axis_steps[axis];

            if out_multi[axis] < out_shape[axis] {
                break;
            }

            out_multi[axis] = 0;
            lhs_flat -= lhs_axis_steps[axis] * out_shape[axis];
            rhs_flat -= rhs_axis_steps[axis] * out_shape[axis];
        }
    }

    pairs
}

fn map_pairs<T: Copy, U>(
    lhs: &[T],
    rhs: &[T],
    pairs: &[(usize, usize)],
    f: impl Fn(T, T) -> U,
) -> Vec<U> {
    pairs.iter().map(|&(l, r)| f(lhs[l], rhs[r])).collect()
}

fn map_pairs_checked<T: IntElement>(
    lhs: &[T],
    rhs: &[T],
    pairs: &[(usize, usize)],
    tally: &mut LoopTally,
    f: impl Fn(T, T) -> Option<T>,
) -> Vec<T> {
    pairs
        .iter()
        .map(|&(l, r)| {
            f(lhs[l], rhs[r]).unwrap_or_else(|| {
                tally.divide_by_zero += 1;
                T::default()
            })
        })
        .collect()
}

fn ordering_holds(op: BinaryOp, ord: Option<Ordering>) -> bool {
    match op {
        BinaryOp::Greater => ord == Some(Ordering::Greater),
        BinaryOp::GreaterEqual => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        BinaryOp::Less => ord == Some(Ordering::Less),
        BinaryOp::LessEqual => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        BinaryOp::Equal => ord == Some(Ordering::Equal),
        _ => ord != Some(Ordering::Equal),
    }
}

fn compare<T>(
    op: BinaryOp,
    lhs: &[T],
    rhs: &[T],
    pairs: &[(usize, usize)],
    cmp: impl Fn(&T, &T) -> Option<Ordering>,
) -> Vec<bool> {
    pairs
        .iter()
        .map(|&(l, r)| ordering_holds(op, cmp(&lhs[l], &rhs[r])))
        .collect()
}

fn logical<T: Copy>(
    op: BinaryOp,
    lhs: &[T],
    rhs: &[T],
    pairs: &[(usize, usize)],
    truthy: impl Fn(T) -> bool,
) -> Vec<bool> {
    map_pairs(lhs, rhs, pairs, |a, b| {
        let (a, b) = (truthy(a), truthy(b));
        match op {
            BinaryOp::LogicalAnd => a && b,
            BinaryOp::LogicalOr => a || b,
            _ => a != b,
        }
    })
}

fn bool_binary(
    op: BinaryOp,
    lhs: &[bool],
    rhs: &[bool],
    pairs: &[(usize, usize)],
) -> Option<Output<bool>> {
    if op.is_comparison() {
        return Some(Output::Bool(compare(op, lhs, rhs, pairs, bool::partial_cmp)));
    }
    if op.is_logical() {
        return Some(Output::Bool(logical(op, lhs, rhs, pairs, |v| v)));
    }
    let values = match op {
        BinaryOp::Add | BinaryOp::Maximum | BinaryOp::Fmax => {
            map_pairs(lhs, rhs, pairs, |a, b| a || b)
        }
        BinaryOp::Multiply | BinaryOp::Minimum | BinaryOp::Fmin => {
            map_pairs(lhs, rhs, pairs, |a, b| a && b)
        }
        _ => return None,
    };
    Some(Output::Same(values))
}

fn int_binary<T: IntElement>(
    op: BinaryOp,
    lhs: &[T],
    rhs: &[T],
    pairs: &[(usize, usize)],
    tally: &mut LoopTally,
) -> Option<Output<T>> {
    if op.is_comparison() {
        return Some(Output::Bool(compare(op, lhs, rhs, pairs, T::partial_cmp)));
    }
    if op.is_logical() {
        return Some(Output::Bool(logical(op, lhs, rhs, pairs, |v| !v.is_zero())));
    }
    let values = match op {
        BinaryOp::Add => map_pairs(lhs, rhs, pairs, T::add_wrapping),
        BinaryOp::Subtract => map_pairs(lhs, rhs, pairs, T::sub_wrapping),
        BinaryOp::Multiply => map_pairs(lhs, rhs, pairs, T::mul_wrapping),
        BinaryOp::FloorDivide => map_pairs_checked(lhs, rhs, pairs, tally, T::floor_div),
        BinaryOp::Fmod => map_pairs_checked(lhs, rhs, pairs, tally, T::fmod),
        BinaryOp::Minimum | BinaryOp::Fmin => map_pairs(lhs, rhs, pairs, T::min),
        BinaryOp::Maximum | BinaryOp::Fmax => map_pairs(lhs, rhs, pairs, T::max),
        _ => return None,
    };
    Some(Output::Same(values))
}

fn float_binary<F: FloatElement>(
    op: BinaryOp,
    lhs: &[F],
    rhs: &[F],
    pairs: &[(usize, usize)],
) -> Option<Output<F>> {
    if op.is_comparison() {
        return Some(Output::Bool(compare(op, lhs, rhs, pairs, F::partial_cmp)));
    }
    if op.is_logical() {
        return Some(Output::Bool(logical(op, lhs, rhs, pairs, |v| v != F::ZERO)));
    }
    let values = match op {
        BinaryOp::Add => map_pairs(lhs, rhs, pairs, |a, b| a + b),
        BinaryOp::Subtract => map_pairs(lhs, rhs, pairs, |a, b| a - b),
        BinaryOp::Multiply => map_pairs(lhs, rhs, pairs, |a, b| a * b),
        BinaryOp::FloorDivide => map_pairs(lhs, rhs, pairs, float_floor_divide),
        BinaryOp::Fmod => map_pairs(lhs, rhs, pairs, |a, b| a % b),
        BinaryOp::Minimum => map_pairs(lhs, rhs, pairs, float_minimum),
        BinaryOp::Maximum => map_pairs(lhs, rhs, pairs, float_maximum),
        BinaryOp::Fmin => map_pairs(lhs, rhs, pairs, float_fmin),
        BinaryOp::Fmax => map_pairs(lhs, rhs, pairs, float_fmax),
        _ => return None,
    };
    Some(Output::Same(values))
}

fn complex_binary<F: FloatElement>(
    op: BinaryOp,
    lhs: &[Complex<F>],
    rhs: &[Complex<F>],
    pairs: &[(usize, usize)],
) -> Option<Output<Complex<F>>> {
    if op.is_comparison() {
        return Some(Output::Bool(compare(op, lhs, rhs, pairs, complex_partial_cmp)));
    }
    if op.is_logical() {
        return Some(Output::Bool(logical(op, lhs, rhs, pairs, complex_is_truthy)));
    }
    let values = match op {
        BinaryOp::Add => map_pairs(lhs, rhs, pairs, complex_add),
        BinaryOp::Subtract => map_pairs(lhs, rhs, pairs, complex_sub),
        BinaryOp::Multiply => map_pairs(lhs, rhs, pairs, complex_mul),
        BinaryOp::FloorDivide => map_pairs(lhs, rhs, pairs, complex_floor_divide),
        BinaryOp::Minimum => map_pairs(lhs, rhs, pairs, complex_minimum),
        BinaryOp::Maximum => map_pairs(lhs, rhs, pairs, complex_maximum),
        BinaryOp::Fmin => map_pairs(lhs, rhs, pairs, complex_fmin),
        BinaryOp::Fmax => map_pairs(lhs, rhs, pairs, complex_fmax),
        _ => return None,
    };
    Some(Output::Same(values))
}

/// Datetime and timedelta ticks only order and compare here; arithmetic
/// goes through [`datetime_arithmetic`].
fn tick_binary(
    op: BinaryOp,
    lhs: &[i64],
    rhs: &[i64],
    pairs: &[(usize, usize)],
    tally: &mut LoopTally,
) -> Option<Output<i64>> {
    let ordering_like = op.is_comparison()
        || op.is_logical()
        || matches!(
            op,
            BinaryOp::Minimum | BinaryOp::Maximum | BinaryOp::Fmin | BinaryOp::Fmax
        );
    if !ordering_like {
        return None;
    }
    int_binary(op, lhs, rhs, pairs, tally)
}

pub(crate) fn binary_storage(
    op: BinaryOp,
    lhs: &ArrayStorage,
    rhs: &ArrayStorage,
    pairs: &[(usize, usize)],
    tally: &mut LoopTally,
) -> Option<ArrayStorage> {
    use ArrayStorage as S;

    Some(match (lhs, rhs) {
        (S::Bool(a), S::Bool(b)) => bool_binary(op, a, b, pairs)?.into_storage(S::Bool),
        (S::I8(a), S::I8(b)) => int_binary(op, a, b, pairs, tally)?.into_storage(S::I8),
        (S::I16(a), S::I16(b)) => int_binary(op, a, b, pairs, tally)?.into_storage(S::I16),
        (S::I32(a), S::I32(b)) => int_binary(op, a, b, pairs, tally)?.into_storage(S::I32),
        (S::I64(a), S::I64(b)) => int_binary(op, a, b, pairs, tally)?.into_storage(S::I64),
        (S::U8(a), S::U8(b)) => int_binary(op, a, b, pairs, tally)?.into_storage(S::U8),
        (S::U16(a), S::U16(b)) => int_binary(op, a, b, pairs, tally)?.into_storage(S::U16),
        (S::U32(a), S::U32(b)) => int_binary(op, a, b, pairs, tally)?.into_storage(S::U32),
        (S::U64(a), S::U64(b)) => int_binary(op, a, b, pairs, tally)?.into_storage(S::U64),
        (S::F32(a), S::F32(b)) => float_binary(op, a, b, pairs)?.into_storage(S::F32),
        (S::F64(a), S::F64(b)) => float_binary(op, a, b, pairs)?.into_storage(S::F64),
        (S::Complex64(a), S::Complex64(b)) => {
            complex_binary(op, a, b, pairs)?.into_storage(S::Complex64)
        }
        (S::Complex128(a), S::Complex128(b)) => {
            complex_binary(op, a, b, pairs)?.into_storage(S::Complex128)
        }
        (S::String(a), S::String(b)) if op.is_comparison() => {
            S::Bool(compare(op, a, b, pairs, String::partial_cmp))
        }
        (S::DateTime64(a), S::DateTime64(b)) => {
            tick_binary(op, a, b, pairs, tally)?.into_storage(S::DateTime64)
        }
        (S::TimeDelta64(a), S::TimeDelta64(b)) => {
            tick_binary(op, a, b, pairs, tally)?.into_storage(S::TimeDelta64)
        }
        _ => return None,
    })
}

/// Add or subtract raw `i64` ticks and tag the result as `out_dtype`.
pub(crate) fn datetime_arithmetic(
    op: BinaryOp,
    lhs: &ArrayStorage,
    rhs: &ArrayStorage,
    pairs: &[(usize, usize)],
    out_dtype: DType,
) -> Option<ArrayStorage> {
    let (ArrayStorage::I64(lhs), ArrayStorage::I64(rhs)) = (lhs, rhs) else {
        return None;
    };
    let ticks = match op {
        BinaryOp::Add => map_pairs(lhs, rhs, pairs, i64::wrapping_add),
        BinaryOp::Subtract => map_pairs(lhs, rhs, pairs, i64::wrapping_sub),
        _ => return None,
    };
    match out_dtype {
        DType::DateTime64 => Some(ArrayStorage::DateTime64(ticks)),
        DType::TimeDelta64 => Some(ArrayStorage::TimeDelta64(ticks)),
        _ => None,
    }
}

fn bool_unary(op: UnaryOp, values: &[bool]) -> Option<Output<bool>> {
    match op {
        UnaryOp::Conjugate => Some(Output::Same(values.to_vec())),
        UnaryOp::Invert | UnaryOp::LogicalNot => {
            Some(Output::Same(values.iter().map(|v| !v).collect()))
        }
        _ => None,
    }
}

fn int_unary<T: IntElement>(
    op: UnaryOp,
    values: &[T],
    tally: &mut LoopTally,
) -> Option<Output<T>> {
    let map = |f: fn(T) -> T| values.iter().map(|&v| f(v)).collect::<Vec<_>>();
    let out = match op {
        UnaryOp::Conjugate => values.to_vec(),
        UnaryOp::Reciprocal => values
            .iter()
            .map(|&v| {
                v.reciprocal().unwrap_or_else(|| {
                    tally.divide_by_zero += 1;
                    T::default()
                })
            })
            .collect(),
        UnaryOp::Invert => map(T::bit_not),
        UnaryOp::Square => map(|v| v.mul_wrapping(v)),
        UnaryOp::Sign => map(T::sign),
        UnaryOp::Negative => map(T::neg_wrapping),
        UnaryOp::Absolute => map(T::abs_wrapping),
        UnaryOp::LogicalNot => {
            return Some(Output::Bool(values.iter().map(|v| v.is_zero()).collect()));
        }
    };
    Some(Output::Same(out))
}

fn float_unary<F: FloatElement>(op: UnaryOp, values: &[F]) -> Option<Output<F>> {
    let map = |f: fn(F) -> F| values.iter().map(|&v| f(v)).collect::<Vec<_>>();
    let out = match op {
        UnaryOp::Conjugate => values.to_vec(),
        UnaryOp::Reciprocal => map(|v| F::ONE / v),
        UnaryOp::Square => map(|v| v * v),
        UnaryOp::Sign => map(float_sign),
        UnaryOp::Negative => map(|v| -v),
        UnaryOp::Absolute => map(F::abs),
        UnaryOp::LogicalNot => {
            return Some(Output::Bool(values.iter().map(|&v| v == F::ZERO).collect()));
        }
        UnaryOp::Invert => return None,
    };
    Some(Output::Same(out))
}

/// `absolute` changes kind (complex to real) and is handled by the dispatcher.
fn complex_unary<F: FloatElement>(
    op: UnaryOp,
    values: &[Complex<F>],
) -> Option<Output<Complex<F>>> {
    let map = |f: fn(Complex<F>) -> Complex<F>| values.iter().map(|&v| f(v)).collect::<Vec<_>>();
    let out = match op {
        UnaryOp::Conjugate => map(|(re, im)| (re, -im)),
        UnaryOp::Reciprocal => map(complex_reciprocal),
        UnaryOp::Square => map(|v| complex_mul(v, v)),
        UnaryOp::Sign => map(complex_sign),
        UnaryOp::Negative => map(|(re, im)| (-re, -im)),
        UnaryOp::LogicalNot => {
            return Some(Output::Bool(
                values.iter().map(|&v| !complex_is_truthy(v)).collect(),
            ));
        }
        UnaryOp::Absolute | UnaryOp::Invert => return None,
    };
    Some(Output::Same(out))
}

fn tick_unary(op: UnaryOp, values: &[i64], is_delta: bool) -> Option<Output<i64>> {
    let map = |f: fn(i64) -> i64| values.iter().map(|&v| f(v)).collect::<Vec<_>>();
    let out = match op {
        UnaryOp::Sign => map(i64::signum),
        UnaryOp::Negative if is_delta => map(i64::wrapping_neg),
        UnaryOp::Absolute if is_delta => map(i64::wrapping_abs),
        UnaryOp::LogicalNot => {
            return Some(Output::Bool(values.iter().map(|&v| v == 0).collect()));
        }
        _ => return None,
    };
    Some(Output::Same(out))
}

pub(crate) fn unary_storage(
    op: UnaryOp,
    values: &ArrayStorage,
    tally: &mut LoopTally,
) -> Option<ArrayStorage> {
    use ArrayStorage as S;

    Some(match values {
        S::Bool(v) => bool_unary(op, v)?.into_storage(S::Bool),
        S::I8(v) => int_unary(op, v, tally)?.into_storage(S::I8),
        S::I16(v) => int_unary(op, v, tally)?.into_storage(S::I16),
        S::I32(v) => int_unary(op, v, tally)?.into_storage(S::I32),
        S::I64(v) => int_unary(op, v, tally)?.into_storage(S::I64),
        S::U8(v) => int_unary(op, v, tally)?.into_storage(S::U8),
        S::U16(v) => int_unary(op, v, tally)?.into_storage(S::U16),
        S::U32(v) => int_unary(op, v, tally)?.into_storage(S::U32),
        S::U64(v) => int_unary(op, v, tally)?.into_storage(S::U64),
        S::F32(v) => float_unary(op, v)?.into_storage(S::F32),
        S::F64(v) => float_unary(op, v)?.into_storage(S::F64),
        S::Complex64(v) if op == UnaryOp::Absolute => {
            S::F32(v.iter().map(|&z| complex_abs(z)).collect())
        }
        S::Complex128(v) if op == UnaryOp::Absolute => {
            S::F64(v.iter().map(|&z| complex_abs(z)).collect())
        }
        S::Complex64(v) => complex_unary(op, v)?.into_storage(S::Complex64),
        S::Complex128(v) => complex_unary(op, v)?.into_storage(S::Complex128),
        S::String(_) => return None,
        S::DateTime64(v) => tick_unary(op, v, false)?.into_storage(S::DateTime64),
        S::TimeDelta64(v) => tick_unary(op, v, true)?.into_storage(S::TimeDelta64),
    })
}
