//! Table-driven loop checks: each fixture case names an operation, a type
//! subset, how to build its operands, and the literal result every type in
//! the subset must produce.

use crate::{HarnessConfig, SuiteReport, assert_array_equal};
use fnp_dtype::{DType, Scalar, TypeDescriptor, type_set};
use fnp_ndarray::NdArray;
use fnp_ufunc::{BinaryOp, LoopContext, UnaryOp, binary_scalar_with, binary_with, unary_with};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub const LITERAL_CASES_FILE: &str = "loop_literal_cases.json";

#[derive(Debug, Clone, Deserialize)]
pub struct LiteralLoopCase {
    pub id: String,
    pub op: String,
    pub types: String,
    pub lhs: OperandSource,
    #[serde(default)]
    pub rhs: Option<OperandSource>,
    /// Subtract this weak integer from the lhs before applying `op`.
    #[serde(default)]
    pub lhs_subtract: Option<i64>,
    /// `astype` applied to the result before comparing.
    #[serde(default)]
    pub result_cast: Option<String>,
    pub expected: Vec<Value>,
    /// `"input"` for the dtype under test, otherwise a dtype name.
    pub expected_dtype: String,
}

/// How an operand is built for the dtype under test.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandSource {
    Arange { start: i64, stop: i64 },
    Full { value: Value, len: usize },
    Values { values: Vec<Value> },
    /// A Python-style weak scalar.
    Scalar(Value),
    ReversedLhs,
    CopyOfLhs,
}

#[derive(Debug, Clone, Copy)]
enum LoopOp {
    Unary(UnaryOp),
    Binary(BinaryOp),
}

impl LoopOp {
    fn parse(name: &str) -> Result<Self, String> {
        UnaryOp::parse(name)
            .map(Self::Unary)
            .or_else(|_| BinaryOp::parse(name).map(Self::Binary))
            .map_err(|err| err.to_string())
    }
}

pub fn load_literal_cases(fixture_root: &Path) -> Result<Vec<LiteralLoopCase>, String> {
    let path = fixture_root.join(LITERAL_CASES_FILE);
    let raw = fs::read_to_string(&path)
        .map_err(|err| format!("failed reading {}: {err}", path.display()))?;
    serde_json::from_str(&raw).map_err(|err| format!("invalid json: {err}"))
}

pub fn scalar_from_json(value: &Value) -> Result<Scalar, String> {
    match value {
        Value::Bool(b) => Ok(Scalar::Bool(*b)),
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(Scalar::Int(i128::from(v)))
            } else if let Some(v) = n.as_u64() {
                Ok(Scalar::Int(i128::from(v)))
            } else {
                n.as_f64()
                    .map(Scalar::Float)
                    .ok_or_else(|| format!("unrepresentable number {n}"))
            }
        }
        Value::Array(parts) => match parts.as_slice() {
            [Value::Number(re), Value::Number(im)] => match (re.as_f64(), im.as_f64()) {
                (Some(re), Some(im)) => Ok(Scalar::Complex(re, im)),
                _ => Err(format!("bad complex literal {value}")),
            },
            _ => Err(format!("complex literal must be [re, im], got {value}")),
        },
        other => Err(format!("unsupported literal {other}")),
    }
}

fn scalars_from_json(values: &[Value]) -> Result<Vec<Scalar>, String> {
    values.iter().map(scalar_from_json).collect()
}

enum Operand {
    Array(NdArray),
    Scalar(Scalar),
}

fn build_operand(
    source: &OperandSource,
    dtype: DType,
    lhs: Option<&NdArray>,
) -> Result<Operand, String> {
    let needs_lhs = || lhs.ok_or_else(|| "operand refers to a missing lhs".to_string());
    let array = match source {
        OperandSource::Arange { start, stop } => {
            NdArray::arange(*start, *stop, dtype).map_err(|err| err.to_string())?
        }
        OperandSource::Full { value, len } => {
            let mut filled = NdArray::zeros(vec![*len], dtype).map_err(|err| err.to_string())?;
            filled.fill(scalar_from_json(value)?);
            filled
        }
        OperandSource::Values { values } => {
            NdArray::from_scalars(&scalars_from_json(values)?, dtype)
        }
        OperandSource::Scalar(value) => return Ok(Operand::Scalar(scalar_from_json(value)?)),
        OperandSource::ReversedLhs => needs_lhs()?.reversed(),
        OperandSource::CopyOfLhs => needs_lhs()?.clone(),
    };
    Ok(Operand::Array(array))
}

fn expected_dtype(case: &LiteralLoopCase, input: DType) -> Result<DType, String> {
    if case.expected_dtype == "input" {
        return Ok(input);
    }
    DType::parse(&case.expected_dtype)
        .ok_or_else(|| format!("unknown expected dtype {}", case.expected_dtype))
}

fn evaluate_case(
    case: &LiteralLoopCase,
    op: LoopOp,
    descriptor: TypeDescriptor,
    ctx: &LoopContext,
) -> Result<(), String> {
    let dtype = descriptor.dtype;
    let Operand::Array(mut lhs) = build_operand(&case.lhs, dtype, None)? else {
        return Err("lhs must be an array".to_string());
    };
    if let Some(offset) = case.lhs_subtract {
        lhs = binary_scalar_with(BinaryOp::Subtract, &lhs, Scalar::Int(i128::from(offset)), ctx)
            .map_err(|err| err.to_string())?;
    }

    let mut result = match (op, &case.rhs) {
        (LoopOp::Unary(op), None) => unary_with(op, &lhs, ctx),
        (LoopOp::Binary(op), Some(source)) => match build_operand(source, dtype, Some(&lhs))? {
            Operand::Array(rhs) => binary_with(op, &lhs, &rhs, ctx),
            Operand::Scalar(scalar) => binary_scalar_with(op, &lhs, scalar, ctx),
        },
        (LoopOp::Unary(op), Some(_)) => {
            return Err(format!("unary op {} given an rhs", op.name()));
        }
        (LoopOp::Binary(op), None) => {
            return Err(format!("binary op {} missing rhs", op.name()));
        }
    }
    .map_err(|err| format!("{} ({})", err, err.reason_code()))?;

    if let Some(cast) = &case.result_cast {
        let target = DType::parse(cast).ok_or_else(|| format!("unknown result cast {cast}"))?;
        result = result.astype(target).map_err(|err| err.to_string())?;
    }

    let want_dtype = expected_dtype(case, dtype)?;
    if result.dtype() != want_dtype {
        return Err(format!(
            "dtype mismatch actual={} expected={}",
            result.dtype().name(),
            want_dtype.name()
        ));
    }
    let expected = NdArray::from_scalars(&scalars_from_json(&case.expected)?, want_dtype);
    assert_array_equal(&result, &expected)
}

pub fn run_literal_loop_suite(config: &HarnessConfig) -> Result<SuiteReport, String> {
    let cases = load_literal_cases(&config.fixture_root)?;
    let ctx = config.loop_context();
    let mut report = SuiteReport::new("loop_literal");

    for case in &cases {
        let op = LoopOp::parse(&case.op).map_err(|err| format!("{}: {err}", case.id))?;
        let types = type_set(&case.types)
            .ok_or_else(|| format!("{}: unknown type set {}", case.id, case.types))?;
        for &descriptor in types {
            let outcome = evaluate_case(case, op, descriptor, &ctx);
            report.record(&case.id, descriptor, ctx.divide, outcome)?;
        }
    }

    Ok(report)
}
