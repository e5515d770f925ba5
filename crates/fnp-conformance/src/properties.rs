//! Checks that compare a loop against another loop (or against itself)
//! rather than against literal values.

use crate::{HarnessConfig, SuiteReport, assert_array_equal};
use fnp_dtype::{DType, Scalar, type_set};
use fnp_ndarray::NdArray;
use fnp_ufunc::{BinaryOp, LoopContext, UFuncError, UnaryOp, binary_with, frexp, ldexp, unary_with};

type PropertyCheck = fn(DType, &LoopContext) -> Result<(), String>;

#[derive(Clone, Copy)]
pub struct LoopProperty {
    pub name: &'static str,
    pub types: &'static str,
    check: PropertyCheck,
}

impl LoopProperty {
    pub fn check(&self, dtype: DType, ctx: &LoopContext) -> Result<(), String> {
        (self.check)(dtype, ctx)
    }
}

pub const LOOP_PROPERTIES: [LoopProperty; 6] = [
    LoopProperty {
        name: "reciprocal_round_trip",
        types: "rc_types",
        check: reciprocal_round_trip,
    },
    LoopProperty {
        name: "invert_involution",
        types: "int_types",
        check: invert_involution,
    },
    LoopProperty {
        name: "square_matches_multiply",
        types: "types[1:]",
        check: square_matches_multiply,
    },
    LoopProperty {
        name: "frexp_reconstructs",
        types: "float_types",
        check: frexp_reconstructs,
    },
    LoopProperty {
        name: "ones_like_preserves",
        types: "all_types[1:]",
        check: ones_like_preserves,
    },
    LoopProperty {
        name: "bool_array_ops",
        types: "bool",
        check: bool_array_ops,
    },
];

fn loop_err(err: UFuncError) -> String {
    format!("{err} ({})", err.reason_code())
}

fn arange(start: i64, stop: i64, dtype: DType) -> Result<NdArray, String> {
    NdArray::arange(start, stop, dtype).map_err(|err| err.to_string())
}

fn reciprocal_round_trip(dtype: DType, ctx: &LoopContext) -> Result<(), String> {
    let a = arange(1, 5, dtype)?;
    let once = unary_with(UnaryOp::Reciprocal, &a, ctx).map_err(loop_err)?;
    let twice = unary_with(UnaryOp::Reciprocal, &once, ctx).map_err(loop_err)?;
    assert_array_equal(&twice, &a)
}

fn invert_involution(dtype: DType, ctx: &LoopContext) -> Result<(), String> {
    let a = arange(0, 5, dtype)?;
    let once = unary_with(UnaryOp::Invert, &a, ctx).map_err(loop_err)?;
    let twice = unary_with(UnaryOp::Invert, &once, ctx).map_err(loop_err)?;
    assert_array_equal(&twice, &a)
}

fn square_matches_multiply(dtype: DType, ctx: &LoopContext) -> Result<(), String> {
    let a = arange(0, 5, dtype)?;
    let squared = unary_with(UnaryOp::Square, &a, ctx).map_err(loop_err)?;
    let product = binary_with(BinaryOp::Multiply, &a, &a, ctx).map_err(loop_err)?;
    if squared.dtype() != product.dtype() {
        return Err(format!(
            "square dtype {} differs from multiply dtype {}",
            squared.dtype().name(),
            product.dtype().name()
        ));
    }
    assert_array_equal(&squared, &product)
}

fn frexp_reconstructs(dtype: DType, _ctx: &LoopContext) -> Result<(), String> {
    let a = arange(0, 5, dtype)?;
    let (mantissa, exponent) = frexp(&a).map_err(loop_err)?;
    for idx in 0..mantissa.len() {
        let m = mantissa
            .get(idx)
            .map_err(|err| err.to_string())?
            .to_f64()
            .abs();
        if m != 0.0 && !(0.5..1.0).contains(&m) {
            return Err(format!("mantissa {m} at {idx} outside [0.5, 1)"));
        }
    }
    let rebuilt = ldexp(&mantissa, &exponent).map_err(loop_err)?;
    assert_array_equal(&rebuilt, &a)
}

fn ones_like_preserves(dtype: DType, _ctx: &LoopContext) -> Result<(), String> {
    let a = arange(0, 5, dtype)?;
    let ones = a.ones_like();
    if ones.shape() != a.shape() {
        return Err(format!(
            "ones_like garbled shape {:?} into {:?}",
            a.shape(),
            ones.shape()
        ));
    }
    if ones.dtype() != dtype {
        return Err(format!("ones_like changed dtype to {}", ones.dtype().name()));
    }
    let expected = NdArray::from_scalars(&[Scalar::Int(1); 5], dtype);
    assert_array_equal(&ones, &expected)
}

fn bool_array_ops(dtype: DType, _ctx: &LoopContext) -> Result<(), String> {
    let a = NdArray::from_scalars(&[Scalar::Bool(false), Scalar::Bool(true)], dtype);
    let text = a.astype(DType::Str).map_err(|err| err.to_string())?;
    let expected_text = NdArray::from(vec!["False".to_string(), "True".to_string()]);
    assert_array_equal(&text, &expected_text)?;

    let x = NdArray::from_scalars(&[Scalar::Bool(true), Scalar::Bool(false)], dtype);
    let ones = x.ones_like();
    if ones.shape() != x.shape() {
        return Err(format!(
            "ones_like botched the shape {:?} into {:?}",
            x.shape(),
            ones.shape()
        ));
    }
    assert_array_equal(&ones, &NdArray::from(vec![true, true]))
}

/// One report per property, each covering every type in its subset.
pub fn run_loop_property_suites(config: &HarnessConfig) -> Result<Vec<SuiteReport>, String> {
    let ctx = config.loop_context();
    LOOP_PROPERTIES
        .iter()
        .map(|property| {
            let types = type_set(property.types)
                .ok_or_else(|| format!("{}: unknown type set {}", property.name, property.types))?;
            let mut report = SuiteReport::new(property.name);
            for &descriptor in types {
                let outcome = property.check(descriptor.dtype, &ctx);
                report.record(property.name, descriptor, ctx.divide, outcome)?;
            }
            Ok(report)
        })
        .collect()
}
