//! Named element-type catalog used to parameterize loop checks.
//!
//! Several NumPy spellings share one storage dtype (`int_`/`long`/`longlong`
//! on LP64, `longdouble` with no wider float available), so descriptors carry
//! the NumPy name alongside the dtype that backs it.

use crate::DType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    pub name: &'static str,
    pub dtype: DType,
}

const fn desc(name: &'static str, dtype: DType) -> TypeDescriptor {
    TypeDescriptor { name, dtype }
}

pub const BOOL_: TypeDescriptor = desc("bool_", DType::Bool);
pub const BYTE: TypeDescriptor = desc("byte", DType::I8);
pub const UBYTE: TypeDescriptor = desc("ubyte", DType::U8);
pub const SHORT: TypeDescriptor = desc("short", DType::I16);
pub const USHORT: TypeDescriptor = desc("ushort", DType::U16);
pub const INTC: TypeDescriptor = desc("intc", DType::I32);
pub const UINTC: TypeDescriptor = desc("uintc", DType::U32);
pub const INT_: TypeDescriptor = desc("int_", DType::I64);
pub const LONG: TypeDescriptor = desc("long", DType::I64);
pub const UINT: TypeDescriptor = desc("uint", DType::U64);
pub const LONGLONG: TypeDescriptor = desc("longlong", DType::I64);
pub const ULONGLONG: TypeDescriptor = desc("ulonglong", DType::U64);
pub const SINGLE: TypeDescriptor = desc("single", DType::F32);
pub const DOUBLE: TypeDescriptor = desc("double", DType::F64);
pub const LONGDOUBLE: TypeDescriptor = desc("longdouble", DType::F64);
pub const CSINGLE: TypeDescriptor = desc("csingle", DType::Complex64);
pub const CDOUBLE: TypeDescriptor = desc("cdouble", DType::Complex128);
pub const CLONGDOUBLE: TypeDescriptor = desc("clongdouble", DType::Complex128);
pub const DATETIME64: TypeDescriptor = desc("datetime64", DType::DateTime64);
pub const TIMEDELTA64: TypeDescriptor = desc("timedelta64", DType::TimeDelta64);

pub const BOOL_TYPES: &[TypeDescriptor] = &[BOOL_];

pub const TYPES: &[TypeDescriptor] = &[
    BOOL_,
    BYTE,
    UBYTE,
    SHORT,
    USHORT,
    INTC,
    UINTC,
    INT_,
    UINT,
    LONGLONG,
    ULONGLONG,
    SINGLE,
    DOUBLE,
    LONGDOUBLE,
    CSINGLE,
    CDOUBLE,
    CLONGDOUBLE,
];

pub const ALL_TYPES: &[TypeDescriptor] = &[
    BOOL_,
    BYTE,
    UBYTE,
    SHORT,
    USHORT,
    INTC,
    UINTC,
    INT_,
    UINT,
    LONGLONG,
    ULONGLONG,
    SINGLE,
    DOUBLE,
    LONGDOUBLE,
    CSINGLE,
    CDOUBLE,
    CLONGDOUBLE,
    DATETIME64,
    TIMEDELTA64,
];

pub const INT_TYPES: &[TypeDescriptor] = &[
    BYTE, UBYTE, SHORT, USHORT, INTC, UINTC, INT_, UINT, LONGLONG, ULONGLONG,
];

pub const UNSIGNED_TYPES: &[TypeDescriptor] = &[UBYTE, USHORT, UINTC, UINT, ULONGLONG];

pub const SIGNED_TYPES: &[TypeDescriptor] = &[
    BYTE,
    SHORT,
    INTC,
    INT_,
    LONG,
    LONGLONG,
    SINGLE,
    DOUBLE,
    LONGDOUBLE,
    CSINGLE,
    CDOUBLE,
    CLONGDOUBLE,
    DATETIME64,
    TIMEDELTA64,
];

pub const REAL_TYPES: &[TypeDescriptor] = &[
    BYTE, UBYTE, SHORT, USHORT, INTC, UINTC, INT_, UINT, LONGLONG, ULONGLONG, SINGLE, DOUBLE,
    LONGDOUBLE,
];

pub const FLOAT_TYPES: &[TypeDescriptor] = &[SINGLE, DOUBLE, LONGDOUBLE];

pub const RC_TYPES: &[TypeDescriptor] =
    &[SINGLE, DOUBLE, LONGDOUBLE, CSINGLE, CDOUBLE, CLONGDOUBLE];

/// Resolve a subset by name. `types[1:]` and `all_types[1:]` drop the
/// leading `bool_` entry.
#[must_use]
pub fn type_set(name: &str) -> Option<&'static [TypeDescriptor]> {
    match name.trim() {
        "bool" => Some(BOOL_TYPES),
        "types" => Some(TYPES),
        "types[1:]" => Some(&TYPES[1..]),
        "all_types" => Some(ALL_TYPES),
        "all_types[1:]" => Some(&ALL_TYPES[1..]),
        "int_types" => Some(INT_TYPES),
        "unsigned_types" => Some(UNSIGNED_TYPES),
        "signed_types" => Some(SIGNED_TYPES),
        "real_types" => Some(REAL_TYPES),
        "float_types" => Some(FLOAT_TYPES),
        "rc_types" => Some(RC_TYPES),
        _ => None,
    }
}

/// `long` only appears in `signed_types`, so it is looked up separately.
#[must_use]
pub fn descriptor(name: &str) -> Option<TypeDescriptor> {
    ALL_TYPES
        .iter()
        .chain([&LONG])
        .copied()
        .find(|entry| entry.name == name)
}

#[must_use]
pub fn without_bool(set: &[TypeDescriptor]) -> Vec<TypeDescriptor> {
    set.iter()
        .copied()
        .filter(|entry| entry.dtype != DType::Bool)
        .collect()
}
