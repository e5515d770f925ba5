#![forbid(unsafe_code)]

pub mod literal_cases;
pub mod properties;

use fnp_dtype::TypeDescriptor;
use fnp_ndarray::NdArray;
use fnp_ufunc::{ErrorPolicy, LoopContext};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub fixture_root: PathBuf,
    /// Integer division by zero fails the case instead of warning.
    pub strict_mode: bool,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        Self {
            fixture_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures"),
            strict_mode: true,
        }
    }

    #[must_use]
    pub fn loop_context(&self) -> LoopContext {
        let divide = if self.strict_mode {
            ErrorPolicy::Raise
        } else {
            ErrorPolicy::Warn
        };
        LoopContext::with_divide(divide)
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteReport {
    pub suite: &'static str,
    pub case_count: usize,
    pub pass_count: usize,
    pub failures: Vec<String>,
}

impl SuiteReport {
    #[must_use]
    pub fn new(suite: &'static str) -> Self {
        Self {
            suite,
            case_count: 0,
            pass_count: 0,
            failures: Vec::new(),
        }
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.case_count == self.pass_count && self.failures.is_empty()
    }

    /// Count one (check, type) case. A failing outcome is recorded and the
    /// caller moves on to the next type.
    pub(crate) fn record(
        &mut self,
        case_id: &str,
        descriptor: TypeDescriptor,
        policy: ErrorPolicy,
        outcome: Result<(), String>,
    ) -> Result<(), String> {
        self.case_count += 1;
        let (passed, detail) = match outcome {
            Ok(()) => {
                self.pass_count += 1;
                (true, String::new())
            }
            Err(detail) => {
                self.failures
                    .push(format!("{case_id}[{}]: {detail}", descriptor.name));
                (false, detail)
            }
        };
        maybe_append_loop_case_log(&LoopCaseLogEntry {
            suite: self.suite,
            case_id: case_id.to_string(),
            type_name: descriptor.name,
            dtype: descriptor.dtype.name(),
            divide_policy: policy.as_str(),
            passed,
            detail,
        })
    }
}

#[derive(Debug, Serialize)]
struct LoopCaseLogEntry {
    suite: &'static str,
    case_id: String,
    type_name: &'static str,
    dtype: &'static str,
    divide_policy: &'static str,
    passed: bool,
    detail: String,
}

static LOOP_CASE_LOG_PATH: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();

pub fn set_loop_case_log_path(path: Option<PathBuf>) {
    let cell = LOOP_CASE_LOG_PATH.get_or_init(|| Mutex::new(None));
    if let Ok(mut slot) = cell.lock() {
        *slot = path;
    }
}

fn maybe_append_loop_case_log(entry: &LoopCaseLogEntry) -> Result<(), String> {
    let configured = LOOP_CASE_LOG_PATH
        .get()
        .and_then(|cell| cell.lock().ok())
        .and_then(|slot| slot.clone());
    let from_env = std::env::var_os("FNP_LOOP_CASE_LOG_PATH").map(PathBuf::from);
    let Some(path) = configured.or(from_env) else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed creating {}: {err}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| format!("failed opening {}: {err}", path.display()))?;
    let line = serde_json::to_string(entry)
        .map_err(|err| format!("failed serializing loop case log entry: {err}"))?;
    let mut payload = line.into_bytes();
    payload.push(b'\n');
    file.write_all(&payload)
        .map_err(|err| format!("failed appending loop case log {}: {err}", path.display()))
}

/// Exact element-wise equality: shapes must match, NaN equals NaN, and a
/// complex element with zero imaginary part equals the matching real value.
pub fn assert_array_equal(actual: &NdArray, expected: &NdArray) -> Result<(), String> {
    if actual.shape() != expected.shape() {
        return Err(format!(
            "shape mismatch actual={:?} expected={:?}",
            actual.shape(),
            expected.shape()
        ));
    }

    match (
        actual.storage().as_strings(),
        expected.storage().as_strings(),
    ) {
        (Some(lhs), Some(rhs)) => {
            return if lhs == rhs {
                Ok(())
            } else {
                Err(format!("string mismatch actual={lhs:?} expected={rhs:?}"))
            };
        }
        (None, None) => {}
        _ => {
            return Err(format!(
                "kind mismatch actual={} expected={}",
                actual.dtype().name(),
                expected.dtype().name()
            ));
        }
    }

    for idx in 0..actual.len() {
        let lhs = actual.get(idx).map_err(|err| err.to_string())?;
        let rhs = expected.get(idx).map_err(|err| err.to_string())?;
        if !lhs.exact_eq(rhs) {
            return Err(format!(
                "element {idx} mismatch actual={lhs} expected={rhs} (dtype={})",
                actual.dtype().name()
            ));
        }
    }
    Ok(())
}

pub fn run_all_loop_suites(config: &HarnessConfig) -> Result<Vec<SuiteReport>, String> {
    let mut reports = vec![literal_cases::run_literal_loop_suite(config)?];
    reports.extend(properties::run_loop_property_suites(config)?);
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::{
        HarnessConfig, SuiteReport, assert_array_equal, run_all_loop_suites,
        set_loop_case_log_path,
    };
    use fnp_dtype::{ArrayStorage, DType, Scalar, catalog};
    use fnp_ndarray::NdArray;
    use crate::literal_cases::LITERAL_CASES_FILE;
    use fnp_ufunc::ErrorPolicy;
    use serde_json::{Value, json};
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn strict_mode_raises_on_integer_division_by_zero() {
        let mut cfg = HarnessConfig::default_paths();
        assert_eq!(cfg.loop_context().divide, ErrorPolicy::Raise);
        cfg.strict_mode = false;
        assert_eq!(cfg.loop_context().divide, ErrorPolicy::Warn);
    }

    #[test]
    fn every_loop_suite_passes() {
        let cfg = HarnessConfig::default_paths();
        let suites = run_all_loop_suites(&cfg).expect("loop suites should run");
        assert!(suites.len() >= 2);
        for suite in suites {
            assert!(suite.case_count > 0, "suite {} ran no cases", suite.suite);
            assert!(
                suite.all_passed(),
                "suite {} failed with {:?}",
                suite.suite,
                suite.failures
            );
        }
    }

    #[test]
    fn report_records_failures_and_keeps_counting() {
        let mut report = SuiteReport::new("unit");
        report
            .record("ok", catalog::BYTE, ErrorPolicy::Warn, Ok(()))
            .expect("record");
        report
            .record(
                "broken",
                catalog::UBYTE,
                ErrorPolicy::Warn,
                Err("boom".to_string()),
            )
            .expect("record");
        assert_eq!(report.case_count, 2);
        assert_eq!(report.pass_count, 1);
        assert_eq!(report.failures, vec!["broken[ubyte]: boom".to_string()]);
        assert!(!report.all_passed());
    }

    #[test]
    fn array_equality_is_exact_across_kinds() {
        let complex = NdArray::from(vec![(1.0f64, 0.0), (2.0, 0.0)]);
        let ints = NdArray::from(vec![1i64, 2]);
        assert!(assert_array_equal(&complex, &ints).is_ok());

        let nan = NdArray::from(vec![f64::NAN]);
        assert!(assert_array_equal(&nan, &nan.clone()).is_ok());

        let off = NdArray::from(vec![1i64, 3]);
        let err = assert_array_equal(&ints, &off).expect_err("mismatch");
        assert!(err.contains("element 1"), "{err}");

        let grid = NdArray::new(vec![1, 2], ArrayStorage::I64(vec![1, 2])).expect("grid");
        let err = assert_array_equal(&grid, &ints).expect_err("shape");
        assert!(err.contains("shape mismatch"), "{err}");

        let strings = NdArray::from(vec!["1".to_string(), "2".to_string()]);
        assert!(assert_array_equal(&strings, &ints).is_err());
        let imag = NdArray::from_scalars(
            &[Scalar::Complex(1.0, 1.0), Scalar::Int(2)],
            DType::Complex64,
        );
        assert!(assert_array_equal(&imag, &ints).is_err());
    }

    #[test]
    fn loop_suites_emit_structured_logs_with_required_fields() {
        let ts_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_nanos());
        let tag = format!("{}_{}", std::process::id(), ts_nanos);
        let passing_id = format!("greater_unsigned_{tag}");
        let failing_id = format!("wrong_sign_{tag}");
        let cases = json!([
            {
                "id": passing_id,
                "op": "greater",
                "types": "unsigned_types",
                "lhs": {"values": {"values": [0, 3]}},
                "rhs": {"scalar": 2},
                "expected": [false, true],
                "expected_dtype": "bool"
            },
            {
                "id": failing_id,
                "op": "sign",
                "types": "float_types",
                "lhs": {"values": {"values": [1, 2]}},
                "expected": [0, 0],
                "expected_dtype": "input"
            }
        ]);
        let mut cfg = HarnessConfig::default_paths();
        cfg.fixture_root = std::env::temp_dir().join(format!("fnp_loop_log_fixture_{tag}"));
        fs::create_dir_all(&cfg.fixture_root).expect("create fixture root");
        fs::write(
            cfg.fixture_root.join(LITERAL_CASES_FILE),
            serde_json::to_string(&cases).expect("serialize cases"),
        )
        .expect("write fixture");
        let log_path = std::env::temp_dir().join(format!("fnp_loop_case_log_{tag}.jsonl"));
        let _ = fs::remove_file(&log_path);
        set_loop_case_log_path(Some(log_path.clone()));

        let suites = run_all_loop_suites(&cfg).expect("loop suites should run");
        set_loop_case_log_path(None);
        let literal = suites
            .iter()
            .find(|suite| suite.suite == "loop_literal")
            .expect("literal suite report");
        assert_eq!(literal.case_count, 8);
        assert_eq!(literal.pass_count, 5);

        let raw = fs::read_to_string(&log_path).expect("loop case log should exist");
        let mut passed_lines = 0usize;
        let mut failed_lines = 0usize;
        for line in raw.lines().filter(|line| !line.trim().is_empty()) {
            let value: Value = serde_json::from_str(line).expect("log line should be json");
            for key in [
                "suite",
                "case_id",
                "type_name",
                "dtype",
                "divide_policy",
                "passed",
                "detail",
            ] {
                assert!(value.get(key).is_some(), "missing key {key} in {line}");
            }
            let case_id = value["case_id"].as_str().unwrap_or_default();
            if case_id == passing_id {
                assert_eq!(value["suite"], "loop_literal");
                assert_eq!(value["passed"], true, "{line}");
                passed_lines += 1;
            } else if case_id == failing_id {
                assert_eq!(value["passed"], false, "{line}");
                assert_eq!(value["divide_policy"], "raise", "{line}");
                failed_lines += 1;
            }
        }
        assert_eq!(passed_lines, 5);
        assert_eq!(failed_lines, 3);
        assert_eq!(passed_lines + failed_lines, literal.case_count);
        let _ = fs::remove_file(&log_path);
        let _ = fs::remove_dir_all(&cfg.fixture_root);
    }
}
