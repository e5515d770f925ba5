#![forbid(unsafe_code)]

use fnp_conformance::{HarnessConfig, run_all_loop_suites, set_loop_case_log_path};
use std::path::PathBuf;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("run_loop_suites failed: {err}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<bool, String> {
    let mut cfg = HarnessConfig::default_paths();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--log-path" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--log-path requires a value".to_string())?;
                set_loop_case_log_path(Some(PathBuf::from(value)));
            }
            "--fixture-root" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--fixture-root requires a value".to_string())?;
                cfg.fixture_root = PathBuf::from(value);
            }
            "--lenient" => cfg.strict_mode = false,
            "--help" | "-h" => {
                println!(
                    "Usage: cargo run -p fnp-conformance --bin run_loop_suites -- \
                     [--log-path <path>] [--fixture-root <dir>] [--lenient]"
                );
                return Ok(true);
            }
            unknown => return Err(format!("unknown argument: {unknown}")),
        }
    }

    let suites = run_all_loop_suites(&cfg)?;
    let mut all_passed = true;
    for suite in &suites {
        println!(
            "suite={} cases={} passed={}",
            suite.suite, suite.case_count, suite.pass_count
        );
        for failure in &suite.failures {
            println!("  FAIL {failure}");
        }
        all_passed &= suite.all_passed();
    }
    Ok(all_passed)
}
