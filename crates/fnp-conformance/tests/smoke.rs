use fnp_conformance::literal_cases::{LITERAL_CASES_FILE, load_literal_cases};
use fnp_conformance::properties::LOOP_PROPERTIES;
use fnp_conformance::{HarnessConfig, run_all_loop_suites};

#[test]
fn literal_fixture_is_present() {
    let cfg = HarnessConfig::default_paths();
    assert!(cfg.fixture_root.join(LITERAL_CASES_FILE).exists());
    let cases = load_literal_cases(&cfg.fixture_root).expect("fixture should parse");
    assert!(!cases.is_empty());
}

#[test]
fn loop_suites_pass() {
    let cfg = HarnessConfig::default_paths();
    let suites = run_all_loop_suites(&cfg).expect("loop suites should execute");
    assert_eq!(suites.len(), 1 + LOOP_PROPERTIES.len());

    for suite in suites {
        assert!(
            suite.all_passed(),
            "suite {} failed with {:?}",
            suite.suite,
            suite.failures
        );
    }
}

#[test]
fn lenient_mode_still_passes() {
    let mut cfg = HarnessConfig::default_paths();
    cfg.strict_mode = false;
    let suites = run_all_loop_suites(&cfg).expect("loop suites should execute");
    assert!(suites.iter().all(|suite| suite.all_passed()));
}
