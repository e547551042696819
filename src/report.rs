use std::io;
use std::path::Path;

use junit_report::{Duration, ReportBuilder, TestCaseBuilder, TestSuiteBuilder};
use num_format::{Locale, ToFormattedString};
use prettytable::{row, Table};

use crate::runner::TestResult;

/// Print a per-test summary table to stdout.
pub fn print_summary(suite_name: &str, results: &[TestResult]) {
    let mut table = Table::new();
    table.add_row(row!["Test", "Result", "Time [s]", "Sim steps"]);
    for r in results {
        let verdict = match &r.result {
            Ok(_) => "passed".to_string(),
            Err(fault) => format!("failed: {}", fault),
        };
        table.add_row(row![
            r.name,
            verdict,
            format!("{:.3}", r.time_secs),
            r.sim_steps.to_formatted_string(&Locale::en)
        ]);
    }
    println!("SUITE {}", suite_name);
    table.printstd();
}

/// Write JUnit XML for CI consumption.
pub fn write_junit_xml(
    suite_name: &str,
    results: &[TestResult],
    path: &Path,
) -> io::Result<()> {
    let mut test_cases = Vec::new();
    for r in results {
        let tc = match &r.result {
            Ok(_) => TestCaseBuilder::success(&r.name, Duration::seconds_f64(r.time_secs)),
            Err(fault) => TestCaseBuilder::failure(
                &r.name,
                Duration::seconds_f64(r.time_secs),
                "failure",
                &fault.to_string(),
            ),
        }
        .build();
        test_cases.push(tc);
    }

    let test_suite = TestSuiteBuilder::new(suite_name)
        .add_testcases(test_cases)
        .build();
    let report = ReportBuilder::new().add_testsuite(test_suite).build();
    let file = std::fs::File::create(path)?;
    report
        .write_xml(file)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    Ok(())
}

/// Nonzero when any test failed, for process-exit reporting.
pub fn exit_code(results: &[TestResult]) -> i32 {
    if results.iter().all(|r| r.passed()) {
        0
    } else {
        1
    }
}
