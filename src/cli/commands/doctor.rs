//! CLI command for `initramfs-builder doctor`
//!
//! Checks external tools and reports issues with suggestions.

use anyhow::Result;

use crate::cli::output::{is_json, is_quiet, print_detail, print_info, print_success, print_warning, status};
use crate::core::doctor::run_doctor;

/// Execute the doctor command
///
/// Missing tools only disable the formats that need them, so the command
/// succeeds whenever it can report.
pub fn execute() -> Result<()> {
    let report = run_doctor();

    // JSON output mode
    if is_json() {
        let json_result = serde_json::json!({
            "status": if report.all_passed() { "success" } else { "warning" },
            "checks": report.checks,
            "build": report.build,
            "passed_count": report.passed_count(),
            "total_count": report.checks.len()
        });
        println!("{}", serde_json::to_string_pretty(&json_result)?);
        return Ok(());
    }

    // Quiet mode - only show problems
    if is_quiet() {
        for check in report.failed() {
            eprintln!("{} Missing: {} (needed for {})", status::ERROR, check.name, check.needed_for);
        }
        return Ok(());
    }

    let build = &report.build;
    print_info(&format!(
        "initramfs-builder {} ({})",
        build.version,
        build.git_sha.unwrap_or("unknown revision")
    ));
    if let Some(target) = build.target {
        print_detail(&format!("Target: {target}"));
    }
    if let Some(timestamp) = build.build_timestamp {
        print_detail(&format!("Built: {timestamp}"));
    }
    println!();

    print_info("Checking external tools...");
    for check in &report.checks {
        let version_str = check
            .version
            .as_ref()
            .map(|v| format!(" (v{v})"))
            .unwrap_or_default();

        if check.passed {
            println!("  {} {}{version_str}", status::SUCCESS, check.name);
        } else {
            println!("  {} {} [needed for {}]", status::ERROR, check.name, check.needed_for);
            if let Some(error) = &check.error {
                print_detail(&format!("Error: {error}"));
            }
            if let Some(suggestion) = &check.suggestion {
                print_detail(&format!("Suggestion: {suggestion}"));
            }
        }
    }

    println!();
    let passed = report.passed_count();
    let total = report.checks.len();
    if report.all_passed() {
        print_success(&format!("All checks passed ({passed}/{total})"));
    } else {
        print_warning(&format!(
            "{passed}/{total} checks passed, {} tool(s) missing",
            report.failed_count()
        ));
        print_detail("Raw cpio output works without external tools.");
    }

    Ok(())
}
