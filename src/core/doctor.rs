//! Doctor command logic
//!
//! Checks that the external tools a build relies on are installed.

use serde::Serialize;

use crate::infra::tools::Tool;

/// Result of a single dependency check
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Name of the dependency being checked
    pub name: String,
    /// Whether the check passed
    pub passed: bool,
    /// Version if available
    pub version: Option<String>,
    /// Error message if check failed
    pub error: Option<String>,
    /// Suggestion for fixing the issue
    pub suggestion: Option<String>,
    /// Output formats that need this dependency
    pub needed_for: String,
}

impl CheckResult {
    /// Create a passing check result
    pub fn pass(name: &str, version: Option<String>, needed_for: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            version,
            error: None,
            suggestion: None,
            needed_for: needed_for.to_string(),
        }
    }

    /// Create a failing check result
    pub fn fail(name: &str, error: &str, suggestion: Option<&str>, needed_for: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            version: None,
            error: Some(error.to_string()),
            suggestion: suggestion.map(String::from),
            needed_for: needed_for.to_string(),
        }
    }
}

/// Version information baked in at compile time
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_sha: Option<&'static str>,
    pub git_dirty: Option<&'static str>,
    pub build_timestamp: Option<&'static str>,
    pub target: Option<&'static str>,
    pub rustc: Option<&'static str>,
}

impl BuildInfo {
    /// Info for the running binary
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            git_sha: option_env!("VERGEN_GIT_SHA"),
            git_dirty: option_env!("VERGEN_GIT_DIRTY"),
            build_timestamp: option_env!("VERGEN_BUILD_TIMESTAMP"),
            target: option_env!("VERGEN_CARGO_TARGET_TRIPLE"),
            rustc: option_env!("VERGEN_RUSTC_SEMVER"),
        }
    }
}

/// Overall doctor report
#[derive(Debug, Serialize)]
pub struct DoctorReport {
    /// Individual check results
    pub checks: Vec<CheckResult>,
    /// This binary
    pub build: BuildInfo,
}

impl DoctorReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            checks: Vec::new(),
            build: BuildInfo::current(),
        }
    }

    /// Add a check result
    pub fn add_check(&mut self, result: CheckResult) {
        self.checks.push(result);
    }

    /// Check if all checks passed
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// Count passed checks
    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    /// Count failed checks
    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    /// Get all failed checks
    pub fn failed(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }
}

impl Default for DoctorReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `program` with its version flag and extract the version it prints
pub fn check_command_available(program: &str, version_flag: &str) -> Option<String> {
    std::process::Command::new(program)
        .arg(version_flag)
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                // mke2fs prints its version on stderr
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let combined = format!("{stdout}{stderr}");
                extract_version(&combined)
            } else {
                None
            }
        })
}

/// Extract version string from command output
fn extract_version(output: &str) -> Option<String> {
    let version_regex = regex::Regex::new(r"v?(\d+\.\d+(?:\.\d+)?(?:-\w+)?)").ok()?;
    version_regex
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Check one external tool
pub fn check_tool(tool: Tool) -> CheckResult {
    let needed_for = match tool {
        Tool::Gzip => "gzip",
        Tool::Mke2fs => "ext4",
    };
    let program = tool.program();
    match tool.locate() {
        Ok(path) => match check_command_available(&path.to_string_lossy(), tool.version_flag()) {
            Some(version) => CheckResult::pass(&program, Some(version), needed_for),
            // Some builds print no parseable version; being on PATH is enough
            None => CheckResult::pass(&program, None, needed_for),
        },
        Err(_) => CheckResult::fail(
            &program,
            &format!("{program} not found in PATH"),
            Some(tool.install_hint()),
            needed_for,
        ),
    }
}

/// Run all doctor checks
pub fn run_doctor() -> DoctorReport {
    let mut report = DoctorReport::new();
    for tool in Tool::ALL {
        report.add_check(check_tool(tool));
    }
    report
}
