//! External tool invocation
//!
//! Every tool call is one blocking round-trip: feed the whole input, wait
//! for exit, collect stdout. A launch failure or non-zero exit is fatal.

use std::ffi::OsStr;
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::error::BuildError;

/// External programs the pipeline relies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// gzip compressor
    Gzip,
    /// ext4 formatter from e2fsprogs
    Mke2fs,
}

impl Tool {
    /// All tools, in the order `doctor` reports them
    pub const ALL: [Tool; 2] = [Tool::Gzip, Tool::Mke2fs];

    /// Default program name
    pub fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Mke2fs => "mke2fs",
        }
    }

    /// Environment variable overriding the program
    pub fn env_var(self) -> &'static str {
        match self {
            Self::Gzip => "INITRAMFS_GZIP",
            Self::Mke2fs => "INITRAMFS_MKE2FS",
        }
    }

    /// Flag that prints the tool's version
    pub fn version_flag(self) -> &'static str {
        match self {
            Self::Gzip => "--version",
            Self::Mke2fs => "-V",
        }
    }

    /// Install hint shown when the tool is missing
    pub fn install_hint(self) -> &'static str {
        match self {
            Self::Gzip => "Install gzip (e.g. apt install gzip)",
            Self::Mke2fs => "Install e2fsprogs (e.g. apt install e2fsprogs)",
        }
    }

    /// Program to execute, honouring the override variable
    pub fn program(self) -> String {
        std::env::var(self.env_var())
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| self.name().to_string())
    }

    /// Resolve the program in `PATH`
    pub fn locate(self) -> Result<PathBuf, BuildError> {
        let program = self.program();
        which::which(&program).map_err(|e| BuildError::ExternalToolFailure {
            tool: program,
            reason: format!("cannot be launched: {e}"),
        })
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run `tool` with `args`, writing `stdin` to it, and return its stdout
pub fn run_tool<S: AsRef<OsStr>>(
    tool: Tool,
    args: &[S],
    stdin: Option<&[u8]>,
) -> Result<Vec<u8>, BuildError> {
    let program = tool.locate()?;
    let failure = |reason: String| BuildError::ExternalToolFailure {
        tool: tool.name().to_string(),
        reason,
    };

    tracing::debug!(
        "Running {} {}",
        program.display(),
        args.iter()
            .map(|a| a.as_ref().to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let mut child = Command::new(&program)
        .args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| failure(format!("cannot be launched: {e}")))?;

    // Feed stdin from a helper thread so a full stdout pipe cannot deadlock us
    let (output, fed) = std::thread::scope(|scope| {
        let feeder = child.stdin.take().map(|mut pipe| {
            let input = stdin.unwrap_or_default();
            scope.spawn(move || pipe.write_all(input))
        });
        let output = child.wait_with_output();
        let fed = feeder.map(|handle| handle.join());
        (output, fed)
    });

    let output = output.map_err(|e| failure(format!("failed waiting for exit: {e}")))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(failure(format!("{}: {}", output.status, stderr.trim())));
    }
    match fed {
        Some(Ok(Err(e))) => return Err(failure(format!("failed to write input: {e}"))),
        Some(Err(_)) => return Err(failure("input writer panicked".to_string())),
        _ => {}
    }

    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names() {
        assert_eq!(Tool::Gzip.name(), "gzip");
        assert_eq!(Tool::Mke2fs.name(), "mke2fs");
        assert_eq!(Tool::Mke2fs.to_string(), "mke2fs");
    }

    #[test]
    fn test_gzip_roundtrip() {
        if which::which("gzip").is_err() {
            eprintln!("gzip not installed, skipping");
            return;
        }
        let input = b"initramfs".repeat(1000);
        let compressed = run_tool(Tool::Gzip, &["--best", "-c"], Some(input.as_slice())).unwrap();
        assert!(compressed.starts_with(&[0x1f, 0x8b]));
        assert!(compressed.len() < input.len());
        let restored = run_tool(Tool::Gzip, &["-dc"], Some(compressed.as_slice())).unwrap();
        assert_eq!(restored, input);
    }

    #[test]
    fn test_nonzero_exit_is_failure() {
        if which::which("gzip").is_err() {
            return;
        }
        // not gzip data
        let err = run_tool(Tool::Gzip, &["-dc"], Some(&b"plain text"[..])).unwrap_err();
        match err {
            BuildError::ExternalToolFailure { tool, .. } => assert_eq!(tool, "gzip"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
