//! cpio stream compression
//!
//! Compresses the serialized archive with `gzip --best`.

use crate::error::BuildError;
use crate::infra::tools::{run_tool, Tool};

/// Compression statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CompressionStats {
    /// Size of the cpio stream
    pub original_size: u64,
    /// Size of the gzip stream
    pub compressed_size: u64,
}

impl CompressionStats {
    /// Calculate compression ratio as a percentage
    pub fn ratio(&self) -> f64 {
        if self.original_size == 0 {
            0.0
        } else {
            (1.0 - (self.compressed_size as f64 / self.original_size as f64)) * 100.0
        }
    }

    /// Calculate bytes saved
    pub fn bytes_saved(&self) -> u64 {
        self.original_size.saturating_sub(self.compressed_size)
    }
}

/// Compress `cpio` at maximum level through the external gzip
pub fn gzip_best(cpio: &[u8]) -> Result<(Vec<u8>, CompressionStats), BuildError> {
    let compressed = run_tool(Tool::Gzip, &["--best", "-c"], Some(cpio))?;
    let stats = CompressionStats {
        original_size: cpio.len() as u64,
        compressed_size: compressed.len() as u64,
    };
    tracing::info!(
        "Compressed cpio {} -> {} bytes ({:.1}% reduction, {} bytes saved)",
        stats.original_size,
        stats.compressed_size,
        stats.ratio(),
        stats.bytes_saved()
    );
    Ok((compressed, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_compression_stats_ratio() {
        let stats = CompressionStats {
            original_size: 1000,
            compressed_size: 400,
        };
        assert!((stats.ratio() - 60.0).abs() < 0.1);
        assert_eq!(stats.bytes_saved(), 600);
    }

    #[test]
    fn test_compression_stats_empty() {
        let stats = CompressionStats::default();
        assert!(stats.ratio().abs() < f64::EPSILON);
        assert_eq!(stats.bytes_saved(), 0);
    }

    #[test]
    fn test_gzip_best_produces_gzip() {
        if which::which("gzip").is_err() {
            eprintln!("gzip not installed, skipping");
            return;
        }
        let cpio = vec![b'0'; 4096];
        let (gz, stats) = gzip_best(&cpio).unwrap();
        assert!(gz.starts_with(&[0x1f, 0x8b]));
        assert_eq!(stats.original_size, 4096);
        assert_eq!(stats.compressed_size, gz.len() as u64);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_compression_ratio_valid(
            original in 1u64..1_000_000,
            compressed in 1u64..1_000_000
        ) {
            let stats = CompressionStats {
                original_size: original,
                compressed_size: compressed.min(original),
            };
            let ratio = stats.ratio();
            prop_assert!((0.0..=100.0).contains(&ratio), "Ratio should be 0-100%");
        }
    }
}
