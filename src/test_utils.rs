//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a valid file basename
    pub fn file_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9._-]{0,15}"
    }

    /// Generate a set of distinct basenames
    pub fn unique_file_names(max: usize) -> impl Strategy<Value = Vec<String>> {
        prop::collection::btree_set(file_name(), 0..=max).prop_map(|set| set.into_iter().collect())
    }

    /// Generate file contents
    pub fn file_contents() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 0..512)
    }

    /// Generate rwx permission bits
    pub fn mode() -> impl Strategy<Value = u32> {
        0u32..=0o777
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_file_name_generator(name in file_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name != "." && name != "..");
            prop_assert!(!name.contains('/'));
        }

        #[test]
        fn test_unique_file_names_generator(names in unique_file_names(8)) {
            let mut deduped = names.clone();
            deduped.dedup();
            prop_assert_eq!(deduped.len(), names.len());
            prop_assert!(names.len() <= 8);
        }

        #[test]
        fn test_mode_generator(mode in mode()) {
            prop_assert!(mode <= 0o777);
        }
    }
}
