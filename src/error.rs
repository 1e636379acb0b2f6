//! Error types for evictkit.
//!
//! Cache misses are never errors; they surface as `None`. The two error types
//! here cover the only fallible surfaces of the crate:
//!
//! - [`ConfigError`]: a fallible constructor rejected a parameter (for example
//!   an LRU-K promotion threshold of 0 or a zero LFU aging ceiling).
//! - [`InvariantError`]: `check_invariants` found the lookup map and the
//!   ordering structures out of agreement.
//!
//! ## Example Usage
//!
//! ```
//! use evictkit::error::ConfigError;
//! use evictkit::policy::lru_k::LruKCache;
//!
//! let cache: Result<LruKCache<u64, String>, ConfigError> = LruKCache::try_new(16, 32, 2);
//! assert!(cache.is_ok());
//!
//! let bad = LruKCache::<u64, String>::try_new(16, 32, 0);
//! assert!(bad.unwrap_err().message().contains("k"));
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when a cache parameter is rejected by a fallible constructor.
///
/// Capacity is never rejected: a capacity of 0 builds a cache that stores
/// nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid cache configuration: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned by `check_invariants` when internal bookkeeping is
/// inconsistent.
///
/// Seeing one of these outside of a test means a bug in the cache itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache invariant violated: {}", self.0)
    }
}

impl std::error::Error for InvariantError {}

/// Returns `Err(InvariantError)` carrying the formatted message unless `cond`
/// holds.
macro_rules! ensure_invariant {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::InvariantError::new(format!($($arg)+)));
        }
    };
}

pub(crate) use ensure_invariant;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- ConfigError ------------------------------------------------------

    #[test]
    fn config_display_prefixes_context() {
        let err = ConfigError::new("k must be >= 1");
        assert_eq!(
            err.to_string(),
            "invalid cache configuration: k must be >= 1"
        );
    }

    #[test]
    fn config_message_accessor() {
        let err = ConfigError::new("ceiling");
        assert_eq!(err.message(), "ceiling");
    }

    #[test]
    fn config_implements_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<ConfigError>();
    }

    // -- InvariantError ---------------------------------------------------

    #[test]
    fn invariant_display_prefixes_context() {
        let err = InvariantError::new("map has 3 entries, list has 2");
        assert_eq!(
            err.to_string(),
            "cache invariant violated: map has 3 entries, list has 2"
        );
    }

    #[test]
    fn invariant_clone_and_eq() {
        let a = InvariantError::new("x");
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn ensure_invariant_short_circuits() {
        fn check(len: usize) -> Result<(), InvariantError> {
            ensure_invariant!(len <= 2, "len {} exceeds capacity {}", len, 2);
            Ok(())
        }

        assert!(check(2).is_ok());
        let err = check(3).unwrap_err();
        assert_eq!(err.message(), "len 3 exceeds capacity 2");
    }
}
