//! Verbosity-gated diagnostics for network construction.
//!
//! Nothing is formatted when the verbosity is below the macro's level.
//! Levels:
//! - 0: SILENT (errors are reported by the caller)
//! - 1: STAGES (one summary line per synthesis/propagation stage)
//! - 2: CHECKS (per-activity decisions: dummies, reroutes, skipped records)
//! - 3: DEBUG (activity table dumps, topological order)

/// Verbosity level constants.
pub const VERBOSITY_SILENT: u8 = 0;
pub const VERBOSITY_STAGES: u8 = 1;
pub const VERBOSITY_CHECKS: u8 = 2;
pub const VERBOSITY_DEBUG: u8 = 3;

/// Log at STAGES level (verbosity >= 1).
#[macro_export]
macro_rules! log_stage {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_STAGES {
            eprintln!($($arg)*);
        }
    };
}

/// Log at CHECKS level (verbosity >= 2).
///
/// Used for: dummy insertion, duplicate rerouting, lenient record skips.
#[macro_export]
macro_rules! log_check {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_CHECKS {
            eprintln!($($arg)*);
        }
    };
}

/// Log at DEBUG level (verbosity >= 3).
#[macro_export]
macro_rules! log_debug {
    ($verbosity:expr, $($arg:tt)*) => {
        if $verbosity >= $crate::logging::VERBOSITY_DEBUG {
            eprintln!($($arg)*);
        }
    };
}

/// Clamp a repeated `-v` count to the highest known level.
pub fn verbosity_from_count(count: u8) -> u8 {
    count.min(VERBOSITY_DEBUG)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_ordering() {
        assert!(VERBOSITY_SILENT < VERBOSITY_STAGES);
        assert!(VERBOSITY_STAGES < VERBOSITY_CHECKS);
        assert!(VERBOSITY_CHECKS < VERBOSITY_DEBUG);
    }

    #[test]
    fn test_verbosity_from_count_clamps() {
        assert_eq!(verbosity_from_count(0), VERBOSITY_SILENT);
        assert_eq!(verbosity_from_count(2), VERBOSITY_CHECKS);
        assert_eq!(verbosity_from_count(9), VERBOSITY_DEBUG);
    }

    #[test]
    fn test_log_macros_silent() {
        let verbosity = VERBOSITY_SILENT;
        log_stage!(verbosity, "stage {}", 1);
        log_check!(verbosity, "check {}", 2);
        log_debug!(verbosity, "debug {}", 3);
    }
}
