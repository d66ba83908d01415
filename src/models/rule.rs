//! Per-location watch rules.

use chrono::NaiveTime;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("{location}: window end {end} must be after window start {start}")]
    InvertedWindow {
        location: String,
        start: NaiveTime,
        end: NaiveTime,
    },
    #[error("{location}: staleness threshold must be greater than zero")]
    ZeroStaleness { location: String },
    #[error("{location}: invalid file pattern '{pattern}': {message}")]
    BadPattern {
        location: String,
        pattern: String,
        message: String,
    },
}

/// What one monitored location expects and when.
#[derive(Debug, Clone)]
pub struct WatchRule {
    /// Short label used in logs, subjects and incidents (e.g. `HOLD`).
    pub location: String,
    pub folder: PathBuf,
    pub pattern: String,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub stale_after: Duration,
    pub interchange_only: bool,
    /// Accepted name prefixes; empty accepts every name.
    pub accepted_prefixes: Vec<String>,
}

impl WatchRule {
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.window_end <= self.window_start {
            return Err(RuleError::InvertedWindow {
                location: self.location.clone(),
                start: self.window_start,
                end: self.window_end,
            });
        }
        if self.stale_after.is_zero() {
            return Err(RuleError::ZeroStaleness {
                location: self.location.clone(),
            });
        }
        glob::Pattern::new(&self.pattern).map_err(|e| RuleError::BadPattern {
            location: self.location.clone(),
            pattern: self.pattern.clone(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Case-insensitive prefix match against the accepted prefixes.
    pub fn accepts_name(&self, file_name: &str) -> bool {
        if self.accepted_prefixes.is_empty() {
            return true;
        }
        let name = file_name.to_lowercase();
        self.accepted_prefixes
            .iter()
            .filter(|p| !p.trim().is_empty())
            .any(|p| name.starts_with(&p.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> WatchRule {
        WatchRule {
            location: "VendorExtractUtility".to_string(),
            folder: PathBuf::from("/data/vendor"),
            pattern: "*.txt".to_string(),
            window_start: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            window_end: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
            stale_after: Duration::from_secs(600),
            interchange_only: false,
            accepted_prefixes: vec!["C".to_string(), "Pend_C".to_string()],
        }
    }

    #[test]
    fn test_valid_rule() {
        assert!(rule().validate().is_ok());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let mut r = rule();
        r.window_end = r.window_start;
        assert!(matches!(
            r.validate(),
            Err(RuleError::InvertedWindow { .. })
        ));
    }

    #[test]
    fn test_zero_staleness_rejected() {
        let mut r = rule();
        r.stale_after = Duration::ZERO;
        assert!(matches!(r.validate(), Err(RuleError::ZeroStaleness { .. })));
    }

    #[test]
    fn test_prefix_match_is_case_insensitive() {
        let r = rule();
        assert!(r.accepts_name("c_20240301.txt"));
        assert!(r.accepts_name("PEND_C_20240301.txt"));
        assert!(!r.accepts_name("D_20240301.txt"));
    }

    #[test]
    fn test_no_prefixes_accepts_everything() {
        let mut r = rule();
        r.accepted_prefixes.clear();
        assert!(r.accepts_name("anything.txt"));
    }
}
