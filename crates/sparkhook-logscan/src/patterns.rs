//! Marker patterns for application id lines.

use regex_lite::Regex;

/// Patterns used when none are configured.
///
/// Each has exactly one capture group holding the id.
pub const DEFAULT_PATTERNS: &[&str] = &[
    // YARN client: "Submitting application ..." / YarnClientImpl: "Submitted application ..."
    r"Submit(?:ting|ted) application (application_\d+_\d+)",
    // Standalone cluster mode
    r"(?:Submitted driver|Driver successfully submitted as) (driver-\d+-\d+)",
];

/// Errors building a [`PatternSet`].
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("invalid pattern '{pattern}': {reason}")]
    Invalid { pattern: String, reason: String },

    #[error("pattern '{pattern}' must have exactly one capture group, found {found}")]
    CaptureGroups { pattern: String, found: usize },

    #[error("no patterns configured")]
    Empty,
}

/// An ordered list of compiled marker patterns.
///
/// For a given line, patterns are tried in order and the first one that
/// matches supplies the id.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    /// Compile a set of patterns.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let regex = Regex::new(pattern).map_err(|e| PatternError::Invalid {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

            // captures_len counts the implicit whole-match group
            let groups = regex.captures_len() - 1;
            if groups != 1 {
                return Err(PatternError::CaptureGroups {
                    pattern: pattern.to_string(),
                    found: groups,
                });
            }
            compiled.push(regex);
        }

        if compiled.is_empty() {
            return Err(PatternError::Empty);
        }

        Ok(Self { patterns: compiled })
    }

    /// Source text of each pattern, in match order.
    pub fn as_strs(&self) -> Vec<&str> {
        self.patterns.iter().map(Regex::as_str).collect()
    }

    pub(crate) fn find_id(&self, line: &str) -> Option<String> {
        self.patterns.iter().find_map(|re| {
            re.captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        let patterns = DEFAULT_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("built-in pattern must compile"))
            .collect();
        Self { patterns }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_compile() {
        let set = PatternSet::new(DEFAULT_PATTERNS).unwrap();
        assert_eq!(set.as_strs(), DEFAULT_PATTERNS.to_vec());
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let result = PatternSet::new(["Submitting application (application_\\d+"]);
        assert!(matches!(result, Err(PatternError::Invalid { .. })));
    }

    #[test]
    fn test_capture_group_count_enforced() {
        let none = PatternSet::new(["application_\\d+_\\d+"]);
        assert!(matches!(
            none,
            Err(PatternError::CaptureGroups { found: 0, .. })
        ));

        let two = PatternSet::new(["(Submitting) application (application_\\d+_\\d+)"]);
        assert!(matches!(
            two,
            Err(PatternError::CaptureGroups { found: 2, .. })
        ));
    }

    #[test]
    fn test_empty_rejected() {
        let result = PatternSet::new(Vec::<String>::new());
        assert!(matches!(result, Err(PatternError::Empty)));
    }

    #[test]
    fn test_custom_pattern() {
        let set = PatternSet::new([r"Job id: (job-[a-z0-9]+)"]).unwrap();
        assert_eq!(set.find_id("INFO Job id: job-abc123 queued").as_deref(), Some("job-abc123"));
        assert_eq!(set.find_id("INFO nothing here"), None);
    }

    #[test]
    fn test_first_pattern_wins_within_line() {
        let set = PatternSet::new([r"first=(\w+)", r"second=(\w+)"]).unwrap();
        assert_eq!(set.find_id("second=b first=a").as_deref(), Some("a"));
    }
}
