//! Application id extraction from spark-submit output.
//!
//! The launcher's client log announces the id the cluster assigned to the
//! submission, e.g.
//!
//! ```text
//! INFO Client: Submitting application application_1486558679801_1820 to ResourceManager
//! ```
//!
//! [`LogScanner`] consumes output one line at a time and records the first id
//! found after one of its marker patterns. Everything else is ignored.

mod patterns;

pub use patterns::{PatternError, PatternSet, DEFAULT_PATTERNS};

/// Scanner state. The only transition is `NotFound` to `Found`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    NotFound,
    Found(String),
}

/// Streaming job id extractor. One instance per submission.
#[derive(Debug, Clone)]
pub struct LogScanner {
    patterns: PatternSet,
    state: ScanState,
}

impl LogScanner {
    /// Scanner using [`DEFAULT_PATTERNS`].
    pub fn new() -> Self {
        Self::with_patterns(PatternSet::default())
    }

    pub fn with_patterns(patterns: PatternSet) -> Self {
        Self {
            patterns,
            state: ScanState::NotFound,
        }
    }

    /// Feed one line of output.
    ///
    /// Returns true only for the line that moved the scanner to `Found`.
    /// Once found, further lines are not inspected.
    pub fn feed(&mut self, line: &str) -> bool {
        if let ScanState::Found(_) = self.state {
            return false;
        }

        match self.patterns.find_id(line) {
            Some(id) => {
                self.state = ScanState::Found(id);
                true
            }
            None => false,
        }
    }

    /// Feed every line of a finite sequence and return the captured id.
    pub fn scan_lines<I, S>(mut self, lines: I) -> Option<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.feed(line.as_ref());
        }
        self.into_application_id()
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn is_found(&self) -> bool {
        matches!(self.state, ScanState::Found(_))
    }

    /// The captured id, if any line has matched so far.
    pub fn application_id(&self) -> Option<&str> {
        match &self.state {
            ScanState::Found(id) => Some(id),
            ScanState::NotFound => None,
        }
    }

    pub fn into_application_id(self) -> Option<String> {
        match self.state {
            ScanState::Found(id) => Some(id),
            ScanState::NotFound => None,
        }
    }
}

impl Default for LogScanner {
    fn default() -> Self {
        Self::new()
    }
}
