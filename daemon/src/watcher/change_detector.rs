//! Suppresses repeated notifications for the same tail line.

/// Remembers the last accepted raw line.
///
/// File notifications can fire more than once per append (content, then the
/// trailing newline), and how often varies by platform. Comparison is on the
/// raw text, so two lines that parse to the same record are both accepted.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_line: Option<String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `line` differs from the previously accepted line.
    pub fn accept(&mut self, line: &str) -> bool {
        if self.last_line.as_deref() == Some(line) {
            return false;
        }
        self.last_line = Some(line.to_string());
        true
    }
}
