use crate::config::Config;
use crate::history::History;

/// State that lives for the whole shell session.
///
/// Owned by the top-level loop and lent to the line editor, the executor and
/// the built-ins. Nothing in the crate keeps this state in globals.
#[derive(Debug, Clone)]
pub struct Session {
    /// Previously entered lines, newest first.
    pub history: History,
    /// Set by `exit`; the read-eval loop stops once it is true.
    pub should_exit: bool,
    /// Record blank lines into history.
    pub keep_blank: bool,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            history: History::new(config.history_size),
            should_exit: false,
            keep_blank: config.keep_blank,
        }
    }

    /// Record a freshly read line, skipping blank ones unless configured otherwise.
    pub fn remember(&mut self, line: &str) {
        if line.trim().is_empty() && !self.keep_blank {
            return;
        }
        tracing::debug!(line, "recording history entry");
        self.history.record(line);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
