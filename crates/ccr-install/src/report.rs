//! User-facing progress sink.

/// Severity of a progress line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
}

/// Receives progress lines meant for the person running the installer.
///
/// Diagnostics go through `tracing` instead.
pub trait Reporter {
    fn report(&mut self, level: Level, message: &str);

    fn info(&mut self, message: &str) {
        self.report(Level::Info, message);
    }

    fn success(&mut self, message: &str) {
        self.report(Level::Success, message);
    }

    fn warn(&mut self, message: &str) {
        self.report(Level::Warn, message);
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    pub lines: Vec<(Level, String)>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.at(Level::Warn)
    }

    pub fn at(&self, level: Level) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.as_str())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|(_, m)| m.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn report(&mut self, level: Level, message: &str) {
        self.lines.push((level, message.to_string()));
    }
}
