/// Line-oriented log of a single run. Every line is mirrored to `tracing` so a
/// terminal user sees it live, and kept in order so a caller (or a background
/// worker) can hand the whole transcript back with the outcome.
#[derive(Debug, Default, Clone)]
pub struct RunLog {
    lines: Vec<String>,
    warnings: usize,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!("{line}");
        self.lines.push(line);
    }

    pub fn warn(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::warn!("{line}");
        self.lines.push(format!("[WARN] {line}"));
        self.warnings += 1;
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    /// Close the log. The run succeeded when it produced a value.
    pub fn finish<T>(self, value: Option<T>) -> RunOutcome<T> {
        let warnings = self.warning_count();
        RunOutcome {
            success: value.is_some(),
            log: self.lines,
            warnings,
            value,
        }
    }
}

#[cfg(test)]
impl RunLog {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

/// What a run reports back: a success flag and the captured log, plus
/// whatever the run produced when it succeeded.
#[derive(Debug, Clone)]
pub struct RunOutcome<T> {
    pub success: bool,
    pub log: Vec<String>,
    pub warnings: usize,
    pub value: Option<T>,
}

impl<T> RunOutcome<T> {
    /// For a failed run, the last warning; it names the error.
    pub fn failure(&self) -> Option<&str> {
        if self.success {
            return None;
        }
        self.log
            .iter()
            .rev()
            .find_map(|l| l.strip_prefix("[WARN] "))
    }
}
