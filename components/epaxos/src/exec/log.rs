use std::ops::Range;

/// LogWindow tracks the executed prefix of one log and what has been garbage collected.
///
/// Every position below `min_active` is purged, every position up to `max_executed` is
/// executed, without gaps. Position 0 is never used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogWindow {
    min_active: i64,
    max_executed: i64,
}

impl Default for LogWindow {
    fn default() -> Self {
        LogWindow {
            min_active: 1,
            max_executed: 0,
        }
    }
}

impl LogWindow {
    pub fn new() -> LogWindow {
        LogWindow::default()
    }

    pub fn min_active(&self) -> i64 {
        self.min_active
    }

    pub fn max_executed(&self) -> i64 {
        self.max_executed
    }

    pub fn is_purged(&self, pos: i64) -> bool {
        pos > 0 && pos < self.min_active
    }

    /// advance moves `max_executed` forward over every consecutive executed position.
    pub fn advance<F: Fn(i64) -> bool>(&mut self, is_executed: F) -> i64 {
        while is_executed(self.max_executed + 1) {
            self.max_executed += 1;
        }
        self.max_executed
    }

    /// collect moves `min_active` forward so that at most `retention` executed positions stay,
    /// and returns the range of positions to purge.
    pub fn collect(&mut self, retention: i64) -> Range<i64> {
        let from = self.min_active;
        let target = self.max_executed - retention;
        if target > self.min_active {
            self.min_active = target;
        }
        from..self.min_active
    }
}
