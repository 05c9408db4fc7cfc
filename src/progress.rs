use std::io::{self, Write};
use std::time::Instant;

/// Timestamped status lines on stderr, so stdout stays free for pass summaries.
#[derive(Clone, Debug)]
pub struct ConsoleProgress {
    enabled: bool,
    t0: Instant,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            t0: Instant::now(),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.emit(msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.emit(&format!("warning: {}", msg.as_ref()));
    }

    /// Prints at every tenth of `total` and on the last item.
    pub fn progress(&self, label: &str, current: usize, total: usize) {
        if !is_milestone(current, total) {
            return;
        }
        let total = total.max(1);
        let done = current.min(total);
        let pct = done as f64 * 100.0 / total as f64;
        self.emit(&format!("{label} {done}/{total} ({pct:5.1}%)"));
    }

    fn emit(&self, line: &str) {
        if !self.enabled {
            return;
        }
        let elapsed = fmt_elapsed(self.t0.elapsed().as_secs());
        let _ = writeln!(io::stderr().lock(), "[{elapsed}] {line}");
    }
}

fn is_milestone(current: usize, total: usize) -> bool {
    if total <= 10 || current >= total {
        return true;
    }
    current % total.div_ceil(10) == 0
}

fn fmt_elapsed(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, secs / 60 % 60, secs % 60);
    if h == 0 {
        format!("{m:02}:{s:02}")
    } else {
        format!("{h:02}:{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestones_thin_out_long_runs() {
        assert!(is_milestone(3, 7));
        let hits = (1..=1000).filter(|&i| is_milestone(i, 1000)).count();
        assert_eq!(hits, 10);
        assert!(is_milestone(1000, 1000));
        assert!(!is_milestone(1, 1000));
    }

    #[test]
    fn elapsed_format() {
        assert_eq!(fmt_elapsed(5), "00:05");
        assert_eq!(fmt_elapsed(3725), "01:02:05");
    }
}
