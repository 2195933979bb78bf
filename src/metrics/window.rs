use std::collections::VecDeque;

pub const DEFAULT_WINDOW_SECS: f64 = 1.0;

/// Trailing window of frame timestamps, oldest first.
///
/// Every append evicts from the head while the head is strictly older than
/// `span` seconds relative to the newest tick, so `count()` is the number of
/// frames seen in the last `span` seconds. Ticks must arrive in non-decreasing
/// order; that is not checked.
#[derive(Clone, Debug)]
pub struct FrameTimestampWindow {
    ticks: VecDeque<f64>,
    span: f64,
}

impl FrameTimestampWindow {
    pub fn new() -> Self {
        FrameTimestampWindow::with_span(DEFAULT_WINDOW_SECS)
    }

    pub fn with_span(span: f64) -> Self {
        FrameTimestampWindow {
            ticks: VecDeque::new(),
            span,
        }
    }

    pub fn append(&mut self, timestamp: f64) {
        self.ticks.push_back(timestamp);
        while let Some(&oldest) = self.ticks.front() {
            if timestamp - oldest > self.span {
                self.ticks.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn count(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn span(&self) -> f64 {
        self.span
    }

    pub fn oldest(&self) -> Option<f64> {
        self.ticks.front().copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.ticks.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.ticks.iter().copied()
    }
}

impl Default for FrameTimestampWindow {
    fn default() -> Self {
        FrameTimestampWindow::new()
    }
}

#[cfg(test)]
mod tests {
    use super::FrameTimestampWindow;

    #[test]
    fn tick_exactly_one_span_old_is_retained() {
        let mut window = FrameTimestampWindow::new();
        window.append(0.0);
        window.append(1.0);
        assert_eq!(window.count(), 2);
        assert_eq!(window.oldest(), Some(0.0));

        window.append(1.000_001);
        assert_eq!(window.count(), 2);
        assert_eq!(window.oldest(), Some(1.0));
    }

    #[test]
    fn gap_longer_than_span_leaves_only_latest() {
        let mut window = FrameTimestampWindow::new();
        for i in 0..10 {
            window.append(i as f64 * 0.01);
        }
        window.append(5.0);
        assert_eq!(window.count(), 1);
        assert_eq!(window.latest(), Some(5.0));
    }

    #[test]
    fn duplicate_timestamps_are_all_counted() {
        let mut window = FrameTimestampWindow::new();
        window.append(2.0);
        window.append(2.0);
        window.append(2.0);
        assert_eq!(window.count(), 3);
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![2.0, 2.0, 2.0]);
    }
}
