//! Block window scanned on each poll tick.

/// Inclusive block range `[from_block, to_block]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchWindow {
    pub from_block: u64,
    pub to_block: u64,
}

impl WatchWindow {
    /// `[max(start_block, head - lookback), head]`, or `None` while the head
    /// is still behind the block the session started at.
    pub fn compute(start_block: u64, head: u64, lookback: u64) -> Option<Self> {
        if head < start_block {
            return None;
        }
        Some(Self {
            from_block: head.saturating_sub(lookback).max(start_block),
            to_block: head,
        })
    }

    /// Heights newest first.
    pub fn descending(&self) -> impl Iterator<Item = u64> {
        (self.from_block..=self.to_block).rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_clamped_to_start_block() {
        let window = WatchWindow::compute(100, 103, 10).unwrap();
        assert_eq!(window, WatchWindow { from_block: 100, to_block: 103 });
    }

    #[test]
    fn test_window_uses_lookback_when_far_ahead() {
        let window = WatchWindow::compute(100, 250, 10).unwrap();
        assert_eq!(window.from_block, 240);
        assert_eq!(window.to_block, 250);
    }

    #[test]
    fn test_head_behind_start_yields_nothing() {
        assert!(WatchWindow::compute(100, 99, 10).is_none());
    }

    #[test]
    fn test_low_heights_do_not_underflow() {
        let window = WatchWindow::compute(0, 3, 10).unwrap();
        assert_eq!(window.from_block, 0);
    }

    #[test]
    fn test_from_block_never_precedes_start() {
        for start in 0..40u64 {
            for head in start..start + 40 {
                let window = WatchWindow::compute(start, head, 10).unwrap();
                assert!(window.from_block >= start);
                assert!(window.to_block - window.from_block <= 10);
            }
        }
    }

    #[test]
    fn test_descending_order() {
        let window = WatchWindow::compute(5, 8, 10).unwrap();
        assert_eq!(window.descending().collect::<Vec<_>>(), vec![8, 7, 6, 5]);
    }
}
