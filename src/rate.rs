/// Poll-rate and frame-rate bookkeeping over a fixed sampling window.
///
/// Published rates hold the last complete window and are never zeroed in
/// between, so readers never observe a partial count.
#[derive(Debug, Clone)]
pub struct RateTracker {
    window_s: f32,
    elapsed_s: f32,
    read_attempts: u32,
    successful_reads: u32,
    poll_rate: u32,
    frame_rate: u32,
}

impl RateTracker {
    /// Default window: one second with a 50 ms margin.
    pub const DEFAULT_WINDOW_S: f32 = 0.95;

    pub fn new(window_s: f32) -> Self {
        Self {
            window_s,
            elapsed_s: 0.0,
            read_attempts: 0,
            successful_reads: 0,
            poll_rate: 0,
            frame_rate: 0,
        }
    }

    /// Account for one poll that took `delta_s` since the previous one.
    pub fn tick(&mut self, delta_s: f32) {
        self.elapsed_s += delta_s;
        self.read_attempts += 1;
    }

    pub fn record_success(&mut self) {
        self.successful_reads += 1;
    }

    /// Close the window if enough time accumulated. Returns true on publish.
    pub fn maybe_publish(&mut self) -> bool {
        if self.elapsed_s < self.window_s {
            return false;
        }
        self.poll_rate = self.read_attempts;
        self.frame_rate = self.successful_reads;
        self.read_attempts = 0;
        self.successful_reads = 0;
        self.elapsed_s = 0.0;
        log::trace!(
            "Rate window closed: poll={}Hz frame={}Hz",
            self.poll_rate,
            self.frame_rate
        );
        true
    }

    pub fn poll_rate(&self) -> u32 {
        self.poll_rate
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn read_attempts(&self) -> u32 {
        self.read_attempts
    }

    pub fn successful_reads(&self) -> u32 {
        self.successful_reads
    }

    pub fn elapsed_s(&self) -> f32 {
        self.elapsed_s
    }
}

impl Default for RateTracker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW_S)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publishes_after_window() {
        let mut rate = RateTracker::default();
        for i in 0..100 {
            rate.tick(0.02);
            if i % 2 == 0 {
                rate.record_success();
            }
            if rate.maybe_publish() {
                break;
            }
        }
        // 48 ticks of 20 ms are the first to reach 0.95 s.
        assert_eq!(rate.poll_rate(), 48);
        assert_eq!(rate.frame_rate(), 24);
        assert_eq!(rate.read_attempts(), 0);
        assert_eq!(rate.successful_reads(), 0);
        assert_eq!(rate.elapsed_s(), 0.0);
    }

    #[test]
    fn test_rates_persist_between_windows() {
        let mut rate = RateTracker::new(0.5);
        rate.tick(0.5);
        rate.record_success();
        assert!(rate.maybe_publish());
        assert_eq!((rate.poll_rate(), rate.frame_rate()), (1, 1));

        rate.tick(0.1);
        assert!(!rate.maybe_publish());
        assert_eq!((rate.poll_rate(), rate.frame_rate()), (1, 1));
        assert_eq!(rate.read_attempts(), 1);
    }

    #[test]
    fn test_nothing_published_before_first_window() {
        let mut rate = RateTracker::default();
        rate.tick(0.2);
        assert!(!rate.maybe_publish());
        assert_eq!(rate.poll_rate(), 0);
        assert_eq!(rate.frame_rate(), 0);
    }
}
