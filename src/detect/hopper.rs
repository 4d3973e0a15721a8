//! Channel Hop Scheduler
//!
//! Non-preemptive, polled scheduler that walks the radio through the working
//! channel set while monitoring is active. Invoked once per control-loop
//! iteration; there is no timer thread. The hop reference advances in whole
//! intervals, so however sparsely the loop polls, the number of hops
//! performed after elapsed time T is exactly floor(T / interval).

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::wireless::capture::Radio;

/// Cycles the radio through the working channel set at a fixed interval
#[derive(Debug)]
pub struct ChannelHopScheduler {
    channels: Vec<u8>,
    interval: Duration,
    index: usize,
    last_hop: Instant,
    hops: u64,
}

impl ChannelHopScheduler {
    /// Build a scheduler over `channels`, hopping every `interval`.
    ///
    /// An empty channel set is allowed and makes the scheduler idle — the
    /// operator chose to monitor nothing when discovery came up empty.
    pub fn new(channels: Vec<u8>, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        Self {
            channels,
            interval,
            index: 0,
            last_hop: Instant::now(),
            hops: 0,
        }
    }

    /// Tune to the first channel of the set and restart the hop clock.
    /// Called when monitoring (re)starts.
    pub fn reset<R: Radio>(&mut self, radio: &mut R, now: Instant) {
        self.index = 0;
        self.last_hop = now;
        if let Some(&first) = self.channels.first() {
            if let Err(e) = radio.set_channel(first) {
                warn!("failed to tune to initial channel {}: {}", first, e);
            }
        }
    }

    /// Hop if the interval has elapsed. Returns the channel tuned to when a
    /// hop happened.
    ///
    /// A poll later than one interval advances through every hop due, so
    /// hop counting tracks wall time rather than poll cadence. On a retune
    /// failure nothing advances and the hop is retried next poll.
    pub fn poll<R: Radio>(&mut self, radio: &mut R, now: Instant) -> Option<u8> {
        if self.channels.is_empty() {
            return None;
        }

        let elapsed = now.duration_since(self.last_hop);
        if elapsed < self.interval {
            return None;
        }

        let due = (elapsed.as_nanos() / self.interval.as_nanos()) as usize;
        let next_index = (self.index + due) % self.channels.len();
        let channel = self.channels[next_index];

        if let Err(e) = radio.set_channel(channel) {
            warn!("channel hop to {} failed: {}", channel, e);
            return None;
        }

        self.index = next_index;
        self.last_hop += self.interval * due as u32;
        self.hops += due as u64;
        debug!("hopped to channel {}", channel);
        Some(channel)
    }

    /// Channel the scheduler currently points at
    pub fn current(&self) -> Option<u8> {
        self.channels.get(self.index).copied()
    }

    /// Total hops performed since construction
    pub fn hops(&self) -> u64 {
        self.hops
    }

    /// Working set size
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRadio;

    #[test]
    fn test_no_hop_before_interval() {
        let mut radio = MockRadio::new();
        let start = Instant::now();
        let mut hopper = ChannelHopScheduler::new(vec![1, 6, 11], Duration::from_millis(100));
        hopper.reset(&mut radio, start);

        assert_eq!(hopper.poll(&mut radio, start + Duration::from_millis(99)), None);
        assert_eq!(hopper.current(), Some(1));
        assert_eq!(hopper.hops(), 0);
    }

    #[test]
    fn test_hops_wrap_through_set() {
        let mut radio = MockRadio::new();
        let start = Instant::now();
        let mut hopper = ChannelHopScheduler::new(vec![1, 6, 11], Duration::from_millis(100));
        hopper.reset(&mut radio, start);

        let mut t = start;
        let expected = [6, 11, 1, 6];
        for &ch in &expected {
            t += Duration::from_millis(100);
            assert_eq!(hopper.poll(&mut radio, t), Some(ch));
        }
        assert_eq!(hopper.hops(), 4);
        // reset() tuned channel 1, then each hop tuned once
        assert_eq!(radio.tuned, vec![1, 6, 11, 1, 6]);
    }

    #[test]
    fn test_exactly_floor_t_over_h_hops() {
        let mut radio = MockRadio::new();
        let start = Instant::now();
        let h = Duration::from_millis(75);
        let mut hopper = ChannelHopScheduler::new(vec![1, 6, 11], h);
        hopper.reset(&mut radio, start);

        // One sparse poll after 7.5 intervals: all 7 due hops are performed
        let t = start + h * 7 + h / 2;
        hopper.poll(&mut radio, t);
        assert_eq!(hopper.hops(), 7);
        // 7 mod 3 = 1 → channel 6
        assert_eq!(hopper.current(), Some(6));

        // Immediately after, nothing further is due
        assert_eq!(hopper.poll(&mut radio, t), None);
        assert_eq!(hopper.hops(), 7);
    }

    #[test]
    fn test_single_channel_set_never_changes_channel() {
        let mut radio = MockRadio::new();
        let start = Instant::now();
        let mut hopper = ChannelHopScheduler::new(vec![6], Duration::from_millis(100));
        hopper.reset(&mut radio, start);

        for i in 1..=5 {
            hopper.poll(&mut radio, start + Duration::from_millis(100 * i));
        }
        assert!(radio.tuned.iter().all(|&c| c == 6));
        assert_eq!(hopper.current(), Some(6));
    }

    #[test]
    fn test_empty_set_idles() {
        let mut radio = MockRadio::new();
        let start = Instant::now();
        let mut hopper = ChannelHopScheduler::new(vec![], Duration::from_millis(100));
        hopper.reset(&mut radio, start);

        assert_eq!(hopper.poll(&mut radio, start + Duration::from_secs(10)), None);
        assert!(radio.tuned.is_empty());
        assert_eq!(hopper.current(), None);
    }
}
