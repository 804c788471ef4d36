/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Round trip latency statistics.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

/** Lock free tracking of heartbeat round trip times.

The running average is a cumulative mean over all observed samples. A single
[AtomicU64] packs the number of samples with their sum so that readers always
see a consistent pair:

```text
63-40   (24 bits)   Number of samples.
39- 0   (40 bits)   Sum of samples in milliseconds.
```

Samples are capped at [Self::MAX_SAMPLE_MILLIS]. When either field would
overflow, count and sum are halved first. This keeps the mean while older
samples weigh less, and [Self::samples] stops growing at about 2^24.
*/
#[derive(Debug, Default)]
pub struct LatencyTracker {
    last_millis: AtomicU64,
    count_and_sum: AtomicU64,
}

impl LatencyTracker {
    /// Largest sample that is accounted for.
    pub const MAX_SAMPLE_MILLIS: u64 = 0x0000_0000_0000_ffff;
    const COUNT_SHIFT: u32 = 40;
    const MAX_COUNT: u64 = 0x0000_0000_00ff_ffff;
    const COUNT_MASK: u64 = 0xffff_ff00_0000_0000;
    const SUM_MASK: u64 = 0x0000_00ff_ffff_ffff;

    /// Record a new round trip time.
    pub fn record(&self, round_trip: Duration) {
        let raw_millis = u64::try_from(round_trip.as_millis()).unwrap_or(u64::MAX);
        if raw_millis > Self::MAX_SAMPLE_MILLIS && log::log_enabled!(log::Level::Debug) {
            log::debug!("Capped round trip time of {round_trip:?}.");
        }
        let millis = std::cmp::min(Self::MAX_SAMPLE_MILLIS, raw_millis);
        self.last_millis.store(millis, Ordering::Relaxed);
        let _ = self
            .count_and_sum
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |value| {
                let (mut count, mut sum) = Self::unpack(value);
                if count == Self::MAX_COUNT || sum + millis > Self::SUM_MASK {
                    count /= 2;
                    sum /= 2;
                }
                Some(((count + 1) << Self::COUNT_SHIFT) | (sum + millis))
            });
    }

    fn unpack(value: u64) -> (u64, u64) {
        (
            (value & Self::COUNT_MASK) >> Self::COUNT_SHIFT,
            value & Self::SUM_MASK,
        )
    }

    /// Most recent round trip time or zero if none was observed.
    pub fn last(&self) -> Duration {
        Duration::from_millis(self.last_millis.load(Ordering::Relaxed))
    }

    /// Mean of all round trip times or zero if none was observed.
    pub fn average(&self) -> Duration {
        let (count, sum) = Self::unpack(self.count_and_sum.load(Ordering::Relaxed));
        if count == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(sum / count)
    }

    /// Number of observed round trips.
    pub fn samples(&self) -> u64 {
        Self::unpack(self.count_and_sum.load(Ordering::Relaxed)).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_mean() {
        let tracker = LatencyTracker::default();
        assert_eq!(tracker.last(), Duration::ZERO);
        assert_eq!(tracker.average(), Duration::ZERO);
        assert_eq!(tracker.samples(), 0);
        tracker.record(Duration::from_millis(10));
        tracker.record(Duration::from_millis(30));
        tracker.record(Duration::from_millis(20));
        assert_eq!(tracker.last(), Duration::from_millis(20));
        assert_eq!(tracker.average(), Duration::from_millis(20));
        assert_eq!(tracker.samples(), 3);
    }

    #[test]
    fn test_capped_sample() {
        let tracker = LatencyTracker::default();
        tracker.record(Duration::from_secs(3600));
        assert_eq!(
            tracker.last(),
            Duration::from_millis(LatencyTracker::MAX_SAMPLE_MILLIS)
        );
        assert_eq!(tracker.samples(), 1);
    }

    #[test]
    fn test_count_saturates_without_wrapping() {
        let tracker = LatencyTracker::default();
        tracker.count_and_sum.store(
            (LatencyTracker::MAX_COUNT << LatencyTracker::COUNT_SHIFT) | (LatencyTracker::MAX_COUNT * 40),
            Ordering::Relaxed,
        );
        assert_eq!(tracker.average(), Duration::from_millis(40));
        tracker.record(Duration::from_millis(40));
        assert_eq!(tracker.samples(), LatencyTracker::MAX_COUNT / 2 + 1);
        assert_eq!(tracker.average(), Duration::from_millis(40));
    }

    #[test]
    fn test_sum_saturates_without_wrapping() {
        let tracker = LatencyTracker::default();
        tracker.count_and_sum.store(
            (1_000_000 << LatencyTracker::COUNT_SHIFT) | (LatencyTracker::SUM_MASK - 10),
            Ordering::Relaxed,
        );
        tracker.record(Duration::from_millis(LatencyTracker::MAX_SAMPLE_MILLIS));
        assert_eq!(tracker.samples(), 500_001);
        assert!(tracker.average() > Duration::ZERO);
    }
}
