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

//! Bounded retry strategy for transport re-establishment.

use std::time::Duration;

/// Capped exponential backoff with a bounded number of attempts.
///
/// The delay before attempt `n` (starting at `1`) is
/// `min(initial_delay * 2^(n-1), max_delay)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_millis(250), Duration::from_secs(30))
    }
}

impl ReconnectPolicy {
    /// Return a new instance.
    ///
    /// At least one connect attempt is always made.
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: std::cmp::max(1, max_attempts),
            initial_delay,
            max_delay: std::cmp::max(initial_delay, max_delay),
        }
    }

    /// Number of consecutive failed connect attempts before giving up.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Return `true` if another attempt is allowed after `failed_attempts`
    /// consecutive failures.
    pub fn allows_retry(&self, failed_attempts: u32) -> bool {
        failed_attempts < self.max_attempts
    }

    /// Delay to wait before connect attempt number `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        std::cmp::min(self.initial_delay.saturating_mul(factor), self.max_delay)
    }
}
