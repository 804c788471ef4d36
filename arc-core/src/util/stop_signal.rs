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

//! One-shot stop signal for async tasks.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use tokio::sync::Semaphore;

/// Signal that can be awaited by any number of tasks and is raised once.
pub struct StopSignal {
    raised: AtomicBool,
    semaphore: Semaphore,
}

impl StopSignal {
    /// Return a new instance.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            raised: AtomicBool::default(),
            semaphore: Semaphore::new(0),
        })
    }

    /// Wait until the signal is raised.
    pub async fn raised(&self) {
        let _ = self.semaphore.acquire().await;
    }

    /// Return `true` if the signal has been raised.
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Relaxed)
    }

    /// Raise the signal and wake all awaiting tasks.
    pub fn raise(&self) {
        // Only add permits once.
        if !self.raised.swap(true, Ordering::Relaxed) {
            self.semaphore.add_permits(Semaphore::MAX_PERMITS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_raise_wakes_all() {
        let stop_signal = StopSignal::new();
        let waiters = (0..3)
            .map(|_| {
                let stop_signal = Arc::clone(&stop_signal);
                tokio::spawn(async move { stop_signal.raised().await })
            })
            .collect::<Vec<_>>();
        assert!(!stop_signal.is_raised());
        stop_signal.raise();
        stop_signal.raise();
        assert!(stop_signal.is_raised());
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
        }
    }
}
