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

//! Time related utility functions.

use std::time::SystemTime;

/// Microseconds since UNIX epoch.
///
/// A clock set before the epoch yields `0`.
pub fn get_timestamp_micros() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| u64::try_from(duration.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Milliseconds since UNIX epoch as carried by heartbeat frames.
pub fn get_timestamp_millis() -> i64 {
    i64::try_from(get_timestamp_micros() / 1_000).unwrap_or(i64::MAX)
}
