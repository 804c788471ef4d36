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

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod conf;
pub mod connection;
pub mod endpoint;
pub mod frame;
mod observable_client;
mod observable_error;
pub mod subscription;
pub mod time;

pub use self::conf::ClientConfig;
pub use self::endpoint::QueryArguments;
pub use self::observable_client::ObservableClient;
pub use self::observable_error::ObservableError;
pub use self::observable_error::ObservableErrorKind;
pub use self::subscription::QueryObserver;
pub use self::subscription::SubscriptionHandle;
