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

//! Client side configuration.
//!
//! Configuration is passed explicitly to the client at construction. Only the
//! composition boundary (like a CLI) decides on process wide defaults.

mod client_config;
mod connection_config;
mod reconnect_policy;

pub use self::client_config::ClientConfig;
pub use self::connection_config::ConnectionConfig;
pub use self::reconnect_policy::ReconnectPolicy;
