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

//! Server side of observable queries.
//!
//! An [ObservableSource] is either a subscription of a [BehaviorSubject] or a
//! lazy stream of full result snapshots. The [ObservableAdapter] sends its
//! emissions as data frames over an externally supplied [ChannelSession].

mod behavior_subject;
mod channel_session;
mod observable_adapter;
mod observable_source;

pub use self::behavior_subject::BehaviorSubject;
pub use self::channel_session::ChannelCloseReason;
pub use self::channel_session::ChannelSession;
pub use self::channel_session::PeerEvent;
pub use self::channel_session::PeerEventStream;
pub use self::observable_adapter::AdapterHandle;
pub use self::observable_adapter::AdapterOutcome;
pub use self::observable_adapter::ObservableAdapter;
pub use self::observable_source::EmissionStream;
pub use self::observable_source::ObservableShape;
pub use self::observable_source::ObservableSource;
pub use self::observable_source::SourceEmission;
