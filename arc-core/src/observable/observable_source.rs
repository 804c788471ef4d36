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

//! Sources of observable query values.

use super::BehaviorSubject;
use arc_client::ObservableError;
use futures::Stream;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

/// Declared shape of the values a query emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservableShape {
    /// Current value first, then every subsequent value.
    Subject,
    /// Every value is a full replacement of the previous result.
    Snapshots,
}

impl fmt::Display for ObservableShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Subject => write!(f, "subject"),
            Self::Snapshots => write!(f, "snapshots"),
        }
    }
}

/// Single emission of a source, already serialized.
#[derive(Debug)]
pub enum SourceEmission {
    /// Serialized value.
    Value(Value),
    /// The value could not be serialized and should be dropped.
    Unserializable(String),
    /// The source failed.
    Failed(ObservableError),
}

/// Stream of serialized emissions.
pub type EmissionStream = Pin<Box<dyn Stream<Item = SourceEmission> + Send>>;

/// Source of an observable query.
pub enum ObservableSource {
    /// Subscription of a [BehaviorSubject].
    Subject(EmissionStream),
    /// Lazy sequence of full result snapshots.
    Snapshots(EmissionStream),
}

impl ObservableSource {
    /// Subscribe to `subject`.
    ///
    /// The subject's current value will be the first emission.
    pub fn subject<T>(subject: &Arc<BehaviorSubject<T>>) -> Self
    where
        T: Serialize + Clone + Send + 'static,
    {
        Self::Subject(Self::serialized(subject.subscribe()))
    }

    /// Emit every element of `snapshots`.
    ///
    /// Each element is sent as a whole, so an element that is a collection
    /// replaces the previous result at the client.
    pub fn snapshots<T, S>(snapshots: S) -> Self
    where
        T: Serialize + 'static,
        S: Stream<Item = Result<T, ObservableError>> + Send + 'static,
    {
        Self::Snapshots(Self::serialized(snapshots))
    }

    fn serialized<T, S>(values: S) -> EmissionStream
    where
        T: Serialize + 'static,
        S: Stream<Item = Result<T, ObservableError>> + Send + 'static,
    {
        Box::pin(values.map(|res| match res {
            Ok(value) => serde_json::to_value(&value)
                .map(SourceEmission::Value)
                .unwrap_or_else(|e| SourceEmission::Unserializable(e.to_string())),
            Err(e) => SourceEmission::Failed(e),
        }))
    }

    /// Shape of this source.
    pub fn shape(&self) -> ObservableShape {
        match self {
            Self::Subject(_) => ObservableShape::Subject,
            Self::Snapshots(_) => ObservableShape::Snapshots,
        }
    }

    /// Serialized emissions of this source.
    pub fn into_emissions(self) -> EmissionStream {
        match self {
            Self::Subject(emissions) | Self::Snapshots(emissions) => emissions,
        }
    }
}

impl fmt::Debug for ObservableSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ObservableSource({})", self.shape())
    }
}
