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

//! Producers of observable sources.

use super::QueryRequest;
use crate::observable::BehaviorSubject;
use crate::observable::ObservableShape;
use crate::observable::ObservableSource;
use arc_client::ObservableError;
use futures::Stream;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

/// Produces the source of a query.
#[async_trait::async_trait]
pub trait QueryPerformer: Send + Sync {
    /// Declared shape of the produced sources.
    fn shape(&self) -> ObservableShape;

    /// Produce a source for the request.
    async fn perform(&self, request: &QueryRequest) -> Result<ObservableSource, ObservableError>;
}

/// [QueryPerformer] that subscribes to a [BehaviorSubject] selected by a
/// function.
pub struct SubjectPerformer<T, F> {
    select_subject: F,
    phantom_data: PhantomData<fn() -> T>,
}

impl<T, F> SubjectPerformer<T, F>
where
    T: Serialize + Clone + Send + 'static,
    F: Fn(&QueryRequest) -> Result<Arc<BehaviorSubject<T>>, ObservableError> + Send + Sync,
{
    /// Return a new instance.
    pub fn new(select_subject: F) -> Self {
        Self {
            select_subject,
            phantom_data: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<T, F> QueryPerformer for SubjectPerformer<T, F>
where
    T: Serialize + Clone + Send + 'static,
    F: Fn(&QueryRequest) -> Result<Arc<BehaviorSubject<T>>, ObservableError> + Send + Sync,
{
    fn shape(&self) -> ObservableShape {
        ObservableShape::Subject
    }

    async fn perform(&self, request: &QueryRequest) -> Result<ObservableSource, ObservableError> {
        let subject = (self.select_subject)(request)?;
        Ok(ObservableSource::subject(&subject))
    }
}

/// [QueryPerformer] that emits the snapshots of a stream created by a
/// function.
pub struct SnapshotsPerformer<T, S, F> {
    create_stream: F,
    phantom_data: PhantomData<fn() -> (T, S)>,
}

impl<T, S, F> SnapshotsPerformer<T, S, F>
where
    T: Serialize + 'static,
    S: Stream<Item = Result<T, ObservableError>> + Send + 'static,
    F: Fn(&QueryRequest) -> Result<S, ObservableError> + Send + Sync,
{
    /// Return a new instance.
    pub fn new(create_stream: F) -> Self {
        Self {
            create_stream,
            phantom_data: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<T, S, F> QueryPerformer for SnapshotsPerformer<T, S, F>
where
    T: Serialize + 'static,
    S: Stream<Item = Result<T, ObservableError>> + Send + 'static,
    F: Fn(&QueryRequest) -> Result<S, ObservableError> + Send + Sync,
{
    fn shape(&self) -> ObservableShape {
        ObservableShape::Snapshots
    }

    async fn perform(&self, request: &QueryRequest) -> Result<ObservableSource, ObservableError> {
        let stream = (self.create_stream)(request)?;
        Ok(ObservableSource::snapshots(stream))
    }
}
