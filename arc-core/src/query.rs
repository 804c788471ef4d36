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

//! Resolution, authorization and performing of observable queries.

mod authorization_evaluator;
mod query_performer;
mod query_pipeline;
mod query_registry;
mod query_request;

pub use self::authorization_evaluator::AllowAll;
pub use self::authorization_evaluator::AuthorizationEvaluator;
pub use self::query_performer::QueryPerformer;
pub use self::query_performer::SnapshotsPerformer;
pub use self::query_performer::SubjectPerformer;
pub use self::query_pipeline::QueryPipeline;
pub use self::query_registry::QueryRegistry;
pub use self::query_registry::QueryResolver;
pub use self::query_registry::RegisteredQuery;
pub use self::query_request::QueryRequest;
