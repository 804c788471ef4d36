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

//! HTTP server and resources.
//!
//! Observable queries are exposed as actorless WebSocket duplex channels
//! initiated by the client.

mod common {
    //! Common API utils.

    mod api_error_mapper;

    pub use api_error_mapper::*;
}
mod ws_resources {
    //! WebSocket resources.

    pub mod ws_observe_resource;
}

pub use self::common::ApiErrorMapper;
use actix_web::App;
use actix_web::HttpServer;
use actix_web::Scope;
use actix_web::web;
use arc_core::conf::AppConfig;
use arc_core::conf::ChannelConfig;
use arc_core::query::QueryPipeline;
use std::sync::Arc;

/// Shared state between requests.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<QueryPipeline>,
    channel_config: ChannelConfig,
}

impl AppState {
    fn new(pipeline: &Arc<QueryPipeline>, channel_config: &ChannelConfig) -> web::Data<Self> {
        web::Data::new(Self {
            pipeline: Arc::clone(pipeline),
            channel_config: channel_config.clone(),
        })
    }
}

/// Scope serving all queries below `base_path`.
fn observe_scope(base_path: &str) -> Scope {
    // An empty scope matches everything
    let scope_path = if base_path == "/" { "" } else { base_path };
    web::scope(scope_path).service(ws_resources::ws_observe_resource::observe_query)
}

/// Run HTTP server until it fails or the surrounding future is dropped.
pub async fn run_http_server(
    app_config: &Arc<AppConfig>,
    pipeline: &Arc<QueryPipeline>,
) -> Result<(), Box<dyn core::error::Error>> {
    let base_path = app_config.api.base_path();
    log::info!(
        "Observable queries are served below http://{}:{}{base_path}",
        app_config.api.bind_address(),
        app_config.api.bind_port(),
    );
    let app_data = AppState::new(pipeline, &app_config.channel);
    HttpServer::new(move || {
        App::new()
            .app_data(app_data.clone())
            .service(observe_scope(&base_path))
    })
    .bind_auto_h2c((app_config.api.bind_address(), app_config.api.bind_port()))?
    .disable_signals()
    .shutdown_timeout(5) // Default 30
    .run()
    .await?;
    Ok(())
}
