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

mod system_queries;

use arc_core::conf::AppConfig;
use arc_core::query::AllowAll;
use arc_core::query::QueryPipeline;
use arc_core::query::QueryRegistry;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::SignalKind;
use tokio::signal::unix::signal;

/// Interval between updates of the system queries.
const SYSTEM_QUERY_TICK: Duration = Duration::from_secs(1);

/// Application main entrypoint.
fn main() -> ExitCode {
    let startup_ts_micros = arc_client::time::get_timestamp_micros();
    if let Err(e) = init_logger() {
        println!("Failed to initialize logging: {e:?}");
        return ExitCode::FAILURE;
    }
    #[cfg(feature = "tracing")]
    {
        // Enable tracing via the RUST_LOG environment variable. Example:
        //
        // ```
        // RUST_LOG="actix_http=trace"
        // ```
        let (non_blocking, _guard) = tracing_appender::non_blocking(std::io::stdout());
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
            .with_writer(non_blocking)
            .init();
    }
    let app_config = Arc::new(AppConfig::new(env!("CARGO_PKG_NAME"), startup_ts_micros));
    match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(run_async(app_config)),
        Err(e) => {
            log::error!("Failed to start async runtime: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize the logging system and apply filters.
fn init_logger() -> Result<(), log::SetLoggerError> {
    env_logger::builder()
        // Set default log level
        .filter_level(log::LevelFilter::Debug)
        // Customize logging for dependencies
        .filter(Some("actix_server::builder"), log::LevelFilter::Warn)
        .filter(Some("actix_http::h1"), log::LevelFilter::Debug)
        .filter(Some("mio::poll"), log::LevelFilter::Debug)
        .filter(Some("arc_api::rest_api::ws_resources"), log::LevelFilter::Info)
        .filter(Some("arc_core::observable"), log::LevelFilter::Info)
        .write_style(env_logger::fmt::WriteStyle::Auto)
        .target(env_logger::fmt::Target::Stdout)
        .is_test(false)
        .parse_env(
            env_logger::Env::new()
                .filter("LOG_LEVEL")
                .write_style("LOG_STYLE"),
        )
        .try_init()
}

/// Async code entry point.
pub async fn run_async(app_config: Arc<AppConfig>) -> ExitCode {
    let registry = QueryRegistry::new();
    system_queries::register_system_queries(&registry, SYSTEM_QUERY_TICK);
    let pipeline = QueryPipeline::new(registry, Arc::new(AllowAll));
    let app_future = arc_api::rest_api::run_http_server(&app_config, &pipeline);
    let signals_future = block_until_signaled();
    let res = tokio::select! {
        res = app_future => {
            log::trace!("app_future finished");
            res
        },
        res = signals_future => {
            log::trace!("signals_future finished");
            res.map_err(|e| Box::new(e) as Box<dyn core::error::Error>)
        },
    }
    .map_err(|e| log::error!("{e}"));
    if res.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Block until SIGTERM or SIGINT is recieved.
async fn block_until_signaled() -> Result<(), std::io::Error> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigterm.recv() => {
            log::debug!("SIGTERM recieved.")
        },
        _ = sigint.recv() => {
            log::debug!("SIGINT recieved.")
        },
    };
    Ok(())
}
