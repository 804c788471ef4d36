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

//! CLI for observing queries.

use arc_client::ClientConfig;
use arc_client::ObservableClient;
use arc_client::QueryArguments;
use std::process::ExitCode;
use tokio::sync::mpsc;

/// Subscribe to a single query and log the values.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = init_logger() {
        println!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }
    let mut args = std::env::args();
    let cli_name = args.next().unwrap_or_default();
    if let Some(origin) = args.next()
        && let Some(route) = args.next()
    {
        let mut arguments = QueryArguments::default();
        for argument in args {
            let Some((name, value)) = argument.split_once('=') else {
                log::warn!("Ignoring argument '{argument}' that is not in 'name=value' form.");
                continue;
            };
            arguments.insert(name, value);
        }
        return observe(&origin, &route, &arguments).await;
    }
    println!(
        "{cli_name} - Arc query observer

Usage:
    {cli_name} [origin] [route] [name=value ...]

Example
    {cli_name} http://localhost:8080 /system/counter/{{start}} start=10
    "
    );
    ExitCode::FAILURE
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    env_logger::builder()
        // Set default log level
        .filter_level(log::LevelFilter::Info)
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

async fn observe(origin: &str, route: &str, arguments: &QueryArguments) -> ExitCode {
    let client = ObservableClient::new(ClientConfig::new(origin));
    let (end_tx, mut end_rx) = mpsc::unbounded_channel();
    let subscription = match client
        .subscribe_with(
            route,
            arguments,
            |value: serde_json::Value| log::info!("{value}"),
            move |error| {
                let _ = end_tx.send(error);
            },
        )
        .await
    {
        Ok(subscription) => subscription,
        Err(e) => {
            log::warn!("Failed to subscribe: {e}");
            return ExitCode::FAILURE;
        }
    };
    log::info!("Observing '{}'.", subscription.url());
    tokio::select! {
        end = end_rx.recv() => match end.flatten() {
            None => {
                log::info!("Query completed.");
                ExitCode::SUCCESS
            }
            Some(e) => {
                log::warn!("Subscription failed: {e}");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            subscription.unsubscribe().await;
            ExitCode::SUCCESS
        }
    }
}
