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

//! End to end tests of the WebSocket transport against a loopback server.

use arc_client::ClientConfig;
use arc_client::ObservableClient;
use arc_client::ObservableError;
use arc_client::ObservableErrorKind;
use arc_client::QueryArguments;
use arc_client::conf::ConnectionConfig;
use arc_client::conf::ReconnectPolicy;
use arc_client::frame::Frame;
use futures::SinkExt;
use futures::StreamExt;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

fn initialize_env_logger() {
    env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .map_err(|e| log::trace!("Env logger for testing was probably already initialized: {e:?}"))
        .ok();
}

fn client_config(origin: &str) -> ClientConfig {
    ClientConfig::new(origin).with_connection(
        ConnectionConfig::default()
            .with_ping_interval(Duration::from_millis(20))
            .with_reconnect_policy(ReconnectPolicy::new(
                3,
                Duration::from_millis(10),
                Duration::from_millis(50),
            )),
    )
}

async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("Timed out.")
}

/// Accept a single WebSocket, emit `values`, answer one client ping and
/// close with `close_code`.
async fn serve_values(listener: TcpListener, values: Vec<u64>, close_code: CloseCode) {
    let (tcp_stream, _) = listener.accept().await.unwrap();
    let mut ws_stream = tokio_tungstenite::accept_async(tcp_stream).await.unwrap();
    for value in values {
        let text = Frame::data(serde_json::json!(value)).encode().unwrap();
        ws_stream.send(Message::text(text)).await.unwrap();
    }
    while let Some(Ok(message)) = ws_stream.next().await {
        if let Message::Text(text) = message
            && let Ok(Frame::Ping { timestamp }) = Frame::decode(text.as_str())
        {
            let pong = Frame::pong(timestamp).encode().unwrap();
            ws_stream.send(Message::text(pong)).await.unwrap();
            break;
        }
    }
    let _ = ws_stream
        .close(Some(CloseFrame {
            code: close_code,
            reason: "done".into(),
        }))
        .await;
    // Drain until the client acknowledges the close
    while let Some(Ok(_)) = ws_stream.next().await {}
}

async fn subscribe_counter(
    client: &ObservableClient,
) -> (
    arc_client::SubscriptionHandle,
    mpsc::UnboundedReceiver<u64>,
    mpsc::UnboundedReceiver<Option<ObservableError>>,
) {
    let (value_tx, value_rx) = mpsc::unbounded_channel();
    let (end_tx, end_rx) = mpsc::unbounded_channel();
    let handle = client
        .subscribe_with(
            "/counter/{start}",
            &QueryArguments::default().with("start", 1),
            move |value: u64| {
                let _ = value_tx.send(value);
            },
            move |error| {
                let _ = end_tx.send(error);
            },
        )
        .await
        .unwrap();
    (handle, value_rx, end_rx)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_values_heartbeat_and_completion() {
    initialize_env_logger();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(serve_values(listener, vec![1, 2, 3], CloseCode::Normal));
    let client = ObservableClient::new(client_config(&origin));
    let (handle, mut value_rx, mut end_rx) = subscribe_counter(&client).await;
    for expected in 1..=3 {
        assert_eq!(within(value_rx.recv()).await, Some(expected));
    }
    assert!(within(end_rx.recv()).await.unwrap().is_none());
    assert!(handle.latency_samples() >= 1);
    within(server).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_source_failure_close() {
    initialize_env_logger();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(serve_values(listener, vec![7], CloseCode::Error));
    let client = ObservableClient::new(client_config(&origin));
    let (_handle, mut value_rx, mut end_rx) = subscribe_counter(&client).await;
    assert_eq!(within(value_rx.recv()).await, Some(7));
    let error = within(end_rx.recv()).await.unwrap().unwrap();
    assert_eq!(error.kind(), &ObservableErrorKind::SourceFailure);
    within(server).await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_upgrade_is_not_retried() {
    initialize_env_logger();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    let (accepted_tx, mut accepted_rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((mut tcp_stream, _)) = listener.accept().await {
            let _ = accepted_tx.send(());
            let _ = tcp_stream
                .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n")
                .await;
            let _ = tcp_stream.shutdown().await;
        }
    });
    let client = ObservableClient::new(client_config(&origin));
    let (_handle, _value_rx, mut end_rx) = subscribe_counter(&client).await;
    let error = within(end_rx.recv()).await.unwrap().unwrap();
    assert_eq!(error.kind(), &ObservableErrorKind::QueryNotFound);
    assert!(accepted_rx.try_recv().is_ok());
    assert!(accepted_rx.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_server_gives_up() {
    initialize_env_logger();
    // Bind and drop to get a port that refuses connections
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let client = ObservableClient::new(client_config(&origin));
    let (_handle, _value_rx, mut end_rx) = subscribe_counter(&client).await;
    let error = within(end_rx.recv()).await.unwrap().unwrap();
    assert_eq!(error.kind(), &ObservableErrorKind::TransportError);
    assert_eq!(client.active_connections().await, 0);
}
