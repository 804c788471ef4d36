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

//! WebSocket based [Connector].

use super::Connector;
use super::Transport;
use super::TransportEvent;
use crate::ObservableError;
use crate::ObservableErrorKind;
use futures::SinkExt;
use futures::StreamExt;
use futures::future;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

/// [Connector] that opens a WebSocket per transport.
#[derive(Debug, Default)]
pub struct WebSocketConnector {}

impl WebSocketConnector {
    /// Rewrite `http(s)://` URLs into `ws(s)://` URLs.
    pub fn web_socket_url(url: &str) -> String {
        if url.starts_with("http") {
            url.replacen("http", "ws", 1)
        } else {
            url.to_owned()
        }
    }

    /// Map a failed WebSocket handshake to an [ObservableError].
    ///
    /// Rejected upgrades are reported as non-retryable kinds.
    fn map_connect_error(url: &str, e: tungstenite::Error) -> ObservableError {
        match e {
            tungstenite::Error::Http(response) => {
                let status = response.status().as_u16();
                let kind = match status {
                    404 => ObservableErrorKind::QueryNotFound,
                    401 | 403 => ObservableErrorKind::Unauthorized,
                    400 => ObservableErrorKind::InvalidArguments,
                    _ => ObservableErrorKind::TransportError,
                };
                kind.error_with_msg(format!("Upgrade of '{url}' was rejected with {status}."))
            }
            e => ObservableErrorKind::TransportError
                .error_with_msg(format!("Failed to connect to '{url}': {e}")),
        }
    }

    fn map_message(res: Result<Message, tungstenite::Error>) -> Option<TransportEvent> {
        match res {
            Ok(Message::Text(text)) => Some(TransportEvent::Text(text.as_str().to_owned())),
            Ok(Message::Binary(bin)) => String::from_utf8(bin.to_vec())
                .map_err(|e| {
                    log::debug!("Ignoring binary message that is not UTF-8: {e:?}");
                })
                .ok()
                .map(TransportEvent::Text),
            Ok(Message::Close(close_frame)) => Some(TransportEvent::Closed {
                code: close_frame.as_ref().map(|frame| u16::from(frame.code)),
                reason: close_frame
                    .as_ref()
                    .map(|frame| String::from(&*frame.reason))
                    .unwrap_or_default(),
            }),
            // Protocol level ping and pong is handled by tungstenite
            Ok(_other) => None,
            Err(e) => Some(TransportEvent::Failed(
                ObservableErrorKind::TransportError.error_with_msg(format!("{e}")),
            )),
        }
    }
}

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Transport, ObservableError> {
        let url = Self::web_socket_url(url);
        let (ws_stream, _res) = tokio_tungstenite::connect_async_with_config(
            url.as_str(),
            Some(WebSocketConfig::default()),
            true,
        )
        .await
        .map_err(|e| Self::map_connect_error(&url, e))?;
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Opened websocket to '{url}'");
        }
        let (write, read) = ws_stream.split();
        let sink = write
            .with(|text: String| future::ready(Ok::<_, tungstenite::Error>(Message::text(text))))
            .sink_map_err(|e| {
                ObservableErrorKind::TransportError.error_with_msg(format!("Send failed: {e}"))
            });
        let events = read.filter_map(|res| future::ready(Self::map_message(res)));
        Ok(Transport {
            sink: Box::pin(sink),
            events: Box::pin(events),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_socket_url() {
        assert_eq!(
            WebSocketConnector::web_socket_url("http://localhost:8080/api/items"),
            "ws://localhost:8080/api/items"
        );
        assert_eq!(
            WebSocketConnector::web_socket_url("https://example.com/api/items?a=http"),
            "wss://example.com/api/items?a=http"
        );
        assert_eq!(
            WebSocketConnector::web_socket_url("ws://localhost/api"),
            "ws://localhost/api"
        );
    }

    #[test]
    fn test_map_close() {
        let event = WebSocketConnector::map_message(Ok(Message::Close(None)));
        assert_eq!(
            event,
            Some(TransportEvent::Closed {
                code: None,
                reason: String::new()
            })
        );
        assert_eq!(
            WebSocketConnector::map_message(Ok(Message::text("{}"))),
            Some(TransportEvent::Text("{}".to_string()))
        );
    }
}
