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

//! WebSocket API resource for observing queries.

use crate::rest_api::AppState;
use crate::rest_api::common::ApiErrorMapper;
use actix_web::Error;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::get;
use actix_web::http::header;
use actix_web::rt;
use actix_web::web;
use actix_web::web::Data;
use actix_web::web::Path;
use actix_web::web::Query;
use actix_ws::AggregatedMessage;
use actix_ws::AggregatedMessageStream;
use actix_ws::CloseCode;
use actix_ws::CloseReason;
use actix_ws::Session;
use arc_client::QueryArguments;
use arc_core::ObservableError;
use arc_core::ObservableErrorKind;
use arc_core::observable::ChannelCloseReason;
use arc_core::observable::ChannelSession;
use arc_core::observable::ObservableAdapter;
use arc_core::observable::PeerEvent;
use arc_core::observable::PeerEventStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedSender;

/// [ChannelSession] of an upgraded actix-web request.
struct ActixChannelSession {
    session: Session,
}

#[async_trait::async_trait]
impl ChannelSession for ActixChannelSession {
    async fn send_text(&mut self, text: String) -> Result<(), ObservableError> {
        self.session.text(text).await.map_err(|_| {
            ObservableErrorKind::TransportError.error_with_msg("WebSocket session is closed.")
        })
    }

    async fn close(self: Box<Self>, reason: ChannelCloseReason) {
        let close_reason = CloseReason {
            code: CloseCode::from(reason.code()),
            description: Some(reason.description().to_string()),
        };
        self.session
            .close(Some(close_reason))
            .await
            .map_err(|e| {
                log::debug!("Failed to close session: {e:?}");
            })
            .ok();
    }
}

/// Open a WebSocket channel observing the query at the requested path.
///
/// The reserved `_source` query string argument identifies the calling
/// tenant or service. The `Authorization` header is passed as an opaque
/// identity to the authorization evaluator.
#[get("/{path:.*}")]
pub async fn observe_query(
    http_request: HttpRequest,
    path: Path<String>,
    app_state: Data<AppState>,
    stream: web::Payload,
) -> Result<HttpResponse, Error> {
    let query_arguments = Query::<Vec<(String, String)>>::from_query(http_request.query_string())
        .map_err(|e| {
            ApiErrorMapper::from_observable_error(
                ObservableErrorKind::InvalidArguments.error_with_msg(e.to_string()),
            )
        })?
        .into_inner()
        .into_iter()
        .collect::<QueryArguments>();
    let identity = http_request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let query_request = app_state
        .pipeline
        .request_for_path(&path.into_inner(), query_arguments, identity)
        .map_err(ApiErrorMapper::from_observable_error)?;
    // Reject before upgrading, so clients get a status code they won't retry
    let source = app_state
        .pipeline
        .open(&query_request)
        .await
        .map_err(ApiErrorMapper::from_observable_error)?;
    let (http_upgrade_response, session, stream) = actix_ws::handle(&http_request, stream)?;
    let stream = stream
        .aggregate_continuations()
        .max_continuation_size(app_state.channel_config.max_frame_bytes());
    log::info!(
        "Source '{}' opened a channel for query '{}'.",
        query_request.source_id().unwrap_or("-"),
        query_request.query_name()
    );
    let (peer_tx, peer_rx) = mpsc::unbounded_channel();
    // The actix stream is bound to this worker, so pull it here and hand
    // over the events
    rt::spawn(pull_messages_from_stream(stream, session.clone(), peer_tx));
    let inbound: PeerEventStream = Box::pin(futures::stream::unfold(peer_rx, |mut peer_rx| async move {
        peer_rx.recv().await.map(|event| (event, peer_rx))
    }));
    let adapter_handle = ObservableAdapter::new(source, &app_state.channel_config)
        .start(Box::new(ActixChannelSession { session }), inbound);
    let query_name = query_request.query_name().to_owned();
    rt::spawn(async move {
        let outcome = adapter_handle.join().await;
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Channel for query '{query_name}' ended: {outcome:?}");
        }
    });
    // Respond immediately with with WebSocket upgrade response
    Ok(http_upgrade_response)
}

/// Pull messages from the client. Only pings are expected.
async fn pull_messages_from_stream(
    mut stream: AggregatedMessageStream,
    mut session: Session,
    peer_tx: UnboundedSender<PeerEvent>,
) {
    loop {
        let event = match stream.next().await {
            Some(Ok(AggregatedMessage::Text(text))) => PeerEvent::Text(text.to_string()),
            Some(Ok(AggregatedMessage::Binary(bin))) => match String::from_utf8(bin.to_vec()) {
                Ok(text) => PeerEvent::Text(text),
                Err(_) => {
                    if log::log_enabled!(log::Level::Debug) {
                        log::debug!("Ignoring binary message that is not UTF-8.");
                    }
                    continue;
                }
            },
            Some(Ok(AggregatedMessage::Ping(msg))) => {
                // Respond to protocol level PING frame with PONG frame
                if session.pong(&msg).await.is_err() {
                    PeerEvent::Disconnected
                } else {
                    continue;
                }
            }
            Some(Ok(AggregatedMessage::Pong(_msg))) => {
                if log::log_enabled!(log::Level::Trace) {
                    log::trace!("Ignoring pong message");
                }
                continue;
            }
            Some(Ok(AggregatedMessage::Close(reason))) => {
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!("Client closed channel: {reason:?}");
                }
                // Acknowledge the close
                let _ = session.clone().close(reason).await;
                PeerEvent::Disconnected
            }
            Some(Err(e)) => {
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!("Failed to get next message: {e:?}");
                }
                PeerEvent::Disconnected
            }
            None => PeerEvent::Disconnected,
        };
        let disconnected = event == PeerEvent::Disconnected;
        if peer_tx.send(event).is_err() || disconnected {
            // Adapter is done or the client is gone
            break;
        }
    }
}
