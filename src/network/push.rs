use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;

use super::{ChannelListener, ConnectionHandle, PushConnector};
use crate::error::ChannelError;

/// Push channel over a WebSocket, authenticated by sending the credential
/// as the handshake subprotocol.
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl PushConnector for WebSocketConnector {
    async fn open(
        &self,
        credential: &str,
        listener: ChannelListener,
    ) -> Result<ConnectionHandle, ChannelError> {
        let mut request = self.url.as_str().into_client_request()?;
        let token =
            HeaderValue::from_str(credential).map_err(|_| ChannelError::InvalidCredential)?;
        request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, token);

        let (stream, _response) = connect_async(request).await?;
        log::info!("Push channel #{} open at {}", listener.epoch(), self.url);
        let (mut writer, mut reader) = stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if let Err(err) = writer.send(Message::Text(frame.into())).await {
                    log::warn!("Push channel write failed: {err}");
                    break;
                }
            }
            if let Err(err) = writer.close().await {
                log::debug!("Push channel close handshake failed: {err}");
            }
            let _ = done_tx.send(());
        });

        tokio::spawn(async move {
            while let Some(frame) = reader.next().await {
                match frame {
                    // Payloads are not interpreted; arrival alone means "refresh".
                    Ok(Message::Text(_)) | Ok(Message::Binary(_)) => listener.activity(),
                    Ok(Message::Close(frame)) => {
                        log::debug!("Push channel #{} close frame: {frame:?}", listener.epoch());
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        log::warn!("Push channel #{} read failed: {err}", listener.epoch());
                        break;
                    }
                }
            }
            listener.closed();
        });

        Ok(ConnectionHandle::new(outbound_tx).with_writer_done(done_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ChannelSignal;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
    use tokio_tungstenite::tungstenite::http::StatusCode;
    use tokio_tungstenite::{WebSocketStream, accept_hdr_async};

    const WAIT: Duration = Duration::from_secs(5);

    /// Accepts one socket, echoing the subprotocol only when it is `tok1`.
    async fn push_server() -> (
        String,
        oneshot::Receiver<Option<String>>,
        oneshot::Receiver<WebSocketStream<tokio::net::TcpStream>>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (token_tx, token_rx) = oneshot::channel();
        let (socket_tx, socket_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let callback = move |request: &Request, mut response: Response| {
                let token = request.headers().get(SEC_WEBSOCKET_PROTOCOL).cloned();
                let _ = token_tx.send(
                    token
                        .as_ref()
                        .and_then(|value| value.to_str().ok())
                        .map(str::to_string),
                );
                match token {
                    Some(value) if value == "tok1" => {
                        response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
                        Ok(response)
                    }
                    _ => {
                        let mut rejection = ErrorResponse::new(Some("unauthorized".to_string()));
                        *rejection.status_mut() = StatusCode::UNAUTHORIZED;
                        Err(rejection)
                    }
                }
            };
            if let Ok(socket) = accept_hdr_async(stream, callback).await {
                let _ = socket_tx.send(socket);
            }
        });

        (format!("ws://{addr}"), token_rx, socket_rx)
    }

    async fn next_signal(rx: &mut mpsc::UnboundedReceiver<ChannelSignal>) -> ChannelSignal {
        timeout(WAIT, rx.recv()).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn credential_travels_as_subprotocol() {
        let (url, token, socket) = push_server().await;
        let (signals_tx, _signals) = mpsc::unbounded_channel();

        let handle = WebSocketConnector::new(url)
            .open("tok1", ChannelListener::new(1, signals_tx))
            .await
            .unwrap();

        assert_eq!(token.await.unwrap().as_deref(), Some("tok1"));
        let _socket = socket.await.unwrap();
        handle.close().await;
    }

    #[tokio::test]
    async fn rejected_handshake_is_an_error() {
        let (url, _token, _socket) = push_server().await;
        let (signals_tx, _signals) = mpsc::unbounded_channel();

        let result = WebSocketConnector::new(url)
            .open("wrong", ChannelListener::new(1, signals_tx))
            .await;
        assert!(matches!(result, Err(ChannelError::Handshake(_))));
    }

    #[tokio::test]
    async fn unusable_credential_is_rejected_locally() {
        let (signals_tx, _signals) = mpsc::unbounded_channel();
        let result = WebSocketConnector::new("ws://127.0.0.1:9")
            .open("bad\ntoken", ChannelListener::new(1, signals_tx))
            .await;
        assert!(matches!(result, Err(ChannelError::InvalidCredential)));
    }

    #[tokio::test]
    async fn inbound_frames_signal_activity_and_close_signals_closed() {
        let (url, _token, socket) = push_server().await;
        let (signals_tx, mut signals) = mpsc::unbounded_channel();

        let handle = WebSocketConnector::new(url)
            .open("tok1", ChannelListener::new(3, signals_tx))
            .await
            .unwrap();
        let mut socket = socket.await.unwrap();

        socket
            .send(Message::Text("<div>new message</div>".into()))
            .await
            .unwrap();
        assert_eq!(
            next_signal(&mut signals).await,
            ChannelSignal::Activity { epoch: 3 }
        );

        socket.close(None).await.unwrap();
        assert_eq!(
            next_signal(&mut signals).await,
            ChannelSignal::Closed { epoch: 3 }
        );
        drop(handle);
    }

    #[tokio::test]
    async fn queued_frames_reach_the_server() {
        let (url, _token, socket) = push_server().await;
        let (signals_tx, _signals) = mpsc::unbounded_channel();

        let handle = WebSocketConnector::new(url)
            .open("tok1", ChannelListener::new(1, signals_tx))
            .await
            .unwrap();
        let mut socket = socket.await.unwrap();

        handle
            .send_frame(r#"{"Payload":"hi","Sender":"bob"}"#.to_string())
            .unwrap();
        handle.close().await;

        let frame = timeout(WAIT, socket.next()).await.unwrap().unwrap().unwrap();
        match frame {
            Message::Text(text) => {
                let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                assert_eq!(value, serde_json::json!({"Payload": "hi", "Sender": "bob"}));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}
