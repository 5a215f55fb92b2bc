use chrono::{DateTime, Utc};
use eyre::{Context, eyre};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use url::Url;

use crate::events::app_event::{AppEvent, ChatEvent};

/// Outbound wire frame: a plain message, or an empty message carrying a
/// base64-encoded file.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OutboundFrame {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FilePayload>,
}

impl OutboundFrame {
    pub fn text(message: String) -> Self {
        Self {
            message,
            file: None,
        }
    }

    pub fn file(payload: FilePayload) -> Self {
        Self {
            message: String::new(),
            file: Some(payload),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FilePayload {
    pub name: String,
    pub mime: String,
    /// Base64-encoded file contents.
    pub data: String,
}

/// Inbound wire frame: one assistant reply per frame.
#[derive(Deserialize, Debug, Clone)]
pub struct InboundMessage {
    pub uuid: String,
    pub content: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The live transport for one chat thread. Reads inbound frames into
/// `ChatEvent`s and writes frames received over the outbound channel.
pub struct SocketClient {
    server_url: Url,
    chat_id: String,
    access_token: String,
    message_tx: mpsc::Sender<AppEvent>,
}

impl SocketClient {
    pub fn new(
        server_url: Url,
        chat_id: String,
        access_token: String,
        message_tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        Self {
            server_url,
            chat_id,
            access_token,
            message_tx,
        }
    }

    /// The per-chat socket address, with the bearer token as the query
    /// credential the backend's middleware expects.
    fn socket_url(&self) -> Result<Url, eyre::Report> {
        let mut url = self
            .server_url
            .join(&format!("/ws/chat/{}/", self.chat_id))
            .context("Invalid socket path")?;

        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| eyre!("Could not derive a websocket scheme"))?;
        url.query_pairs_mut()
            .append_pair("token", &self.access_token);

        Ok(url)
    }

    pub async fn run(
        self,
        mut outbound_rx: mpsc::Receiver<OutboundFrame>,
    ) -> Result<(), eyre::Report> {
        let url = self.socket_url()?;
        tracing::info!("Connecting chat socket for chat {}", self.chat_id);

        let (ws_stream, _) = connect_async(url.as_str()).await?;
        tracing::info!("WebSocket handshake has been successfully completed");
        let (mut write, mut read) = ws_stream.split();

        self.send_event(ChatEvent::Connected).await;

        loop {
            tokio::select! {
                frame = outbound_rx.recv() => {
                    // The sender half only drops on teardown.
                    let Some(frame) = frame else { return Ok(()) };
                    let text = match serde_json::to_string(&frame) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!("Failed to encode outbound frame: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = write.send(WsMessage::text(text)).await {
                        tracing::error!("Failed to send frame: {}", e);
                        self.send_event(ChatEvent::SendError(e.to_string())).await;
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(s))) => {
                            match serde_json::from_str::<InboundMessage>(&s) {
                                Ok(inbound) => {
                                    self.send_event(ChatEvent::MessageReceived(inbound)).await;
                                }
                                Err(e) => {
                                    tracing::warn!("Ignoring malformed inbound frame: {}", e);
                                }
                            }
                        }
                        Some(Ok(WsMessage::Close(c))) => {
                            tracing::info!("Websocket closed: {:?}", c);
                            self.send_event(ChatEvent::Disconnected(
                                "connection closed by server".to_string(),
                            ))
                            .await;
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::error!("Error reading message from websocket: {}", e);
                            self.send_event(ChatEvent::Disconnected(e.to_string())).await;
                            return Err(e.into());
                        }
                        None => {
                            self.send_event(ChatEvent::Disconnected(
                                "connection lost".to_string(),
                            ))
                            .await;
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    async fn send_event(&self, event: ChatEvent) {
        if self
            .message_tx
            .send(AppEvent::Chat(event))
            .await
            .is_err()
        {
            tracing::error!("Failed to send message to UI thread: channel is closed.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn text_frames_carry_no_file_field() {
        let frame = OutboundFrame::text("hello".to_string());
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({ "message": "hello" })
        );
    }

    #[test]
    fn file_frames_send_an_empty_message_and_the_payload() {
        let frame = OutboundFrame::file(FilePayload {
            name: "notes.pdf".to_string(),
            mime: "application/pdf".to_string(),
            data: "QUJD".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "message": "",
                "file": { "name": "notes.pdf", "mime": "application/pdf", "data": "QUJD" }
            })
        );
    }

    #[test]
    fn inbound_frames_tolerate_missing_file_and_timestamp() {
        let inbound: InboundMessage =
            serde_json::from_str(r#"{ "uuid": "u1", "content": "hi" }"#).unwrap();
        assert_eq!(inbound.uuid, "u1");
        assert_eq!(inbound.content, "hi");
        assert!(inbound.file.is_none());
        assert!(inbound.timestamp.is_none());
    }

    #[test]
    fn socket_url_scopes_the_chat_and_carries_the_token() {
        let (tx, _rx) = mpsc::channel(1);
        let client = SocketClient::new(
            Url::parse("http://localhost:8000").unwrap(),
            "abc".to_string(),
            "tok".to_string(),
            tx,
        );
        let url = client.socket_url().unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/ws/chat/abc/?token=tok");
    }

    #[test]
    fn https_servers_get_a_secure_socket() {
        let (tx, _rx) = mpsc::channel(1);
        let client = SocketClient::new(
            Url::parse("https://chat.example.org").unwrap(),
            "new".to_string(),
            "tok".to_string(),
            tx,
        );
        assert_eq!(client.socket_url().unwrap().scheme(), "wss");
    }
}
