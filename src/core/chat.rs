use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::core::api::ApiClient;
use crate::models::message::{ChatMessage, FileRef};
use crate::utils::files::{mime_for_name, name_from_path};

/// Username of the backend account that authors assistant replies.
const ASSISTANT_USERNAME: &str = "llm";

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChatSummary {
    pub id: i64,
    pub uuid: String,
    pub name: String,
}

#[derive(Deserialize)]
struct Paginated<T> {
    results: Vec<T>,
}

#[derive(Deserialize)]
struct MessageRow {
    uuid: String,
    content: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    user: Option<MessageUser>,
}

#[derive(Deserialize)]
struct MessageUser {
    username: String,
}

/// Read access to the chat-list and chat-history endpoints.
#[derive(Clone)]
pub struct ChatClient {
    api: ApiClient,
}

impl ChatClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list_chats(&self) -> Result<Vec<ChatSummary>, eyre::Report> {
        let page: Paginated<ChatSummary> = self.api.get("/api/chat/").await?;
        Ok(page.results)
    }

    /// Fetches a thread's messages. The backend returns them newest-first;
    /// they are reversed here so the log reads top-down.
    pub async fn fetch_history(&self, chat_uuid: &str) -> Result<Vec<ChatMessage>, eyre::Report> {
        let path = format!("/api/chat/{chat_uuid}/messages/");
        let page: Paginated<MessageRow> = self.api.get(&path).await?;

        let mut messages: Vec<ChatMessage> = page
            .results
            .into_iter()
            .map(|row| {
                let is_user = row
                    .user
                    .as_ref()
                    .is_none_or(|u| u.username != ASSISTANT_USERNAME);
                let file = row.file.as_deref().map(|path| FileRef {
                    name: name_from_path(path),
                    mime: mime_for_name(path),
                });
                ChatMessage::from_history(row.uuid, row.content, is_user, file, row.timestamp)
            })
            .collect();
        messages.reverse();
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::api::SessionTokens;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ChatClient {
        let api = ApiClient::new(
            Url::parse(&server.uri()).unwrap(),
            SessionTokens {
                access: "a".to_string(),
                refresh: "r".to_string(),
            },
        )
        .unwrap();
        ChatClient::new(api)
    }

    #[tokio::test]
    async fn chat_list_unwraps_the_results_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/chat/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    { "id": 2, "uuid": "u2", "name": "rust questions" },
                    { "id": 1, "uuid": "u1", "name": "first chat" },
                ]
            })))
            .mount(&server)
            .await;

        let chats = client_for(&server).list_chats().await.unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].id, 2);
        assert_eq!(chats[0].uuid, "u2");
    }

    #[tokio::test]
    async fn history_is_reversed_and_attributed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/chat/abc/messages/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {
                        "uuid": "m2",
                        "content": "hello back",
                        "user": { "username": "llm" },
                        "timestamp": "2026-08-01T10:00:05Z"
                    },
                    {
                        "uuid": "m1",
                        "content": "hello",
                        "user": { "username": "ada" },
                        "file": "/media/uploads/notes.pdf",
                        "timestamp": "2026-08-01T10:00:00Z"
                    },
                ]
            })))
            .mount(&server)
            .await;

        let messages = client_for(&server).fetch_history("abc").await.unwrap();
        assert_eq!(messages.len(), 2);

        // Oldest first after the reversal.
        assert_eq!(messages[0].id, "m1");
        assert_eq!(messages[0].content, "hello");
        assert!(messages[0].is_user);
        assert_eq!(
            messages[0].file,
            Some(FileRef {
                name: "notes.pdf".to_string(),
                mime: "application/pdf".to_string(),
            })
        );

        assert_eq!(messages[1].id, "m2");
        assert!(!messages[1].is_user);
        // History never animates.
        assert!(!messages[1].is_new);
    }
}
