use crate::core::api::SessionTokens;
use crate::events::app_event::AppEvent;
use crate::models::user::UserProfile;
use eyre::{Context, eyre};
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use url::Url;

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const TOKENS_FILE_NAME: &str = "tokens.json";
const PROFILE_FILE_NAME: &str = "user.json";

/// A message from an auth task to the UI thread.
#[derive(Debug)]
pub enum AuthMessage {
    Success(Session),
    SignupComplete(UserProfile),
    Error(String),
}

/// An authenticated session: the token pair plus the signed-in profile.
#[derive(Debug, Clone)]
pub struct Session {
    pub tokens: SessionTokens,
    pub profile: UserProfile,
}

#[derive(Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    user: UserProfile,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

/// The client responsible for signup, login, token verification and the
/// on-disk session blobs.
#[derive(Clone)]
pub struct SessionClient {
    http: ReqwestClient,
    base_url: Url,
    data_path: PathBuf,
    ui_message_tx: mpsc::Sender<AppEvent>,
}

impl SessionClient {
    pub fn new(base_url: Url, ui_message_tx: mpsc::Sender<AppEvent>) -> Result<Self, eyre::Report> {
        let data_path = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not find a config directory"))?
            .join(env!("CARGO_PKG_NAME"));

        Self::with_data_path(base_url, data_path, ui_message_tx)
    }

    fn with_data_path(
        base_url: Url,
        data_path: PathBuf,
        ui_message_tx: mpsc::Sender<AppEvent>,
    ) -> Result<Self, eyre::Report> {
        let http = ReqwestClient::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()?;

        if !data_path.exists() {
            std::fs::create_dir_all(&data_path).context("Failed to create config directory")?;
        }

        Ok(Self {
            http,
            base_url,
            data_path,
            ui_message_tx,
        })
    }

    /// Restores a session from the persisted blobs without user input.
    /// The stored access token is verified against the backend; a rejected
    /// token is refreshed once before giving up.
    pub async fn try_silent_login(&self) -> Result<Session, eyre::Report> {
        tracing::info!("Attempting silent login from stored session");
        let tokens = self.load_tokens().await?;
        let profile = self.load_profile().await?;

        let tokens = self.verify_or_refresh(tokens).await?;
        self.save_tokens(&tokens).await?;

        Ok(Session { tokens, profile })
    }

    /// Exchanges credentials for a token pair and sends the outcome to the
    /// UI thread.
    pub async fn login(self, email: String, password: String) {
        match self.obtain_session(&email, &password).await {
            Ok(session) => {
                if let Err(e) = self.persist(&session).await {
                    tracing::warn!("Failed to persist session: {}", e);
                }
                self.send_message(AuthMessage::Success(session)).await;
            }
            Err(e) => {
                tracing::warn!("Login failed: {}", e);
                self.send_message(AuthMessage::Error(format!("Login failed: {}", e)))
                    .await;
            }
        }
    }

    /// Creates an account and reports back; the user still logs in with
    /// the fresh credentials afterwards.
    pub async fn signup(self, email: String, username: String, password: String) {
        let result = self.create_account(&email, &username, &password).await;
        match result {
            Ok(profile) => self.send_message(AuthMessage::SignupComplete(profile)).await,
            Err(e) => {
                tracing::warn!("Signup failed: {}", e);
                self.send_message(AuthMessage::Error(format!("Signup failed: {}", e)))
                    .await;
            }
        }
    }

    /// Removes the persisted session blobs. Called on logout.
    pub async fn clear_persisted(&self) {
        for name in [TOKENS_FILE_NAME, PROFILE_FILE_NAME] {
            let path = self.data_path.join(name);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove {:?}: {}", path, e);
                }
            }
        }
    }

    pub async fn save_profile(&self, profile: &UserProfile) -> Result<(), eyre::Report> {
        self.write_json(PROFILE_FILE_NAME, profile).await
    }

    async fn obtain_session(&self, email: &str, password: &str) -> Result<Session, eyre::Report> {
        let response = self
            .http
            .post(self.endpoint("/api/user/token/")?)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .context("Login request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!("{body}"));
        }

        let login: LoginResponse = response.json().await.context("Malformed login response")?;
        Ok(Session {
            tokens: SessionTokens {
                access: login.access,
                refresh: login.refresh,
            },
            profile: login.user,
        })
    }

    async fn create_account(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<UserProfile, eyre::Report> {
        let response = self
            .http
            .post(self.endpoint("/api/user/signup/")?)
            .json(&serde_json::json!({
                "email": email,
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .context("Signup request failed")?;

        let status = response.status();
        if !status.is_success() {
            // Surface the validation body verbatim, field errors included.
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!("{body}"));
        }

        response.json().await.context("Malformed signup response")
    }

    async fn verify_or_refresh(
        &self,
        tokens: SessionTokens,
    ) -> Result<SessionTokens, eyre::Report> {
        if self.verify(&tokens.access).await? {
            tracing::info!("Stored access token is valid");
            return Ok(tokens);
        }

        tracing::info!("Stored access token rejected, refreshing");
        let access = self.refresh(&tokens.refresh).await?;
        Ok(SessionTokens {
            access,
            refresh: tokens.refresh,
        })
    }

    async fn verify(&self, access: &str) -> Result<bool, eyre::Report> {
        let response = self
            .http
            .post(self.endpoint("/api/user/token/verify/")?)
            .json(&serde_json::json!({ "token": access }))
            .send()
            .await
            .context("Token verify request failed")?;

        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::UNAUTHORIZED {
            Ok(false)
        } else {
            Err(eyre!("Token verify failed with {status}"))
        }
    }

    async fn refresh(&self, refresh: &str) -> Result<String, eyre::Report> {
        let response = self
            .http
            .post(self.endpoint("/api/user/token/refresh/")?)
            .json(&serde_json::json!({ "refresh": refresh }))
            .send()
            .await
            .context("Token refresh request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(eyre!("Token refresh failed with {status}: {body}"));
        }

        let refreshed: RefreshResponse =
            response.json().await.context("Malformed refresh response")?;
        Ok(refreshed.access)
    }

    async fn persist(&self, session: &Session) -> Result<(), eyre::Report> {
        self.save_tokens(&session.tokens).await?;
        self.save_profile(&session.profile).await?;
        Ok(())
    }

    async fn save_tokens(&self, tokens: &SessionTokens) -> Result<(), eyre::Report> {
        self.write_json(TOKENS_FILE_NAME, tokens).await
    }

    async fn load_tokens(&self) -> Result<SessionTokens, eyre::Report> {
        self.read_json(TOKENS_FILE_NAME).await
    }

    async fn load_profile(&self) -> Result<UserProfile, eyre::Report> {
        self.read_json(PROFILE_FILE_NAME).await
    }

    async fn write_json<T: serde::Serialize>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<(), eyre::Report> {
        let path = self.data_path.join(name);
        let bytes = serde_json::to_vec_pretty(value)?;
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(&bytes).await?;
        Ok(())
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<T, eyre::Report> {
        let path = self.data_path.join(name);
        let mut file = tokio::fs::File::open(path).await?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).await?;
        Ok(serde_json::from_slice(&buffer)?)
    }

    fn endpoint(&self, path: &str) -> Result<Url, eyre::Report> {
        self.base_url.join(path).context("Invalid endpoint path")
    }

    async fn send_message(&self, msg: AuthMessage) {
        if self.ui_message_tx.send(AppEvent::Auth(msg)).await.is_err() {
            tracing::error!("Failed to send message to UI thread: channel is closed.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server_uri: &str, dir: &std::path::Path) -> SessionClient {
        let (tx, _rx) = mpsc::channel(8);
        SessionClient::with_data_path(
            Url::parse(server_uri).unwrap(),
            dir.to_path_buf(),
            tx,
        )
        .unwrap()
    }

    fn sample_profile() -> UserProfile {
        UserProfile {
            username: "ada".to_string(),
            email: Some("ada@example.org".to_string()),
            avatar: None,
            api_key: None,
        }
    }

    #[tokio::test]
    async fn persisted_session_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client("http://localhost:8000", dir.path());

        let session = Session {
            tokens: SessionTokens {
                access: "a1".to_string(),
                refresh: "r1".to_string(),
            },
            profile: sample_profile(),
        };
        client.persist(&session).await.unwrap();

        assert_eq!(client.load_tokens().await.unwrap(), session.tokens);
        assert_eq!(client.load_profile().await.unwrap(), session.profile);
    }

    #[tokio::test]
    async fn clear_persisted_removes_both_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client("http://localhost:8000", dir.path());

        let session = Session {
            tokens: SessionTokens {
                access: "a1".to_string(),
                refresh: "r1".to_string(),
            },
            profile: sample_profile(),
        };
        client.persist(&session).await.unwrap();
        client.clear_persisted().await;

        assert!(client.load_tokens().await.is_err());
        assert!(client.load_profile().await.is_err());
    }

    #[tokio::test]
    async fn silent_login_refreshes_a_rejected_access_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/user/token/verify/"))
            .and(body_json(json!({ "token": "stale" })))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "code": "token_not_valid" })),
            )
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/user/token/refresh/"))
            .and(body_json(json!({ "refresh": "r1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "fresh" })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = test_client(&server.uri(), dir.path());
        client
            .persist(&Session {
                tokens: SessionTokens {
                    access: "stale".to_string(),
                    refresh: "r1".to_string(),
                },
                profile: sample_profile(),
            })
            .await
            .unwrap();

        let session = client.try_silent_login().await.unwrap();
        assert_eq!(session.tokens.access, "fresh");
        // The refreshed pair must have been written back.
        assert_eq!(client.load_tokens().await.unwrap().access, "fresh");
    }

    #[tokio::test]
    async fn silent_login_fails_without_stored_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let client = test_client("http://localhost:8000", dir.path());
        assert!(client.try_silent_login().await.is_err());
    }
}
