use eyre::{Context, eyre};
use parking_lot::RwLock;
use reqwest::{Client as ReqwestClient, Method, Response, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{sync::Arc, time::Duration};
use url::Url;

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// The access/refresh pair issued by the token endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionTokens {
    pub access: String,
    pub refresh: String,
}

/// JSON body the backend attaches to auth failures. `token_not_valid` marks
/// an expired or invalid access token.
#[derive(Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Authorized HTTP client for the backend API. All requests carry the
/// bearer access token; a `401` whose body carries `token_not_valid`
/// triggers a transparent token refresh and exactly one replay of the
/// original request.
#[derive(Clone)]
pub struct ApiClient {
    http: ReqwestClient,
    base_url: Url,
    tokens: Arc<RwLock<SessionTokens>>,
}

impl ApiClient {
    pub fn new(base_url: Url, tokens: SessionTokens) -> Result<Self, eyre::Report> {
        let http = ReqwestClient::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .context("Failed to build reqwest client")?;

        Ok(Self {
            http,
            base_url,
            tokens: Arc::new(RwLock::new(tokens)),
        })
    }

    pub fn access_token(&self) -> String {
        self.tokens.read().access.clone()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, eyre::Report> {
        self.send_json::<(), T>(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, eyre::Report> {
        self.send_json(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, eyre::Report> {
        self.send_json(Method::PUT, path, Some(body)).await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, eyre::Report> {
        let url = self.endpoint(path)?;
        let response = self.request(method.clone(), url.clone(), body).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let text = response.text().await.unwrap_or_default();
            let expired = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .and_then(|b| b.code)
                .is_some_and(|code| code == "token_not_valid");

            if !expired {
                return Err(eyre!("Request unauthorized: {text}"));
            }

            self.refresh().await?;
            let retry = self.request(method, url, body).await?;
            return Self::into_json(retry).await;
        }

        Self::into_json(response).await
    }

    async fn request<B: Serialize>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Response, eyre::Report> {
        let mut builder = self
            .http
            .request(method, url)
            .bearer_auth(self.access_token());
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder.send().await.context("Request failed")
    }

    async fn into_json<T: DeserializeOwned>(response: Response) -> Result<T, eyre::Report> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(eyre!("Request failed with {status}: {text}"));
        }
        response.json().await.context("Malformed response body")
    }

    fn endpoint(&self, path: &str) -> Result<Url, eyre::Report> {
        self.base_url.join(path).context("Invalid endpoint path")
    }

    async fn refresh(&self) -> Result<(), eyre::Report> {
        let refresh = self.tokens.read().refresh.clone();
        let url = self.endpoint("/api/user/token/refresh/")?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "refresh": refresh }))
            .send()
            .await
            .context("Token refresh request failed")?;

        let refreshed: RefreshResponse = Self::into_json(response).await?;
        self.tokens.write().access = refreshed.access;
        tracing::info!("Access token refreshed");
        Ok(())
    }
}
