//! HTTP implementation of [`AuthApi`] using `reqwest`.

use std::time::Duration;

use amep_protocol::{
    AuthResponse, Codec, JsonCodec, LoginRequest, NewAccount, RefreshRequest,
    RefreshResponse, User,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::{AuthApi, TransportError, endpoints};

/// Configuration for [`HttpAuthApi`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL the endpoint paths are appended to
    /// (e.g. `"https://amep.example.org/api"`).
    pub base_url: String,

    /// Per-request timeout. There is no retry on timeout.
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Talks to the identity API over HTTP(S).
///
/// Cheap to clone: `reqwest::Client` is an `Arc` internally, so clones
/// share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: Client,
    config: HttpConfig,
}

impl HttpAuthApi {
    /// Builds a client with the configured timeout.
    ///
    /// # Errors
    /// Returns [`TransportError::Request`] if the TLS backend fails to
    /// initialize.
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// The active configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Sends the request and decodes a JSON body on success.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = request.send().await.map_err(classify)?;
        let response = check_status(response).await?;
        let body = response.bytes().await.map_err(classify)?;
        JsonCodec.decode(&body).map_err(TransportError::Decode)
    }
}

impl AuthApi for HttpAuthApi {
    async fn me(&self, access_token: &str) -> Result<User, TransportError> {
        tracing::debug!(path = endpoints::ME, "fetching current user");
        let request = self.client.get(self.url(endpoints::ME)).bearer_auth(access_token);
        self.send_json(request).await
    }

    async fn login(
        &self,
        request: &LoginRequest,
    ) -> Result<AuthResponse, TransportError> {
        tracing::debug!(path = endpoints::LOGIN, email = %request.email, "logging in");
        let http = self.client.post(self.url(endpoints::LOGIN)).json(request);
        let response: AuthResponse = self.send_json(http).await?;
        response.validate().map_err(TransportError::Decode)?;
        Ok(response)
    }

    async fn register(
        &self,
        account: &NewAccount,
    ) -> Result<AuthResponse, TransportError> {
        tracing::debug!(path = endpoints::REGISTER, "registering account");
        let http = self.client.post(self.url(endpoints::REGISTER)).json(account);
        let response: AuthResponse = self.send_json(http).await?;
        response.validate().map_err(TransportError::Decode)?;
        Ok(response)
    }

    async fn logout(
        &self,
        access_token: Option<&str>,
    ) -> Result<(), TransportError> {
        tracing::debug!(path = endpoints::LOGOUT, "notifying server of logout");
        let mut http = self.client.post(self.url(endpoints::LOGOUT));
        if let Some(token) = access_token {
            http = http.bearer_auth(token);
        }
        let response = http.send().await.map_err(classify)?;
        // The acknowledgment body is not interpreted.
        check_status(response).await.map(|_| ())
    }

    async fn refresh(
        &self,
        request: &RefreshRequest,
    ) -> Result<RefreshResponse, TransportError> {
        tracing::debug!(path = endpoints::REFRESH, "exchanging refresh token");
        let http = self.client.post(self.url(endpoints::REFRESH)).json(request);
        let response: RefreshResponse = self.send_json(http).await?;
        response.validate().map_err(TransportError::Decode)?;
        Ok(response)
    }
}

/// Maps non-success statuses to [`TransportError`] variants.
async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(TransportError::Unauthorized);
    }
    let message = response.text().await.unwrap_or_default();
    Err(TransportError::Api {
        status: status.as_u16(),
        message,
    })
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Unavailable(e.to_string())
    } else {
        TransportError::Request(e)
    }
}
