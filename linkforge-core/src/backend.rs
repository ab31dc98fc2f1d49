//! REST client for the portal backend.
//!
//! Only available with the `http` feature.
//!
//! # Endpoints
//!
//! - `POST {base}/auth/{provider}/exchange` with `{"accessToken": …}`,
//!   answered by `{"customToken": …}`
//! - `POST {base}/auth/custom-token` with `{"token": …}`, answered by
//!   `{"uid": …, "email": …, "providerId": …}`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::collaborator::Backend;
use crate::error::BackendError;
use crate::model::{Identity, ProviderId};
use crate::secret::Secret;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest<'a> {
    access_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeResponse {
    custom_token: String,
}

#[derive(Serialize)]
struct CustomTokenRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomTokenResponse {
    uid: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    provider_id: Option<String>,
}

/// [`Backend`] over the portal's REST API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a client for the backend at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, BackendError> {
        let mut base_url = Url::parse(base_url).map_err(|e| BackendError::InvalidUrl {
            message: format!("{}: {}", base_url, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl {
                message: format!("{} cannot be used as a base URL", base_url),
            });
        }
        // Url::join drops the last segment unless the path ends with a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    /// The normalised base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url.join(path).map_err(|e| BackendError::InvalidUrl {
            message: format!("{}: {}", path, e),
        })
    }

    async fn post_json<B, R>(&self, url: Url, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        tracing::debug!(%url, "backend request");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Network {
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| BackendError::Network {
            message: format!("failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["error"].as_str().map(String::from))
                .unwrap_or(text);
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| BackendError::InvalidResponse {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn exchange_provider_token(
        &self,
        provider_name: &str,
        access_token: &Secret,
    ) -> Result<Secret, BackendError> {
        let url = self.endpoint(&format!("auth/{}/exchange", provider_name))?;
        let response: ExchangeResponse = self
            .post_json(
                url,
                &ExchangeRequest {
                    access_token: access_token.expose(),
                },
            )
            .await?;

        if response.custom_token.trim().is_empty() {
            return Err(BackendError::InvalidResponse {
                message: "empty customToken".to_string(),
            });
        }
        Ok(Secret::new(response.custom_token))
    }

    async fn sign_in_with_custom_token(&self, token: &Secret) -> Result<Identity, BackendError> {
        let url = self.endpoint("auth/custom-token")?;
        let response: CustomTokenResponse = self
            .post_json(
                url,
                &CustomTokenRequest {
                    token: token.expose(),
                },
            )
            .await?;

        let provider = response
            .provider_id
            .map(ProviderId::new)
            .unwrap_or_else(|| ProviderId::new("custom"));
        let mut identity = Identity::new(response.uid, provider);
        identity.email = response.email;
        Ok(identity)
    }
}
