use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::Serialize;
use serde_json::Value as JsonValue;

// tokio::time::sleep is only available on non-WASM targets.
#[cfg(not(target_arch = "wasm32"))]
use tokio::time::sleep;

use crate::{
    codec::{build_raw_query, decode_response, decode_row_count},
    wire::{self, EngineRequest},
    Action, ClientOptions, EngineError, Effectful, ModelDelegate, RawEffectful, RawExecutor,
    Result, Sql,
};

/// Version stamped into normalized errors as `clientVersion`.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
/// HTTP client for a query engine speaking the JSON action protocol.
pub struct EngineClient {
    http: reqwest::Client,
    engine_url: String,
    token: String,
    options: ClientOptions,
}

impl fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineClient")
            .field("engine_url", &self.engine_url)
            .field("token", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

impl EngineClient {
    /// Creates a client with a raw authorization header value.
    pub fn new(engine_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new_raw_auth(engine_url, token)
    }

    /// Creates a client with a full raw authorization value.
    ///
    /// Example: `"Bearer <token>"` or any custom scheme.
    pub fn new_raw_auth(engine_url: impl Into<String>, authorization: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            engine_url: engine_url.into(),
            token: authorization.into(),
            options: ClientOptions::default(),
        }
    }

    /// Creates a client from a bearer token.
    ///
    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    pub fn new_bearer(engine_url: impl Into<String>, token: impl AsRef<str>) -> Self {
        let authorization = normalize_bearer_authorization(token.as_ref());
        Self::new_raw_auth(engine_url, authorization)
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `DBFX_ENGINE_URL` — full engine endpoint URL
    /// - `DBFX_ENGINE_TOKEN` — access token (Bearer prefix optional)
    ///
    /// Returns an error if either variable is missing or empty.
    ///
    /// **Not available on `wasm32` targets**, where environment variables do
    /// not exist. Use [`EngineClient::new_bearer`] there.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dbfx::EngineClient;
    ///
    /// let engine = EngineClient::from_env().expect("missing DBFX_* env vars");
    /// ```
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> std::result::Result<Self, String> {
        let url = std::env::var("DBFX_ENGINE_URL")
            .map_err(|_| "missing DBFX_ENGINE_URL environment variable".to_owned())?;
        let token = std::env::var("DBFX_ENGINE_TOKEN")
            .map_err(|_| "missing DBFX_ENGINE_TOKEN environment variable".to_owned())?;
        if url.trim().is_empty() {
            return Err("DBFX_ENGINE_URL is set but empty".to_owned());
        }
        if token.trim().is_empty() {
            return Err("DBFX_ENGINE_TOKEN is set but empty".to_owned());
        }
        Ok(Self::new_bearer(url, token))
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Returns a handle scoped to one model, e.g. `"User"`.
    pub fn model(&self, name: impl Into<String>) -> ModelHandle {
        ModelHandle {
            client: self.clone(),
            model: name.into(),
        }
    }

    /// Shorthand for `Effectful::new(self.model(name))`.
    pub fn effectful(&self, model: impl Into<String>) -> Effectful<ModelHandle> {
        Effectful::new(self.model(model))
    }

    /// Shorthand for `RawEffectful::new(self.clone())`.
    pub fn raw_effectful(&self) -> RawEffectful<EngineClient> {
        RawEffectful::new(self.clone())
    }

    /// Runs a parameterized statement and returns the affected-row count.
    pub async fn execute_raw(&self, sql: impl Into<Sql>) -> Result<u64> {
        let raw = build_raw_query(sql.into())?;
        let data = self.request(None, "executeRaw", &raw).await?;
        decode_row_count(data)
    }

    /// Sends one action to the engine and returns its `data` payload.
    pub async fn request<Q: Serialize>(
        &self,
        model: Option<&str>,
        action: &str,
        query: &Q,
    ) -> Result<JsonValue> {
        let payload = EngineRequest {
            model_name: model,
            action,
            query,
        };
        let response = self.send_with_retry(&payload).await?;
        decode_response(response)
    }

    async fn send_with_retry<Q: Serialize>(
        &self,
        payload: &EngineRequest<'_, Q>,
    ) -> Result<wire::EngineResponse> {
        let mut attempt = 0usize;
        loop {
            // On WASM, reqwest uses AbortController for the timeout.
            let response = self
                .http
                .post(&self.engine_url)
                .header(header::AUTHORIZATION, &self.token)
                .header(header::CONTENT_TYPE, "application/json")
                .timeout(Duration::from_millis(self.options.timeout_ms))
                .json(payload)
                .send()
                .await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.map_err(EngineError::Transport)?;

                    if !status.is_success() {
                        if should_retry_status(status) && attempt < self.options.max_retries {
                            self.wait_before_retry(attempt).await;
                            attempt += 1;
                            continue;
                        }

                        return Err(EngineError::Http {
                            status: status.as_u16(),
                            body,
                        });
                    }

                    return serde_json::from_str::<wire::EngineResponse>(&body).map_err(|err| {
                        EngineError::Decode(format!(
                            "invalid engine response JSON: {err}; body: {body}"
                        ))
                    });
                }
                Err(err) => {
                    if should_retry_transport(&err) && attempt < self.options.max_retries {
                        self.wait_before_retry(attempt).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(EngineError::Transport(err));
                }
            }
        }
    }

    /// Waits before the next retry attempt.
    ///
    /// On WASM targets this is a no-op: `tokio::time::sleep` is not
    /// available there.
    async fn wait_before_retry(&self, attempt: usize) {
        let delay_ms = self.options.backoff_ms(attempt);

        #[cfg(feature = "tracing")]
        tracing::debug!(attempt, delay_ms, "retrying engine request");

        #[cfg(not(target_arch = "wasm32"))]
        sleep(Duration::from_millis(delay_ms)).await;

        #[cfg(target_arch = "wasm32")]
        let _ = delay_ms;
    }
}

#[async_trait]
impl RawExecutor for EngineClient {
    type Error = EngineError;

    async fn execute_raw(&self, sql: Sql) -> Result<u64> {
        EngineClient::execute_raw(self, sql).await
    }
}

/// Engine client scoped to a single model.
#[derive(Clone, Debug)]
pub struct ModelHandle {
    client: EngineClient,
    model: String,
}

impl ModelHandle {
    pub fn name(&self) -> &str {
        &self.model
    }

    /// Runs `action` natively; failures come back as [`EngineError`].
    pub async fn call(&self, action: Action, args: &JsonValue) -> Result<JsonValue> {
        self.client
            .request(Some(&self.model), action.as_str(), args)
            .await
    }
}

#[async_trait]
impl ModelDelegate for ModelHandle {
    type Error = EngineError;

    async fn dispatch(&self, action: Action, args: JsonValue) -> Result<JsonValue> {
        self.call(action, &args).await
    }
}

fn should_retry_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn should_retry_transport(err: &reqwest::Error) -> bool {
    err.is_timeout()
        || err.is_request()
        || err.is_body()
        // is_connect() is not available on wasm32 targets (no TCP)
        || {
            #[cfg(not(target_arch = "wasm32"))]
            { err.is_connect() }
            #[cfg(target_arch = "wasm32")]
            { false }
        }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
