//! Authenticated HTTP transport for the MSR APIs.
//!
//! [`MsrClient`] owns the HTTP connection pool, the base URL and the basic
//! auth header. Resource operations build a request, hand it to the
//! transport, and decode the body the transport returns. The transport
//! classifies each response by status code before anything is decoded.

use base64::Engine as _;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;
use url::Url;

use crate::config::{ClientConfig, Credentials, TlsMode};
use crate::context::CallContext;
use crate::error::{MsrError, Result};

/// Which API an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Api {
    /// Unversioned paths such as `/health`.
    Root,
    /// `/api/v0/...`
    Registry,
    /// `/enzi/v0/...`
    Identity,
}

impl Api {
    const fn prefix(self) -> &'static [&'static str] {
        match self {
            Self::Root => &[],
            Self::Registry => &["api", "v0"],
            Self::Identity => &["enzi", "v0"],
        }
    }
}

/// One entry of an MSR error envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Body MSR returns with failed requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorEnvelope {
    /// Reported errors, most relevant first by MSR's own ordering.
    pub errors: Vec<ApiErrorDetail>,
}

/// Client for the MSR registry and identity APIs.
///
/// Cloning is cheap and clones share the connection pool, so one client can
/// serve many concurrent callers.
#[derive(Debug, Clone)]
pub struct MsrClient {
    config: ClientConfig,
    base_url: Url,
    http: reqwest::Client,
    authorization: HeaderValue,
}

impl MsrClient {
    /// Creates a client that verifies server certificates.
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::Config`] if host, username or password is empty or
    /// the host is not a valid base URL. No request is sent.
    ///
    /// # Examples
    ///
    /// ```
    /// use msr_client::MsrClient;
    ///
    /// let client = MsrClient::new("https://msr.example.com", "admin", "secret")?;
    /// assert!(MsrClient::new("https://msr.example.com", "", "secret").is_err());
    /// # Ok::<(), msr_client::MsrError>(())
    /// ```
    pub fn new(host: &str, username: &str, password: &str) -> Result<Self> {
        Self::from_config(ClientConfig::new(host, Credentials::new(username, password)))
    }

    /// Creates a client that accepts any server certificate.
    ///
    /// # Errors
    ///
    /// Same as [`MsrClient::new`].
    pub fn new_unsafe_tls(host: &str, username: &str, password: &str) -> Result<Self> {
        Self::from_config(
            ClientConfig::new(host, Credentials::new(username, password))
                .danger_skip_tls_verification(),
        )
    }

    /// Creates a client from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::Config`] if the configuration is incomplete or the
    /// HTTP client cannot be built.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let base_url = Self::parse_base_url(&config.base_url)?;
        let http = Self::build_http_client(&config)?;
        let authorization = Self::basic_auth_header(&config.credentials)?;

        Ok(Self {
            config,
            base_url,
            http,
            authorization,
        })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the parsed base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends a request and returns the body of a successful response.
    ///
    /// Basic auth is added here; callers never set `Authorization`.
    ///
    /// # Errors
    ///
    /// - [`MsrError::Transport`] if no response arrives or `ctx` fires first.
    /// - Any error from [`classify_response`].
    pub async fn execute(&self, ctx: &CallContext, request: RequestBuilder) -> Result<Vec<u8>> {
        self.exchange(ctx, request).await.map(|(_, body)| body)
    }

    /// Sends a request and decodes the JSON body of a successful response.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        ctx: &CallContext,
        request: RequestBuilder,
    ) -> Result<T> {
        let (status, body) = self.exchange(ctx, request).await?;
        serde_json::from_slice(&body).map_err(|source| MsrError::Decode { status, source })
    }

    /// Sends a request whose success body is ignored.
    pub(crate) async fn send(&self, ctx: &CallContext, request: RequestBuilder) -> Result<()> {
        self.exchange(ctx, request).await.map(drop)
    }

    /// Starts a bodyless request.
    pub(crate) fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url)
    }

    /// Starts a request with a JSON body.
    pub(crate) fn json_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<RequestBuilder> {
        let body = serde_json::to_vec(body).map_err(|source| MsrError::Encode { source })?;
        Ok(self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .body(body))
    }

    /// Builds the URL of an endpoint. Each segment is percent-encoded.
    pub(crate) fn endpoint(&self, api: Api, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // parse_base_url rejected cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(api.prefix()).extend(segments);
        }
        url
    }

    async fn exchange(&self, ctx: &CallContext, request: RequestBuilder) -> Result<(u16, Vec<u8>)> {
        let request = request
            .header(AUTHORIZATION, self.authorization.clone())
            .build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        let (status, body) = ctx
            .guard(async {
                let response = self.http.execute(request).await?;
                let status = response.status().as_u16();
                let body = response.bytes().await?;
                Ok::<_, reqwest::Error>((status, body.to_vec()))
            })
            .await?;

        debug!(%method, %url, status, bytes = body.len(), "MSR exchange completed");
        classify_response(status, &body).map(|body| (status, body))
    }

    fn parse_base_url(raw: &str) -> Result<Url> {
        let url = Url::parse(raw.trim())
            .map_err(|e| MsrError::config(format!("invalid MSR host URL '{raw}': {e}")))?;
        if url.cannot_be_a_base() {
            return Err(MsrError::config(format!(
                "MSR host URL '{raw}' cannot be used as a base URL"
            )));
        }
        Ok(url)
    }

    fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent);

        if config.tls_mode() == TlsMode::Skip {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| MsrError::config(format!("building HTTP client failed: {e}")))
    }

    fn basic_auth_header(credentials: &Credentials) -> Result<HeaderValue> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            credentials.username(),
            credentials.password()
        ));
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
            .map_err(|_| MsrError::config("credentials cannot be encoded as a header"))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Classifies a response by status code.
///
/// - below 400: the body is returned untouched;
/// - 401: [`MsrError::Unauthorized`], without looking at the body;
/// - other 4xx/5xx: the body is decoded as an [`ErrorEnvelope`]. A body that
///   is not an envelope gives [`MsrError::Decode`], an envelope without
///   errors gives [`MsrError::EmptyErrorEnvelope`], and otherwise the first
///   reported message becomes [`MsrError::Api`].
///
/// # Errors
///
/// As listed above.
pub fn classify_response(status: u16, body: &[u8]) -> Result<Vec<u8>> {
    if status < 400 {
        return Ok(body.to_vec());
    }
    if status == 401 {
        return Err(MsrError::Unauthorized { status });
    }

    let envelope: ErrorEnvelope =
        serde_json::from_slice(body).map_err(|source| MsrError::Decode { status, source })?;

    match envelope.errors.into_iter().next() {
        Some(first) => Err(MsrError::Api {
            status,
            message: first.message,
        }),
        None => Err(MsrError::EmptyErrorEnvelope { status }),
    }
}

/// Rejects payloads equal to their type's zero value.
pub(crate) fn ensure_not_empty<T>(payload: &T, name: &'static str) -> Result<()>
where
    T: Default + PartialEq,
{
    if *payload == T::default() {
        Err(MsrError::EmptyInput { payload: name })
    } else {
        Ok(())
    }
}

/// Decodes a list field, reading JSON `null` as an empty list.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<Vec<T>>::deserialize(deserializer).map(Option::unwrap_or_default)
}
