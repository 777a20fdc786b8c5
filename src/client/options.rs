//! Connection options and transcription schema.
//!
//! [`ClientOptions`] says where and as whom to connect; [`LiveSchema`] says
//! how to transcribe. Together they produce the websocket request:
//!
//! ```text
//! {base_url}/{path with :version substituted}?{schema as query pairs}
//! Sec-WebSocket-Protocol: token, <api key>
//! ```
//!
//! # Example
//!
//! ```ignore
//! use listen_live::{ClientOptions, LiveSchema};
//!
//! let options = ClientOptions::new().with_api_key("dg-key");
//! let schema = LiveSchema::new()
//!     .model("nova-2")
//!     .interim_results(true)
//!     .keywords(["rust:2", "tokio"]);
//!
//! let url = options.live_url(&schema)?;
//! // wss://api.deepgram.com/v1/listen?interim_results=true&keywords=rust%3A2&keywords=tokio&model=nova-2
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default service endpoint.
pub const DEFAULT_BASE_URL: &str = "wss://api.deepgram.com";

/// Default API version.
pub const DEFAULT_VERSION: &str = "v1";

/// Path template of the live transcription endpoint.
pub const LIVE_PATH_TEMPLATE: &str = ":version/listen";

/// Environment variable holding an API key.
pub const API_KEY_ENV: &str = "DEEPGRAM_API_KEY";

/// Environment variable holding a short-lived access token.
pub const ACCESS_TOKEN_ENV: &str = "DEEPGRAM_ACCESS_TOKEN";

/// Environment variable overriding the base URL.
pub const API_URL_ENV: &str = "DEEPGRAM_API_URL";

/// `:name` placeholders in path templates.
static PATH_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":([A-Za-z_][A-Za-z0-9_]*)").expect("path parameter regex must compile")
});

// ============================================================================
// Credentials
// ============================================================================

/// How the client authenticates.
///
/// Sent as a websocket sub-protocol pair: `token, <key>` or
/// `bearer, <token>`.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Long-lived API key.
    ApiKey(String),
    /// Short-lived access token.
    AccessToken(String),
}

impl Credentials {
    /// Returns the sub-protocol scheme name.
    #[inline]
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::ApiKey(_) => "token",
            Self::AccessToken(_) => "bearer",
        }
    }

    /// Returns the secret.
    #[inline]
    #[must_use]
    pub fn secret(&self) -> &str {
        match self {
            Self::ApiKey(secret) | Self::AccessToken(secret) => secret,
        }
    }

    /// Returns the `Sec-WebSocket-Protocol` header value.
    #[must_use]
    pub fn subprotocol_header(&self) -> String {
        format!("{}, {}", self.scheme(), self.secret())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            Self::ApiKey(_) => "ApiKey",
            Self::AccessToken(_) => "AccessToken",
        };
        f.debug_tuple(variant).field(&"<redacted>").finish()
    }
}

// ============================================================================
// ClientOptions
// ============================================================================

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Authentication; required to connect.
    pub credentials: Option<Credentials>,

    /// Scheme and host, e.g. `wss://api.deepgram.com`.
    ///
    /// `http`/`https` are rewritten to `ws`/`wss`; a bare host gets `wss`.
    pub base_url: String,

    /// API version substituted for `:version`.
    pub version: String,

    /// Endpoint path template.
    pub path: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            credentials: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            version: DEFAULT_VERSION.to_string(),
            path: LIVE_PATH_TEMPLATE.to_string(),
        }
    }
}

// ============================================================================
// ClientOptions - Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with default endpoint and no credentials.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads options from the process environment.
    ///
    /// See [`ClientOptions::from_lookup`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads options through `lookup`.
    ///
    /// An access token (`DEEPGRAM_ACCESS_TOKEN`) takes precedence over an API
    /// key (`DEEPGRAM_API_KEY`). `DEEPGRAM_API_URL` overrides the base URL.
    /// Empty values are ignored.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let credentials = read(ACCESS_TOKEN_ENV)
            .map(Credentials::AccessToken)
            .or_else(|| read(API_KEY_ENV).map(Credentials::ApiKey));

        let mut options = Self {
            credentials,
            ..Self::default()
        };
        if let Some(base_url) = read(API_URL_ENV) {
            options.base_url = base_url;
        }
        options
    }
}

// ============================================================================
// ClientOptions - Builder Methods
// ============================================================================

impl ClientOptions {
    /// Authenticates with an API key.
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::ApiKey(key.into()));
        self
    }

    /// Authenticates with an access token.
    #[inline]
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::AccessToken(token.into()));
        self
    }

    /// Sets the base URL.
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the API version.
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the endpoint path template.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

// ============================================================================
// ClientOptions - Request Building
// ============================================================================

impl ClientOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if credentials are missing or empty, or the
    /// base URL or version is empty.
    pub fn validate(&self) -> Result<()> {
        match &self.credentials {
            None => {
                return Err(Error::config(format!(
                    "Credentials are required. Use .with_api_key() or set {API_KEY_ENV}."
                )));
            }
            Some(credentials) if credentials.secret().trim().is_empty() => {
                return Err(Error::config("Credentials must not be empty"));
            }
            Some(_) => {}
        }

        if self.base_url.trim().is_empty() {
            return Err(Error::config("Base URL must not be empty"));
        }
        if self.version.trim().is_empty() {
            return Err(Error::config("API version must not be empty"));
        }

        Ok(())
    }

    /// Builds the live endpoint URL for `schema`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the path template names an unknown parameter
    ///   or the scheme is not a websocket/http scheme
    /// - [`Error::Url`] if the result does not parse
    pub fn live_url(&self, schema: &LiveSchema) -> Result<Url> {
        let path = render_path(&self.path, &[("version", &self.version)])?;

        let base = self.base_url.trim().trim_end_matches('/');
        let base = if base.contains("://") {
            base.to_string()
        } else {
            format!("wss://{base}")
        };

        let mut url = Url::parse(&format!("{base}/{}", path.trim_start_matches('/')))?;

        let scheme = match url.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            other => {
                return Err(Error::config(format!(
                    "Unsupported URL scheme `{other}`; expected ws, wss, http or https"
                )));
            }
        };
        if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
            return Err(Error::config(format!("Cannot switch URL scheme to {scheme}")));
        }

        let pairs = schema.to_query_pairs();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Builds the websocket handshake request for `schema`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if validation fails or the credentials are not a
    ///   valid header value
    /// - [`Error::Url`] / [`Error::WebSocket`] if the URL is unusable
    pub fn live_request(&self, schema: &LiveSchema) -> Result<(Url, Request)> {
        self.validate()?;

        let url = self.live_url(schema)?;
        let mut request = url.as_str().into_client_request()?;

        if let Some(credentials) = &self.credentials {
            let header = HeaderValue::from_str(&credentials.subprotocol_header()).map_err(|_| {
                Error::config("Credentials contain characters not allowed in a header")
            })?;
            request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, header);
        }

        Ok((url, request))
    }
}

/// Substitutes `:name` placeholders with URL-encoded values from `params`.
fn render_path(template: &str, params: &[(&str, &str)]) -> Result<String> {
    let mut rendered = String::with_capacity(template.len() + 16);
    let mut last = 0;

    for caps in PATH_PARAM_RE.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        let value = params
            .iter()
            .find(|(key, _)| *key == name.as_str())
            .map(|(_, value)| *value)
            .ok_or_else(|| {
                Error::config(format!("Missing path parameter `{}`", name.as_str()))
            })?;

        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(&urlencoding::encode(value));
        last = whole.end();
    }

    rendered.push_str(&template[last..]);
    Ok(rendered)
}

// ============================================================================
// LiveSchema
// ============================================================================

/// Transcription options, forwarded as query parameters.
///
/// Keys are free-form so new service options need no crate change. Values
/// map to query pairs as follows:
///
/// | Value | Query |
/// |-------|-------|
/// | string, number, bool | one pair |
/// | array | one pair per element |
/// | null | omitted |
/// | object | one pair, compact JSON |
///
/// Pairs are emitted in key order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LiveSchema {
    entries: BTreeMap<String, Value>,
}

impl LiveSchema {
    /// Creates an empty schema.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an arbitrary option.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Sets an option in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Removes an option.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Returns an option's value.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns `true` if no options are set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flattens the schema into query pairs.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.entries.len());

        for (key, value) in &self.entries {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        if let Some(text) = query_value(item) {
                            pairs.push((key.clone(), text));
                        }
                    }
                }
                other => {
                    if let Some(text) = query_value(other) {
                        pairs.push((key.clone(), text));
                    }
                }
            }
        }

        pairs
    }
}

/// Renders one scalar (or nested) value as query text.
fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

// ============================================================================
// LiveSchema - Typed Setters
// ============================================================================

impl LiveSchema {
    /// Model name, e.g. `nova-2`.
    #[must_use]
    pub fn model(self, model: impl Into<String>) -> Self {
        self.set("model", model.into())
    }

    /// BCP-47 language tag.
    #[must_use]
    pub fn language(self, language: impl Into<String>) -> Self {
        self.set("language", language.into())
    }

    /// Raw audio encoding, e.g. `linear16`.
    #[must_use]
    pub fn encoding(self, encoding: impl Into<String>) -> Self {
        self.set("encoding", encoding.into())
    }

    /// Sample rate in Hz, for raw encodings.
    #[must_use]
    pub fn sample_rate(self, hz: u32) -> Self {
        self.set("sample_rate", hz)
    }

    /// Number of interleaved channels.
    #[must_use]
    pub fn channels(self, channels: u32) -> Self {
        self.set("channels", channels)
    }

    /// Emit interim (non-final) transcripts.
    #[must_use]
    pub fn interim_results(self, enabled: bool) -> Self {
        self.set("interim_results", enabled)
    }

    /// Add punctuation and capitalization.
    #[must_use]
    pub fn punctuate(self, enabled: bool) -> Self {
        self.set("punctuate", enabled)
    }

    /// Apply formatting to numbers, dates and similar.
    #[must_use]
    pub fn smart_format(self, enabled: bool) -> Self {
        self.set("smart_format", enabled)
    }

    /// Silence length in milliseconds that ends an utterance.
    #[must_use]
    pub fn utterance_end_ms(self, ms: u32) -> Self {
        self.set("utterance_end_ms", ms)
    }

    /// Emit `SpeechStarted` events.
    #[must_use]
    pub fn vad_events(self, enabled: bool) -> Self {
        self.set("vad_events", enabled)
    }

    /// Endpointing silence in milliseconds.
    #[must_use]
    pub fn endpointing(self, ms: u32) -> Self {
        self.set("endpointing", ms)
    }

    /// Keywords to boost, each optionally `word:intensifier`.
    #[must_use]
    pub fn keywords<I, S>(self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<Value> = keywords
            .into_iter()
            .map(|k| Value::String(k.into()))
            .collect();
        self.set("keywords", list)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    fn options() -> ClientOptions {
        ClientOptions::new().with_api_key("secret-key")
    }

    #[test]
    fn test_default_url() {
        let url = options().live_url(&LiveSchema::new()).expect("url");
        assert_eq!(url.as_str(), "wss://api.deepgram.com/v1/listen");
    }

    #[test]
    fn test_schema_becomes_sorted_query() {
        let schema = LiveSchema::new()
            .model("nova-2")
            .interim_results(true)
            .sample_rate(16000)
            .keywords(["rust:2", "tokio"])
            .set("redact", Value::Null);

        let url = options().live_url(&schema).expect("url");
        assert_eq!(
            url.query(),
            Some("interim_results=true&keywords=rust%3A2&keywords=tokio&model=nova-2&sample_rate=16000")
        );
    }

    #[test]
    fn test_object_values_are_json_encoded() {
        let schema = LiveSchema::new().set("extra", json!({"a": 1}));
        let pairs = schema.to_query_pairs();
        assert_eq!(pairs, vec![("extra".to_string(), r#"{"a":1}"#.to_string())]);
    }

    #[test]
    fn test_base_url_normalization() {
        let schema = LiveSchema::new();

        let url = options()
            .with_base_url("https://api.eu.example.com/")
            .live_url(&schema)
            .expect("url");
        assert_eq!(url.as_str(), "wss://api.eu.example.com/v1/listen");

        let url = options()
            .with_base_url("http://127.0.0.1:8080")
            .live_url(&schema)
            .expect("url");
        assert_eq!(url.as_str(), "ws://127.0.0.1:8080/v1/listen");

        let url = options()
            .with_base_url("api.example.com")
            .live_url(&schema)
            .expect("url");
        assert_eq!(url.scheme(), "wss");
    }

    #[test]
    fn test_unsupported_scheme() {
        let err = options()
            .with_base_url("ftp://example.com")
            .live_url(&LiveSchema::new())
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_path_template() {
        let url = options()
            .with_version("v2")
            .with_path("/:version/listen/stream")
            .live_url(&LiveSchema::new())
            .expect("url");
        assert_eq!(url.path(), "/v2/listen/stream");

        let err = options()
            .with_path(":version/:region/listen")
            .live_url(&LiveSchema::new())
            .unwrap_err();
        assert!(err.to_string().contains("region"));
    }

    #[test]
    fn test_render_path_encodes_values() {
        let rendered = render_path(":version/listen", &[("version", "v 1")]).expect("render");
        assert_eq!(rendered, "v%201/listen");
    }

    #[test]
    fn test_validate_requires_credentials() {
        let err = ClientOptions::new().validate().unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV));

        let err = ClientOptions::new().with_api_key("  ").validate().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        assert!(options().validate().is_ok());
    }

    #[test]
    fn test_live_request_sets_subprotocol() {
        let (url, request) = options()
            .live_request(&LiveSchema::new().model("nova-2"))
            .expect("request");

        assert_eq!(url.query(), Some("model=nova-2"));
        assert_eq!(request.uri().to_string(), url.as_str());
        assert_eq!(
            request.headers().get(SEC_WEBSOCKET_PROTOCOL).expect("header"),
            "token, secret-key"
        );

        let (_, request) = ClientOptions::new()
            .with_access_token("jwt")
            .live_request(&LiveSchema::new())
            .expect("request");
        assert_eq!(
            request.headers().get(SEC_WEBSOCKET_PROTOCOL).expect("header"),
            "bearer, jwt"
        );
    }

    #[test]
    fn test_live_request_rejects_header_breaking_credentials() {
        let err = ClientOptions::new()
            .with_api_key("bad\nkey")
            .live_request(&LiveSchema::new())
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_from_lookup() {
        let options = ClientOptions::from_lookup(|key| match key {
            API_KEY_ENV => Some("from-env".into()),
            API_URL_ENV => Some("ws://localhost:9000".into()),
            _ => None,
        });
        assert_eq!(options.credentials, Some(Credentials::ApiKey("from-env".into())));
        assert_eq!(options.base_url, "ws://localhost:9000");

        let options = ClientOptions::from_lookup(|key| match key {
            API_KEY_ENV => Some("key".into()),
            ACCESS_TOKEN_ENV => Some("token".into()),
            _ => None,
        });
        assert_eq!(options.credentials, Some(Credentials::AccessToken("token".into())));

        let options = ClientOptions::from_lookup(|_| Some(String::new()));
        assert_eq!(options, ClientOptions::default());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let debug = format!("{:?}", Credentials::ApiKey("super-secret".into()));
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("ApiKey"));
    }

    #[test]
    fn test_schema_deserializes_from_json() {
        let schema: LiveSchema =
            serde_json::from_str(r#"{"model":"nova-2","punctuate":true}"#).expect("parse");
        assert_eq!(schema, LiveSchema::new().model("nova-2").punctuate(true));
    }

    proptest! {
        #[test]
        fn prop_query_roundtrips_through_url(
            entries in proptest::collection::btree_map("[a-z_]{1,10}", "[ -~]{0,20}", 0..6)
        ) {
            let mut schema = LiveSchema::new();
            for (key, value) in &entries {
                schema.insert(key.clone(), value.clone());
            }

            let url = options().live_url(&schema).expect("url");
            let decoded: Vec<(String, String)> = url
                .query_pairs()
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            let expected: Vec<(String, String)> = entries.into_iter().collect();
            prop_assert_eq!(decoded, expected);
        }
    }
}
