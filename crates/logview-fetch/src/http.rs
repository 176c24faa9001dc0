//! Network implementations of the retrieval services
//!
//! - [`HttpBlobService`]: blob retrieval over HTTP with `reqwest`
//! - [`WsStreamService`]: push retrieval over a WebSocket with
//!   `tokio-tungstenite`

use crate::blob::{BlobBody, BlobService};
use crate::config::LogViewConfig;
use crate::error::FetchError;
use crate::stream::{EventStream, StreamEvent, StreamService};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, AUTHORIZATION};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Blob retrieval over HTTP
#[derive(Debug, Clone)]
pub struct HttpBlobService {
    client: reqwest::Client,
    endpoint: String,
    account_id: String,
}

impl HttpBlobService {
    /// Create service from configuration
    ///
    /// # Errors
    /// Returns [`FetchError::InvalidEndpoint`] when the endpoint is not a URL.
    pub fn new(config: &LogViewConfig) -> Result<Self, FetchError> {
        reqwest::Url::parse(&config.blob_endpoint)
            .map_err(|e| FetchError::InvalidEndpoint(format!("{}: {e}", config.blob_endpoint)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint: config.blob_endpoint.clone(),
            account_id: config.account_id.clone(),
        })
    }
}

/// Content types accepted as log text
fn is_text_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime.starts_with("text/")
        || mime == "application/json"
        || mime == "application/x-ndjson"
        || mime == "application/octet-stream"
}

#[async_trait]
impl BlobService for HttpBlobService {
    async fn fetch(
        &self,
        log_key: &str,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<BlobBody, FetchError> {
        let request = self
            .client
            .get(&self.endpoint)
            .query(&[("accountID", self.account_id.as_str()), ("key", log_key)])
            .bearer_auth(token)
            .send();

        let response = tokio::select! {
            () = cancel.cancelled() => return Err(FetchError::Cancelled),
            response = request => response?.error_for_status()?,
        };

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if content_type
            .as_deref()
            .is_some_and(|ct| !is_text_content_type(ct))
        {
            return Ok(BlobBody::Other { content_type });
        }

        let bytes = tokio::select! {
            () = cancel.cancelled() => return Err(FetchError::Cancelled),
            bytes = response.bytes() => bytes?,
        };

        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Ok(BlobBody::Text(text)),
            Err(_) => Ok(BlobBody::Other { content_type }),
        }
    }
}

/// Push retrieval over a WebSocket
#[derive(Debug, Clone)]
pub struct WsStreamService {
    endpoint: String,
}

impl WsStreamService {
    /// Create service from configuration
    #[must_use]
    pub fn new(config: &LogViewConfig) -> Self {
        Self {
            endpoint: config.stream_endpoint.clone(),
        }
    }

    /// Connection URL for an account and retrieval key
    #[must_use]
    pub fn url(&self, account_id: &str, log_key: &str) -> String {
        format!(
            "{}?accountID={}&key={}",
            self.endpoint,
            urlencoding::encode(account_id),
            urlencoding::encode(log_key)
        )
    }
}

/// Control frame sent by the server instead of log text
#[derive(Debug, Deserialize)]
struct ControlFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: String,
}

/// Classify a text frame as log text or a server error.
fn classify_frame(text: String) -> StreamEvent {
    match serde_json::from_str::<ControlFrame>(&text) {
        Ok(frame) if frame.kind.eq_ignore_ascii_case("error") => StreamEvent::Error(frame.message),
        _ => StreamEvent::Message(text),
    }
}

#[async_trait]
impl StreamService for WsStreamService {
    async fn connect(
        &self,
        account_id: &str,
        log_key: &str,
        token: &str,
    ) -> Result<EventStream, FetchError> {
        let url = self.url(account_id, log_key);
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| FetchError::InvalidEndpoint(format!("{url}: {e}")))?;
        let auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| FetchError::Connect(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, auth);

        let (socket, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| FetchError::Connect(e.to_string()))?;

        let events = socket.filter_map(|frame| async move {
            match frame {
                Ok(Message::Text(text)) => Some(Ok(classify_frame(text))),
                Ok(Message::Binary(bytes)) => Some(
                    String::from_utf8(bytes)
                        .map(classify_frame)
                        .map_err(|_| FetchError::NonText),
                ),
                Ok(_) => None,
                Err(err) => Some(Err(FetchError::from(err))),
            }
        });
        Ok(events.boxed())
    }
}
