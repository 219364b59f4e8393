use async_trait::async_trait;
use reqwest::{header, Client, Method, StatusCode};
use thiserror::Error;

/// Status line and declared content type of a probe response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub content_type: Option<String>,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True when no content type is declared or it names an image.
    pub fn looks_like_image(&self) -> bool {
        match self.content_type.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(ct) => ct.to_ascii_lowercase().starts_with("image/"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Method not supported by host")]
    Unsupported,

    #[error("Network error: {0}")]
    Network(String),
}

/// Network seam for asset reachability checks.
#[async_trait]
pub trait AssetProbe: Send + Sync {
    /// Lightweight existence check.
    async fn head(&self, url: &str) -> Result<ProbeResponse, ProbeError>;

    /// Full retrieval check.
    async fn get(&self, url: &str) -> Result<ProbeResponse, ProbeError>;
}

/// reqwest-backed probe. Timeouts are applied by the caller per probe.
#[derive(Clone, Default)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn request(&self, method: Method, url: &str) -> Result<ProbeResponse, ProbeError> {
        let response = self
            .client
            .request(method, url)
            .send()
            .await
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(ProbeResponse {
            status: response.status().as_u16(),
            content_type,
        })
    }
}

#[async_trait]
impl AssetProbe for HttpProbe {
    async fn head(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        let response = self.request(Method::HEAD, url).await?;
        let status = response.status;
        if status == StatusCode::METHOD_NOT_ALLOWED.as_u16()
            || status == StatusCode::NOT_IMPLEMENTED.as_u16()
        {
            return Err(ProbeError::Unsupported);
        }
        Ok(response)
    }

    async fn get(&self, url: &str) -> Result<ProbeResponse, ProbeError> {
        // Headers are enough; the body is dropped unread.
        self.request(Method::GET, url).await
    }
}
