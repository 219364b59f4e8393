use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Catalog returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl CatalogError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status.as_u16() {
            429 => CatalogError::RateLimited,
            code => CatalogError::Http {
                status: code,
                body: Self::truncate_body(body),
            },
        }
    }
}
