//! Products backend REST client.
//!
//! # Architecture
//!
//! - `reqwest` for HTTP, JSON bodies mapped onto [`shopfront_core::Product`]
//! - The backend is the source of truth; nothing is cached locally
//! - Every failure is logged here and returned as [`ApiError`]; handlers
//!   decide whether to degrade (empty listing) or surface a banner
//!
//! # Endpoints
//!
//! ```text
//! GET    /products                  list
//! GET    /products/search?keyword=  search
//! GET    /product/{id}              fetch one
//! GET    /product/{id}/image        raw image bytes
//! POST   /product                   multipart create (product JSON + imageFile)
//! PUT    /product/{id}              multipart update
//! DELETE /product/{id}              delete
//! ```

mod client;
pub mod types;

pub use client::CatalogClient;
pub use types::{ImageUpload, ProductImage};

use thiserror::Error;

/// Errors that can occur when talking to the products backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("product 12".to_string());
        assert_eq!(err.to_string(), "Not found: product 12");

        let err = ApiError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Backend returned 500: boom");
    }
}
