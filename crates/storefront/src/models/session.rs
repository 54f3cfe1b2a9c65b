//! Session-related types.
//!
//! The session holds the browser's cart token and a one-shot flash banner.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::cart::CartToken;

/// Severity of a flash banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
    Info,
}

impl FlashKind {
    /// CSS modifier for the banner.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "banner-success",
            Self::Error => "banner-error",
            Self::Info => "banner-info",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }

    /// CSS modifier for the banner.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        self.kind.css_class()
    }
}

/// Session keys.
pub mod keys {
    /// Key for the browser's cart token.
    pub const CART_TOKEN: &str = "cart_token";

    /// Key for the pending flash banner.
    pub const FLASH: &str = "flash";
}

/// The cart token for this session, if one was issued.
pub async fn cart_token(session: &Session) -> Option<CartToken> {
    session
        .get::<CartToken>(keys::CART_TOKEN)
        .await
        .ok()
        .flatten()
}

/// The cart token for this session, issuing one on first use.
///
/// # Errors
///
/// Returns an error if the session store rejects the write.
pub async fn ensure_cart_token(
    session: &Session,
) -> Result<CartToken, tower_sessions::session::Error> {
    if let Some(token) = cart_token(session).await {
        return Ok(token);
    }
    let token = CartToken::generate();
    session.insert(keys::CART_TOKEN, &token).await?;
    tracing::debug!(cart_token = %token, "Issued cart token");
    Ok(token)
}

/// Queue a flash banner for the next page.
pub async fn set_flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(keys::FLASH, flash).await {
        tracing::error!("Failed to store flash message: {e}");
    }
}

/// Take the pending flash banner, clearing it.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session.remove::<Flash>(keys::FLASH).await.ok().flatten()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_cart_token_is_stable_per_session() {
        let session = session();
        assert!(cart_token(&session).await.is_none());

        let first = ensure_cart_token(&session).await.unwrap();
        let second = ensure_cart_token(&session).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(cart_token(&session).await, Some(first));
    }

    #[tokio::test]
    async fn test_flash_is_taken_once() {
        let session = session();
        set_flash(&session, Flash::success("Product added successfully!")).await;

        let flash = take_flash(&session).await.unwrap();
        assert_eq!(flash.kind, FlashKind::Success);
        assert_eq!(flash.css_class(), "banner-success");
        assert!(take_flash(&session).await.is_none());
    }

    #[test]
    fn test_flash_kind_serializes_lowercase() {
        let json = serde_json::to_string(&Flash::error("nope")).unwrap();
        assert_eq!(json, r#"{"kind":"error","message":"nope"}"#);
    }
}
