//! Persistent shopping carts.
//!
//! Each browser gets a random cart token (held in its session). The cart is
//! stored as a JSON array under `cart:{token}` in a [`KvStore`], and every
//! mutation is announced on a broadcast channel so open pages can refresh
//! their badge.
//!
//! There is no locking across processes and no reconciliation against the
//! backend: the last write wins and prices are snapshots.

pub mod kv;

use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use shopfront_core::{Cart, CartItem, ProductId};

pub use kv::{KvError, KvStore};

/// Prefix of every cart key in the store.
pub const CART_KEY_PREFIX: &str = "cart:";

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

/// Errors from cart persistence.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Cart storage error: {0}")]
    Storage(#[from] KvError),

    #[error("Cart encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A per-browser cart identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CartToken(String);

impl CartToken {
    /// A fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing token string.
    #[must_use]
    pub fn from_string(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn storage_key(&self) -> String {
        format!("{CART_KEY_PREFIX}{}", self.0)
    }
}

impl std::fmt::Display for CartToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Announcement that a cart changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartEvent {
    pub token: CartToken,
    pub item_count: u32,
}

/// Cart persistence and change notification.
#[derive(Clone)]
pub struct CartStore {
    kv: KvStore,
    events: broadcast::Sender<CartEvent>,
}

impl CartStore {
    /// Wrap a key-value store.
    #[must_use]
    pub fn new(kv: KvStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { kv, events }
    }

    /// Subscribe to cart change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    /// Underlying key-value store.
    #[must_use]
    pub const fn kv(&self) -> &KvStore {
        &self.kv
    }

    /// Load a cart. Missing or unreadable data yields an empty cart.
    pub async fn load(&self, token: &CartToken) -> Cart {
        self.kv
            .get(&token.storage_key())
            .await
            .map(|json| decode(token, &json))
            .unwrap_or_default()
    }

    /// Add units of a product, appending a new line if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub async fn add(
        &self,
        token: &CartToken,
        snapshot: CartItem,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        self.mutate(token, |cart| cart.add(snapshot, quantity)).await
    }

    /// Set a line's quantity; quantities below one are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub async fn update_quantity(
        &self,
        token: &CartToken,
        id: ProductId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        self.mutate(token, |cart| {
            cart.set_quantity(id, quantity);
        })
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be persisted.
    pub async fn remove(&self, token: &CartToken, id: ProductId) -> Result<Cart, CartError> {
        self.mutate(token, |cart| {
            cart.remove(id);
        })
        .await
    }

    /// Empty the cart, deleting its stored key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be persisted.
    pub async fn clear(&self, token: &CartToken) -> Result<(), CartError> {
        self.kv.remove(&token.storage_key()).await?;
        self.notify(token, 0);
        Ok(())
    }

    /// Every stored cart, keyed by token.
    pub async fn all(&self) -> Vec<(CartToken, Cart)> {
        let mut carts = Vec::new();
        for key in self.kv.keys_with_prefix(CART_KEY_PREFIX).await {
            let Some(raw) = key.strip_prefix(CART_KEY_PREFIX) else {
                continue;
            };
            let token = CartToken::from_string(raw);
            let cart = self.load(&token).await;
            carts.push((token, cart));
        }
        carts
    }

    /// Load, change, and write back one cart, then broadcast its count.
    async fn mutate<F>(&self, token: &CartToken, f: F) -> Result<Cart, CartError>
    where
        F: FnOnce(&mut Cart),
    {
        let mut result: Result<Cart, serde_json::Error> = Ok(Cart::new());
        self.kv
            .update(&token.storage_key(), |current| {
                let mut cart = current.map(|json| decode(token, json)).unwrap_or_default();
                f(&mut cart);
                match cart.to_json() {
                    Ok(json) => {
                        result = Ok(cart);
                        Some(json)
                    }
                    Err(e) => {
                        result = Err(e);
                        current.map(str::to_string)
                    }
                }
            })
            .await?;

        let cart = result?;
        self.notify(token, cart.item_count());
        Ok(cart)
    }

    fn notify(&self, token: &CartToken, item_count: u32) {
        // No subscribers is the normal case outside open pages.
        let _ = self.events.send(CartEvent {
            token: token.clone(),
            item_count,
        });
    }
}

/// Parse a stored cart, treating corrupt data as empty.
fn decode(token: &CartToken, json: &str) -> Cart {
    Cart::from_json(json).unwrap_or_else(|e| {
        tracing::warn!(cart_token = %token, error = %e, "Discarding unreadable cart");
        Cart::new()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::Price;

    use super::*;

    fn item(id: i32, cents: i64) -> CartItem {
        CartItem {
            id: ProductId::new(id),
            name: format!("Item {id}"),
            price: Price::from_cents(cents),
            quantity: 1,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_add_persists_and_accumulates() {
        let store = CartStore::new(KvStore::in_memory());
        let token = CartToken::generate();

        store.add(&token, item(1, 1000), 1).await.unwrap();
        let cart = store.add(&token, item(1, 1000), 2).await.unwrap();
        assert_eq!(cart.item_count(), 3);

        let loaded = store.load(&token).await;
        assert_eq!(loaded, cart);
    }

    #[tokio::test]
    async fn test_carts_are_isolated_by_token() {
        let store = CartStore::new(KvStore::in_memory());
        let a = CartToken::generate();
        let b = CartToken::generate();

        store.add(&a, item(1, 1000), 1).await.unwrap();
        assert!(store.load(&b).await.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_update_and_remove_are_idempotent() {
        let store = CartStore::new(KvStore::in_memory());
        let token = CartToken::generate();
        store.add(&token, item(1, 500), 1).await.unwrap();
        store.add(&token, item(2, 300), 1).await.unwrap();

        let first = store.update_quantity(&token, ProductId::new(1), 4).await.unwrap();
        let second = store.update_quantity(&token, ProductId::new(1), 4).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.total(), Price::from_cents(2300));

        let first = store.remove(&token, ProductId::new(2)).await.unwrap();
        let second = store.remove(&token, ProductId::new(2)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.items().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_removes_key() {
        let store = CartStore::new(KvStore::in_memory());
        let token = CartToken::generate();
        store.add(&token, item(1, 500), 1).await.unwrap();

        store.clear(&token).await.unwrap();
        assert!(store.load(&token).await.is_empty());
        assert!(store.kv().keys_with_prefix(CART_KEY_PREFIX).await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_cart_loads_empty_and_is_overwritten() {
        let kv = KvStore::in_memory();
        let token = CartToken::from_string("t1");
        kv.set("cart:t1", "{garbage".to_string()).await.unwrap();

        let store = CartStore::new(kv.clone());
        assert!(store.load(&token).await.is_empty());

        store.add(&token, item(7, 100), 1).await.unwrap();
        assert_eq!(
            kv.get("cart:t1").await.as_deref(),
            Some(r#"[{"id":7,"name":"Item 7","price":1.0,"quantity":1}]"#)
        );
    }

    #[tokio::test]
    async fn test_mutations_broadcast_item_count() {
        let store = CartStore::new(KvStore::in_memory());
        let token = CartToken::generate();
        let mut events = store.subscribe();

        store.add(&token, item(1, 500), 2).await.unwrap();
        store.clear(&token).await.unwrap();

        let first = events.recv().await.unwrap();
        assert_eq!(first.token, token);
        assert_eq!(first.item_count, 2);
        assert_eq!(events.recv().await.unwrap().item_count, 0);
    }

    #[tokio::test]
    async fn test_all_lists_every_cart() {
        let store = CartStore::new(KvStore::in_memory());
        store.add(&CartToken::from_string("a"), item(1, 100), 1).await.unwrap();
        store.add(&CartToken::from_string("b"), item(2, 200), 2).await.unwrap();

        let all = store.all().await;
        let tokens: Vec<&str> = all.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tokens, vec!["a", "b"]);
        assert_eq!(all[1].1.item_count(), 2);
    }
}
