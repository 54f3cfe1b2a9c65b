//! Cart inspection commands.

use std::path::Path;

use tracing::info;

use shopfront_storefront::cart::{CartStore, KvError, KvStore};

/// Print every stored cart (or one, by token) with its lines and total.
///
/// # Errors
///
/// Returns an error if the store file exists but cannot be read.
pub async fn show(store: &Path, token: Option<&str>) -> Result<(), KvError> {
    let carts = CartStore::new(KvStore::open(store).await?);
    let mut shown = 0;

    for (cart_token, cart) in carts.all().await {
        if token.is_some_and(|t| t != cart_token.as_str()) {
            continue;
        }
        shown += 1;

        info!("Cart {cart_token}");
        for item in cart.items() {
            info!(
                "  {:>3} x {:<32} {:>12} {:>12}",
                item.quantity,
                item.name,
                item.price.display(),
                item.line_total().display()
            );
        }
        info!(
            "  {} items, total {}",
            cart.item_count(),
            cart.total().display()
        );
    }

    if shown == 0 {
        info!("No carts found in {}", store.display());
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::{CartItem, Price, ProductId};
    use shopfront_storefront::cart::CartToken;

    use super::*;

    #[tokio::test]
    async fn test_show_reads_saved_carts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carts.json");

        let carts = CartStore::new(KvStore::open(&path).await.unwrap());
        let item = CartItem {
            id: ProductId::new(1),
            name: "Lamp".to_string(),
            price: Price::from_cents(1000),
            quantity: 1,
            image: None,
        };
        carts
            .add(&CartToken::from_string("t1"), item, 2)
            .await
            .unwrap();

        assert!(show(&path, None).await.is_ok());
        assert!(show(&path, Some("missing")).await.is_ok());
    }

    #[tokio::test]
    async fn test_show_missing_store_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(show(&dir.path().join("none.json"), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_show_corrupt_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("carts.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(show(&path, None).await.is_err());
    }
}
