//! Integration tests for product administration.

use axum::http::StatusCode;
use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};
use shopfront_core::Price;
use shopfront_integration_tests::{PNG_BYTES, TestContext};

fn product_form(name: &str, price: &str, stock: &str) -> Form {
    Form::new()
        .text("name", name.to_string())
        .text("brand", "Lumen")
        .text("description", "Warm LED lamp")
        .text("price", price.to_string())
        .text("category", "Home")
        .text("release_date", "2024-11-05")
        .text("stock_quantity", stock.to_string())
        .text("product_available", "on")
}

fn png(file_name: &str) -> Part {
    Part::bytes(PNG_BYTES.to_vec())
        .file_name(file_name.to_string())
        .mime_str("image/png")
        .unwrap()
}

async fn post_multipart(ctx: &TestContext, path: &str, form: Form) -> (StatusCode, String) {
    let response = ctx
        .client
        .post(ctx.url(path))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    (status, response.text().await.unwrap())
}

// ============================================================================
// List
// ============================================================================

#[tokio::test]
async fn test_admin_table_lists_products() {
    let ctx = TestContext::new().await;
    let (status, body) = ctx.get("/admin/products").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Laptop Pro"));
    assert!(body.contains("Coffee Mug"));
    assert!(body.contains("Available"));
}

#[tokio::test]
async fn test_admin_table_backend_failure() {
    let ctx = TestContext::with_failing_backend().await;
    let (status, body) = ctx.get("/admin/products").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Failed to load products. Please try again later."));
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_product() {
    let ctx = TestContext::new().await;
    let form = product_form("Desk Lamp", "39.90", "12").part("image", png("lamp.png"));

    let (status, body) = post_multipart(&ctx, "/admin/products", form).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("has been added."));
    assert!(body.contains("Desk Lamp"));

    let data = ctx.backend.lock().unwrap();
    let lamp = data.products.values().find(|p| p.name == "Desk Lamp").unwrap();
    assert_eq!(lamp.price, Price::from_cents(3990));
    assert_eq!(lamp.stock_quantity, 12);
    assert!(lamp.product_available);
    assert_eq!(lamp.release_date, NaiveDate::from_ymd_opt(2024, 11, 5));
}

#[tokio::test]
async fn test_create_requires_image() {
    let ctx = TestContext::new().await;
    let (status, body) =
        post_multipart(&ctx, "/admin/products", product_form("Desk Lamp", "39.90", "1")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("Please select an image for the product."));
    assert_eq!(ctx.backend.lock().unwrap().products.len(), 3);
}

#[tokio::test]
async fn test_create_rejects_negative_price() {
    let ctx = TestContext::new().await;
    let form = product_form("Desk Lamp", "-1", "1").part("image", png("lamp.png"));

    let (status, body) = post_multipart(&ctx, "/admin/products", form).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("Price cannot be negative."));
    // Entered values are kept.
    assert!(body.contains("Desk Lamp"));
}

#[tokio::test]
async fn test_create_requires_name() {
    let ctx = TestContext::new().await;
    let form = product_form("  ", "5", "1").part("image", png("lamp.png"));

    let (status, _) = post_multipart(&ctx, "/admin/products", form).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.backend.lock().unwrap().products.len(), 3);
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_edit_form_is_prefilled() {
    let ctx = TestContext::new().await;
    let (status, body) = ctx.get("/admin/products/2/edit").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("value=\"Wireless Mouse\""));
    assert!(body.contains("value=\"image.png\""));

    let (status, _) = ctx.get("/admin/products/999/edit").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_without_upload_keeps_image() {
    let ctx = TestContext::new().await;
    let form = product_form("Wireless Mouse II", "30", "8")
        .text("image_name", "image.png")
        .text("image_type", "image/png");

    let (status, body) = post_multipart(&ctx, "/admin/products/2", form).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("has been updated."));

    let data = ctx.backend.lock().unwrap();
    let mouse = data.products.get(&2).unwrap();
    assert_eq!(mouse.name, "Wireless Mouse II");
    assert_eq!(mouse.price, Price::from_cents(3000));
    assert_eq!(mouse.image_name, "image.png");
    assert!(data.images.contains_key(&2));
}

#[tokio::test]
async fn test_update_with_upload_replaces_image_metadata() {
    let ctx = TestContext::new().await;
    let form = product_form("Wireless Mouse", "25.50", "3")
        .text("image_name", "image.png")
        .text("image_type", "image/png")
        .part("image", png("mouse-v2.png"));

    let (status, _) = post_multipart(&ctx, "/admin/products/2", form).await;

    assert_eq!(status, StatusCode::OK);
    let data = ctx.backend.lock().unwrap();
    assert_eq!(data.products.get(&2).unwrap().image_name, "mouse-v2.png");
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_product() {
    let ctx = TestContext::new().await;
    let (status, body) = ctx
        .post_form("/admin/products/3/delete", &[("name", "Coffee Mug")])
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("has been deleted."));
    assert!(!ctx.backend.lock().unwrap().products.contains_key(&3));
}

#[tokio::test]
async fn test_delete_missing_product() {
    let ctx = TestContext::new().await;
    let (_, body) = ctx
        .post_form("/admin/products/999/delete", &[("name", "Ghost")])
        .await;

    assert!(body.contains("Product not found."));
    assert_eq!(ctx.backend.lock().unwrap().products.len(), 3);
}
