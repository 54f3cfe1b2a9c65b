//! Cart route handlers.
//!
//! The cart lives in the cart store under the session's cart token. Adds from
//! product cards go through HTMX and return the badge fragment; everything
//! else is a plain form post that redirects back to `/cart`.

use std::convert::Infallible;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{
        AppendHeaders, Html, IntoResponse, Redirect, Response, Sse,
        sse::{Event, KeepAlive},
    },
};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::{Cart, CartItem, ProductId};

use super::{is_htmx, products::image_path};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::models::Flash;
use crate::models::session::{cart_token, ensure_cart_token, set_flash, take_flash};
use crate::state::AppState;

/// Event name carried by cart count SSE messages.
pub const CART_COUNT_EVENT: &str = "cart-count";

const CHECKOUT_NOTICE: &str = "Checkout functionality will be implemented in the future.";

// =============================================================================
// Views
// =============================================================================

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
    pub price: String,
    pub quantity: u32,
    pub line_total: String,
    pub can_decrement: bool,
    pub decrement_quantity: u32,
    pub increment_quantity: u32,
}

impl From<&CartItem> for CartLineView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.as_i32(),
            name: item.name.clone(),
            image: item.image.clone(),
            price: item.price.display(),
            quantity: item.quantity,
            line_total: item.line_total().display(),
            can_decrement: item.quantity > 1,
            decrement_quantity: item.quantity.saturating_sub(1).max(1),
            increment_quantity: item.quantity.saturating_add(1),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartLineView>,
    pub total: String,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items().iter().map(CartLineView::from).collect(),
            total: cart.total().display(),
            item_count: cart.item_count(),
        }
    }
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
///
/// Quantities arrive as raw text so a cleared or negative number input is
/// clamped rather than rejected.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i32,
    pub quantity: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: i32,
    #[serde(default)]
    pub quantity: String,
}

/// Parse a submitted quantity. Blank or non-numeric input yields `None`.
fn parse_quantity(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim)
        .filter(|q| !q.is_empty())
        .and_then(|q| q.parse().ok())
}

/// Requested add quantity: missing or below one means one.
fn requested_add_quantity(raw: Option<&str>) -> u32 {
    parse_quantity(raw).map_or(1, |q| u32::try_from(q.max(1)).unwrap_or(u32::MAX))
}

/// Requested line quantity: `None` when below one or unreadable.
fn requested_line_quantity(raw: &str) -> Option<u32> {
    parse_quantity(Some(raw))
        .filter(|q| *q >= 1)
        .map(|q| u32::try_from(q).unwrap_or(u32::MAX))
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: i32,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub flash: Option<Flash>,
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let cart = match cart_token(&session).await {
        Some(token) => state.carts().load(&token).await,
        None => Cart::new(),
    };

    CartShowTemplate {
        flash: take_flash(&session).await,
        cart: CartView::from(&cart),
    }
}

/// Add a product to the cart.
///
/// The product is fetched so the cart line carries a fresh name and price
/// snapshot, and the quantity is bounded by its stock.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let htmx = is_htmx(&headers);
    let id = ProductId::new(form.product_id);

    let product = match state.catalog().get_product(id).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            return Ok(
                add_failed(&session, htmx, StatusCode::NOT_FOUND, "Product not found.").await,
            );
        }
        Err(e) => {
            tracing::error!("Failed to fetch product {id} for cart: {e}");
            return Ok(add_failed(
                &session,
                htmx,
                StatusCode::BAD_GATEWAY,
                "Failed to add product to cart. Please try again.",
            )
            .await);
        }
    };

    if !product.can_purchase() {
        return Ok(add_failed(
            &session,
            htmx,
            StatusCode::CONFLICT,
            "This product is out of stock.",
        )
        .await);
    }

    let quantity = product.clamp_quantity(requested_add_quantity(form.quantity.as_deref()));
    let token = ensure_cart_token(&session).await?;
    let cart = state
        .carts()
        .add(&token, product.to_cart_item(quantity, Some(image_path(id))), quantity)
        .await?;

    let product_id = id.to_string();
    let quantity_text = quantity.to_string();
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[
            ("product_id", product_id.as_str()),
            ("quantity", quantity_text.as_str()),
        ]),
    );

    if htmx {
        return Ok((
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartCountTemplate {
                count: cart.item_count(),
            },
        )
            .into_response());
    }

    set_flash(&session, Flash::success("Product added to cart!")).await;
    Ok(Redirect::to("/cart").into_response())
}

/// Response for an add that could not go through.
async fn add_failed(session: &Session, htmx: bool, status: StatusCode, message: &str) -> Response {
    if htmx {
        return (status, Html(add_error_fragment(message))).into_response();
    }
    set_flash(session, Flash::error(message)).await;
    Redirect::to("/cart").into_response()
}

/// Dismissible banner shown in the page's `#cart-feedback` slot.
fn add_error_fragment(message: &str) -> String {
    format!(
        "<div class=\"banner banner-error\" role=\"alert\"><span>{message}</span>\
         <button type=\"button\" class=\"banner-close\" data-dismiss aria-label=\"Dismiss\">&times;</button></div>"
    )
}

/// Set a line's quantity. Quantities below one or unreadable are ignored.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Redirect, AppError> {
    let Some(quantity) = requested_line_quantity(&form.quantity) else {
        return Ok(Redirect::to("/cart"));
    };
    if let Some(token) = cart_token(&session).await {
        state
            .carts()
            .update_quantity(&token, ProductId::new(form.product_id), quantity)
            .await?;
    }
    Ok(Redirect::to("/cart"))
}

/// Remove a line from the cart.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect, AppError> {
    if let Some(token) = cart_token(&session).await {
        state
            .carts()
            .remove(&token, ProductId::new(form.product_id))
            .await?;
    }
    Ok(Redirect::to("/cart"))
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Redirect, AppError> {
    if let Some(token) = cart_token(&session).await {
        state.carts().clear(&token).await?;
    }
    Ok(Redirect::to("/cart"))
}

/// Checkout placeholder.
#[instrument(skip(session))]
pub async fn checkout(session: Session) -> Redirect {
    set_flash(&session, Flash::info(CHECKOUT_NOTICE)).await;
    Redirect::to("/cart")
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let count = match cart_token(&session).await {
        Some(token) => state.carts().load(&token).await.item_count(),
        None => 0,
    };

    CartCountTemplate { count }
}

/// Stream this session's cart count whenever the cart changes.
///
/// Sends the current count immediately, then one message per change made
/// from any tab sharing the session.
#[instrument(skip(state, session))]
pub async fn events(
    State(state): State<AppState>,
    session: Session,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let token = cart_token(&session).await;
    let carts = state.carts().clone();
    let mut receiver = carts.subscribe();

    let stream = async_stream::stream! {
        let initial = match &token {
            Some(token) => carts.load(token).await.item_count(),
            None => 0,
        };
        yield Ok(count_event(initial));

        let Some(token) = token else {
            return;
        };

        loop {
            match receiver.recv().await {
                Ok(event) if event.token == token => {
                    yield Ok(count_event(event.item_count));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Cart event stream lagged");
                    yield Ok(count_event(carts.load(&token).await.item_count()));
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn count_event(count: u32) -> Event {
    Event::default().event(CART_COUNT_EVENT).data(count.to_string())
}
