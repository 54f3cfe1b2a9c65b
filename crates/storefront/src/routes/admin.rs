//! Product administration route handlers.
//!
//! Create and update are multipart forms: the text fields become the JSON
//! `product` part and the optional file input becomes the backend's
//! `imageFile` part.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use shopfront_core::{Price, Product, ProductId, ProductInput};

use super::{error_page, products::image_path};
use crate::catalog::{ApiError, ImageUpload};
use crate::error::AppError;
use crate::filters;
use crate::models::Flash;
use crate::models::session::{set_flash, take_flash};
use crate::state::AppState;

const LOAD_ERROR: &str = "Failed to load products. Please try again later.";
const IMAGE_REQUIRED: &str = "Please select an image for the product.";

// =============================================================================
// Views
// =============================================================================

/// Admin table row.
#[derive(Debug, Clone)]
pub struct AdminProductRow {
    pub id: i32,
    pub name: String,
    pub brand: String,
    pub price: String,
    pub category: String,
    pub stock_quantity: i32,
    pub status: &'static str,
    pub status_class: &'static str,
    pub image_url: String,
}

impl From<&Product> for AdminProductRow {
    fn from(product: &Product) -> Self {
        let (status, status_class) = if product.product_available {
            ("Available", "status-available")
        } else {
            ("Unavailable", "status-unavailable")
        };
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            price: product.price.display(),
            category: product.category.clone(),
            stock_quantity: product.stock_quantity,
            status,
            status_class,
            image_url: product
                .embedded_image_uri()
                .unwrap_or_else(|| image_path(product.id)),
        }
    }
}

/// Values shown in the create/edit form.
///
/// Kept as raw strings so a rejected submission re-renders exactly what the
/// user typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFormView {
    pub name: String,
    pub description: String,
    pub brand: String,
    pub price: String,
    pub category: String,
    pub release_date: String,
    pub product_available: bool,
    pub stock_quantity: String,
    pub image_name: String,
    pub image_type: String,
}

impl From<&ProductInput> for ProductFormView {
    fn from(input: &ProductInput) -> Self {
        Self {
            name: input.name.clone(),
            description: input.description.clone(),
            brand: input.brand.clone(),
            price: input.price.amount().to_string(),
            category: input.category.clone(),
            release_date: input
                .release_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            product_available: input.product_available,
            stock_quantity: input.stock_quantity.to_string(),
            image_name: input.image_name.clone().unwrap_or_default(),
            image_type: input.image_type.clone().unwrap_or_default(),
        }
    }
}

impl ProductFormView {
    /// Validate into the backend payload.
    ///
    /// Blank price and stock mean zero; a blank release date means `today`.
    ///
    /// # Errors
    ///
    /// Returns a user-facing message for the first invalid field.
    pub fn to_input(&self, today: NaiveDate) -> Result<ProductInput, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Product name is required.".to_string());
        }

        let price = match self.price.trim() {
            "" => Price::ZERO,
            raw => raw
                .parse::<Price>()
                .map_err(|_| "Price must be a number.".to_string())?,
        };
        if price.is_negative() {
            return Err("Price cannot be negative.".to_string());
        }

        let stock_quantity = match self.stock_quantity.trim() {
            "" => 0,
            raw => raw
                .parse::<i32>()
                .map_err(|_| "Stock quantity must be a whole number.".to_string())?,
        };
        if stock_quantity < 0 {
            return Err("Stock quantity cannot be negative.".to_string());
        }

        let release_date = match self.release_date.trim() {
            "" => today,
            raw => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| "Release date must be a valid date.".to_string())?,
        };

        Ok(ProductInput {
            id: None,
            name: name.to_string(),
            description: self.description.trim().to_string(),
            brand: self.brand.trim().to_string(),
            price,
            category: self.category.trim().to_string(),
            release_date: Some(release_date),
            product_available: self.product_available,
            stock_quantity,
            image_name: Some(self.image_name.clone()).filter(|s| !s.is_empty()),
            image_type: Some(self.image_type.clone()).filter(|s| !s.is_empty()),
        })
    }

    /// Set one text field by its form name. Unknown names are ignored.
    fn set(&mut self, field: &str, value: String) {
        match field {
            "name" => self.name = value,
            "description" => self.description = value,
            "brand" => self.brand = value,
            "price" => self.price = value,
            "category" => self.category = value,
            "release_date" => self.release_date = value,
            "product_available" => self.product_available = is_checked(&value),
            "stock_quantity" => self.stock_quantity = value,
            "image_name" => self.image_name = value,
            "image_type" => self.image_type = value,
            _ => {}
        }
    }
}

fn is_checked(value: &str) -> bool {
    matches!(value, "on" | "true" | "1")
}

/// A parsed product form submission.
#[derive(Debug)]
pub struct ProductSubmission {
    pub form: ProductFormView,
    pub image: Option<ImageUpload>,
}

/// Read the multipart body into form values and the optional image.
///
/// An empty file input (no name, no bytes) counts as no image.
async fn read_submission(mut multipart: Multipart) -> Result<ProductSubmission, AppError> {
    let mut form = ProductFormView::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form data: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid image upload: {e}")))?;
            if !bytes.is_empty() {
                image = Some(ImageUpload::new(
                    file_name,
                    content_type.as_deref(),
                    bytes.to_vec(),
                ));
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid form field {name}: {e}")))?;
            form.set(&name, value);
        }
    }

    Ok(ProductSubmission { form, image })
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

// =============================================================================
// Templates
// =============================================================================

/// Admin product table template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/index.html")]
pub struct AdminIndexTemplate {
    pub flash: Option<Flash>,
    pub products: Vec<AdminProductRow>,
    pub error: Option<&'static str>,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/form.html")]
pub struct ProductFormTemplate {
    pub flash: Option<Flash>,
    /// `None` when creating.
    pub product_id: Option<i32>,
    pub form: ProductFormView,
    pub action: String,
    pub image_required: bool,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    fn create(form: ProductFormView, error: Option<String>) -> Self {
        Self {
            flash: None,
            product_id: None,
            form,
            action: "/admin/products".to_string(),
            image_required: true,
            error,
        }
    }

    fn edit(id: ProductId, form: ProductFormView, error: Option<String>) -> Self {
        Self {
            flash: None,
            product_id: Some(id.as_i32()),
            form,
            action: format!("/admin/products/{id}"),
            image_required: false,
            error,
        }
    }
}

/// Delete form data.
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub name: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Product table.
#[instrument(skip(state, session))]
pub async fn index(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let (products, error) = match state.catalog().list_products().await {
        Ok(products) => (products.iter().map(AdminProductRow::from).collect(), None),
        Err(e) => {
            tracing::error!("Failed to fetch products: {e}");
            (Vec::new(), Some(LOAD_ERROR))
        }
    };

    AdminIndexTemplate {
        flash: take_flash(&session).await,
        products,
        error,
    }
}

/// Blank create form.
#[instrument(skip(session))]
pub async fn new_product(session: Session) -> impl IntoResponse {
    let form = ProductFormView::from(&ProductInput::new_default(today()));
    ProductFormTemplate {
        flash: take_flash(&session).await,
        ..ProductFormTemplate::create(form, None)
    }
}

/// Create a product from a multipart submission.
#[instrument(skip(state, session, multipart))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let ProductSubmission { form, image } = read_submission(multipart).await?;

    let input = match form.to_input(today()) {
        Ok(input) => input,
        Err(message) => {
            return Ok(rejected(ProductFormTemplate::create(form, Some(message))));
        }
    };
    let Some(image) = image else {
        return Ok(rejected(ProductFormTemplate::create(
            form,
            Some(IMAGE_REQUIRED.to_string()),
        )));
    };

    match state.catalog().create_product(&input, image).await {
        Ok(product) => {
            let name = if product.name.is_empty() {
                &input.name
            } else {
                &product.name
            };
            set_flash(&session, Flash::success(format!("Product \"{name}\" has been added."))).await;
            Ok(Redirect::to("/admin/products").into_response())
        }
        Err(e) => {
            tracing::error!("Failed to create product: {e}");
            Ok((
                StatusCode::BAD_GATEWAY,
                ProductFormTemplate::create(
                    form,
                    Some("Failed to add product. Please try again.".to_string()),
                ),
            )
                .into_response())
        }
    }
}

/// Pre-filled edit form.
#[instrument(skip(state, session))]
pub async fn edit(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Response {
    let id = ProductId::new(id);
    match state.catalog().get_product(id).await {
        Ok(Some(product)) => {
            let form = ProductFormView::from(&ProductInput::from_product(&product));
            ProductFormTemplate {
                flash: take_flash(&session).await,
                ..ProductFormTemplate::edit(id, form, None)
            }
            .into_response()
        }
        Ok(None) => error_page(StatusCode::NOT_FOUND, "Product not found", "Product not found"),
        Err(e) => {
            tracing::error!("Failed to fetch product {id}: {e}");
            error_page(
                StatusCode::BAD_GATEWAY,
                "Something went wrong",
                "Failed to load product details. Please try again later.",
            )
        }
    }
}

/// Update a product from a multipart submission.
///
/// Without a new upload the stored image name and type ride along from the
/// form's hidden fields so the backend keeps the existing image.
#[instrument(skip(state, session, multipart))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let id = ProductId::new(id);
    let ProductSubmission { form, image } = read_submission(multipart).await?;

    let mut input = match form.to_input(today()) {
        Ok(input) => input,
        Err(message) => {
            return Ok(rejected(ProductFormTemplate::edit(id, form, Some(message))));
        }
    };
    input.id = Some(id);
    if let Some(image) = &image {
        input.image_name = Some(image.file_name.clone());
        input.image_type = Some(image.content_type.clone());
    }

    match state.catalog().update_product(id, &input, image).await {
        Ok(()) => {
            set_flash(
                &session,
                Flash::success(format!("Product \"{}\" has been updated.", input.name)),
            )
            .await;
            Ok(Redirect::to("/admin/products").into_response())
        }
        Err(e) => {
            tracing::error!("Failed to update product {id}: {e}");
            Ok((
                StatusCode::BAD_GATEWAY,
                ProductFormTemplate::edit(
                    id,
                    form,
                    Some("Failed to update product. Please try again.".to_string()),
                ),
            )
                .into_response())
        }
    }
}

/// Delete a product and report the outcome as a flash banner.
#[instrument(skip(state, session))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<DeleteForm>,
) -> Redirect {
    let id = ProductId::new(id);
    let flash = match state.catalog().delete_product(id).await {
        Ok(()) => {
            let name = form
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("#{id}"));
            Flash::success(format!("Product \"{name}\" has been deleted."))
        }
        Err(ApiError::NotFound(_)) => Flash::error("Product not found."),
        Err(e) => {
            tracing::error!("Failed to delete product {id}: {e}");
            Flash::error("Failed to delete product. Please try again.")
        }
    };

    set_flash(&session, flash).await;
    Redirect::to("/admin/products")
}

fn rejected(template: ProductFormTemplate) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}
