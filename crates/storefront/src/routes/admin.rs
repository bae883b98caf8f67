//! Admin route handlers: catalog management and the order overview.
//!
//! Every handler takes [`RequireAdmin`] as its first argument, so anonymous and
//! non-admin requests are turned away before any other work happens.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, info, instrument};

use corner_shop_core::ProductId;

use crate::db::{OrderRepository, Page, ProductRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{PageContext, RequireAdmin, push_flash};
use crate::models::{FieldErrors, Flash, OrderSummary, Product, ProductDraft};
use crate::services::{CatalogError, CatalogService, ImageUpload};
use crate::state::AppState;

const DASHBOARD: &str = "/admin/dashboard";

// =============================================================================
// Form Types
// =============================================================================

/// Dashboard pagination; products and orders page independently.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub products_page: Option<u32>,
    pub orders_page: Option<u32>,
}

/// Raw product form values as typed, for re-rendering after a failed submit.
#[derive(Debug, Clone, Default)]
pub struct ProductFormValues {
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock: String,
}

impl From<&Product> for ProductFormValues {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.to_plain_string(),
            stock: product.stock.to_string(),
        }
    }
}

/// A submitted product form: text fields plus an optional image.
#[derive(Debug, Default)]
struct ProductSubmission {
    values: ProductFormValues,
    image: Option<ImageUpload>,
}

/// Read the multipart product form. A file input left empty yields no image.
async fn read_submission(mut multipart: Multipart) -> Result<ProductSubmission, AppError> {
    let mut submission = ProductSubmission::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "image" {
            let filename = field.file_name().unwrap_or_default().to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            if !filename.is_empty() && !bytes.is_empty() {
                submission.image = Some(ImageUpload {
                    filename,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let values = &mut submission.values;
        match name.as_str() {
            "name" => values.name = text,
            "description" => values.description = text,
            "price" => values.price = text,
            "stock" => values.stock = text,
            _ => {}
        }
    }

    Ok(submission)
}

fn parse_draft(values: &ProductFormValues) -> Result<ProductDraft, FieldErrors> {
    ProductDraft::parse(
        &values.name,
        &values.description,
        &values.price,
        &values.stock,
    )
}

// =============================================================================
// Templates
// =============================================================================

/// Admin dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub page: PageContext,
    pub products: Page<Product>,
    pub orders: Page<OrderSummary>,
}

/// Add/edit product form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/product_form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    pub title: &'static str,
    pub action: String,
    pub values: ProductFormValues,
    pub errors: FieldErrors,
    /// The product being edited; `None` when adding.
    pub product: Option<Product>,
}

impl ProductFormTemplate {
    fn new_product(page: PageContext, values: ProductFormValues, errors: FieldErrors) -> Self {
        Self {
            page,
            title: "Add Product",
            action: "/admin/add_product".to_owned(),
            values,
            errors,
            product: None,
        }
    }

    fn edit_product(
        page: PageContext,
        product: Product,
        values: ProductFormValues,
        errors: FieldErrors,
    ) -> Self {
        Self {
            page,
            title: "Edit Product",
            action: format!("/admin/edit_product/{}", product.id),
            values,
            errors,
            product: Some(product),
        }
    }
}

/// Split a catalog failure into inline form errors, or a generic retry flash
/// for infrastructure failures. `NotFound` is passed through.
fn form_errors(
    err: CatalogError,
    page: &mut PageContext,
    retry: &str,
) -> Result<FieldErrors, AppError> {
    let mut errors = FieldErrors::default();
    match err {
        CatalogError::Validation(field_errors) => return Ok(field_errors),
        CatalogError::NotFound => return Err(AppError::NotFound("product".to_owned())),
        e if e.is_user_error() => errors.add("image", e.to_string()),
        e => {
            let event_id = sentry::capture_error(&e);
            error!(error = %e, sentry_event_id = %event_id, "Catalog update failed");
            page.flashes.push(Flash::danger(retry));
        }
    }
    Ok(errors)
}

// =============================================================================
// Dashboard
// =============================================================================

/// Display products and recent orders.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn dashboard(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse, AppError> {
    let per_page = Page::<Product>::DEFAULT_PER_PAGE;

    let products = ProductRepository::new(state.pool())
        .list_active(query.products_page.unwrap_or(1).max(1), per_page)
        .await?;
    let orders = OrderRepository::new(state.pool())
        .list_recent(query.orders_page.unwrap_or(1).max(1), per_page)
        .await?;

    Ok(DashboardTemplate {
        page,
        products,
        orders,
    })
}

// =============================================================================
// Add Product
// =============================================================================

/// Display the empty product form.
pub async fn new_product(
    RequireAdmin(_admin): RequireAdmin,
    page: PageContext,
) -> impl IntoResponse {
    ProductFormTemplate::new_product(page, ProductFormValues::default(), FieldErrors::default())
}

/// Create a product from the submitted form.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    mut page: PageContext,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let ProductSubmission { values, image } = read_submission(multipart).await?;

    let draft = match parse_draft(&values) {
        Ok(draft) => draft,
        Err(errors) => {
            return Ok(ProductFormTemplate::new_product(page, values, errors).into_response());
        }
    };

    match CatalogService::new(state.pool(), state.images())
        .create(&draft, image)
        .await
    {
        Ok(product) => {
            info!(product_id = %product.id, "Admin added product");
            push_flash(&session, Flash::success("Product added successfully!")).await?;
            Ok(Redirect::to(DASHBOARD).into_response())
        }
        Err(e) => {
            let errors = form_errors(e, &mut page, "Error adding product. Please try again.")?;
            Ok(ProductFormTemplate::new_product(page, values, errors).into_response())
        }
    }
}

// =============================================================================
// Edit Product
// =============================================================================

async fn active_product(state: &AppState, id: ProductId) -> Result<Product, AppError> {
    ProductRepository::new(state.pool())
        .get_active(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Display the product form filled with the current values.
pub async fn edit_product(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, AppError> {
    let product = active_product(&state, id).await?;
    let values = ProductFormValues::from(&product);
    Ok(ProductFormTemplate::edit_product(
        page,
        product,
        values,
        FieldErrors::default(),
    ))
}

/// Overwrite a product from the submitted form. Without a new image the
/// current one is kept.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn update_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    mut page: PageContext,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let product = active_product(&state, id).await?;
    let ProductSubmission { values, image } = read_submission(multipart).await?;

    let draft = match parse_draft(&values) {
        Ok(draft) => draft,
        Err(errors) => {
            return Ok(
                ProductFormTemplate::edit_product(page, product, values, errors).into_response(),
            );
        }
    };

    match CatalogService::new(state.pool(), state.images())
        .update(id, &draft, image)
        .await
    {
        Ok(_) => {
            push_flash(&session, Flash::success("Product updated successfully!")).await?;
            Ok(Redirect::to(DASHBOARD).into_response())
        }
        Err(e) => {
            let errors = form_errors(e, &mut page, "Error updating product. Please try again.")?;
            Ok(ProductFormTemplate::edit_product(page, product, values, errors).into_response())
        }
    }
}

// =============================================================================
// Delete Product
// =============================================================================

/// Archive a product. It disappears from the catalog and carts; past orders
/// keep their lines.
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn delete_product(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Redirect, AppError> {
    match CatalogService::new(state.pool(), state.images()).archive(id).await {
        Ok(()) => {
            push_flash(&session, Flash::success("Product deleted successfully!")).await?;
            Ok(Redirect::to(DASHBOARD))
        }
        Err(CatalogError::NotFound) => Err(AppError::NotFound(format!("product {id}"))),
        Err(CatalogError::Repository(e)) => Err(AppError::Database(e)),
        Err(e) => Err(AppError::Internal(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ImageError;

    #[test]
    fn test_validation_errors_pass_through() {
        let mut page = PageContext::default();
        let mut field_errors = FieldErrors::default();
        field_errors.add("name", "Name is required.");

        let errors = form_errors(CatalogError::Validation(field_errors), &mut page, "retry")
            .unwrap_or_default();
        assert_eq!(errors.get("name"), Some("Name is required."));
        assert!(page.flashes.is_empty());
    }

    #[test]
    fn test_rejected_image_shown_on_field() {
        let mut page = PageContext::default();
        let errors = form_errors(
            CatalogError::Image(ImageError::DisallowedExtension),
            &mut page,
            "retry",
        )
        .unwrap_or_default();
        assert!(errors.get("image").is_some_and(|m| m.contains("png")));
        assert!(page.flashes.is_empty());
    }

    #[test]
    fn test_storage_failure_becomes_retry_flash() {
        let mut page = PageContext::default();
        let io = std::io::Error::other("disk full");
        let errors = form_errors(CatalogError::Image(ImageError::Io(io)), &mut page, "Try again.")
            .unwrap_or_default();
        assert!(errors.is_empty());
        assert_eq!(page.flashes.len(), 1);
        assert_eq!(page.flashes[0].message, "Try again.");
    }

    #[test]
    fn test_not_found_is_not_a_form_error() {
        let mut page = PageContext::default();
        assert!(matches!(
            form_errors(CatalogError::NotFound, &mut page, "retry"),
            Err(AppError::NotFound(_))
        ));
    }
}
