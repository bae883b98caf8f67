//! Catalog pages: the product listing and product detail.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::instrument;

use corner_shop_core::ProductId;

use super::PageQuery;
use crate::db::{Page, ProductRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::PageContext;
use crate::models::Product;
use crate::state::AppState;

/// Products per page on the home page.
const PRODUCTS_PER_PAGE: u32 = 12;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub page: PageContext,
    pub products: Page<Product>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "product.html")]
pub struct ProductTemplate {
    pub page: PageContext,
    pub product: Product,
}

/// Display the active products, newest first.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let products = ProductRepository::new(state.pool())
        .list_active(query.number(), PRODUCTS_PER_PAGE)
        .await?;

    Ok(IndexTemplate { page, products })
}

/// Display one active product.
#[instrument(skip(state, page))]
pub async fn product(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse, AppError> {
    let product = ProductRepository::new(state.pool())
        .get_active(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(ProductTemplate { page, product })
}
