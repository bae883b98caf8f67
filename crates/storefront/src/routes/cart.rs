//! Cart and checkout route handlers.
//!
//! The cart lives in the session as product IDs and quantities. Products are
//! resolved against the catalog on every view, so prices and availability are
//! always current. Lines whose product has since been archived are dropped
//! from the session cart when it is viewed.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use corner_shop_core::ProductId;

use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{PageContext, RequireAuth, load_cart, push_flash, save_cart};
use crate::models::{Cart, CartView, Flash, Product};
use crate::services::{CheckoutError, CheckoutService};
use crate::state::AppState;

const EMPTY_CART: &str = "Your cart is empty.";
const OUT_OF_STOCK: &str = "One or more products are out of stock.";
const NO_LONGER_AVAILABLE: &str = "One or more products are no longer available.";
const UNAVAILABLE_REMOVED: &str =
    "Some items are no longer available and were removed from your cart.";
const TOTAL_TOO_LARGE: &str = "Your order total is too large. Please reduce the quantities.";

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
pub struct CartTemplate<'a> {
    pub page: PageContext,
    pub cart: CartView<'a>,
}

/// Order review template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate<'a> {
    pub page: PageContext,
    pub cart: CartView<'a>,
}

/// Active products referenced by the cart, keyed by ID.
async fn cart_catalog(
    state: &AppState,
    cart: &Cart,
) -> Result<HashMap<ProductId, Product>, AppError> {
    let products = ProductRepository::new(state.pool())
        .get_active_by_ids(&cart.product_ids())
        .await?;
    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

/// Resolve the cart's products, dropping lines that are no longer
/// available. Returns the catalog and how many lines were dropped.
async fn prune_cart(
    state: &AppState,
    session: &Session,
    cart: &mut Cart,
) -> Result<(HashMap<ProductId, Product>, usize), AppError> {
    let catalog = cart_catalog(state, cart).await?;
    let removed = cart.retain_available(&catalog);
    if removed > 0 {
        save_cart(session, cart).await?;
        info!(removed, "Dropped unavailable products from cart");
    }
    Ok((catalog, removed))
}

/// Add one unit of a product to the cart.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<ProductId>,
) -> Result<Redirect, AppError> {
    let product = ProductRepository::new(state.pool())
        .get_active(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let mut cart = load_cart(&session).await?;
    let quantity = cart.add(product.id, 1);
    save_cart(&session, &cart).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        &[("product_id", &id.to_string()), ("quantity", &quantity.to_string())],
    );
    push_flash(&session, Flash::success(format!("Added {} to cart.", product.name))).await?;

    Ok(Redirect::to("/"))
}

/// Display the cart with current prices.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    mut page: PageContext,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await?;
    let (catalog, removed) = prune_cart(&state, &session, &mut cart).await?;
    if removed > 0 {
        page.cart_count = cart.item_count();
        page.flashes.push(Flash::warning(UNAVAILABLE_REMOVED));
    }

    Ok(CartTemplate {
        page,
        cart: cart.view(&catalog),
    }
    .into_response())
}

/// Remove a product's line from the cart. Unknown IDs are ignored.
pub async fn remove(session: Session, Path(id): Path<ProductId>) -> Result<Redirect, AppError> {
    let mut cart = load_cart(&session).await?;
    if cart.remove(id) {
        save_cart(&session, &cart).await?;
        push_flash(&session, Flash::success("Item removed from cart.")).await?;
    }
    Ok(Redirect::to("/cart"))
}

/// Display the order review before placing it.
pub async fn review(
    RequireAuth(_user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> Result<Response, AppError> {
    let mut cart = load_cart(&session).await?;
    if cart.is_empty() {
        push_flash(&session, Flash::warning(EMPTY_CART)).await?;
        return Ok(Redirect::to("/").into_response());
    }

    let (catalog, removed) = prune_cart(&state, &session, &mut cart).await?;
    if removed > 0 {
        push_flash(&session, Flash::warning(UNAVAILABLE_REMOVED)).await?;
        return Ok(Redirect::to("/cart").into_response());
    }
    Ok(CheckoutTemplate {
        page,
        cart: cart.view(&catalog),
    }
    .into_response())
}

/// Place the order.
///
/// The cart is cleared only after the order is committed; a rejected checkout
/// leaves it as it was.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn checkout(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Redirect, AppError> {
    let mut cart = load_cart(&session).await?;

    match CheckoutService::new(state.pool())
        .place_order(user.id, &cart)
        .await
    {
        Ok(placed) => {
            cart.clear();
            save_cart(&session, &cart).await?;
            add_breadcrumb(
                "checkout",
                "Order placed",
                &[("order_id", &placed.order_id.to_string())],
            );
            info!(order_id = %placed.order_id, "Checkout complete");
            push_flash(&session, Flash::success("Order placed successfully!")).await?;
            Ok(Redirect::to("/"))
        }
        Err(CheckoutError::EmptyCart) => {
            push_flash(&session, Flash::warning(EMPTY_CART)).await?;
            Ok(Redirect::to("/"))
        }
        Err(e @ CheckoutError::ProductUnavailable(_)) => {
            warn!(error = %e, "Checkout refused");
            push_flash(&session, Flash::danger(NO_LONGER_AVAILABLE)).await?;
            Ok(Redirect::to("/cart"))
        }
        Err(
            e @ (CheckoutError::OutOfStock { .. }
            | CheckoutError::Repository(RepositoryError::Conflict(_))),
        ) => {
            warn!(error = %e, "Checkout refused");
            push_flash(&session, Flash::danger(OUT_OF_STOCK)).await?;
            Ok(Redirect::to("/cart"))
        }
        Err(e @ CheckoutError::TotalTooLarge) => {
            warn!(error = %e, "Checkout refused");
            push_flash(&session, Flash::danger(TOTAL_TOO_LARGE)).await?;
            Ok(Redirect::to("/cart"))
        }
        Err(CheckoutError::Repository(e)) => Err(AppError::Database(e)),
    }
}
