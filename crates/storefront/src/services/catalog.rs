//! Admin catalog management.

use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use corner_shop_core::ProductId;

use super::images::{DEFAULT_IMAGE, ImageError, ImageStore};
use crate::db::{ProductRepository, RepositoryError};
use crate::models::{FieldErrors, Product, ProductDraft};

/// Errors from creating, updating, or archiving products.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Form input failed validation.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// The uploaded image was rejected or could not be stored.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The product does not exist or is archived.
    #[error("product not found")]
    NotFound,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

impl CatalogError {
    /// Whether the error is the user's to fix (shown inline on the form)
    /// rather than an infrastructure failure.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Image(ImageError::MissingFilename | ImageError::DisallowedExtension)
        )
    }
}

/// An uploaded image as received from the form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Product create/update/archive with image handling.
pub struct CatalogService<'a> {
    products: ProductRepository<'a>,
    images: &'a ImageStore,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, images: &'a ImageStore) -> Self {
        Self {
            products: ProductRepository::new(pool),
            images,
        }
    }

    /// Create a product, storing its image first. Without an image the
    /// placeholder is recorded.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Image` if the upload is rejected or cannot be
    /// written, `CatalogError::Repository` if the insert fails (the stored
    /// image is removed again).
    pub async fn create(
        &self,
        draft: &ProductDraft,
        image: Option<ImageUpload>,
    ) -> Result<Product, CatalogError> {
        let image_file = match image {
            Some(upload) => self.images.save(&upload.filename, &upload.bytes).await?,
            None => DEFAULT_IMAGE.to_owned(),
        };

        match self.products.create(draft, &image_file).await {
            Ok(product) => {
                info!(product_id = %product.id, name = %product.name, "Product created");
                Ok(product)
            }
            Err(e) => {
                self.images.remove(&image_file).await;
                Err(e.into())
            }
        }
    }

    /// Overwrite a product's fields, replacing its image when one is given.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product is absent or archived,
    /// otherwise the errors of [`CatalogService::create`].
    pub async fn update(
        &self,
        id: ProductId,
        draft: &ProductDraft,
        image: Option<ImageUpload>,
    ) -> Result<Product, CatalogError> {
        let existing = self
            .products
            .get_active(id)
            .await?
            .ok_or(CatalogError::NotFound)?;

        let new_image = match image {
            Some(upload) => Some(self.images.save(&upload.filename, &upload.bytes).await?),
            None => None,
        };

        match self.products.update(id, draft, new_image.as_deref()).await {
            Ok(product) => {
                if new_image.is_some() {
                    self.images.remove(&existing.image_file).await;
                }
                info!(product_id = %product.id, "Product updated");
                Ok(product)
            }
            Err(e) => {
                if let Some(stored) = &new_image {
                    self.images.remove(stored).await;
                }
                Err(e.into())
            }
        }
    }

    /// Archive a product. Its image stays on disk for past orders.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product is absent or already
    /// archived.
    pub async fn archive(&self, id: ProductId) -> Result<(), CatalogError> {
        self.products.archive(id).await?;
        info!(product_id = %id, "Product archived");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_from_repository() {
        assert!(matches!(
            CatalogError::from(RepositoryError::NotFound),
            CatalogError::NotFound
        ));
        assert!(matches!(
            CatalogError::from(RepositoryError::Conflict("x".into())),
            CatalogError::Repository(_)
        ));
    }

    #[test]
    fn test_user_errors_vs_infrastructure() {
        assert!(CatalogError::Image(ImageError::DisallowedExtension).is_user_error());
        assert!(CatalogError::Validation(FieldErrors::default()).is_user_error());
        let io = std::io::Error::other("disk full");
        assert!(!CatalogError::Image(ImageError::Io(io)).is_user_error());
        assert!(!CatalogError::NotFound.is_user_error());
    }
}
