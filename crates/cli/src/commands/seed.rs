//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - name: Enamel Mug
//!     description: Speckled camp mug, 350 ml.
//!     price: "12.50"
//!     stock: 40
//!     image: mug.png   # optional, already present in the images directory
//! ```
//!
//! Every entry is validated before the database is touched. Products whose
//! name matches an active product are skipped, so the file can be re-run.

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};

use corner_shop_storefront::db::ProductRepository;
use corner_shop_storefront::models::ProductDraft;
use corner_shop_storefront::services::images::{DEFAULT_IMAGE, validate_filename};

use super::connect;

/// Top level of the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    pub products: Vec<SeedProduct>,
}

/// One product entry as written in the file.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock: i64,
    pub image: Option<String>,
}

/// A validated entry ready to insert.
#[derive(Debug)]
pub struct SeedEntry {
    pub draft: ProductDraft,
    pub image_file: String,
}

/// Validate every entry, returning either all drafts or all problems.
pub fn validate(file: &SeedFile) -> Result<Vec<SeedEntry>, Vec<String>> {
    let mut entries = Vec::with_capacity(file.products.len());
    let mut problems = Vec::new();

    for (index, product) in file.products.iter().enumerate() {
        let label = format!("products[{index}] ({})", product.name);

        let draft = ProductDraft::parse(
            &product.name,
            &product.description,
            &product.price,
            &product.stock.to_string(),
        )
        .map_err(|errors| problems.push(format!("{label}: {errors}")))
        .ok();

        let image_file = match &product.image {
            None => Some(DEFAULT_IMAGE.to_owned()),
            Some(image) => match validate_filename(image) {
                Ok(sanitized) if &sanitized == image => Some(sanitized),
                Ok(_) => {
                    problems.push(format!("{label}: image name {image:?} is not a plain filename"));
                    None
                }
                Err(e) => {
                    problems.push(format!("{label}: {e}"));
                    None
                }
            },
        };

        if let (Some(draft), Some(image_file)) = (draft, image_file) {
            entries.push(SeedEntry { draft, image_file });
        }
    }

    if problems.is_empty() {
        Ok(entries)
    } else {
        Err(problems)
    }
}

/// Seed products from a YAML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or database operations fail.
pub async fn products(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let file: SeedFile = serde_yaml::from_str(&content)?;

    let entries = match validate(&file) {
        Ok(entries) => entries,
        Err(problems) => {
            error!("Seed file validation failed:");
            for problem in &problems {
                error!("  - {problem}");
            }
            return Err(format!("{} validation errors found", problems.len()).into());
        }
    };

    info!(products = entries.len(), "Seed file validated");
    if dry_run {
        return Ok(());
    }

    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    let mut inserted = 0_usize;
    let mut skipped = 0_usize;
    for entry in &entries {
        if repo.active_name_exists(&entry.draft.name).await? {
            warn!(name = %entry.draft.name, "Product already exists, skipping");
            skipped += 1;
            continue;
        }
        let product = repo.create(&entry.draft, &entry.image_file).await?;
        info!(product_id = %product.id, name = %product.name, "Inserted product");
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    info!("  Products skipped (already exist): {skipped}");

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> SeedFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_valid_file() {
        let file = parse(
            r#"
products:
  - name: Enamel Mug
    description: Speckled camp mug.
    price: "12.50"
    stock: 40
    image: mug.png
  - name: Tote Bag
    description: Heavy canvas.
    price: "9"
    stock: 0
"#,
        );

        let entries = validate(&file).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].image_file, "mug.png");
        assert_eq!(entries[0].draft.stock, 40);
        assert_eq!(entries[1].image_file, DEFAULT_IMAGE);
        assert_eq!(entries[1].draft.price.to_plain_string(), "9.00");
    }

    #[test]
    fn test_every_problem_reported() {
        let file = parse(
            r#"
products:
  - name: X
    description: Too short a name.
    price: "1.00"
    stock: 1
  - name: Negative Stock
    description: Bad stock.
    price: "1.00"
    stock: -3
  - name: Bad Image
    description: Traversal.
    price: "1.00"
    stock: 1
    image: ../secret.png
"#,
        );

        let problems = validate(&file).unwrap_err();
        assert_eq!(problems.len(), 3);
        assert!(problems[0].contains("products[0]"));
        assert!(problems[1].contains("Stock cannot be negative."));
        assert!(problems[2].contains("not a plain filename"));
    }
}
