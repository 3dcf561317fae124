use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::CatalogError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
struct CatalogDocument {
    products: Vec<Product>,
}

/// The static product list, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Ok(Self::new(document.products))
    }

    /// Loads from a local file or, when `source` is an http(s) URL, downloads it.
    #[instrument]
    pub async fn load(source: &str) -> Result<Self, CatalogError> {
        let json = if source.starts_with("http://") || source.starts_with("https://") {
            reqwest::get(source).await?.error_for_status()?.text().await?
        } else {
            tokio::fs::read_to_string(Path::new(source)).await?
        };
        let catalog = Self::from_json(&json)?;
        info!("Loaded {} products from {}", catalog.products.len(), source);
        Ok(catalog)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn find(&self, name: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.name == name)
    }

    pub fn categories(&self) -> Vec<String> {
        self.products
            .iter()
            .map(|p| p.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "products": [
            {"id": 1, "name": "Revitalift Serum", "brand": "L'Oréal Paris", "category": "skincare",
             "image": "serum.jpg", "description": "Hyaluronic acid serum"},
            {"id": 2, "name": "Sky High Mascara", "brand": "Maybelline", "category": "makeup",
             "image": "mascara.jpg"},
            {"id": 3, "name": "Hydrating Cleanser", "brand": "CeraVe", "category": "skincare",
             "image": "cleanser.jpg"}
        ]
    }"#;

    #[test]
    fn test_from_json_ignores_unknown_fields() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.products().len(), 3);
        assert_eq!(catalog.products()[1].description, None);
        assert_eq!(
            catalog.find("Revitalift Serum").unwrap().description.as_deref(),
            Some("Hyaluronic acid serum")
        );
    }

    #[test]
    fn test_categories_are_distinct_and_sorted() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.categories(), vec!["makeup", "skincare"]);
    }

    #[test]
    fn test_from_json_rejects_missing_products() {
        assert!(matches!(
            Catalog::from_json(r#"{"items": []}"#),
            Err(CatalogError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let catalog = Catalog::load(path.to_str().unwrap()).await.unwrap();
        assert!(catalog.find("Hydrating Cleanser").is_some());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let result = Catalog::load("/definitely/not/here.json").await;
        assert!(matches!(result, Err(CatalogError::Io(_))));
    }
}
