//! The product under review.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// A product description handed to every persona.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,

    /// Free-text price; numeric prices are accepted and kept as written
    #[serde(deserialize_with = "price_text")]
    pub price: String,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default)]
    pub strengths: Vec<String>,

    #[serde(default)]
    pub weaknesses: Vec<String>,

    #[serde(default)]
    pub unique_features: Vec<String>,
}

fn price_text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Price {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Price::deserialize(deserializer)? {
        Price::Text(text) => text,
        Price::Number(number) => number.to_string(),
    })
}

impl Product {
    pub fn new(name: impl Into<String>, price: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            description: description.into(),
            category: None,
            strengths: Vec::new(),
            weaknesses: Vec::new(),
            unique_features: Vec::new(),
        }
    }

    /// Load a product from a JSON or TOML file, chosen by extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let product: Product = if is_toml {
            toml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: format!("{}: {}", path.display(), e),
                source: Some(e),
            })?
        } else {
            serde_json::from_str(&content)?
        };

        if product.name.trim().is_empty() {
            return Err(Error::config_field_invalid("name", "product name must not be empty"));
        }
        Ok(product)
    }

    /// Category, or `N/A` when unset.
    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or("N/A")
    }

    /// Render the product as the user message each persona reviews.
    ///
    /// Strength, weakness and uniqueness sections are omitted when empty.
    pub fn to_review_format(&self) -> String {
        let mut text = format!(
            "Review this product: {}\n{} price: {}",
            self.name, self.description, self.price
        );

        let sections = [
            ("Strengths", &self.strengths),
            ("Weaknesses", &self.weaknesses),
            ("Uniqueness", &self.unique_features),
        ];

        for (title, items) in sections {
            if !items.is_empty() {
                text.push_str(&format!("\n\n{}:\n{}", title, items.join("\n")));
            }
        }

        text
    }
}

/// Product fields carried into the summary prompt and the run outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductContext {
    pub name: String,
    pub description: String,
    pub price: String,
    pub category: String,
}

impl From<&Product> for ProductContext {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.clone(),
            category: product.category_or_default().to_string(),
        }
    }
}
