use crate::domain::money::Amount;
use crate::error::{Result, ShopError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A product category. Names are unique across live categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A catalog product.
///
/// `sizes` and `colors` are ordered sets; at rest they are serialized as
/// comma-joined strings and expanded back to lists at the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub price: Amount,
    pub description: String,
    #[serde(with = "comma_list")]
    pub sizes: Vec<String>,
    #[serde(with = "comma_list")]
    pub colors: Vec<String>,
    /// Opaque photo reference: a URL or an uploaded-file id.
    pub photo: String,
    pub stock: u32,
    pub created_at: DateTime<Utc>,
}

/// Fields collected for a product about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub category_id: i64,
    pub price: Amount,
    pub description: String,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub stock: u32,
    pub photo: String,
}

/// A product joined with its category name for the admin listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    pub product: Product,
    pub category: Option<String>,
}

/// The editable-field allow-list. Anything else is rejected at the parse
/// boundary and never reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductField {
    Name,
    Price,
    Description,
    Sizes,
    Colors,
    Stock,
    Photo,
}

impl ProductField {
    pub const ALL: [Self; 7] = [
        Self::Name,
        Self::Price,
        Self::Description,
        Self::Sizes,
        Self::Colors,
        Self::Stock,
        Self::Photo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Price => "price",
            Self::Description => "description",
            Self::Sizes => "sizes",
            Self::Colors => "colors",
            Self::Stock => "stock",
            Self::Photo => "photo",
        }
    }

    /// Parses raw text into the value type this field expects.
    pub fn parse_value(&self, raw: &str) -> Result<FieldValue> {
        match self {
            Self::Name | Self::Description | Self::Photo => {
                Ok(FieldValue::Text(non_empty(raw)?))
            }
            Self::Price => Ok(FieldValue::Money(Amount::from_decimal_str(raw)?)),
            Self::Stock => {
                let count = raw.trim().parse::<u32>().map_err(|_| {
                    ShopError::ValidationFailed(format!(
                        "{raw:?} is not a non-negative whole number"
                    ))
                })?;
                Ok(FieldValue::Count(count))
            }
            Self::Sizes | Self::Colors => {
                let list = split_list(raw);
                if list.is_empty() {
                    return Err(ShopError::ValidationFailed(
                        "expected a comma-separated list".to_string(),
                    ));
                }
                Ok(FieldValue::List(list))
            }
        }
    }
}

impl FromStr for ProductField {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "price" => Ok(Self::Price),
            "description" => Ok(Self::Description),
            "sizes" => Ok(Self::Sizes),
            "colors" => Ok(Self::Colors),
            "stock" => Ok(Self::Stock),
            "photo" => Ok(Self::Photo),
            other => Err(ShopError::InvalidField(other.to_string())),
        }
    }
}

impl fmt::Display for ProductField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed value collected by a wizard step or applied to a product field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Money(Amount),
    Count(u32),
    Id(i64),
    List(Vec<String>),
    Field(ProductField),
}

/// The §6 catalog read API: everything the storefront needs in one query,
/// with sizes/colors expanded to lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub categories: Vec<Category>,
    pub products: Vec<ProductView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
    pub price: Amount,
    pub description: String,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub photo: String,
    pub stock: u32,
}

impl From<&Product> for ProductView {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            category_id: p.category_id,
            price: p.price,
            description: p.description.clone(),
            sizes: p.sizes.clone(),
            colors: p.colors.clone(),
            photo: p.photo.clone(),
            stock: p.stock,
        }
    }
}

/// Splits comma-separated text into an ordered set: trimmed, empties dropped,
/// first occurrence wins.
pub fn split_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if !part.is_empty() && !out.iter().any(|p| p == part) {
            out.push(part.to_string());
        }
    }
    out
}

fn non_empty(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ShopError::ValidationFailed(
            "expected non-empty text".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

mod comma_list {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(list: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&list.join(","))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<String>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(super::split_list(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_list_is_an_ordered_set() {
        assert_eq!(split_list("S, M ,L"), vec!["S", "M", "L"]);
        assert_eq!(split_list("Black,,Black, White"), vec!["Black", "White"]);
        assert!(split_list("  ,").is_empty());
    }

    #[test]
    fn test_field_allow_list() {
        assert_eq!("price".parse::<ProductField>().unwrap(), ProductField::Price);
        assert_eq!(" Stock ".parse::<ProductField>().unwrap(), ProductField::Stock);
        assert!(matches!(
            "category_id".parse::<ProductField>(),
            Err(ShopError::InvalidField(_))
        ));
    }

    #[test]
    fn test_typed_value_parsing_per_field() {
        assert_eq!(
            ProductField::Price.parse_value("7.50").unwrap(),
            FieldValue::Money(Amount::new(750).unwrap())
        );
        assert_eq!(
            ProductField::Stock.parse_value("10").unwrap(),
            FieldValue::Count(10)
        );
        assert_eq!(
            ProductField::Sizes.parse_value("S,M,L").unwrap(),
            FieldValue::List(vec!["S".into(), "M".into(), "L".into()])
        );
        assert!(matches!(
            ProductField::Stock.parse_value("-1"),
            Err(ShopError::ValidationFailed(_))
        ));
        assert!(matches!(
            ProductField::Name.parse_value("   "),
            Err(ShopError::ValidationFailed(_))
        ));
    }

    #[test]
    fn test_product_lists_are_comma_joined_at_rest() {
        let product = Product {
            id: 1,
            name: "Hoodie".to_string(),
            category_id: 1,
            price: Amount::new(75000).unwrap(),
            description: "Black hoodie".to_string(),
            sizes: vec!["S".into(), "M".into(), "L".into()],
            colors: vec!["Black".into()],
            photo: "http://x/img.jpg".to_string(),
            stock: 10,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["sizes"], "S,M,L");
        assert_eq!(json["colors"], "Black");

        let back: Product = serde_json::from_value(json).unwrap();
        assert_eq!(back.sizes, vec!["S", "M", "L"]);

        let view = ProductView::from(&product);
        assert_eq!(
            serde_json::to_value(&view).unwrap()["sizes"],
            serde_json::json!(["S", "M", "L"])
        );
    }
}
