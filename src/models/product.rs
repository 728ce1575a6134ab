use serde::{Deserialize, Deserializer, Serialize};

use crate::models::CheckoutKind;
use crate::util::{format_brl, truncate_chars};

/// Product cards show at most this many characters of the description.
pub const SHORT_DESCRIPTION_CHARS: usize = 120;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "price")]
    pub price: f64,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "video")]
    pub video_url: Option<String>,
    /// The one SKU that provisions a launcher license instead of a download
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_launcher: bool,
    #[serde(default, rename = "category", deserialize_with = "category_ref")]
    pub category_id: Option<String>,
    #[serde(default, rename = "subcategory", deserialize_with = "one_or_many")]
    pub subcategories: Vec<String>,
}

impl Product {
    /// Absolute image URL; relative paths are served from `asset_base`.
    pub fn image_url(&self, asset_base: &str) -> Option<String> {
        let image = self.image.as_deref().filter(|i| !i.is_empty())?;
        if image.starts_with("http") {
            return Some(image.to_string());
        }
        let asset_base = asset_base.trim_end_matches('/');
        if image.starts_with('/') {
            Some(format!("{asset_base}{image}"))
        } else {
            Some(format!("{asset_base}/{image}"))
        }
    }

    pub fn short_description(&self) -> String {
        truncate_chars(&self.description, SHORT_DESCRIPTION_CHARS)
    }

    pub fn display_price(&self) -> String {
        format_brl(self.price)
    }

    pub fn checkout_kind(&self) -> CheckoutKind {
        if self.is_launcher {
            CheckoutKind::Launcher
        } else {
            CheckoutKind::Script
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    /// Subcategories are plain names; a name is also its filter id
    #[serde(default, deserialize_with = "null_as_default")]
    pub subcategories: Vec<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Prices arrive as numbers, numeric strings or null.
fn price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PriceRepr {
        Number(f64),
        Text(String),
    }

    match Option::<PriceRepr>::deserialize(deserializer)? {
        Some(PriceRepr::Number(n)) => Ok(n),
        Some(PriceRepr::Text(s)) => s
            .trim()
            .replace(',', ".")
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid price: {s}"))),
        None => Ok(0.0),
    }
}

/// `category` is either an id or a populated `{ _id, name }` document.
fn category_ref<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CategoryRef {
        Id(String),
        Document {
            #[serde(rename = "_id", alias = "id")]
            id: String,
        },
    }

    Ok(Option::<CategoryRef>::deserialize(deserializer)?.map(|c| match c {
        CategoryRef::Id(id) => id,
        CategoryRef::Document { id } => id,
    }))
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(s)) if s.is_empty() => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
        None => Vec::new(),
    })
}
