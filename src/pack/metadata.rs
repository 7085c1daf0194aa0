// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Pack metadata file: reading the store listing and editing its fields

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

use crate::source::PackSource;
use crate::{PackLensError, Result};

/// Editable top-level fields of the metadata file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PackField {
    Tag,
    Prices,
    LongDescription,
    SellerId,
    SellerStripeAccountId,
}

impl PackField {
    pub const ALL: [PackField; 5] = [
        PackField::Tag,
        PackField::Prices,
        PackField::LongDescription,
        PackField::SellerId,
        PackField::SellerStripeAccountId,
    ];

    /// JSON key in the metadata document
    pub fn key(&self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Prices => "prices",
            Self::LongDescription => "longDescription",
            Self::SellerId => "sellerId",
            Self::SellerStripeAccountId => "sellerStripeAccountId",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Tag => "Unique tag",
            Self::Prices => "Price",
            Self::LongDescription => "Description",
            Self::SellerId => "SellerId",
            Self::SellerStripeAccountId => "SellerStripeAccountId",
        }
    }
}

impl fmt::Display for PackField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PackField {
    type Err = PackLensError;

    /// Accepts the JSON key in any case, with or without `_`/`-` separators
    fn from_str(s: &str) -> Result<Self> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        let wanted = if wanted == "price" { "prices".to_string() } else { wanted };

        Self::ALL
            .into_iter()
            .find(|field| field.key().to_ascii_lowercase() == wanted)
            .ok_or_else(|| {
                PackLensError::Config(format!(
                    "Unknown pack field '{}', expected one of: {}",
                    s,
                    Self::ALL.map(|f| f.key()).join(", ")
                ))
            })
    }
}

/// Read-only view of the fields shown in the pack summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackInfo {
    pub tag: Option<String>,
    pub price: Option<String>,
    pub long_description: Option<String>,
    pub seller_id: Option<String>,
    pub seller_stripe_account_id: Option<String>,
}

impl PackInfo {
    pub fn from_value(document: &Value) -> Self {
        Self {
            tag: scalar(&document["tag"]),
            price: scalar(&document["prices"][0]["value"]),
            long_description: scalar(&document["longDescription"]),
            seller_id: scalar(&document["sellerId"]),
            seller_stripe_account_id: scalar(&document["sellerStripeAccountId"]),
        }
    }

    /// Value of one field as displayed
    pub fn get(&self, field: PackField) -> Option<&str> {
        match field {
            PackField::Tag => self.tag.as_deref(),
            PackField::Prices => self.price.as_deref(),
            PackField::LongDescription => self.long_description.as_deref(),
            PackField::SellerId => self.seller_id.as_deref(),
            PackField::SellerStripeAccountId => self.seller_stripe_account_id.as_deref(),
        }
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A metadata document kept in its original key order
#[derive(Debug, Clone, PartialEq)]
pub struct PackMetadata {
    document: Value,
}

impl PackMetadata {
    /// Parse a metadata file; anything but a JSON object is rejected
    pub fn parse(text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text)?;
        Self::from_value(document)
    }

    pub fn from_value(document: Value) -> Result<Self> {
        if !document.is_object() {
            return Err(PackLensError::MalformedMetadata(
                "the metadata file does not contain a JSON object".to_string(),
            ));
        }
        Ok(Self { document })
    }

    pub fn info(&self) -> PackInfo {
        PackInfo::from_value(&self.document)
    }

    pub fn as_value(&self) -> &Value {
        &self.document
    }

    /// Replace one top-level field
    ///
    /// Prices are stored as a single default price holding only the digits of
    /// `value`.
    pub fn set_field(&mut self, field: PackField, value: &str) {
        let new_value = match field {
            PackField::Prices => {
                let digits: String = value.chars().filter(char::is_ascii_digit).collect();
                json!([{ "value": digits, "name": "default" }])
            }
            _ => Value::String(value.to_string()),
        };
        if let Value::Object(map) = &mut self.document {
            map.insert(field.key().to_string(), new_value);
        }
    }

    /// Strip trailing whitespace from every string in the document
    pub fn trim_trailing_whitespace(&mut self) {
        trim_strings(&mut self.document);
    }

    /// Two-space indented JSON, the layout the file is rewritten with
    pub fn to_pretty_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.document)?)
    }
}

fn trim_strings(value: &mut Value) {
    match value {
        Value::String(s) => {
            let trimmed = s.trim_end().len();
            s.truncate(trimmed);
        }
        Value::Array(items) => items.iter_mut().for_each(trim_strings),
        Value::Object(map) => map.values_mut().for_each(trim_strings),
        _ => {}
    }
}

/// Locate the metadata file directly under `root`, ignoring case
pub async fn locate_metadata_file<S: PackSource + ?Sized>(
    source: &S,
    root: &Path,
    file_name: &str,
) -> Result<PathBuf> {
    match source.find_entry(root, file_name).await? {
        Some(entry) if entry.is_file() => Ok(entry.path),
        _ => Err(PackLensError::NotFound {
            path: root.join(file_name),
        }),
    }
}

/// Read the metadata file, set one field and rewrite the whole file
pub async fn update_metadata_file<S: PackSource + ?Sized>(
    source: &S,
    file: &Path,
    field: PackField,
    value: &str,
) -> Result<PackMetadata> {
    let text = source.read_text(file).await?;
    let mut metadata = PackMetadata::parse(&text)?;

    metadata.set_field(field, value);
    metadata.trim_trailing_whitespace();

    source.write_text(file, &metadata.to_pretty_string()?).await?;
    info!("Updated '{}' in {:?}", field, file);

    Ok(metadata)
}
