use serde::{Deserialize, Serialize};

use crate::{
    domain::{CarModel, Make, ProductSearch, ProductSort, SortDirection},
    error::FieldError,
};

// Raw form payloads as posted by the browser. Every field is optional text;
// typing and validation happen in the wizard.

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSelectionForm {
    #[serde(default)]
    pub product_category: Option<String>,
    #[serde(default)]
    pub make_id: Option<String>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizationForm {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub interior: Option<String>,
    #[serde(default)]
    pub tire_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInformationForm {
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInformationForm {
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub billing_address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

pub const ITEM_NAME_MAX_CHARS: usize = 100;
pub const ITEM_DESCRIPTION_MAX_CHARS: usize = 500;

/// Trimmed item fields that passed validation. A blank description is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
}

impl ItemForm {
    /// Limits are counted in characters, not bytes.
    pub fn validate(&self) -> Result<NewItem, Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = self.name.as_deref().map(str::trim).unwrap_or_default();
        if name.is_empty() {
            errors.push(FieldError::missing("name", "Name is required"));
        } else if name.chars().count() > ITEM_NAME_MAX_CHARS {
            errors.push(FieldError::malformed(
                "name",
                format!("Name must not exceed {ITEM_NAME_MAX_CHARS} characters"),
            ));
        }

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|description| !description.is_empty());
        if description
            .is_some_and(|description| description.chars().count() > ITEM_DESCRIPTION_MAX_CHARS)
        {
            errors.push(FieldError::malformed(
                "description",
                format!("Description must not exceed {ITEM_DESCRIPTION_MAX_CHARS} characters"),
            ));
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(NewItem {
            name: name.to_string(),
            description: description.map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoForm {
    #[serde(default)]
    pub text: Option<String>,
}

impl TodoForm {
    /// Trimmed text, or `None` when blank.
    pub fn text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

/// Product listing query string as sent by the search form and the pager.
/// Every parameter is optional and malformed values fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

impl ProductQuery {
    pub fn normalize(&self) -> ProductSearch {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        ProductSearch {
            search: non_blank(&self.search),
            category: non_blank(&self.category),
            page: self
                .page
                .as_deref()
                .and_then(|raw| raw.trim().parse().ok())
                .unwrap_or(0),
            sort: self
                .sort_by
                .as_deref()
                .map(ProductSort::parse)
                .unwrap_or_default(),
            direction: self
                .direction
                .as_deref()
                .map(SortDirection::parse)
                .unwrap_or_default(),
        }
    }
}

/// Make with its models, used by the tools CLI listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub make: Make,
    pub models: Vec<CarModel>,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
