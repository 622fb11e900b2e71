use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(MakeId);
id_newtype!(ModelId);
id_newtype!(OrderId);
id_newtype!(ItemId);
id_newtype!(TodoId);
id_newtype!(ProductId);

/// Opaque key of one client session. Issued by the server and carried in a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Make {
    pub id: MakeId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarModel {
    pub id: ModelId,
    pub name: String,
    pub make_id: MakeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Confirmed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Confirmed => "confirmed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(OrderStatus::Draft),
            "confirmed" => Some(OrderStatus::Confirmed),
            _ => None,
        }
    }
}

/// Everything a finished wizard run collects. Produced only from a complete draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub product_category: String,
    pub make: Make,
    pub model: CarModel,
    pub quantity: u32,
    pub color: String,
    pub interior: String,
    pub tire_type: String,
    pub delivery_address: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub payment_method: String,
    pub billing_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(flatten)]
    pub details: OrderDetails,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: Option<String>,
    pub date_time_added: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub text: String,
    pub done: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    /// Whole cents.
    pub price_cents: i64,
    pub stock: u32,
}

impl Product {
    /// `12.50` style price without a currency sign.
    pub fn price_display(&self) -> String {
        format!("{}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }
}

/// Column a product listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductSort {
    #[default]
    Name,
    Category,
    Price,
    Stock,
}

impl ProductSort {
    pub const ALL: [ProductSort; 4] = [
        ProductSort::Name,
        ProductSort::Category,
        ProductSort::Price,
        ProductSort::Stock,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProductSort::Name => "name",
            ProductSort::Category => "category",
            ProductSort::Price => "price",
            ProductSort::Stock => "stock",
        }
    }

    /// Unknown names fall back to sorting by name.
    pub fn parse(raw: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str().eq_ignore_ascii_case(raw.trim()))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Only `desc` (any case) sorts descending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// A normalized product listing request. Blank filters are `None`; pages are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductSearch {
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: u32,
    pub sort: ProductSort,
    pub direction: SortDirection,
}

pub const PRODUCT_PAGE_SIZE: u32 = 10;

/// One page of a product listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub total_items: u64,
}

impl ProductPage {
    pub fn total_pages(&self) -> u64 {
        self.total_items.div_ceil(u64::from(PRODUCT_PAGE_SIZE))
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) + 1 < self.total_pages()
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
