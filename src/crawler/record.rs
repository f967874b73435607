//! Item records and per-item outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency every price on the catalog is quoted in
pub const CURRENCY: &str = "GBP";

pub const DEFAULT_TITLE: &str = "No title";
pub const DEFAULT_CATEGORY: &str = "Unknown";

/// One successfully extracted item page
///
/// Field order here is the field order of the JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub url: String,
    pub title: String,
    pub category: String,
    /// 1..=5, or 0 when the page carries no recognisable rating
    pub rating: u8,
    pub upc: String,
    pub price: f64,
    pub currency: String,
    pub in_stock: bool,
    pub reviews: u32,
}

impl Record {
    /// A record for `url` with every other field at its default
    pub fn with_defaults(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: DEFAULT_TITLE.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            rating: 0,
            upc: String::new(),
            price: 0.0,
            currency: CURRENCY.to_string(),
            in_stock: false,
            reviews: 0,
        }
    }
}

/// Record fields that can fall back to a default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Category,
    Rating,
    Upc,
    Price,
    Availability,
    Reviews,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Category => "category",
            Self::Rating => "rating",
            Self::Upc => "upc",
            Self::Price => "price",
            Self::Availability => "in_stock",
            Self::Reviews => "reviews",
        }
    }
}

/// Why a field was given its default value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldWarning {
    /// The element carrying the field was not on the page
    Missing(Field),

    /// The element was there but its content could not be interpreted
    Unparsable { field: Field, raw: String },
}

impl FieldWarning {
    pub fn field(&self) -> Field {
        match self {
            Self::Missing(field) | Self::Unparsable { field, .. } => *field,
        }
    }
}

impl fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(field) => write!(f, "{}: missing", field.as_str()),
            Self::Unparsable { field, raw } => {
                write!(f, "{}: could not parse {:?}", field.as_str(), raw)
            }
        }
    }
}

/// A record together with the fields that were defaulted while building it
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub record: Record,
    pub warnings: Vec<FieldWarning>,
}

impl Extraction {
    /// True when no field had to fall back to its default
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Result of processing one item URL; exactly one is produced per dispatched URL
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(Box<Extraction>),

    /// Transport or extraction failure; the two are not told apart downstream
    Failure { url: String, reason: String },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
