//! Common types used across the platform

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a product's quantity is denominated.
///
/// `ByWeight` products are sold in grams (fractional quantities allowed),
/// `ByCount` products are sold per piece. The distinction drives the selling
/// price rounding rules in [`crate::pricing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    ByWeight,
    ByCount,
}

impl UnitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKind::ByWeight => "by_weight",
            UnitKind::ByCount => "by_count",
        }
    }
}

impl FromStr for UnitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "by_weight" => Ok(UnitKind::ByWeight),
            "by_count" => Ok(UnitKind::ByCount),
            other => Err(format!("unknown unit kind: {}", other)),
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized brand label.
///
/// Brand is free text at the edges of the system and historically arrived
/// either as `NULL` or as an empty string for "no brand". Every ingestion
/// point funnels through [`Brand::normalize`] so matching and grouping code
/// only ever sees one representation: `Option<Brand>`, where `None` is the
/// single no-brand bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Brand(String);

impl Brand {
    /// Normalize a raw brand value. Trims whitespace; empty or absent input
    /// collapses to `None`.
    pub fn normalize(raw: Option<&str>) -> Option<Brand> {
        let trimmed = raw?.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Brand(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Convenience: the `Option<String>` form used when binding to SQL.
pub fn brand_to_sql(brand: &Option<Brand>) -> Option<&str> {
    brand.as_ref().map(|b| b.as_str())
}
