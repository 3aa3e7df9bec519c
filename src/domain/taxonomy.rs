//! Taxonomy domain model
//!
//! Tags and categories, many-to-many with posts. Update pipelines only ever
//! change the *association* between a post and a taxonomy; taxonomy records
//! themselves are created on demand and never deleted by post mutations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::post::ParseEnumError;
use super::slugify;

/// Kind of taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyKind {
    #[default]
    Tag,
    Category,
}

impl TaxonomyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyKind::Tag => "tag",
            TaxonomyKind::Category => "category",
        }
    }
}

impl fmt::Display for TaxonomyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxonomyKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tag" => Ok(TaxonomyKind::Tag),
            "category" => Ok(TaxonomyKind::Category),
            other => Err(ParseEnumError {
                what: "taxonomy kind",
                value: other.to_string(),
            }),
        }
    }
}

/// A stored taxonomy record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub id: i64,
    pub kind: TaxonomyKind,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Denormalized count of linked posts
    #[serde(default)]
    pub post_count: u32,
}

/// A requested taxonomy in an update payload.
///
/// Matched against existing records by (kind, name); a missing record is
/// created with a slug derived from the name unless one is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyInput {
    pub kind: TaxonomyKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

impl TaxonomyInput {
    pub fn tag(name: impl Into<String>) -> Self {
        Self {
            kind: TaxonomyKind::Tag,
            name: name.into(),
            slug: None,
        }
    }

    pub fn category(name: impl Into<String>) -> Self {
        Self {
            kind: TaxonomyKind::Category,
            name: name.into(),
            slug: None,
        }
    }

    /// The slug this input resolves to
    pub fn resolved_slug(&self) -> String {
        self.slug.clone().unwrap_or_else(|| slugify(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parsing_roundtrip() {
        for kind in [TaxonomyKind::Tag, TaxonomyKind::Category] {
            assert_eq!(kind.as_str().parse::<TaxonomyKind>().unwrap(), kind);
        }
        assert!("label".parse::<TaxonomyKind>().is_err());
    }

    #[test]
    fn input_slug_defaults_from_name() {
        let input = TaxonomyInput::tag("Systems Programming");
        assert_eq!(input.resolved_slug(), "systems-programming");

        let explicit = TaxonomyInput {
            slug: Some("sys-prog".into()),
            ..TaxonomyInput::tag("Systems Programming")
        };
        assert_eq!(explicit.resolved_slug(), "sys-prog");
    }
}
