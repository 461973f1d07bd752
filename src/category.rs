// src/category.rs
//! Keyword categorization.
//!
//! A fixed, ordered table of `(category, triggers)`; the first category with a
//! trigger that is a substring of the lower-cased keyword wins, otherwise
//! `Category::Other`. The same table serves ingestion and re-categorization.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "科技/AI")]
    TechAi,
    #[serde(rename = "体育")]
    Sports,
    #[serde(rename = "金融/商业")]
    Finance,
    #[serde(rename = "娱乐/生活")]
    Entertainment,
    #[serde(rename = "其他", alias = "other")]
    Other,
}

/// Evaluated top to bottom.
pub const TRIGGER_TABLE: &[(Category, &[&str])] = &[
    (
        Category::TechAi,
        &[
            "ai", "tech", "app", "update", "software", "chip", "nvidia", "chatgpt", "openai",
            "apple", "ces",
        ],
    ),
    (
        Category::Sports,
        &[
            "vs", "match", "score", "league", "nfl", "nba", "mlb", "football", "basketball",
            "soccer",
        ],
    ),
    (
        Category::Finance,
        &[
            "stock", "crypto", "bitcoin", "price", "market", "economy", "fed", "tax", "irs",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "movie", "series", "netflix", "singer", "concert", "award", "game", "star", "show",
            "year",
        ],
    ),
];

impl Category {
    pub const ALL: [Category; 5] = [
        Category::TechAi,
        Category::Sports,
        Category::Finance,
        Category::Entertainment,
        Category::Other,
    ];

    /// Wire label, as written to snapshots and the exported summary.
    pub fn label(self) -> &'static str {
        match self {
            Category::TechAi => "科技/AI",
            Category::Sports => "体育",
            Category::Finance => "金融/商业",
            Category::Entertainment => "娱乐/生活",
            Category::Other => "其他",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Total and pure: every keyword maps to exactly one category.
pub fn categorize(keyword: &str) -> Category {
    let kw = keyword.to_lowercase();
    TRIGGER_TABLE
        .iter()
        .find(|(_, triggers)| triggers.iter().any(|t| kw.contains(t)))
        .map(|(cat, _)| *cat)
        .unwrap_or(Category::Other)
}
