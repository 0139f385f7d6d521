//! Core data models for the paper discovery system.
//!
//! This module contains the data structures shared by the aggregation and search
//! engines: the raw paper row as the store hands it out, the trimmed summary used
//! for category exemplars, the derived category record, and search results.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Author label used when a paper row has no authors.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// A paper row as stored in the repository.
///
/// The store owns these rows; this crate only reads them. Every descriptive
/// field is optional because the source table is loosely populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paper {
    /// Opaque unique identifier
    pub id: String,

    /// Paper title
    #[serde(default)]
    pub title: Option<String>,

    /// Author list as free text (e.g. "Reyes, J.; Santos, M.")
    #[serde(default)]
    pub authors: Option<String>,

    /// Abstract text
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,

    /// Raw category label, inconsistently cased at the source
    #[serde(default)]
    pub category: Option<String>,

    /// Year of publication
    #[serde(default, deserialize_with = "lenient_integer")]
    pub year_published: Option<i32>,

    /// View counter; absent means zero
    #[serde(default, deserialize_with = "lenient_integer")]
    pub views: Option<u64>,

    /// Upload timestamp, only used to break ties between equally viewed papers
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl Paper {
    /// Create a paper with only an id and title set.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            authors: None,
            abstract_text: None,
            category: None,
            year_published: None,
            views: None,
            uploaded_at: None,
        }
    }

    /// View count with the missing value treated as zero.
    pub fn view_count(&self) -> u64 {
        self.views.unwrap_or(0)
    }

    /// Author text, or [`UNKNOWN_AUTHOR`] when absent.
    pub fn authors_or_unknown(&self) -> &str {
        self.authors.as_deref().unwrap_or(UNKNOWN_AUTHOR)
    }
}

/// Ordering used to pick category exemplars: most viewed first, then most
/// recently uploaded. Missing views count as zero and a missing upload time
/// sorts after any known one.
pub fn popularity_order(a: &Paper, b: &Paper) -> Ordering {
    b.view_count()
        .cmp(&a.view_count())
        .then_with(|| b.uploaded_at.cmp(&a.uploaded_at))
}

/// Newest publication year first, papers without a year last.
pub fn year_desc_order(a: &Paper, b: &Paper) -> Ordering {
    b.year_published.cmp(&a.year_published)
}

/// Parse the timestamp formats seen in exported `uploaded_at` values.
///
/// Offsets are normalised to UTC; values without one are taken as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// Badly typed values in a row become missing fields, matching how the SQLite
// backend reads the same row.
fn lenient_integer<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let parsed = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(parsed.and_then(|v| T::try_from(v).ok()))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}

/// Condensed view of a paper, used as a category exemplar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperSummary {
    pub id: String,
    pub title: String,
    pub authors: String,
    pub year: Option<i32>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub views: u64,
}

impl From<&Paper> for PaperSummary {
    fn from(paper: &Paper) -> Self {
        Self {
            id: paper.id.clone(),
            title: paper.title.clone().unwrap_or_default(),
            authors: paper.authors_or_unknown().to_string(),
            year: paper.year_published,
            abstract_text: paper.abstract_text.clone().unwrap_or_default(),
            views: paper.view_count(),
        }
    }
}

impl From<Paper> for PaperSummary {
    fn from(paper: Paper) -> Self {
        Self::from(&paper)
    }
}

/// A topic in the catalogue, derived from one distinct raw category value.
///
/// Categories are recomputed on every aggregation run and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// URL-safe identifier derived from `raw_name`
    pub slug: String,

    /// Canonical label for display
    pub display_name: String,

    /// Category value exactly as stored; the only field used to query the store
    pub raw_name: String,

    /// Number of papers whose category equals `raw_name`
    pub paper_count: usize,

    /// Most viewed papers in this category, at most three
    pub top_papers: Vec<PaperSummary>,
}

impl Category {
    /// A category with no papers, used for the fallback catalogue and for
    /// categories whose queries failed.
    pub fn empty(raw_name: &str) -> Self {
        Self {
            slug: crate::catalog::slugify(raw_name),
            display_name: crate::catalog::display_name(raw_name).to_string(),
            raw_name: raw_name.to_string(),
            paper_count: 0,
            top_papers: Vec::new(),
        }
    }
}

/// A single search hit.
///
/// `matched` records whether the free-text query was found in the title or
/// authors; unmatched papers are still returned after the matched ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub paper: Paper,
    pub matched: bool,
}

impl SearchResult {
    pub fn new(paper: Paper, matched: bool) -> Self {
        Self { paper, matched }
    }

    pub fn summary(&self) -> PaperSummary {
        PaperSummary::from(&self.paper)
    }
}

/// Role reported by the session collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Adviser,
    Admin,
    Superadmin,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn paper_with(id: &str, views: Option<u64>, uploaded: Option<i64>) -> Paper {
        let mut paper = Paper::new(id, id);
        paper.views = views;
        paper.uploaded_at = uploaded.map(|secs| Utc.timestamp_opt(secs, 0).unwrap());
        paper
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let utc = |s| parse_timestamp(s).map(|t| t.to_rfc3339());
        assert_eq!(utc("2024-03-01T08:30:00Z").as_deref(), Some("2024-03-01T08:30:00+00:00"));
        assert_eq!(utc("2024-03-01T08:30:00+08:00").as_deref(), Some("2024-03-01T00:30:00+00:00"));
        assert!(parse_timestamp("2024-03-01 08:30:00").is_some());
        assert!(parse_timestamp("2024-03-01 08:30:00.123").is_some());
        assert!(parse_timestamp("March 1st").is_none());
    }

    #[test]
    fn test_badly_typed_json_fields_become_missing() {
        let paper: Paper = serde_json::from_str(
            r#"{"id": "x", "views": -1, "year_published": "2024",
                "uploaded_at": "2024-03-01 05:00:00"}"#,
        )
        .unwrap();
        assert_eq!(paper.views, None);
        assert_eq!(paper.year_published, Some(2024));
        assert_eq!(paper.uploaded_at, parse_timestamp("2024-03-01T05:00:00Z"));

        let paper: Paper = serde_json::from_str(
            r#"{"id": "y", "views": "many", "year_published": [2024], "uploaded_at": 17}"#,
        )
        .unwrap();
        assert_eq!(paper.views, None);
        assert_eq!(paper.year_published, None);
        assert_eq!(paper.uploaded_at, None);
    }

    #[test]
    fn test_summary_defaults_for_missing_fields() {
        let paper = Paper {
            id: "p1".to_string(),
            title: None,
            authors: None,
            abstract_text: None,
            category: Some("Website".to_string()),
            year_published: None,
            views: None,
            uploaded_at: None,
        };
        let summary = PaperSummary::from(&paper);
        assert_eq!(summary.authors, UNKNOWN_AUTHOR);
        assert_eq!(summary.views, 0);
        assert_eq!(summary.title, "");
        assert_eq!(summary.year, None);
    }

    #[test]
    fn test_popularity_order_views_then_upload_time() {
        let mut papers = vec![
            paper_with("a", Some(5), Some(100)),
            paper_with("b", None, Some(300)),
            paper_with("c", Some(5), Some(200)),
            paper_with("d", Some(9), None),
        ];
        papers.sort_by(popularity_order);
        let ids: Vec<&str> = papers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c", "a", "b"]);
    }

    #[test]
    fn test_null_views_rank_as_zero() {
        let mut papers = vec![
            paper_with("none", None, Some(10)),
            paper_with("zero", Some(0), Some(5)),
        ];
        papers.sort_by(popularity_order);
        // Equal views, so the newer upload wins.
        assert_eq!(papers[0].id, "none");
    }

    #[test]
    fn test_year_desc_puts_missing_years_last() {
        let mut a = Paper::new("a", "a");
        a.year_published = Some(2021);
        let b = Paper::new("b", "b");
        let mut c = Paper::new("c", "c");
        c.year_published = Some(2024);
        let mut papers = vec![a, b, c];
        papers.sort_by(year_desc_order);
        let ids: Vec<&str> = papers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_paper_deserializes_with_missing_fields() {
        let paper: Paper = serde_json::from_str(r#"{"id": "x", "abstract": "text"}"#).unwrap();
        assert_eq!(paper.abstract_text.as_deref(), Some("text"));
        assert!(paper.views.is_none());
        assert_eq!(paper.authors_or_unknown(), UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_user_role_serialization() {
        assert_eq!(serde_json::to_string(&UserRole::Superadmin).unwrap(), "\"superadmin\"");
    }
}
