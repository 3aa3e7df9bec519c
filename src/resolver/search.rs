//! Fuzzy full-text search over published posts
//!
//! Loads every published post, strips markup out of the rendered body and
//! ranks by weighted fuzzy match: title over excerpt over body. The top
//! six matches come back without any body text — bodies never travel in
//! search payloads — and score ties keep storage order.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::Serialize;

use crate::error::ResolverError;
use crate::normalize::readable_date;
use crate::render::innertext;
use crate::storage::{PostCriteria, SortDir, SortField};

use super::Environment;

const RESULT_CAP: usize = 6;

const TITLE_WEIGHT: f64 = 1.0;
const EXCERPT_WEIGHT: f64 = 0.9;
const BODY_WEIGHT: f64 = 0.8;

/// One search match; deliberately has no body field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub slug: String,
    pub published_at: Option<String>,
}

/// A search result set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub rows: Vec<SearchHit>,
    pub count: u64,
}

impl SearchPage {
    fn empty() -> Self {
        Self {
            rows: Vec::new(),
            count: 0,
        }
    }
}

/// Runs the search read path. An empty query is an empty result set,
/// not an error.
pub fn search_posts(env: &Environment, query: &str) -> Result<SearchPage, ResolverError> {
    log::debug!("reached resolver: search");

    let query = query.trim();
    if query.is_empty() {
        return Ok(SearchPage::empty());
    }

    // storage order doubles as the tie-break, so fix it explicitly
    let candidates = env.store.find_all(&PostCriteria {
        status: Some(crate::domain::PostStatus::Publish),
        order: Some((SortField::Id, SortDir::Asc)),
        ..PostCriteria::default()
    })?;

    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(f64, SearchHit)> = Vec::new();

    for post in candidates {
        let body = innertext(&post.html);

        let title_score = matcher
            .fuzzy_match(&post.title, query)
            .map(|s| s as f64 * TITLE_WEIGHT);
        let excerpt_score = matcher
            .fuzzy_match(&post.excerpt, query)
            .map(|s| s as f64 * EXCERPT_WEIGHT);
        let body_score = matcher
            .fuzzy_match(&body, query)
            .map(|s| s as f64 * BODY_WEIGHT);

        let best = [title_score, excerpt_score, body_score]
            .into_iter()
            .flatten()
            .fold(None::<f64>, |acc, s| Some(acc.map_or(s, |a| a.max(s))));

        if let Some(score) = best {
            scored.push((
                score,
                SearchHit {
                    id: post.id,
                    title: post.title,
                    excerpt: post.excerpt,
                    slug: post.slug,
                    published_at: post.published_at.map(readable_date),
                },
            ));
        }
    }

    // stable sort keeps storage order between equal scores
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    let rows: Vec<SearchHit> = scored
        .into_iter()
        .take(RESULT_CAP)
        .map(|(_, hit)| hit)
        .collect();

    Ok(SearchPage {
        count: rows.len() as u64,
        rows,
    })
}
