//! Post normalization
//!
//! Reshapes a raw stored record into the caller-facing form: host-prefixed
//! cover image, nested cover object, canonical `/<type>/<slug>` slug and
//! readable timestamps. [`PostView`] is a distinct type from
//! [`Post`](crate::domain::Post), so normalizing an already-normalized
//! record is unrepresentable — the slug and URL rewrites are not reversible,
//! and each pipeline holds exactly one raw copy.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Post, PostStatus, PostType};
use crate::storage::SiteConfig;

/// Canonical human-readable date form, e.g. `Jan 05, 2026`
const READABLE_DATE: &str = "%b %d, %Y";

/// Nested cover image shape
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverImageView {
    pub src: String,
    pub width: u32,
    pub height: u32,
}

/// Caller-facing post shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    pub id: i64,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub status: PostStatus,
    pub title: String,
    /// Canonical slug, `/<type>/<slug>`
    pub slug: String,
    pub md: String,
    pub html: String,
    pub excerpt: String,
    pub cover_image: CoverImageView,
    pub featured: bool,
    pub reading_time: String,
    pub author_id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub published_at: Option<String>,
}

/// Prefixes a path-relative URL with the configured host; absolute URLs
/// pass through untouched.
pub fn absolute_url(path: &str, site: &SiteConfig) -> String {
    if path.starts_with('/') {
        format!("{}{}", site.host(), path)
    } else {
        path.to_string()
    }
}

/// Formats a timestamp in the canonical readable form
pub fn readable_date(date: DateTime<Utc>) -> String {
    date.format(READABLE_DATE).to_string()
}

/// Normalizes a raw record for external consumption.
pub fn normalize_post(post: Post, site: &SiteConfig) -> PostView {
    let cover_image = match post.cover_image {
        Some(src) if !src.is_empty() => CoverImageView {
            src: absolute_url(&src, site),
            width: post.cover_image_width,
            height: post.cover_image_height,
        },
        _ => CoverImageView::default(),
    };

    PostView {
        id: post.id,
        post_type: post.post_type,
        status: post.status,
        title: post.title,
        slug: format!("/{}/{}", post.post_type, post.slug),
        md: post.md,
        html: post.html,
        excerpt: post.excerpt,
        cover_image,
        featured: post.featured,
        reading_time: post.reading_time,
        author_id: post.author_id,
        created_at: readable_date(post.created_at),
        updated_at: readable_date(post.updated_at),
        published_at: post.published_at.map(readable_date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn site() -> SiteConfig {
        SiteConfig::new("https://example.com", "")
    }

    fn post() -> Post {
        Post {
            id: 1,
            post_type: PostType::Post,
            status: PostStatus::Publish,
            title: "Hello".into(),
            slug: "hello".into(),
            md: "hi".into(),
            md_draft: None,
            html: "<p>hi</p>".into(),
            excerpt: "hi".into(),
            cover_image: Some("/img/x.png".into()),
            cover_image_width: 800,
            cover_image_height: 600,
            featured: false,
            reading_time: "1 min read".into(),
            author_id: 1,
            created_at: Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2026, 1, 6, 12, 0, 0).unwrap(),
            published_at: Some(Utc.with_ymd_and_hms(2026, 1, 7, 12, 0, 0).unwrap()),
        }
    }

    #[test]
    fn relative_cover_image_is_host_prefixed() {
        let view = normalize_post(post(), &site());
        assert_eq!(view.cover_image.src, "https://example.com/img/x.png");
        assert_eq!(view.cover_image.width, 800);
        assert_eq!(view.cover_image.height, 600);
    }

    #[test]
    fn absolute_cover_image_is_untouched() {
        let mut raw = post();
        raw.cover_image = Some("https://cdn.example.net/y.png".into());
        let view = normalize_post(raw, &site());
        assert_eq!(view.cover_image.src, "https://cdn.example.net/y.png");
    }

    #[test]
    fn missing_cover_image_defaults_to_zeroes() {
        let mut raw = post();
        raw.cover_image = None;
        raw.cover_image_width = 0;
        raw.cover_image_height = 0;
        let view = normalize_post(raw, &site());
        assert_eq!(view.cover_image, CoverImageView::default());
    }

    #[test]
    fn slug_carries_the_content_type() {
        let view = normalize_post(post(), &site());
        assert_eq!(view.slug, "/post/hello");

        let mut page = post();
        page.post_type = PostType::Page;
        let view = normalize_post(page, &site());
        assert_eq!(view.slug, "/page/hello");
    }

    #[test]
    fn timestamps_use_the_readable_form() {
        let view = normalize_post(post(), &site());
        assert_eq!(view.created_at, "Jan 05, 2026");
        assert_eq!(view.published_at.as_deref(), Some("Jan 07, 2026"));
    }

    #[test]
    fn base_path_participates_in_the_host() {
        let site = SiteConfig::new("https://example.com", "/blog");
        let view = normalize_post(post(), &site);
        assert_eq!(view.cover_image.src, "https://example.com/blog/img/x.png");
    }
}
