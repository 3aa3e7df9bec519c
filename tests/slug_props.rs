//! Property tests for slug derivation and URL normalization

use proptest::prelude::*;

use quillpress::domain::{reading_time, slugify};
use quillpress::normalize::absolute_url;
use quillpress::storage::SiteConfig;

proptest! {
    #[test]
    fn slugs_contain_only_lowercase_alphanumerics_and_dashes(title in "[ -~]{0,80}") {
        let slug = slugify(&title);
        prop_assert!(slug
            .chars()
            .all(|c| c == '-' || (c.is_ascii_alphanumeric() && !c.is_ascii_uppercase())));
    }

    #[test]
    fn slugs_never_start_or_end_with_a_dash(title in "[ -~]{0,80}") {
        let slug = slugify(&title);
        prop_assert!(!slug.starts_with('-'));
        prop_assert!(!slug.ends_with('-'));
    }

    #[test]
    fn slugs_never_contain_dash_runs(title in "[ -~]{0,80}") {
        let slug = slugify(&title);
        prop_assert!(!slug.contains("--"));
    }

    #[test]
    fn slugify_is_idempotent_on_ascii(title in "[ -~]{0,80}") {
        let once = slugify(&title);
        prop_assert_eq!(slugify(&once), once.clone());
    }

    #[test]
    fn reading_time_is_at_least_one_minute(words in 0usize..100_000) {
        let estimate = reading_time(words);
        prop_assert!(estimate.ends_with(" min read"));
        prop_assert!(!estimate.starts_with('0'));
    }

    #[test]
    fn absolute_url_is_stable_once_absolute(path in "/[a-z0-9/._-]{0,40}") {
        let site = SiteConfig::new("https://example.com", "");
        let absolute = absolute_url(&path, &site);
        prop_assert!(absolute.starts_with("https://example.com/"));
        prop_assert_eq!(absolute_url(&absolute, &site), absolute);
    }
}
