//! Navigation menu document
//!
//! The menu is a single JSON document persisted in the settings table.
//! Items that reference a post carry its id; the update pipeline keeps
//! their labels in sync when the referenced post is retitled.

use serde::{Deserialize, Serialize};

/// One navigation entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub label: String,

    /// Post this entry points at, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,

    /// Direct link target for entries that don't reference a post
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// The site navigation menu
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub items: Vec<MenuItem>,
}

impl Menu {
    /// Returns true if any entry references the given post
    pub fn references_post(&self, post_id: i64) -> bool {
        self.items.iter().any(|item| item.post_id == Some(post_id))
    }

    /// Rewrites labels of entries referencing the given post.
    ///
    /// Returns true if anything changed.
    pub fn relabel_post(&mut self, post_id: i64, label: &str) -> bool {
        let mut changed = false;
        for item in &mut self.items {
            if item.post_id == Some(post_id) && item.label != label {
                item.label = label.to_string();
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu() -> Menu {
        Menu {
            items: vec![
                MenuItem {
                    label: "Home".into(),
                    post_id: Some(1),
                    slug: None,
                },
                MenuItem {
                    label: "About".into(),
                    post_id: None,
                    slug: Some("/page/about".into()),
                },
            ],
        }
    }

    #[test]
    fn relabel_only_touches_referencing_items() {
        let mut m = menu();
        assert!(m.references_post(1));
        assert!(!m.references_post(42));

        assert!(m.relabel_post(1, "Welcome"));
        assert_eq!(m.items[0].label, "Welcome");
        assert_eq!(m.items[1].label, "About");
    }

    #[test]
    fn relabel_is_a_noop_when_label_matches() {
        let mut m = menu();
        assert!(!m.relabel_post(1, "Home"));
        assert!(!m.relabel_post(99, "Anything"));
    }
}
