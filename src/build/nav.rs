//! Navigation built from `navigation` front matter.
//!
//! Every document with a `navigation` block becomes a link. A link whose
//! `parent` names another entry's key nests under it; siblings are ordered
//! by `order`, ties keeping discovery order.

use std::collections::HashMap;

use serde::Serialize;

use super::document::Document;

/// A single navigation link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub key: String,
    pub title: String,
    pub url: String,
    pub order: i64,
    /// This link is the page being rendered
    pub is_current: bool,
    /// This link or one of its descendants is the page being rendered
    pub is_active: bool,
    pub children: Vec<NavLink>,
}

struct NavEntry<'a> {
    key: String,
    title: String,
    parent: Option<&'a str>,
    order: i64,
    doc: &'a Document,
}

/// Build the navigation tree from discovered documents.
///
/// Entries whose parent is unknown, or whose parent chain loops back to
/// themselves, are placed at the root.
pub fn build_navigation(documents: &[Document]) -> Vec<NavLink> {
    let entries: Vec<NavEntry> = documents
        .iter()
        .filter_map(|doc| {
            let nav = doc.front_matter.navigation.as_ref()?;
            let title = nav.title.clone().unwrap_or_else(|| doc.title());
            Some(NavEntry {
                key: nav.key.clone().unwrap_or_else(|| title.clone()),
                title,
                parent: nav.parent.as_deref(),
                order: nav.order,
                doc,
            })
        })
        .collect();

    let mut by_key: HashMap<&str, usize> = HashMap::new();
    for (i, entry) in entries.iter().enumerate() {
        if let Some(&first) = by_key.get(entry.key.as_str()) {
            tracing::warn!(
                "navigation key '{}' is used by both {} and {}; children attach to the first",
                entry.key,
                entries[first].doc.source_path.display(),
                entry.doc.source_path.display()
            );
            continue;
        }
        by_key.insert(&entry.key, i);
    }

    let mut parents: Vec<Option<usize>> = entries
        .iter()
        .map(|entry| {
            let parent = entry.parent?;
            match by_key.get(parent) {
                Some(&idx) => Some(idx),
                None => {
                    tracing::warn!(
                        "{}: navigation parent '{}' does not exist",
                        entry.doc.source_path.display(),
                        parent
                    );
                    None
                }
            }
        })
        .collect();

    break_cycles(&entries, &mut parents);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];
    let mut roots = Vec::new();
    for (i, parent) in parents.iter().enumerate() {
        match parent {
            Some(p) => children[*p].push(i),
            None => roots.push(i),
        }
    }

    build_level(&roots, &entries, &children)
}

/// Detach any entry whose parent chain leads back to itself.
fn break_cycles(entries: &[NavEntry], parents: &mut [Option<usize>]) {
    for i in 0..parents.len() {
        let mut seen = vec![false; parents.len()];
        let mut current = parents[i];
        while let Some(p) = current {
            if p == i {
                tracing::warn!(
                    "{}: navigation parent chain of '{}' is circular",
                    entries[i].doc.source_path.display(),
                    entries[i].key
                );
                parents[i] = None;
                break;
            }
            if seen[p] {
                break;
            }
            seen[p] = true;
            current = parents[p];
        }
    }
}

fn build_level(indices: &[usize], entries: &[NavEntry], children: &[Vec<usize>]) -> Vec<NavLink> {
    let mut indices = indices.to_vec();
    // Stable: equal orders keep discovery order
    indices.sort_by_key(|&i| entries[i].order);

    indices
        .into_iter()
        .map(|i| {
            let entry = &entries[i];
            NavLink {
                key: entry.key.clone(),
                title: entry.title.clone(),
                url: entry.doc.url_path.clone(),
                order: entry.order,
                is_current: false,
                is_active: false,
                children: build_level(&children[i], entries, children),
            }
        })
        .collect()
}

/// Copy the navigation with the link for `url` marked current and its
/// ancestors marked active.
pub fn mark_current(nav: &[NavLink], url: &str) -> Vec<NavLink> {
    nav.iter()
        .map(|link| {
            let children = mark_current(&link.children, url);
            let is_current = link.url == url;
            let is_active = is_current || children.iter().any(|c| c.is_active);
            NavLink {
                is_current,
                is_active,
                children,
                ..link.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn make_doc(path: &str, navigation: &str) -> Document {
        let raw = if navigation.is_empty() {
            "Body".to_string()
        } else {
            format!("---\nnavigation:\n{}\n---\nBody", navigation)
        };
        let url = format!("/{}/", path.trim_end_matches(".md"));
        Document::parse(PathBuf::from(path), url, &raw).unwrap()
    }

    fn keys(nav: &[NavLink]) -> Vec<&str> {
        nav.iter().map(|l| l.key.as_str()).collect()
    }

    #[test]
    fn test_flat_navigation_sorted_by_order() {
        let docs = vec![
            make_doc("about.md", "  key: About\n  order: 2"),
            make_doc("home.md", "  key: Home\n  order: 1"),
            make_doc("hidden.md", ""),
        ];

        let nav = build_navigation(&docs);
        assert_eq!(keys(&nav), vec!["Home", "About"]);
        assert_eq!(nav[0].url, "/home/");
    }

    #[test]
    fn test_key_defaults_to_title() {
        let docs = vec![make_doc("getting-started.md", "  order: 1")];
        let nav = build_navigation(&docs);
        assert_eq!(nav[0].key, "Getting Started");
        assert_eq!(nav[0].title, "Getting Started");
    }

    #[test]
    fn test_children_nest_under_parent() {
        let docs = vec![
            make_doc("guides.md", "  key: Guides\n  order: 1"),
            make_doc("guides/b.md", "  key: B\n  parent: Guides\n  order: 2"),
            make_doc("guides/a.md", "  key: A\n  parent: Guides\n  order: 1"),
            make_doc("guides/c.md", "  key: C\n  parent: Guides\n  order: 1"),
        ];

        let nav = build_navigation(&docs);
        assert_eq!(keys(&nav), vec!["Guides"]);
        // a and c tie on order and keep their input order
        assert_eq!(keys(&nav[0].children), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_unknown_parent_goes_to_root() {
        let docs = vec![make_doc("orphan.md", "  key: Orphan\n  parent: Nobody\n  order: 1")];
        let nav = build_navigation(&docs);
        assert_eq!(keys(&nav), vec!["Orphan"]);
    }

    #[test]
    fn test_cycle_does_not_loop() {
        let docs = vec![
            make_doc("a.md", "  key: A\n  parent: B\n  order: 1"),
            make_doc("b.md", "  key: B\n  parent: A\n  order: 2"),
        ];

        let nav = build_navigation(&docs);
        assert_eq!(keys(&nav), vec!["A"]);
        assert_eq!(keys(&nav[0].children), vec!["B"]);
    }

    #[test]
    fn test_mark_current() {
        let docs = vec![
            make_doc("guides.md", "  key: Guides\n  order: 1"),
            make_doc("guides/a.md", "  key: A\n  parent: Guides\n  order: 1"),
            make_doc("about.md", "  key: About\n  order: 2"),
        ];
        let nav = build_navigation(&docs);

        let marked = mark_current(&nav, "/guides/a/");
        assert!(!marked[0].is_current);
        assert!(marked[0].is_active);
        assert!(marked[0].children[0].is_current);
        assert!(!marked[1].is_active);

        // The source tree is untouched
        assert!(!nav[0].is_active);
    }
}
