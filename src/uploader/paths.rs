//! Folder paths implied by a selection of files.
//!
//! Paths are forward-slash separated and relative to the selection root.
//! Empty segments are ignored, so `"/A//B/"` and `"A/B"` name the same folder.

use crate::uploader::source::FileEntry;
use std::collections::BTreeSet;

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Every folder path that must exist remotely before `files` can be placed.
///
/// For `"Photos/2024/img.png"` this yields `"Photos"` and `"Photos/2024"`.
pub fn resolve_required_paths(files: &[FileEntry]) -> BTreeSet<String> {
    let mut paths = BTreeSet::new();
    for file in files {
        let Some(dir) = file.relative_path.as_deref().and_then(parent_dir) else {
            continue;
        };
        let mut current = String::new();
        for part in segments(&dir) {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(part);
            paths.insert(current.clone());
        }
    }
    paths
}

/// Directory part of a file's relative path, or `None` when the file sits at the root
pub fn parent_dir(relative_path: &str) -> Option<String> {
    let mut parts: Vec<&str> = segments(relative_path).collect();
    parts.pop();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Split a folder path into its parent path and leaf name.
/// The parent is empty for top-level folders.
pub fn split_parent(path: &str) -> (String, String) {
    let mut parts: Vec<&str> = segments(path).collect();
    let leaf = parts.pop().unwrap_or_default().to_string();
    (parts.join("/"), leaf)
}

/// Number of segments in a folder path
pub fn depth(path: &str) -> usize {
    segments(path).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn file(path: Option<&str>) -> FileEntry {
        let entry = FileEntry::from_bytes("f", bytes::Bytes::new());
        match path {
            Some(p) => entry.with_relative_path(p),
            None => entry,
        }
    }

    #[test]
    fn test_registers_every_ancestor() {
        let files = vec![file(Some("Photos/2024/img.png"))];
        let paths: Vec<String> = resolve_required_paths(&files).into_iter().collect();
        assert_eq!(paths, vec!["Photos", "Photos/2024"]);
    }

    #[test]
    fn test_shared_ancestors_deduplicated() {
        let files = vec![
            file(Some("A/x.png")),
            file(Some("A/B/y.png")),
            file(Some("A/B/z.png")),
            file(None),
            file(Some("top.txt")),
        ];
        let paths: Vec<String> = resolve_required_paths(&files).into_iter().collect();
        assert_eq!(paths, vec!["A", "A/B"]);
    }

    #[test]
    fn test_empty_segments_ignored() {
        let files = vec![file(Some("/A//B/c.txt"))];
        let paths: Vec<String> = resolve_required_paths(&files).into_iter().collect();
        assert_eq!(paths, vec!["A", "A/B"]);
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("a.txt"), None);
        assert_eq!(parent_dir("A/a.txt").as_deref(), Some("A"));
        assert_eq!(parent_dir("A/B/a.txt").as_deref(), Some("A/B"));
    }

    #[test]
    fn test_split_parent_and_depth() {
        assert_eq!(split_parent("A/B"), ("A".to_string(), "B".to_string()));
        assert_eq!(split_parent("A"), (String::new(), "A".to_string()));
        assert_eq!(depth("A/B/C"), 3);
        assert_eq!(depth(""), 0);
    }

    proptest! {
        #[test]
        fn prop_paths_closed_under_parent(
            parts in proptest::collection::vec(proptest::collection::vec("[a-z]{1,3}", 1..5), 0..8)
        ) {
            let files: Vec<FileEntry> = parts
                .iter()
                .map(|segs| file(Some(format!("{}/file.bin", segs.join("/")).as_str())))
                .collect();

            let paths = resolve_required_paths(&files);
            prop_assert_eq!(&paths, &resolve_required_paths(&files));
            for path in &paths {
                let (parent, leaf) = split_parent(path);
                prop_assert!(!leaf.is_empty());
                if !parent.is_empty() {
                    prop_assert!(paths.contains(&parent));
                }
            }
        }
    }
}
