//! Path helpers for the slash-delimited node namespace.
//!
//! Paths are absolute (`/a/b/c`), have no trailing slash except for the
//! root itself, and contain no empty, `.` or `..` segments.

use linden_constants::namespace::MAX_PATH_SIZE;
use linden_constants::namespace::MAX_SEGMENT_SIZE;

use crate::NodeStoreError;

/// The root path.
pub const ROOT: &str = "/";

/// Validate an absolute node path.
pub fn validate_path(path: &str) -> Result<(), NodeStoreError> {
    let invalid = |reason: &str| NodeStoreError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if !path.starts_with('/') {
        return Err(invalid("path must be absolute"));
    }
    if path.len() > MAX_PATH_SIZE {
        return Err(invalid("path too long"));
    }
    if path == ROOT {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(invalid("path must not end with '/'"));
    }
    for segment in path[1..].split('/') {
        check_segment(segment).map_err(|reason| invalid(reason))?;
    }
    Ok(())
}

/// Validate a single path segment such as a service, lock or election name.
pub fn validate_segment(name: &str) -> Result<(), NodeStoreError> {
    check_segment(name).map_err(|reason| NodeStoreError::InvalidPath {
        path: name.to_string(),
        reason: reason.to_string(),
    })?;
    if name.contains('/') {
        return Err(NodeStoreError::InvalidPath {
            path: name.to_string(),
            reason: "name must not contain '/'".to_string(),
        });
    }
    Ok(())
}

fn check_segment(segment: &str) -> Result<(), &'static str> {
    if segment.is_empty() {
        return Err("empty path segment");
    }
    if segment == "." || segment == ".." {
        return Err("relative path segment");
    }
    if segment.len() > MAX_SEGMENT_SIZE {
        return Err("path segment too long");
    }
    if segment.contains('\0') {
        return Err("path contains NUL");
    }
    Ok(())
}

/// Join a parent path and a child name.
pub fn join(parent: &str, child: &str) -> String {
    if parent == ROOT {
        format!("/{child}")
    } else {
        format!("{parent}/{child}")
    }
}

/// Parent of `path`, or `None` for the root.
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Last segment of `path` (empty for the root).
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Every ancestor of `path` below the root, followed by `path` itself.
///
/// `/a/b/c` yields `["/a", "/a/b", "/a/b/c"]`.
pub fn ancestors_inclusive(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        current.push('/');
        current.push_str(segment);
        out.push(current.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path_accepts_well_formed() {
        assert!(validate_path("/").is_ok());
        assert!(validate_path("/linden").is_ok());
        assert!(validate_path("/linden/locks/export-job").is_ok());
    }

    #[test]
    fn test_validate_path_rejects_malformed() {
        assert!(validate_path("").is_err());
        assert!(validate_path("linden").is_err());
        assert!(validate_path("/linden/").is_err());
        assert!(validate_path("/linden//locks").is_err());
        assert!(validate_path("/linden/../etc").is_err());
    }

    #[test]
    fn test_validate_segment() {
        assert!(validate_segment("primary-writer").is_ok());
        assert!(validate_segment("").is_err());
        assert!(validate_segment("a/b").is_err());
        assert!(validate_segment("..").is_err());
        assert!(validate_segment(&"x".repeat(MAX_SEGMENT_SIZE + 1)).is_err());
    }

    #[test]
    fn test_join_and_parent() {
        assert_eq!(join("/", "linden"), "/linden");
        assert_eq!(join("/linden", "locks"), "/linden/locks");
        assert_eq!(parent("/linden/locks"), Some("/linden"));
        assert_eq!(parent("/linden"), Some("/"));
        assert_eq!(parent("/"), None);
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("/linden/locks/lock-0000000001"), "lock-0000000001");
        assert_eq!(basename("/"), "");
    }

    #[test]
    fn test_ancestors_inclusive() {
        assert_eq!(ancestors_inclusive("/a/b/c"), vec!["/a", "/a/b", "/a/b/c"]);
        assert!(ancestors_inclusive("/").is_empty());
    }
}

#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn prop_join_then_split_roundtrips(parent_segs in prop::collection::vec("[a-z0-9-]{1,12}", 0..5), child in "[a-z0-9-]{1,12}") {
            let parent_path = if parent_segs.is_empty() {
                ROOT.to_string()
            } else {
                format!("/{}", parent_segs.join("/"))
            };
            let joined = join(&parent_path, &child);
            prop_assert!(validate_path(&joined).is_ok());
            prop_assert_eq!(parent(&joined), Some(parent_path.as_str()));
            prop_assert_eq!(basename(&joined), child.as_str());
        }
    }
}
