//! Namespace layout under the configured base path.
//!
//! ```text
//! <base>/services/<service>/instance-NNNNNNNNNN
//! <base>/locks/<lock>/lock-NNNNNNNNNN
//! <base>/elections/<election>/candidate-NNNNNNNNNN
//! <base>/config/<key>
//! ```

use linden_constants::namespace::CONFIG_NODE;
use linden_constants::namespace::ELECTIONS_NODE;
use linden_constants::namespace::LOCKS_NODE;
use linden_constants::namespace::SERVICES_NODE;
use linden_node_types::NodeStoreError;
use linden_node_types::path;

/// Derives every path Linden uses from one base root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    base: String,
}

impl Namespace {
    /// Create a layout rooted at `base`.
    pub fn new(base: impl Into<String>) -> Result<Self, NodeStoreError> {
        let base = base.into();
        path::validate_path(&base)?;
        Ok(Self { base })
    }

    /// The base root.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Every top-level subtree, in creation order.
    pub fn roots(&self) -> [String; 4] {
        [self.services(), self.locks(), self.elections(), self.config()]
    }

    pub fn services(&self) -> String {
        path::join(&self.base, SERVICES_NODE)
    }

    /// Directory holding the instances of one service.
    pub fn service(&self, name: &str) -> Result<String, NodeStoreError> {
        path::validate_segment(name)?;
        Ok(path::join(&self.services(), name))
    }

    pub fn locks(&self) -> String {
        path::join(&self.base, LOCKS_NODE)
    }

    /// Directory holding the contenders of one lock.
    pub fn lock(&self, name: &str) -> Result<String, NodeStoreError> {
        path::validate_segment(name)?;
        Ok(path::join(&self.locks(), name))
    }

    pub fn elections(&self) -> String {
        path::join(&self.base, ELECTIONS_NODE)
    }

    /// Directory holding the candidates of one election.
    pub fn election(&self, name: &str) -> Result<String, NodeStoreError> {
        path::validate_segment(name)?;
        Ok(path::join(&self.elections(), name))
    }

    pub fn config(&self) -> String {
        path::join(&self.base, CONFIG_NODE)
    }

    /// Node holding one shared configuration entry.
    pub fn config_key(&self, key: &str) -> Result<String, NodeStoreError> {
        path::validate_segment(key)?;
        Ok(path::join(&self.config(), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let ns = Namespace::new("/linden").unwrap();
        assert_eq!(ns.services(), "/linden/services");
        assert_eq!(ns.lock("export-job").unwrap(), "/linden/locks/export-job");
        assert_eq!(ns.election("primary").unwrap(), "/linden/elections/primary");
        assert_eq!(ns.config_key("flags").unwrap(), "/linden/config/flags");
    }

    #[test]
    fn test_root_base() {
        let ns = Namespace::new("/").unwrap();
        assert_eq!(ns.locks(), "/locks");
    }

    #[test]
    fn test_rejects_bad_names() {
        let ns = Namespace::new("/linden").unwrap();
        assert!(ns.service("").is_err());
        assert!(ns.lock("a/b").is_err());
        assert!(ns.election("..").is_err());
        assert!(Namespace::new("relative").is_err());
    }
}
