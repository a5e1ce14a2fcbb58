use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global interner for node ids. Ids are looked up far more often than
/// they are created, so comparisons stay O(1).
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Stable, globally unique identifier of a `VisualNode`.
///
/// An id is a lookup key only. Holding one never keeps a node alive; the
/// overlay and the hierarchy builder resolve it through `VisualTree` every
/// time they need the node.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Spur);

impl NodeId {
    /// Intern `s`, returning the existing id if it was seen before.
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// Look up `s` without interning it.
    pub fn get(s: &str) -> Option<Self> {
        INTERNER.get(s).map(NodeId)
    }

    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Id for text and comment nodes, which carry no id of their own.
    pub fn anonymous() -> Self {
        Self::with_prefix("_anon")
    }

    /// Generate a unique id with a prefix (e.g. `rx-node_4`).
    pub fn with_prefix(prefix: &str) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{prefix}_{n}"))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(NodeId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let a = NodeId::intern("hero_card");
        let b = NodeId::intern("hero_card");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "hero_card");
        assert_eq!(a.to_string(), "hero_card");
    }

    #[test]
    fn lookup_does_not_intern() {
        assert!(NodeId::get("never_interned_id_7f3a").is_none());
        let id = NodeId::intern("seen_once");
        assert_eq!(NodeId::get("seen_once"), Some(id));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = NodeId::anonymous();
        let b = NodeId::anonymous();
        assert_ne!(a, b);
        assert!(NodeId::with_prefix("rx-node").as_str().starts_with("rx-node_"));
    }
}
