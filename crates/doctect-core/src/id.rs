use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for node IDs: fast comparisons, low memory.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// A lightweight, interned identifier for nodes in the content tree.
/// Internally a `Spur` index (4 bytes, Copy, O(1) Eq and Hash).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Spur);

impl NodeId {
    /// Intern a new string as a NodeId, or return existing if already interned.
    pub fn intern(s: &str) -> Self {
        NodeId(INTERNER.get_or_intern(s))
    }

    /// Look up an already-interned id without growing the interner.
    ///
    /// Lookups driven by user input (link values, grid source ids) go
    /// through here so a typo never allocates a new interned string.
    pub fn get(s: &str) -> Option<Self> {
        INTERNER.get(s).map(NodeId)
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.as_str())
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
    fn interning_roundtrip() {
        let a = NodeId::intern("month_01");
        let b = NodeId::intern("month_01");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "month_01");
    }

    #[test]
    fn get_does_not_intern() {
        assert!(NodeId::get("never_interned_anywhere_xyz").is_none());
        let id = NodeId::intern("day_2026_01_01");
        assert_eq!(NodeId::get("day_2026_01_01"), Some(id));
    }

    #[test]
    fn display_is_plain_debug_is_prefixed() {
        let id = NodeId::intern("week_1");
        assert_eq!(id.to_string(), "week_1");
        assert_eq!(format!("{id:?}"), "@week_1");
    }
}
