//! Runtime specs: the set of runtimes a chunk or chunk group runs in

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Sorted set of runtime names
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RuntimeSpec(BTreeSet<String>);

impl RuntimeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(name: impl Into<String>) -> Self {
        let mut set = BTreeSet::new();
        set.insert(name.into());
        Self(set)
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    /// Merge `other` into `self`, returning `true` if anything was added
    pub fn extend(&mut self, other: &RuntimeSpec) -> bool {
        let before = self.0.len();
        self.0.extend(other.0.iter().cloned());
        self.0.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RuntimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().collect();
        write!(f, "{}", names.join("|"))
    }
}

impl<S: Into<String>> FromIterator<S> for RuntimeSpec {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_sorted() {
        let spec: RuntimeSpec = ["main", "admin"].into_iter().collect();
        assert_eq!(spec.to_string(), "admin|main");
    }

    #[test]
    fn test_extend_reports_change() {
        let mut spec = RuntimeSpec::single("main");
        assert!(!spec.extend(&RuntimeSpec::single("main")));
        assert!(spec.extend(&RuntimeSpec::single("admin")));
        assert_eq!(spec.len(), 2);
    }
}
