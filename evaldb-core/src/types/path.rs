//! Slash-delimited object paths inside a container.

use std::fmt;

/// Root of the parallel namespace that holds dimension-scale datasets.
pub const SCALES_ROOT: &str = "_scales";

/// A normalized, absolute path to a group, dataset or link.
///
/// Paths always start with `/`, never end with `/` (except the root) and
/// never contain empty segments. Segments are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Build a path from any slash-delimited string.
    ///
    /// Repeated and trailing slashes are collapsed; a missing leading slash
    /// is added.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let mut normalized = String::with_capacity(raw.as_ref().len() + 1);
        for segment in raw.as_ref().split('/').filter(|s| !s.is_empty()) {
            normalized.push('/');
            normalized.push_str(segment);
        }
        if normalized.is_empty() {
            normalized.push('/');
        }
        Self(normalized)
    }

    /// The root group path `/`.
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Build a path from individual segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = Self::root();
        for segment in segments {
            path = path.join(segment);
        }
        path
    }

    /// Check whether this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Append one or more segments (the argument may itself contain slashes).
    #[must_use]
    pub fn join(&self, child: impl AsRef<str>) -> Self {
        if self.is_root() {
            Self::new(child)
        } else {
            Self::new(format!("{}/{}", self.0, child.as_ref()))
        }
    }

    /// Iterate over the path segments, root excluded.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Number of segments below the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// The final segment, or `None` for the root.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.segments().last()
    }

    /// The parent path, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::root()),
        }
    }

    /// Check whether `self` equals `other` or lies beneath it.
    #[must_use]
    pub fn starts_with(&self, other: &ObjectPath) -> bool {
        if other.is_root() {
            return true;
        }
        self.0 == other.0
            || (self.0.starts_with(&other.0) && self.0.as_bytes().get(other.0.len()) == Some(&b'/'))
    }

    /// The mirror of this path inside the `/_scales` namespace.
    ///
    /// `/models/simulation/m1/variables` maps to
    /// `/_scales/models/simulation/m1/variables`.
    #[must_use]
    pub fn scale_mirror(&self) -> Self {
        Self::root().join(SCALES_ROOT).join(&self.0)
    }

    /// Check whether this path lives in the `/_scales` namespace.
    #[must_use]
    pub fn is_in_scale_namespace(&self) -> bool {
        self.segments().next() == Some(SCALES_ROOT)
    }

    /// Borrow the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ObjectPath {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_slashes() {
        assert_eq!(ObjectPath::new("models//simulation/").as_str(), "/models/simulation");
        assert_eq!(ObjectPath::new("").as_str(), "/");
        assert_eq!(ObjectPath::new("///").as_str(), "/");
    }

    #[test]
    fn parent_and_name() {
        let path = ObjectPath::new("/methods/opt/results/execution:1");
        assert_eq!(path.name(), Some("execution:1"));
        assert_eq!(path.parent().unwrap().as_str(), "/methods/opt/results");
        assert_eq!(ObjectPath::new("/methods").parent(), Some(ObjectPath::root()));
        assert_eq!(ObjectPath::root().parent(), None);
        assert_eq!(path.depth(), 4);
    }

    #[test]
    fn join_from_root_and_nested() {
        assert_eq!(ObjectPath::root().join("a/b").as_str(), "/a/b");
        assert_eq!(ObjectPath::new("/a").join("b").join("c").as_str(), "/a/b/c");
        assert_eq!(ObjectPath::from_segments(["x", "y"]).as_str(), "/x/y");
    }

    #[test]
    fn scale_mirror_prefixes_namespace() {
        let path = ObjectPath::new("/models/simulation/m1/variables");
        let mirror = path.scale_mirror();
        assert_eq!(mirror.as_str(), "/_scales/models/simulation/m1/variables");
        assert!(mirror.is_in_scale_namespace());
        assert!(!path.is_in_scale_namespace());
    }

    #[test]
    fn starts_with_respects_segment_boundaries() {
        let path = ObjectPath::new("/models/sim/m10");
        assert!(path.starts_with(&ObjectPath::new("/models/sim")));
        assert!(!path.starts_with(&ObjectPath::new("/models/sim/m1")));
        assert!(path.starts_with(&ObjectPath::root()));
    }
}
