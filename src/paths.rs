// Paths Module - Concrete and search paths into a fetched JSON document
//
// A ConcretePath addresses one node with its literal keys and indices
// ("/balldrivers/0/motors/1"). Its SearchPath is the same path with every
// numeric segment generalized to the wildcard ("/balldrivers/[i]/motors/[i]").
// Both are only ever extended together through NodePath::child.
// Segments are stored in JSON Pointer form: a key's "~" becomes "~0" and "/" becomes "~1".
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wildcard segment matching any array index or numeric object key
pub const WILDCARD: &str = "[i]";

/// True for a non-empty run of ASCII digits ("0", "12"); "-1", "1.5" and "" are literal keys
pub fn is_numeric_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Escape an object key into a path segment
pub fn escape_segment(key: &str) -> String {
    if !key.contains('/') && !key.contains('~') {
        return key.to_string();
    }
    key.replace('~', "~0").replace('/', "~1")
}

/// Recover the object key a path segment was escaped from
pub fn unescape_segment(segment: &str) -> String {
    if !segment.contains('~') {
        return segment.to_string();
    }
    segment.replace("~1", "/").replace("~0", "~")
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConcretePath(String);

impl ConcretePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        split_segments(&self.0)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Percent-encoded form of the path for a request URL, one segment per original key
    pub fn url_path(&self) -> String {
        let mut url = String::with_capacity(self.0.len());
        for segment in self.segments() {
            url.push('/');
            url.push_str(&urlencoding::encode(&unescape_segment(segment)));
        }
        url
    }

    /// Generalize numeric segments; yields the search path this node is looked up by
    pub fn to_search_path(&self) -> SearchPath {
        let mut search = String::with_capacity(self.0.len());
        for segment in self.segments() {
            search.push('/');
            if is_numeric_segment(segment) {
                search.push_str(WILDCARD);
            } else {
                search.push_str(segment);
            }
        }
        SearchPath(search)
    }
}

impl fmt::Display for ConcretePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SearchPath(String);

impl SearchPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "/")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Declared lookup key of an action routine.
///
/// Stored normalized with a leading slash and no empty segments, so
/// `"balldrivers/[i]"` and `"/balldrivers/[i]/"` denote the same pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PathPattern(String);

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let mut normalized = String::with_capacity(pattern.len() + 1);
        for segment in split_segments(pattern) {
            normalized.push('/');
            normalized.push_str(segment);
        }
        PathPattern(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl From<String> for PathPattern {
    fn from(s: String) -> Self {
        PathPattern::parse(&s)
    }
}

impl From<&str> for PathPattern {
    fn from(s: &str) -> Self {
        PathPattern::parse(s)
    }
}

impl From<PathPattern> for String {
    fn from(p: PathPattern) -> Self {
        p.0
    }
}

impl From<&SearchPath> for PathPattern {
    fn from(s: &SearchPath) -> Self {
        PathPattern(s.0.clone())
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Concrete and search path of one node, derived in lockstep
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath {
    pub concrete: ConcretePath,
    pub search: SearchPath,
}

impl NodePath {
    pub fn root() -> Self {
        NodePath::default()
    }

    /// Build a path from a base such as "/balldrivers" or "system/0"; segments are already escaped
    pub fn from_base(base: &str) -> Self {
        split_segments(base).fold(NodePath::root(), |path, segment| path.push_segment(segment))
    }

    /// Path of the member `key` of this node; `key` is escaped first
    pub fn child(&self, key: &str) -> Self {
        self.push_segment(&escape_segment(key))
    }

    pub fn child_index(&self, index: usize) -> Self {
        self.push_segment(&index.to_string())
    }

    fn push_segment(&self, segment: &str) -> Self {
        let mut concrete = self.concrete.0.clone();
        let mut search = self.search.0.clone();
        concrete.push('/');
        concrete.push_str(segment);
        search.push('/');
        if is_numeric_segment(segment) {
            search.push_str(WILDCARD);
        } else {
            search.push_str(segment);
        }
        NodePath {
            concrete: ConcretePath(concrete),
            search: SearchPath(search),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_segments() {
        assert!(is_numeric_segment("0"));
        assert!(is_numeric_segment("42"));
        assert!(!is_numeric_segment(""));
        assert!(!is_numeric_segment("-1"));
        assert!(!is_numeric_segment("1.5"));
        assert!(!is_numeric_segment("motor1"));
    }

    #[test]
    fn test_child_derives_both_paths_together() {
        let path = NodePath::root()
            .child("balldrivers")
            .child_index(0)
            .child("motors")
            .child("3");
        assert_eq!(path.concrete.as_str(), "/balldrivers/0/motors/3");
        assert_eq!(path.search.as_str(), "/balldrivers/[i]/motors/[i]");
        assert_eq!(path.concrete.segments().count(), 4);
    }

    #[test]
    fn test_search_path_is_generalized_concrete_path() {
        let path = NodePath::from_base("/system/12/general/7x");
        assert_eq!(path.concrete.to_search_path(), path.search);
        assert_eq!(path.search.as_str(), "/system/[i]/general/7x");
    }

    #[test]
    fn test_from_base_ignores_extra_slashes() {
        let a = NodePath::from_base("balldrivers");
        let b = NodePath::from_base("//balldrivers/");
        assert_eq!(a, b);
        assert_eq!(a.concrete.as_str(), "/balldrivers");
    }

    #[test]
    fn test_pattern_normalization() {
        let a = PathPattern::parse("balldrivers/[i]");
        let b = PathPattern::parse("/balldrivers/[i]/");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "/balldrivers/[i]");

        let path = NodePath::from_base("/balldrivers/1");
        assert_eq!(PathPattern::from(&path.search), a);
        assert_ne!(PathPattern::from(&NodePath::from_base("/balldrivers").search), a);
    }

    #[test]
    fn test_keys_with_slash_or_tilde_stay_one_segment() {
        let path = NodePath::root().child("x/0");
        assert_eq!(path.concrete.as_str(), "/x~10");
        assert_eq!(path.search.as_str(), "/x~10");
        assert_eq!(path.concrete.to_search_path(), path.search);
        assert_eq!(path.concrete.segments().count(), 1);

        let tilde = NodePath::root().child("a~1").child_index(2);
        assert_eq!(tilde.concrete.as_str(), "/a~01/2");
        assert_eq!(tilde.search.as_str(), "/a~01/[i]");
        assert_eq!(unescape_segment("a~01"), "a~1");
        assert_eq!(unescape_segment(&escape_segment("~/~1")), "~/~1");

        // "balldrivers/0" as one key must not collide with element 0 of "balldrivers"
        let key = NodePath::root().child("balldrivers/0");
        let element = NodePath::root().child("balldrivers").child_index(0);
        assert_ne!(key.concrete, element.concrete);
        assert_ne!(key.search, element.search);
        assert_ne!(key.concrete.url_path(), element.concrete.url_path());
    }

    #[test]
    fn test_url_path_percent_encodes_keys() {
        let path = NodePath::root().child("ball feeders").child("x/0").child("a~b").child_index(1);
        assert_eq!(path.concrete.url_path(), "/ball%20feeders/x%2F0/a~b/1");
        assert_eq!(NodePath::from_base("/balldrivers/0").concrete.url_path(), "/balldrivers/0");
        assert_eq!(NodePath::root().concrete.url_path(), "");
    }

    #[test]
    fn test_root_display() {
        assert_eq!(NodePath::root().concrete.to_string(), "/");
        assert_eq!(NodePath::root().search.to_string(), "/");
        assert_eq!(NodePath::from_base("/balldrivers/2").search.to_string(), "/balldrivers/[i]");
        assert!(NodePath::root().concrete.is_root());
    }
}
