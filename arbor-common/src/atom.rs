use crate::Data;
use std::{
    borrow::Borrow,
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
};
use string_cache::DefaultAtom;

/// Interned strings. Used for type tags, property keys and keywords.
///
/// Equality is a pointer comparison in the common case; ordering compares the string contents so
/// that property maps keyed by atoms iterate in a stable, human-predictable order.
#[derive(Clone, Eq, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Atom(DefaultAtom);

impl Atom {
    /// Returns the interned string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the part of the atom following `prefix`, if the atom starts with it.
    pub fn strip_prefix(&self, prefix: &str) -> Option<&str> {
        self.as_str().strip_prefix(prefix)
    }
}

impl Deref for Atom {
    type Target = str;
    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for Atom {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

// Hashes like `str`, as required by `Borrow<str>`.
impl Hash for Atom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state)
    }
}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.0 == other.0 {
            Ordering::Equal
        } else {
            self.as_str().cmp(other.as_str())
        }
    }
}

impl Data for Atom {
    fn same(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> From<T> for Atom
where
    DefaultAtom: From<T>,
{
    fn from(value: T) -> Self {
        Atom(DefaultAtom::from(value))
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, ":{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Atom;
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn ordering_follows_contents() {
        let mut map = BTreeMap::new();
        map.insert(Atom::from("text"), 1);
        map.insert(Atom::from("alignment"), 2);
        map.insert(Atom::from("on-action"), 3);
        let keys: Vec<_> = map.keys().map(Atom::as_str).collect();
        assert_eq!(keys, ["alignment", "on-action", "text"]);
    }

    #[test]
    fn hash_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(Atom::from("text"), 1);
        map.insert(Atom::from(String::from("on-action")), 2);
        assert_eq!(map.get("text"), Some(&1));
        assert_eq!(map.get("on-action"), Some(&2));
        assert_eq!(map.get("title"), None);
    }

    #[test]
    fn strip_prefix() {
        assert_eq!(Atom::from("on-action").strip_prefix("on-"), Some("action"));
        assert_eq!(Atom::from("text").strip_prefix("on-"), None);
    }
}
