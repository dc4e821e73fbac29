//! Literal values: property literals and event payloads.
use arbor_common::{Atom, Data};
use std::{cmp::Ordering, collections::BTreeMap, fmt, sync::Arc};

/// An immutable literal value.
///
/// Strings, lists and maps share their storage, so cloning is cheap. Equality is structural;
/// floats compare by bit pattern.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Keyword(Atom),
    List(Arc<[Value]>),
    Map(Arc<BTreeMap<Value, Value>>),
}

impl Value {
    /// Creates a keyword value (`:name`).
    pub fn keyword(name: &str) -> Value {
        Value::Keyword(Atom::from(name))
    }

    /// Creates a string value.
    pub fn str(s: &str) -> Value {
        Value::Str(s.into())
    }

    /// Creates a list value.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(items.into_iter().collect())
    }

    /// Creates a map value. Keys given as `&str` become keywords.
    ///
    /// ```
    /// use arbor::Value;
    /// let payload = Value::map([("event", Value::keyword("clicked!"))]);
    /// assert_eq!(payload.to_string(), "{:event :clicked!}");
    /// ```
    pub fn map<K: Into<Value>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Map(Arc::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        ))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Value::Float(f) => Some(f),
            Value::Int(i) => Some(i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_keyword(&self) -> Option<&Atom> {
        match self {
            Value::Keyword(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(&items[..]),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<Value, Value>> {
        match self {
            Value::Map(map) => Some(&**map),
            _ => None,
        }
    }

    /// Looks up a keyword key in a map value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(&Value::keyword(key))
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Nil => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Str(_) => 4,
            Value::Keyword(_) => 5,
            Value::List(_) => 6,
            Value::Map(_) => 7,
        }
    }

    /// Fast path for shared storage.
    fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Arc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.ptr_eq(other) {
            return Ordering::Equal;
        }
        match (self, other) {
            (Value::Nil, Value::Nil) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Keyword(a), Value::Keyword(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.iter().cmp(b.iter()),
            (Value::Map(a), Value::Map(b)) => a.iter().cmp(b.iter()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Data for Value {
    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

/// String slices used as map keys become keywords, see [`Value::map`]. Use [`Value::str`] for
/// string literals.
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::keyword(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v.into())
    }
}

impl From<Atom> for Value {
    fn from(v: Atom) -> Self {
        Value::Keyword(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::list(v.into_iter().map(Into::into))
    }
}

fn write_seq<'a>(f: &mut fmt::Formatter, items: impl Iterator<Item = &'a Value>) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Keyword(k) => write!(f, ":{k}"),
            Value::List(items) => {
                f.write_str("[")?;
                write_seq(f, items.iter())?;
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                write_seq(f, map.iter().flat_map(|(k, v)| [k, v]))?;
                f.write_str("}")
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::Value;

    #[test]
    fn structural_equality() {
        let a = Value::map([("event", Value::keyword("clicked!")), ("id", Value::Int(3))]);
        let b = Value::map([("id", Value::Int(3)), ("event", Value::keyword("clicked!"))]);
        assert_eq!(a, b);
        assert_ne!(a, Value::map([("event", Value::keyword("clicked!"))]));
    }

    #[test]
    fn floats_compare_by_bits() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert_ne!(Value::Float(1.0), Value::Int(1));
    }

    #[test]
    fn display() {
        let v = Value::list([Value::Nil, Value::str("a"), Value::Float(1.5), Value::keyword("k")]);
        assert_eq!(v.to_string(), r#"[nil "a" 1.5 :k]"#);
    }

    #[test]
    fn map_lookup() {
        let v = Value::map([("count", Value::Int(2))]);
        assert_eq!(v.get("count").and_then(Value::as_int), Some(2));
        assert!(v.get("missing").is_none());
        assert!(Value::Int(1).get("count").is_none());
    }
}
