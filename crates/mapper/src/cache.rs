//! Per-mapper runtime cache.
//!
//! Unbounded and never evicted: entries live exactly as long as the owning
//! cache. There is no internal locking; writes take `&mut self`, so sharing a
//! cache across threads needs synchronisation supplied by the caller.

use std::collections::HashMap;
use std::fmt;

/// Scalar cache key.
///
/// Strings holding a canonical decimal integer collapse to `Int`, so `"42"`
/// and `42` name the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Int(i64),
    Str(String),
}

impl CacheKey {
    fn from_text(s: &str) -> Self {
        match canonical_int(s) {
            Some(n) => CacheKey::Int(n),
            None => CacheKey::Str(s.to_string()),
        }
    }
}

// "0", "17", "-3" qualify; "007", "-0", "+1", " 1" and overflowing values do not.
fn canonical_int(s: &str) -> Option<i64> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let bytes = digits.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes[0] == b'0' && (bytes.len() > 1 || digits.len() != s.len()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Int(n) => write!(f, "{n}"),
            CacheKey::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self { CacheKey::from_text(s) }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        match canonical_int(&s) {
            Some(n) => CacheKey::Int(n),
            None => CacheKey::Str(s),
        }
    }
}

impl From<&String> for CacheKey {
    fn from(s: &String) -> Self { CacheKey::from_text(s) }
}

impl From<bool> for CacheKey {
    fn from(b: bool) -> Self { CacheKey::Int(b as i64) }
}

macro_rules! int_key {
    ($($t:ty),*) => {
        $(impl From<$t> for CacheKey {
            fn from(n: $t) -> Self { CacheKey::Int(n as i64) }
        })*
    };
}

int_key!(i8, i16, i32, i64, u8, u16, u32);

// Wide integers outside the i64 range keep their decimal text as a string key.
macro_rules! wide_int_key {
    ($($t:ty),*) => {
        $(impl From<$t> for CacheKey {
            fn from(n: $t) -> Self {
                match i64::try_from(n) {
                    Ok(n) => CacheKey::Int(n),
                    Err(_) => CacheKey::Str(n.to_string()),
                }
            }
        })*
    };
}

wide_int_key!(isize, usize, u64, i128, u128);

/// One key or an ordered list of keys sharing a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheKeys {
    One(CacheKey),
    Many(Vec<CacheKey>),
}

impl CacheKeys {
    pub fn into_vec(self) -> Vec<CacheKey> {
        match self {
            CacheKeys::One(k) => vec![k],
            CacheKeys::Many(ks) => ks,
        }
    }
}

macro_rules! single_keys {
    ($($t:ty),*) => {
        $(impl From<$t> for CacheKeys {
            fn from(k: $t) -> Self { CacheKeys::One(k.into()) }
        })*
    };
}

single_keys!(CacheKey, &str, String, &String, bool, i8, i16, i32, i64, u8, u16, u32, isize, usize, u64, i128, u128);

impl<K: Into<CacheKey>> From<Vec<K>> for CacheKeys {
    fn from(ks: Vec<K>) -> Self { CacheKeys::Many(ks.into_iter().map(Into::into).collect()) }
}

impl<K: Into<CacheKey>, const N: usize> From<[K; N]> for CacheKeys {
    fn from(ks: [K; N]) -> Self { CacheKeys::Many(ks.into_iter().map(Into::into).collect()) }
}

impl<K: Into<CacheKey> + Clone> From<&[K]> for CacheKeys {
    fn from(ks: &[K]) -> Self { CacheKeys::Many(ks.iter().cloned().map(Into::into).collect()) }
}

#[derive(Debug, Clone)]
pub struct RuntimeCache<V> {
    entries: HashMap<CacheKey, V>,
}

impl<V> Default for RuntimeCache<V> {
    fn default() -> Self { Self { entries: HashMap::new() } }
}

impl<V> RuntimeCache<V> {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, key: impl Into<CacheKey>) -> Option<&V> {
        self.entries.get(&key.into())
    }

    pub fn contains(&self, key: impl Into<CacheKey>) -> bool {
        self.entries.contains_key(&key.into())
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl<V: Clone> RuntimeCache<V> {
    /// Store `value` under every key, replacing earlier values for those keys.
    pub fn insert(&mut self, value: V, keys: impl Into<CacheKeys>) {
        for key in keys.into().into_vec() {
            self.entries.insert(key, value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_share_int_slot() {
        assert_eq!(CacheKey::from("42"), CacheKey::Int(42));
        assert_eq!(CacheKey::from("-7"), CacheKey::Int(-7));
        assert_eq!(CacheKey::from("0"), CacheKey::Int(0));
        assert_eq!(CacheKey::from(true), CacheKey::Int(1));
        for s in ["042", "-0", "+1", " 1", "1.5", "", "-", "99999999999999999999"] {
            assert_eq!(CacheKey::from(s), CacheKey::Str(s.to_string()), "{s:?}");
        }
    }

    #[test]
    fn wide_integers_fit_or_fall_back_to_text() {
        assert_eq!(CacheKey::from(3usize), CacheKey::Int(3));
        assert_eq!(CacheKey::from(7u64), CacheKey::Int(7));
        assert_eq!(CacheKey::from(-2i128), CacheKey::Int(-2));
        assert_eq!(CacheKey::from(u64::MAX), CacheKey::Str("18446744073709551615".into()));
        assert_eq!(CacheKey::from(i128::MIN), CacheKey::Str(i128::MIN.to_string()));

        let mut cache = RuntimeCache::new();
        let ids = vec![10u64, 11];
        cache.insert('x', ids);
        cache.insert('y', ids_len(&[1, 2, 3]));
        assert_eq!(cache.get(10i64), Some(&'x'));
        assert_eq!(cache.get("11"), Some(&'x'));
        assert_eq!(cache.get(3usize), Some(&'y'));
    }

    fn ids_len(ids: &[i32]) -> usize { ids.len() }

    #[test]
    fn lookups_need_no_clone_bound() {
        struct Handle;
        let cache: RuntimeCache<Handle> = RuntimeCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert!(!cache.contains("k"));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn miss_then_hit() {
        let mut cache = RuntimeCache::new();
        assert_eq!(cache.get("missing"), None);
        cache.insert(42, "k");
        assert_eq!(cache.get("k"), Some(&42));
        assert!(cache.contains("k"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn multi_key_insert_and_overwrite() {
        let mut cache = RuntimeCache::new();
        cache.insert("v".to_string(), ["a", "b"]);
        assert_eq!(cache.get("a").map(String::as_str), Some("v"));
        assert_eq!(cache.get("b").map(String::as_str), Some("v"));

        cache.insert("w".to_string(), "a");
        assert_eq!(cache.get("a").map(String::as_str), Some("w"));
        assert_eq!(cache.get("b").map(String::as_str), Some("v"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn stored_false_is_not_a_miss() {
        let mut cache = RuntimeCache::new();
        cache.insert(false, 5i64);
        assert_eq!(cache.get("5"), Some(&false));
        assert_eq!(cache.get(6i64), None);
    }

    #[test]
    fn mixed_key_kinds() {
        let mut cache = RuntimeCache::new();
        let ids: &[i64] = &[1, 2];
        cache.insert("user", ids);
        cache.insert("user", vec!["alice@example.com".to_string()]);
        assert!(cache.contains("1"));
        assert!(cache.contains(2u8));
        assert!(cache.contains("alice@example.com"));
        assert_eq!(cache.len(), 3);
    }
}
