//! MIME header map.
//!
//! Field names are case-insensitive; a name may carry several values, which keep
//! the order they were added in.

use std::collections::HashMap;

/// A set of MIME header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    fields: HashMap<String, Vec<String>>,
}

impl Header {
    /// Creates an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the first value of the field, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&name.to_ascii_lowercase())
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }

    /// Returns every value of the field, in insertion order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.fields
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Reports whether the field is present.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(&name.to_ascii_lowercase())
    }

    /// Replaces all values of the field with `value`.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields
            .insert(name.to_ascii_lowercase(), vec![value.into()]);
    }

    /// Appends `value` to the field.
    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        self.fields
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Removes the field, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.fields.remove(&name.to_ascii_lowercase())
    }

    /// Number of distinct field names.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over `(lowercased name, values)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Appends a continuation to the last value of the field (folded header line).
    pub(crate) fn append_to_last(&mut self, name: &str, continuation: &str) -> bool {
        match self
            .fields
            .get_mut(&name.to_ascii_lowercase())
            .and_then(|v| v.last_mut())
        {
            Some(last) => {
                if !last.is_empty() {
                    last.push(' ');
                }
                last.push_str(continuation);
                true
            }
            None => false,
        }
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Header {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut header = Header::new();
        for (k, v) in iter {
            header.add(k.as_ref(), v);
        }
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let mut header = Header::new();
        header.set("Content-Type", "text/plain");
        assert_eq!(header.get("content-type"), Some("text/plain"));
        assert_eq!(header.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(header.contains("Content-type"));
        assert!(!header.contains("Content-Transfer-Encoding"));
    }

    #[test]
    fn test_repeated_fields_keep_order() {
        let mut header = Header::new();
        header.add("Received", "from a");
        header.add("received", "from b");
        assert_eq!(header.get("Received"), Some("from a"));
        assert_eq!(header.get_all("RECEIVED"), &["from a", "from b"]);
        assert_eq!(header.len(), 1);

        header.set("Received", "from c");
        assert_eq!(header.get_all("received"), &["from c"]);
    }

    #[test]
    fn test_from_iter() {
        let header: Header = [("Content-Type", "text/html"), ("X-Tag", "a")]
            .into_iter()
            .collect();
        assert_eq!(header.get("content-type"), Some("text/html"));
        assert_eq!(header.get("x-tag"), Some("a"));
        assert!(header.get_all("missing").is_empty());
    }

    #[test]
    fn test_append_to_last() {
        let mut header = Header::new();
        header.add("Subject", "hello");
        assert!(header.append_to_last("subject", "world"));
        assert_eq!(header.get("Subject"), Some("hello world"));
        assert!(!header.append_to_last("x-missing", "value"));
    }
}
