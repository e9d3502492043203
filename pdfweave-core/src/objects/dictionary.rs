use crate::objects::{Object, ObjectId};
use indexmap::IndexMap;

/// PDF dictionary. Keys keep insertion order so re-serialization is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary {
    entries: IndexMap<String, Object>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Object>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Object> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Object> {
        self.entries.get_mut(key)
    }

    /// Removes a key while keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Object> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Object> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Object)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut Object)> {
        self.entries.iter_mut()
    }

    /// Value of the `/Type` entry.
    pub fn get_type(&self) -> Option<&str> {
        self.get_name("Type")
    }

    pub fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Object::as_name)
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Object::as_integer)
    }

    pub fn get_reference(&self, key: &str) -> Option<ObjectId> {
        self.get(key).and_then(Object::as_reference)
    }

    pub fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key).and_then(|obj| match obj {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        })
    }
}

impl FromIterator<(String, Object)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (String, Object)>>(iter: T) -> Self {
        let mut dict = Dictionary::new();
        for (key, value) in iter {
            dict.set(key, value);
        }
        dict
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a String, &'a Object);
    type IntoIter = indexmap::map::Iter<'a, String, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dictionary() {
        let dict = Dictionary::new();
        assert!(dict.is_empty());
        assert_eq!(dict.len(), 0);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Page"));
        dict.set("Parent", ObjectId::new(2, 0));
        dict.set("Contents", ObjectId::new(4, 0));
        dict.set("MediaBox", vec![Object::Integer(0)]);

        let keys: Vec<&str> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Type", "Parent", "Contents", "MediaBox"]);

        dict.remove("Parent");
        let keys: Vec<&str> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Type", "Contents", "MediaBox"]);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut dict = Dictionary::new();
        dict.set("A", 1);
        dict.set("B", 2);
        dict.set("A", 3);
        let entries: Vec<_> = dict.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        assert_eq!(
            entries,
            vec![
                ("A".to_string(), Object::Integer(3)),
                ("B".to_string(), Object::Integer(2))
            ]
        );
    }

    #[test]
    fn test_typed_getters() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Pages"));
        dict.set("Count", 3);
        dict.set("Parent", ObjectId::new(1, 0));

        assert_eq!(dict.get_type(), Some("Pages"));
        assert_eq!(dict.get_integer("Count"), Some(3));
        assert_eq!(dict.get_reference("Parent"), Some(ObjectId::new(1, 0)));
        assert_eq!(dict.get_integer("Missing"), None);
    }
}
