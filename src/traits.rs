use crate::error::Error;
use crate::types::{Map, Value};
use std::sync::RwLock;

/// Capability used to reach into objects that are not part of the value tree.
///
/// Methods take `&self`; implementors own whatever interior mutability they
/// need. Paths reaching through a bean property mutate the fetched copy and
/// write it back with [`PropertyAccessor::set`].
pub trait PropertyAccessor: Send + Sync {
    /// Read a property; `None` when the object has no such property.
    fn get(&self, name: &str) -> Option<Value>;

    /// Write a property.
    fn set(&self, name: &str, value: Value) -> Result<(), Error>;

    /// Remove a property, returning whether a non-null value was removed.
    fn remove(&self, name: &str) -> bool;

    /// All property names, in declaration order.
    fn property_names(&self) -> Vec<String>;

    /// Number of properties holding a non-null value.
    fn size(&self) -> usize {
        self.property_names()
            .iter()
            .filter(|name| matches!(self.get(name), Some(v) if !v.is_null()))
            .count()
    }
}

/// In-memory record accessor.
///
/// With a schema, only the declared properties exist: writes to anything
/// else fail and removal resets a property to null instead of dropping it.
pub struct RecordAccessor {
    fields: RwLock<Map>,
    fixed: bool,
}

impl RecordAccessor {
    /// Open record: any property may be added or dropped.
    pub fn new(fields: Map) -> Self {
        Self {
            fields: RwLock::new(fields),
            fixed: false,
        }
    }

    /// Fixed record with every declared property starting out null.
    pub fn with_schema<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = names.into_iter().map(|n| (n.into(), Value::Null)).collect();
        Self {
            fields: RwLock::new(fields),
            fixed: true,
        }
    }
}

impl PropertyAccessor for RecordAccessor {
    fn get(&self, name: &str) -> Option<Value> {
        let fields = self.fields.read().unwrap_or_else(|e| e.into_inner());
        fields.get(name).cloned()
    }

    fn set(&self, name: &str, value: Value) -> Result<(), Error> {
        let mut fields = self.fields.write().unwrap_or_else(|e| e.into_inner());
        if self.fixed && !fields.contains_key(name) {
            return Err(Error::mutation(format!("record has no property '{}'", name)));
        }
        fields.insert(name.to_string(), value);
        Ok(())
    }

    fn remove(&self, name: &str) -> bool {
        let mut fields = self.fields.write().unwrap_or_else(|e| e.into_inner());
        let previous = if self.fixed {
            fields.get_mut(name).map(std::mem::take)
        } else {
            fields.shift_remove(name)
        };
        matches!(previous, Some(v) if !v.is_null())
    }

    fn property_names(&self) -> Vec<String> {
        let fields = self.fields.read().unwrap_or_else(|e| e.into_inner());
        fields.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_record_rejects_unknown_properties() {
        let record = RecordAccessor::with_schema(["id", "name"]);
        assert!(record.set("id", Value::Integer(7)).is_ok());
        assert!(record.set("email", Value::Null).is_err());
        assert_eq!(record.size(), 1);
        assert!(record.remove("id"));
        assert_eq!(record.get("id"), Some(Value::Null));
        assert_eq!(record.property_names(), vec!["id", "name"]);
    }

    #[test]
    fn open_record_drops_removed_properties() {
        let mut fields = Map::new();
        fields.insert("a".to_string(), Value::Integer(1));
        let record = RecordAccessor::new(fields);
        assert!(record.remove("a"));
        assert!(!record.remove("a"));
        assert!(record.property_names().is_empty());
    }
}
