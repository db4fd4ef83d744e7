use fnv::FnvHashMap;

use super::{cut_range, slot, Collection};
use crate::error::{Result, RuntimeError};
use crate::runtime::Runtime;
use crate::value::Value;

/// An ordered key to value map whose array part is its key set, e.g. named arguments.
#[derive(Clone, Debug, Default)]
pub struct AssocList {
    keys: Vec<Value>,
    entries: FnvHashMap<Value, Value>,
}

impl AssocList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from pairs in order. A repeated key keeps its first position and its last value.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mut list = AssocList::new();
        for (key, value) in pairs {
            list.insert(key, value);
        }
        list
    }

    pub fn insert(&mut self, key: Value, value: Value) {
        if !self.entries.contains_key(&key) {
            self.keys.push(key.clone());
        }
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> &[Value] {
        &self.keys
    }
}

impl Collection for AssocList {
    fn kind(&self) -> &'static str {
        "associative list"
    }

    fn values(&self, _rt: &mut Runtime) -> Result<Vec<Value>> {
        Ok(self.keys.clone())
    }

    fn len(&self, _rt: &mut Runtime) -> Result<usize> {
        Ok(self.keys.len())
    }

    fn is_associative(&self, _rt: &mut Runtime) -> Result<bool> {
        Ok(!self.keys.is_empty())
    }

    fn get_value(&self, _rt: &mut Runtime, key: &Value) -> Result<Value> {
        match key.as_index()? {
            Some(index) => Ok(self.keys[slot(index, self.keys.len())?].clone()),
            None => Ok(self.entries.get(key).cloned().unwrap_or_default()),
        }
    }

    fn set_value(
        &mut self,
        _rt: &mut Runtime,
        key: &Value,
        value: Value,
        _allow_growth: bool,
    ) -> Result<()> {
        if key.as_index()?.is_some() {
            return Err(RuntimeError::InvalidIndex(key.to_string()));
        }
        self.insert(key.clone(), value);
        Ok(())
    }

    fn add_value(&mut self, _rt: &mut Runtime, value: Value) -> Result<()> {
        if !self.entries.contains_key(&value) {
            self.insert(value, Value::Null);
        }
        Ok(())
    }

    fn remove_value(&mut self, _rt: &mut Runtime, value: &Value) -> Result<()> {
        if self.entries.remove(value).is_some() {
            self.keys.retain(|k| k != value);
        }
        Ok(())
    }

    fn contains_value(&self, _rt: &mut Runtime, value: &Value) -> Result<bool> {
        Ok(self.entries.contains_key(value))
    }

    fn contains_key(&self, _rt: &mut Runtime, key: &Value) -> Result<bool> {
        Ok(self.entries.contains_key(key))
    }

    fn assoc_value(&self, _rt: &mut Runtime, key: &Value) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn cut(&mut self, _rt: &mut Runtime, start: i64, end: i64) -> Result<()> {
        let range = cut_range(start, end, self.keys.len())?;
        for key in self.keys.drain(range) {
            self.entries.remove(&key);
        }
        Ok(())
    }
}
