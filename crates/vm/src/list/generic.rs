use fnv::FnvHashMap;
use itertools::Itertools;

use super::{cut_range, find_in, slot, Collection, MAX_LIST_CELLS};
use crate::error::{Result, RuntimeError};
use crate::runtime::Runtime;
use crate::value::Value;

/// The default `/list`: an ordered array part plus a lazily allocated hash part.
///
/// Every key of the hash part is also an element of the array part. The occurrence counts
/// mirror the array part so membership checks don't scan.
#[derive(Clone, Debug, Default)]
pub struct GenericList {
    values: Vec<Value>,
    assoc: Option<FnvHashMap<Value, Value>>,
    counts: FnvHashMap<Value, usize>,
}

impl GenericList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        let mut counts = FnvHashMap::default();
        for value in &values {
            *counts.entry(value.clone()).or_insert(0) += 1;
        }
        GenericList {
            values,
            assoc: None,
            counts,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The array part.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn is_associative(&self) -> bool {
        self.assoc.as_ref().map_or(false, |assoc| !assoc.is_empty())
    }

    /// Hash-part entries in array order, one per distinct key.
    pub fn assoc_entries(&self) -> Vec<(Value, Value)> {
        let assoc = match &self.assoc {
            Some(assoc) => assoc,
            None => return vec![],
        };
        self.values
            .iter()
            .unique()
            .filter_map(|key| assoc.get(key).map(|value| (key.clone(), value.clone())))
            .collect()
    }

    pub fn assoc_get(&self, key: &Value) -> Option<&Value> {
        self.assoc.as_ref().and_then(|assoc| assoc.get(key))
    }

    pub fn get(&self, key: &Value) -> Result<Value> {
        match key.as_index()? {
            Some(index) => Ok(self.values[slot(index, self.values.len())?].clone()),
            None => Ok(self.assoc_get(key).cloned().unwrap_or_default()),
        }
    }

    pub fn set(&mut self, key: &Value, value: Value, allow_growth: bool) -> Result<()> {
        match key.as_index()? {
            Some(index) if allow_growth && index == self.values.len() as i64 + 1 => {
                self.push(value);
                Ok(())
            }
            Some(index) => {
                let i = slot(index, self.values.len())?;
                if self.values[i] == value {
                    return Ok(());
                }
                let old = std::mem::replace(&mut self.values[i], value.clone());
                self.forget_occurrence(&old);
                *self.counts.entry(value).or_insert(0) += 1;
                Ok(())
            }
            None => {
                self.set_assoc(key.clone(), value);
                Ok(())
            }
        }
    }

    /// Upsert into the hash part, appending `key` to the array part first if it is new.
    pub fn set_assoc(&mut self, key: Value, value: Value) {
        if !self.contains(&key) {
            self.push(key.clone());
        }
        self.assoc
            .get_or_insert_with(FnvHashMap::default)
            .insert(key, value);
    }

    pub fn push(&mut self, value: Value) {
        *self.counts.entry(value.clone()).or_insert(0) += 1;
        self.values.push(value);
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.counts.contains_key(value)
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.assoc
            .as_ref()
            .map_or(false, |assoc| assoc.contains_key(key))
    }

    /// Remove the last occurrence of `value`. Returns whether anything was removed.
    pub fn remove(&mut self, value: &Value) -> bool {
        match self.values.iter().rposition(|v| v == value) {
            Some(i) => {
                let removed = self.values.remove(i);
                self.forget_occurrence(&removed);
                true
            }
            None => false,
        }
    }

    pub fn find(&self, value: &Value, start: i64, end: i64) -> usize {
        find_in(&self.values, value, start, end)
    }

    pub fn cut(&mut self, start: i64, end: i64) -> Result<()> {
        let range = cut_range(start, end, self.values.len())?;
        let removed: Vec<_> = self.values.drain(range).collect();
        for value in &removed {
            self.forget_occurrence(value);
        }
        Ok(())
    }

    pub fn insert(&mut self, index: i64, value: Value) -> Result<()> {
        if index < 1 || index > self.values.len() as i64 + 1 {
            return Err(RuntimeError::out_of_bounds(index, self.values.len()));
        }
        *self.counts.entry(value.clone()).or_insert(0) += 1;
        self.values.insert(index as usize - 1, value);
        Ok(())
    }

    pub fn swap(&mut self, a: i64, b: i64) -> Result<()> {
        let a = slot(a, self.values.len())?;
        let b = slot(b, self.values.len())?;
        self.values.swap(a, b);
        Ok(())
    }

    /// Copy `[start, end)` along with the hash entries of every surviving key.
    pub fn copy_range(&self, start: i64, end: i64) -> Result<GenericList> {
        let len = self.values.len() as i64;
        let start = if start == 0 { 1 } else { start };
        if start < 1 || start > len + 1 || end > len + 1 {
            return Err(RuntimeError::out_of_bounds(start.max(end), self.values.len()));
        }
        let end = if end == 0 { len + 1 } else { end };
        if end <= start {
            return Ok(GenericList::new());
        }

        let mut copy =
            GenericList::from_values(self.values[(start - 1) as usize..(end - 1) as usize].to_vec());
        if let Some(assoc) = &self.assoc {
            for (key, value) in assoc {
                if copy.contains(key) {
                    copy.assoc
                        .get_or_insert_with(FnvHashMap::default)
                        .insert(key.clone(), value.clone());
                }
            }
        }
        Ok(copy)
    }

    pub fn resize(&mut self, len: i64) -> Result<()> {
        if len < 0 || len > MAX_LIST_CELLS as i64 {
            return Err(RuntimeError::invalid_arguments(format!(
                "cannot resize a list to {}",
                len
            )));
        }
        let len = len as usize;
        if len > self.values.len() {
            for _ in self.values.len()..len {
                self.push(Value::Null);
            }
            Ok(())
        } else {
            self.cut(len as i64 + 1, 0)
        }
    }

    /// Values of both lists without duplicates, first occurrence first. Hash entries are
    /// merged with `other` winning.
    pub fn union(&self, other: &GenericList) -> GenericList {
        let mut result =
            GenericList::from_values(self.values.iter().chain(&other.values).unique().cloned().collect());
        for (key, value) in self.assoc_entries().into_iter().chain(other.assoc_entries()) {
            result.set_assoc(key, value);
        }
        result
    }

    fn forget_occurrence(&mut self, value: &Value) {
        if let Some(count) = self.counts.get_mut(value) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(value);
                if let Some(assoc) = &mut self.assoc {
                    assoc.remove(value);
                }
            }
        }
    }
}

impl Collection for GenericList {
    fn kind(&self) -> &'static str {
        "list"
    }

    fn is_associative(&self, _rt: &mut Runtime) -> Result<bool> {
        Ok(GenericList::is_associative(self))
    }

    fn values(&self, _rt: &mut Runtime) -> Result<Vec<Value>> {
        Ok(self.values.clone())
    }

    fn len(&self, _rt: &mut Runtime) -> Result<usize> {
        Ok(self.values.len())
    }

    fn get_value(&self, _rt: &mut Runtime, key: &Value) -> Result<Value> {
        self.get(key)
    }

    fn set_value(
        &mut self,
        _rt: &mut Runtime,
        key: &Value,
        value: Value,
        allow_growth: bool,
    ) -> Result<()> {
        self.set(key, value, allow_growth)
    }

    fn add_value(&mut self, _rt: &mut Runtime, value: Value) -> Result<()> {
        self.push(value);
        Ok(())
    }

    fn remove_value(&mut self, _rt: &mut Runtime, value: &Value) -> Result<()> {
        self.remove(value);
        Ok(())
    }

    fn contains_value(&self, _rt: &mut Runtime, value: &Value) -> Result<bool> {
        Ok(self.contains(value))
    }

    fn contains_key(&self, _rt: &mut Runtime, key: &Value) -> Result<bool> {
        Ok(GenericList::contains_key(self, key))
    }

    fn assoc_value(&self, _rt: &mut Runtime, key: &Value) -> Result<Option<Value>> {
        Ok(self.assoc_get(key).cloned())
    }

    fn find_value(&self, _rt: &mut Runtime, value: &Value, start: i64, end: i64) -> Result<usize> {
        Ok(self.find(value, start, end))
    }

    fn cut(&mut self, _rt: &mut Runtime, start: i64, end: i64) -> Result<()> {
        GenericList::cut(self, start, end)
    }

    fn insert(&mut self, _rt: &mut Runtime, index: i64, value: Value) -> Result<()> {
        GenericList::insert(self, index, value)
    }

    fn swap(&mut self, _rt: &mut Runtime, a: i64, b: i64) -> Result<()> {
        GenericList::swap(self, a, b)
    }

    fn create_copy(&self, _rt: &mut Runtime, start: i64, end: i64) -> Result<GenericList> {
        self.copy_range(start, end)
    }

    fn resize(&mut self, _rt: &mut Runtime, len: i64) -> Result<()> {
        GenericList::resize(self, len)
    }
}
