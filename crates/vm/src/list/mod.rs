//! The collection interface shared by every list-shaped object, and its backing stores.
//!
//! Scripts only ever see `/list` objects. What backs one is picked when the list is created:
//! a [`GenericList`] owning its storage, or a view that reads and writes some other store
//! (object variables, appearances, the map, a call frame...).

pub mod appearance;
pub mod args;
pub mod assoc;
pub mod client;
pub mod contents;
pub mod generic;
pub mod savefile;
pub mod vars;
pub mod verbs;

#[cfg(test)]
mod test;

use std::cell::{Ref, RefCell, RefMut};
use std::ops::Range;
use std::rc::Rc;

pub use assoc::AssocList;
pub use generic::GenericList;

use crate::error::{Result, RuntimeError};
use crate::object::{DreamObject, ObjectId, ObjectKind};
use crate::runtime::Runtime;
use crate::value::Value;

/// Upper bound on the nulls and nested lists `list(a, b, ...)` may allocate.
pub const MAX_LIST_CELLS: usize = 1 << 24;

/// Operations every list-shaped object supports.
///
/// Indices are 1-based. A variant only overrides what its backing store changes; the defaults
/// read through [`values`](Collection::values) and refuse structural writes with
/// [`RuntimeError::NotSupported`].
///
/// Every method takes the runtime: views forward to engine stores, and some reads allocate
/// objects.
pub trait Collection {
    /// Name used in error messages.
    fn kind(&self) -> &'static str;

    /// The array part, in order.
    fn values(&self, rt: &mut Runtime) -> Result<Vec<Value>>;

    fn len(&self, rt: &mut Runtime) -> Result<usize> {
        Ok(self.values(rt)?.len())
    }

    fn is_associative(&self, _rt: &mut Runtime) -> Result<bool> {
        Ok(false)
    }

    /// Integer keys index the array part and fail out of range; other keys read the hash part
    /// and yield `Null` on a miss.
    fn get_value(&self, rt: &mut Runtime, key: &Value) -> Result<Value> {
        match key.as_index()? {
            Some(index) => {
                let values = self.values(rt)?;
                Ok(values[slot(index, values.len())?].clone())
            }
            None => Err(RuntimeError::InvalidIndex(key.to_string())),
        }
    }

    fn set_value(
        &mut self,
        _rt: &mut Runtime,
        _key: &Value,
        _value: Value,
        _allow_growth: bool,
    ) -> Result<()> {
        Err(RuntimeError::not_supported("index assignment", self.kind()))
    }

    fn add_value(&mut self, _rt: &mut Runtime, _value: Value) -> Result<()> {
        Err(RuntimeError::not_supported("adding values", self.kind()))
    }

    /// Removes the last occurrence of `value`.
    fn remove_value(&mut self, _rt: &mut Runtime, _value: &Value) -> Result<()> {
        Err(RuntimeError::not_supported("removing values", self.kind()))
    }

    /// Array-part membership.
    fn contains_value(&self, rt: &mut Runtime, value: &Value) -> Result<bool> {
        Ok(self.values(rt)?.contains(value))
    }

    /// Hash-part membership.
    fn contains_key(&self, _rt: &mut Runtime, _key: &Value) -> Result<bool> {
        Ok(false)
    }

    /// Hash-part lookup that never interprets `key` as an index.
    fn assoc_value(&self, _rt: &mut Runtime, _key: &Value) -> Result<Option<Value>> {
        Ok(None)
    }

    /// 1-based position of the first match in `[start, end)`, or 0.
    fn find_value(&self, rt: &mut Runtime, value: &Value, start: i64, end: i64) -> Result<usize> {
        Ok(find_in(&self.values(rt)?, value, start, end))
    }

    /// Remove `[start, end)`. `end == 0` reaches the end of the list.
    fn cut(&mut self, _rt: &mut Runtime, _start: i64, _end: i64) -> Result<()> {
        Err(RuntimeError::not_supported("cut", self.kind()))
    }

    fn insert(&mut self, _rt: &mut Runtime, _index: i64, _value: Value) -> Result<()> {
        Err(RuntimeError::not_supported("insert", self.kind()))
    }

    fn swap(&mut self, rt: &mut Runtime, a: i64, b: i64) -> Result<()> {
        let (a, b) = (Value::from(a as f32), Value::from(b as f32));
        let first = self.get_value(rt, &a)?;
        let second = self.get_value(rt, &b)?;
        self.set_value(rt, &a, second, false)?;
        self.set_value(rt, &b, first, false)
    }

    fn resize(&mut self, _rt: &mut Runtime, _len: i64) -> Result<()> {
        Err(RuntimeError::not_supported("resizing", self.kind()))
    }

    /// An independent generic list holding `[start, end)` and the hash entries of the keys
    /// that survived.
    fn create_copy(&self, rt: &mut Runtime, start: i64, end: i64) -> Result<GenericList> {
        let mut copy = GenericList::from_values(self.values(rt)?).copy_range(start, end)?;
        if self.is_associative(rt)? {
            for key in copy.values().to_vec() {
                if let Some(value) = self.assoc_value(rt, &key)? {
                    copy.set_assoc(key, value);
                }
            }
        }
        Ok(copy)
    }

    /// Drop any reference the backing store keeps to a deleted object.
    fn forget(&mut self, _object: ObjectId) {}
}

/// 0-based slot of a 1-based index into a sequence of `len` elements.
pub(crate) fn slot(index: i64, len: usize) -> Result<usize> {
    if index < 1 || index > len as i64 {
        return Err(RuntimeError::out_of_bounds(index, len));
    }
    Ok(index as usize - 1)
}

/// 0-based range removed by `cut(start, end)` on a sequence of `len` elements.
pub(crate) fn cut_range(start: i64, end: i64, len: usize) -> Result<Range<usize>> {
    let past_end = len as i64 + 1;
    let end = if end == 0 || end > past_end { past_end } else { end };
    if start < 1 || start > past_end {
        return Err(RuntimeError::out_of_bounds(start, len));
    }
    if end <= start {
        return Ok(0..0);
    }
    Ok(start as usize - 1..end as usize - 1)
}

pub(crate) fn find_in<T: PartialEq>(values: &[T], value: &T, start: i64, end: i64) -> usize {
    let past_end = values.len() as i64 + 1;
    let end = if end == 0 || end > past_end - 1 { past_end } else { end };
    let start = start.max(1);
    (start..end)
        .find(|&i| values[i as usize - 1] == *value)
        .map_or(0, |i| i as usize)
}

/// A live handle to a list object.
///
/// Holds the object itself so it can be used while the runtime is borrowed mutably.
#[derive(Clone)]
pub struct ListRef {
    id: ObjectId,
    object: Rc<DreamObject>,
}

impl ListRef {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn value(&self) -> Value {
        Value::Object(self.id)
    }

    fn read(&self) -> Result<Ref<'_, dyn Collection + 'static>> {
        if self.object.is_deleted() {
            return Err(RuntimeError::DeletedObject);
        }
        self.object.collection()
    }

    fn write(&self) -> Result<RefMut<'_, dyn Collection + 'static>> {
        if self.object.is_deleted() {
            return Err(RuntimeError::DeletedObject);
        }
        self.object.collection_mut()
    }

    pub fn kind(&self) -> Result<&'static str> {
        Ok(self.read()?.kind())
    }

    pub fn len(&self, rt: &mut Runtime) -> Result<usize> {
        self.read()?.len(rt)
    }

    pub fn values(&self, rt: &mut Runtime) -> Result<Vec<Value>> {
        self.read()?.values(rt)
    }

    pub fn is_associative(&self, rt: &mut Runtime) -> Result<bool> {
        self.read()?.is_associative(rt)
    }

    pub fn get(&self, rt: &mut Runtime, key: &Value) -> Result<Value> {
        self.read()?.get_value(rt, key)
    }

    /// Index assignment as scripts perform it: no implicit growth.
    pub fn set(&self, rt: &mut Runtime, key: &Value, value: Value) -> Result<()> {
        self.write()?.set_value(rt, key, value, false)
    }

    pub fn set_value(
        &self,
        rt: &mut Runtime,
        key: &Value,
        value: Value,
        allow_growth: bool,
    ) -> Result<()> {
        self.write()?.set_value(rt, key, value, allow_growth)
    }

    pub fn add(&self, rt: &mut Runtime, value: Value) -> Result<()> {
        self.write()?.add_value(rt, value)
    }

    pub fn remove(&self, rt: &mut Runtime, value: &Value) -> Result<()> {
        self.write()?.remove_value(rt, value)
    }

    pub fn contains(&self, rt: &mut Runtime, value: &Value) -> Result<bool> {
        self.read()?.contains_value(rt, value)
    }

    pub fn contains_key(&self, rt: &mut Runtime, key: &Value) -> Result<bool> {
        self.read()?.contains_key(rt, key)
    }

    pub fn assoc_value(&self, rt: &mut Runtime, key: &Value) -> Result<Option<Value>> {
        self.read()?.assoc_value(rt, key)
    }

    pub fn find(&self, rt: &mut Runtime, value: &Value, start: i64, end: i64) -> Result<usize> {
        self.read()?.find_value(rt, value, start, end)
    }

    pub fn cut(&self, rt: &mut Runtime, start: i64, end: i64) -> Result<()> {
        self.write()?.cut(rt, start, end)
    }

    pub fn insert(&self, rt: &mut Runtime, index: i64, value: Value) -> Result<()> {
        self.write()?.insert(rt, index, value)
    }

    pub fn swap(&self, rt: &mut Runtime, a: i64, b: i64) -> Result<()> {
        self.write()?.swap(rt, a, b)
    }

    pub fn resize(&self, rt: &mut Runtime, len: i64) -> Result<()> {
        self.write()?.resize(rt, len)
    }

    /// Snapshot of `[start, end)` as a detached generic list.
    pub fn snapshot(&self, rt: &mut Runtime, start: i64, end: i64) -> Result<GenericList> {
        self.read()?.create_copy(rt, start, end)
    }

    /// Copy `[start, end)` into a new list object.
    pub fn copy(&self, rt: &mut Runtime, start: i64, end: i64) -> Result<ListRef> {
        let copy = self.snapshot(rt, start, end)?;
        Ok(rt.new_list_with(copy))
    }

    /// Hash-part entries in array order.
    pub fn assoc_entries(&self, rt: &mut Runtime) -> Result<Vec<(Value, Value)>> {
        let list = self.read()?;
        if !list.is_associative(rt)? {
            return Ok(vec![]);
        }
        let mut entries = vec![];
        for key in list.values(rt)? {
            if entries.iter().any(|(k, _)| *k == key) {
                continue;
            }
            if let Some(value) = list.assoc_value(rt, &key)? {
                entries.push((key, value));
            }
        }
        Ok(entries)
    }

    pub(crate) fn forget(&self, object: ObjectId) {
        match self.write() {
            Ok(mut list) => list.forget(object),
            Err(_) => tracing::warn!(list = ?self.id, ?object, "list in use; deleted object not forgotten"),
        }
    }
}

impl Runtime {
    pub fn new_list(&mut self) -> ListRef {
        self.new_list_with(GenericList::new())
    }

    pub fn new_list_from(&mut self, values: impl IntoIterator<Item = Value>) -> ListRef {
        self.new_list_with(GenericList::from_values(values.into_iter().collect()))
    }

    /// An associative-only list, e.g. for named arguments.
    pub fn new_assoc_list(&mut self, pairs: impl IntoIterator<Item = (Value, Value)>) -> ListRef {
        self.new_list_with(AssocList::from_pairs(pairs))
    }

    pub fn new_list_with(&mut self, collection: impl Collection + 'static) -> ListRef {
        self.new_list_boxed(Box::new(collection))
    }

    pub(crate) fn new_list_boxed(&mut self, collection: Box<dyn Collection>) -> ListRef {
        let object = Rc::new(DreamObject::new(
            self.list_type().clone(),
            ObjectKind::List(RefCell::new(collection)),
        ));
        let id = self.insert_object(object.clone());
        ListRef { id, object }
    }

    /// `list(a, b, ...)` with numeric arguments: nested lists of nulls, one level per
    /// dimension.
    pub fn new_list_dimensions(&mut self, dimensions: &[Value]) -> Result<ListRef> {
        let mut sizes = Vec::with_capacity(dimensions.len());
        let mut total = 1usize;
        for dimension in dimensions {
            let size = match dimension.as_float() {
                Some(size) if size.is_finite() && size >= 0.0 && size <= MAX_LIST_CELLS as f32 => {
                    size as usize
                }
                _ => {
                    return Err(RuntimeError::invalid_arguments(format!(
                        "invalid list dimension {}",
                        dimension
                    )))
                }
            };
            total = total.saturating_mul(size.max(1));
            if total > MAX_LIST_CELLS {
                return Err(RuntimeError::invalid_arguments(format!(
                    "list dimensions exceed {} cells",
                    MAX_LIST_CELLS
                )));
            }
            sizes.push(size);
        }
        self.build_list_dimensions(&sizes)
    }

    fn build_list_dimensions(&mut self, sizes: &[usize]) -> Result<ListRef> {
        let (&size, rest) = match sizes.split_first() {
            Some(split) => split,
            None => return Ok(self.new_list()),
        };
        let mut values = vec![];
        for _ in 0..size {
            if rest.is_empty() {
                values.push(Value::Null);
            } else {
                values.push(self.build_list_dimensions(rest)?.value());
            }
        }
        Ok(self.new_list_from(values))
    }

    pub fn list(&self, id: ObjectId) -> Result<ListRef> {
        let object = self.object(id)?;
        if !object.is_list() {
            return Err(RuntimeError::TypeCast {
                value: object.def.path.to_string(),
                expected: "list",
            });
        }
        Ok(ListRef { id, object })
    }

    /// The list a value refers to; anything else is a type-cast error.
    pub fn as_list(&self, value: &Value) -> Result<ListRef> {
        match value {
            Value::Object(id) => self.list(*id),
            _ => Err(RuntimeError::TypeCast {
                value: value.to_string(),
                expected: "list",
            }),
        }
    }

    pub fn try_as_list(&self, value: &Value) -> Option<ListRef> {
        self.as_list(value).ok()
    }
}
