//! Views onto the overlay, underlay and filter lists of an atom's appearance.
//!
//! Every write goes through [`AppearanceStore::update`](crate::appearance::AppearanceStore::update),
//! so shared records are never touched and the rendering layer sees each change.

use std::cell::RefCell;

use fnv::FnvHashMap;
use smol_str::SmolStr;

use super::{cut_range, find_in, slot, Collection};
use crate::appearance::{type_appearance, Appearance, AppearanceRef, Filter};
use crate::error::{Result, RuntimeError};
use crate::object::{DreamObject, ObjectId, ObjectKind};
use crate::runtime::Runtime;
use crate::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Overlays,
    Underlays,
}

impl Layer {
    fn name(self) -> &'static str {
        match self {
            Layer::Overlays => "overlay",
            Layer::Underlays => "underlay",
        }
    }

    fn of(self, appearance: &Appearance) -> &Vec<AppearanceRef> {
        match self {
            Layer::Overlays => &appearance.overlays,
            Layer::Underlays => &appearance.underlays,
        }
    }

    fn of_mut(self, appearance: &mut Appearance) -> &mut Vec<AppearanceRef> {
        match self {
            Layer::Overlays => &mut appearance.overlays,
            Layer::Underlays => &mut appearance.underlays,
        }
    }
}

pub struct OverlaysList {
    atom: ObjectId,
    layer: Layer,
}

impl OverlaysList {
    pub fn new(atom: ObjectId, layer: Layer) -> Self {
        OverlaysList { atom, layer }
    }

    fn current(&self, rt: &Runtime) -> Vec<AppearanceRef> {
        self.layer
            .of(&rt.appearances.get_appearance(self.atom))
            .clone()
    }
}

impl Collection for OverlaysList {
    fn kind(&self) -> &'static str {
        match self.layer {
            Layer::Overlays => "overlays",
            Layer::Underlays => "underlays",
        }
    }

    fn values(&self, rt: &mut Runtime) -> Result<Vec<Value>> {
        Ok(self.current(rt).into_iter().map(Value::Appearance).collect())
    }

    fn get_value(&self, rt: &mut Runtime, key: &Value) -> Result<Value> {
        let index = key
            .as_index()?
            .ok_or_else(|| RuntimeError::InvalidIndex(key.to_string()))?;
        let current = self.current(rt);
        if index < 1 || index > current.len() as i64 {
            return Err(RuntimeError::invalid_arguments(format!(
                "atom only has {} {}(s)",
                current.len(),
                self.layer.name()
            )));
        }
        Ok(Value::Appearance(current[index as usize - 1].clone()))
    }

    fn add_value(&mut self, rt: &mut Runtime, value: Value) -> Result<()> {
        if let Some(overlay) = rt.overlay_appearance(self.atom, &value)? {
            self.layer.of_mut(&mut rt.appearances.update(self.atom)).push(overlay);
            tracing::trace!(atom = ?self.atom, layer = self.layer.name(), "overlay added");
        }
        Ok(())
    }

    fn remove_value(&mut self, rt: &mut Runtime, value: &Value) -> Result<()> {
        if let Some(overlay) = rt.overlay_appearance(self.atom, value)? {
            let mut appearance = rt.appearances.update(self.atom);
            let overlays = self.layer.of_mut(&mut appearance);
            if let Some(i) = overlays.iter().rposition(|o| *o == overlay) {
                overlays.remove(i);
            }
        }
        Ok(())
    }

    fn cut(&mut self, rt: &mut Runtime, start: i64, end: i64) -> Result<()> {
        let mut appearance = rt.appearances.update(self.atom);
        let overlays = self.layer.of_mut(&mut appearance);
        let range = cut_range(start, end, overlays.len())?;
        overlays.drain(range);
        Ok(())
    }
}

/// An atom's filters. Reads hand out the filter object attached to each slot; writing a var
/// of one of those updates that slot on the atom.
pub struct FiltersList {
    atom: ObjectId,
}

impl FiltersList {
    pub fn new(atom: ObjectId) -> Self {
        FiltersList { atom }
    }

    fn current(&self, rt: &Runtime) -> Vec<Filter> {
        rt.appearances.get_appearance(self.atom).filters.clone()
    }
}

impl Collection for FiltersList {
    fn kind(&self) -> &'static str {
        "filters"
    }

    fn values(&self, rt: &mut Runtime) -> Result<Vec<Value>> {
        let current = self.current(rt);
        rt.prune_filter_objects(self.atom, current.len());
        current
            .into_iter()
            .enumerate()
            .map(|(slot, filter)| Ok(Value::Object(rt.attach_filter(self.atom, slot, filter)?)))
            .collect()
    }

    fn len(&self, rt: &mut Runtime) -> Result<usize> {
        Ok(rt.appearances.get_appearance(self.atom).filters.len())
    }

    fn get_value(&self, rt: &mut Runtime, key: &Value) -> Result<Value> {
        let current = self.current(rt);
        rt.prune_filter_objects(self.atom, current.len());
        let position = match key {
            Value::String(name) => current.iter().position(|f| f.name.as_ref() == Some(name)),
            _ => match key.as_index()? {
                Some(index) => Some(slot(index, current.len())?),
                None => return Err(RuntimeError::InvalidIndex(key.to_string())),
            },
        };
        match position {
            Some(i) => Ok(Value::Object(rt.attach_filter(self.atom, i, current[i].clone())?)),
            None => Ok(Value::Null),
        }
    }

    fn set_value(
        &mut self,
        rt: &mut Runtime,
        key: &Value,
        value: Value,
        _allow_growth: bool,
    ) -> Result<()> {
        let index = key
            .as_index()?
            .ok_or_else(|| RuntimeError::InvalidIndex(key.to_string()))?;
        let replacement = match &value {
            Value::Null => None,
            value => Some(rt.must_get_filter(value)?),
        };
        let mut appearance = rt.appearances.update(self.atom);
        let i = slot(index, appearance.filters.len())?;
        match replacement {
            Some(filter) => appearance.filters[i] = filter,
            None => {
                appearance.filters.remove(i);
            }
        }
        Ok(())
    }

    fn add_value(&mut self, rt: &mut Runtime, value: Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let filter = rt.must_get_filter(&value)?;
        rt.appearances.update(self.atom).filters.push(filter);
        Ok(())
    }

    fn remove_value(&mut self, rt: &mut Runtime, value: &Value) -> Result<()> {
        let filter = match value {
            Value::String(_) => None,
            value => Some(rt.must_get_filter(value)?),
        };
        let mut appearance = rt.appearances.update(self.atom);
        let position = match (&filter, value) {
            (Some(filter), _) => appearance.filters.iter().rposition(|f| f == filter),
            (None, Value::String(name)) => appearance
                .filters
                .iter()
                .rposition(|f| f.name.as_ref() == Some(name)),
            _ => None,
        };
        if let Some(i) = position {
            appearance.filters.remove(i);
        }
        Ok(())
    }

    fn contains_value(&self, rt: &mut Runtime, value: &Value) -> Result<bool> {
        Ok(match rt.filter_of(value) {
            Some(filter) => self.current(rt).contains(&filter),
            None => false,
        })
    }

    fn find_value(&self, rt: &mut Runtime, value: &Value, start: i64, end: i64) -> Result<usize> {
        let filter = match rt.filter_of(value) {
            Some(filter) => filter,
            None => return Ok(0),
        };
        Ok(find_in(&self.current(rt), &filter, start, end))
    }

    fn cut(&mut self, rt: &mut Runtime, start: i64, end: i64) -> Result<()> {
        let mut appearance = rt.appearances.update(self.atom);
        let range = cut_range(start, end, appearance.filters.len())?;
        appearance.filters.drain(range);
        Ok(())
    }
}

/// Which filter object stands for which slot of an atom's filters.
#[derive(Default)]
pub struct FilterAttachments {
    slots: FnvHashMap<ObjectId, (ObjectId, usize)>,
    objects: FnvHashMap<(ObjectId, usize), ObjectId>,
}

impl FilterAttachments {
    fn attach(&mut self, filter: ObjectId, atom: ObjectId, slot: usize) {
        self.slots.insert(filter, (atom, slot));
        self.objects.insert((atom, slot), filter);
    }

    fn object_at(&self, atom: ObjectId, slot: usize) -> Option<ObjectId> {
        self.objects.get(&(atom, slot)).copied()
    }

    /// The atom and slot a filter object is attached to.
    pub fn slot_of(&self, filter: ObjectId) -> Option<(ObjectId, usize)> {
        self.slots.get(&filter).copied()
    }

    /// Number of attached filter objects.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Filter objects of `atom` at `len` or past it.
    pub(crate) fn stale(&self, atom: ObjectId, len: usize) -> Vec<ObjectId> {
        self.objects
            .iter()
            .filter(|((a, slot), _)| *a == atom && *slot >= len)
            .map(|(_, &filter)| filter)
            .collect()
    }

    /// Forget a filter object.
    pub(crate) fn detach(&mut self, filter: ObjectId) {
        if let Some(key) = self.slots.remove(&filter) {
            self.objects.remove(&key);
        }
    }
}

impl Runtime {
    /// `filter(type = ..., ...)`: a detached filter object.
    pub fn new_filter(&mut self, kind: &str, params: Vec<(SmolStr, Value)>) -> Result<ObjectId> {
        let mut filter = Filter::new(kind);
        for (name, value) in params {
            match name.as_str() {
                "name" => filter.name = value.try_get_as::<SmolStr>(),
                _ => filter.set_param(&name, value),
            }
        }
        let def = self.tree.get("/dm_filter")?;
        let object = DreamObject::new(def, ObjectKind::Filter(RefCell::new(filter)));
        Ok(self.insert_object(object.into()))
    }

    /// The filter object standing for `atom`'s filter at `slot`. The same object is handed
    /// out on every read of that slot and is refreshed when the slot's filter changed.
    pub(crate) fn attach_filter(&mut self, atom: ObjectId, slot: usize, filter: Filter) -> Result<ObjectId> {
        if let Some(id) = self.filters.object_at(atom, slot) {
            if let Ok(object) = self.object(id) {
                if let ObjectKind::Filter(cell) = &object.kind {
                    if *cell.borrow() != filter {
                        *cell.borrow_mut() = filter;
                    }
                    return Ok(id);
                }
            }
        }
        let def = self.tree.get("/dm_filter")?;
        let object = DreamObject::new(def, ObjectKind::Filter(RefCell::new(filter)));
        let id = self.insert_object(object.into());
        self.filters.attach(id, atom, slot);
        tracing::trace!(?atom, slot, filter = ?id, "filter attached");
        Ok(id)
    }

    /// Delete the filter objects of `atom` whose slot no longer exists.
    pub(crate) fn prune_filter_objects(&mut self, atom: ObjectId, len: usize) {
        for id in self.filters.stale(atom, len) {
            self.delete(id);
        }
    }

    /// The filter a filter object holds.
    pub fn filter_of(&self, value: &Value) -> Option<Filter> {
        let object = self.object(value.as_object()?).ok()?;
        match &object.kind {
            ObjectKind::Filter(filter) => Some(filter.borrow().clone()),
            _ => None,
        }
    }

    fn must_get_filter(&self, value: &Value) -> Result<Filter> {
        self.filter_of(value).ok_or_else(|| RuntimeError::TypeCast {
            value: value.to_string(),
            expected: "filter",
        })
    }

    /// Edit a filter object. If it is attached to an atom, the atom's copy of the filter is
    /// replaced too.
    pub(crate) fn update_filter(&mut self, id: ObjectId, edit: impl FnOnce(&mut Filter)) -> Result<()> {
        let object = self.object(id)?;
        let cell = match &object.kind {
            ObjectKind::Filter(cell) => cell,
            _ => {
                return Err(RuntimeError::TypeCast {
                    value: object.def.path.to_string(),
                    expected: "filter",
                })
            }
        };
        let old = cell.borrow().clone();
        edit(&mut cell.borrow_mut());
        let new = cell.borrow().clone();

        if let Some((atom, slot)) = self.filters.slot_of(id) {
            let mut appearance = self.appearances.update(atom);
            if let Some(filter) = appearance.filters.get_mut(slot) {
                if *filter == old {
                    *filter = new;
                }
            }
        }
        Ok(())
    }

    /// What adding `value` to `atom`'s overlays adds. `None` for `null`.
    fn overlay_appearance(&mut self, atom: ObjectId, value: &Value) -> Result<Option<AppearanceRef>> {
        let appearance = match value {
            Value::Null => return Ok(None),
            Value::Appearance(appearance) => return Ok(Some(appearance.clone())),
            Value::Object(id) => {
                let object = self.object(*id)?;
                if object.atom().is_none() {
                    return Err(RuntimeError::TypeCast {
                        value: object.def.path.to_string(),
                        expected: "atom or image",
                    });
                }
                return Ok(Some(self.appearances.get_appearance(*id)));
            }
            Value::Type(def) => type_appearance(def),
            Value::Resource(resource) => Appearance {
                icon: Some(
                    resource
                        .path
                        .clone()
                        .unwrap_or_else(|| SmolStr::new(resource.id.to_string())),
                ),
                ..Appearance::default()
            },
            Value::String(state) => Appearance {
                icon: self.appearances.get_appearance(atom).icon.clone(),
                icon_state: Some(state.clone()),
                ..Appearance::default()
            },
            other => {
                return Err(RuntimeError::TypeCast {
                    value: other.to_string(),
                    expected: "overlay",
                })
            }
        };
        Ok(Some(self.appearances.add_appearance(appearance)))
    }
}
