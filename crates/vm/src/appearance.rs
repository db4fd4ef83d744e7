//! Interned visual state of atoms.
//!
//! Appearances are immutable once interned and shared between every atom that looks the same.
//! Changes go through [`AppearanceMut`], which builds a new record and swaps it in.

use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use dreamrt_util::by_ptr::ByPtr;
use fnv::FnvHashSet;
use slotmap::SecondaryMap;
use smol_str::SmolStr;

use crate::object::ObjectId;
use crate::tree::{ObjectDefinition, ProcRef};
use crate::value::Value;

pub type AppearanceRef = ByPtr<Rc<Appearance>>;

/// Direction an atom faces when nothing says otherwise.
pub const SOUTH: u8 = 2;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Appearance {
    pub name: Option<SmolStr>,
    pub icon: Option<SmolStr>,
    pub icon_state: Option<SmolStr>,
    pub direction: u8,
    pub transform: Transform,
    pub overlays: Vec<AppearanceRef>,
    pub underlays: Vec<AppearanceRef>,
    pub filters: Vec<Filter>,
    pub verbs: Vec<ProcRef>,
}

impl Default for Appearance {
    fn default() -> Self {
        Appearance {
            name: None,
            icon: None,
            icon_state: None,
            direction: SOUTH,
            transform: Transform::default(),
            overlays: vec![],
            underlays: vec![],
            filters: vec![],
            verbs: vec![],
        }
    }
}

/// The appearance a fresh instance of `def` starts with, taken from its `name`, `icon`,
/// `icon_state` and `dir` defaults. An unnamed type is named after the last segment of its path.
pub fn type_appearance(def: &ObjectDefinition) -> Appearance {
    let text = |var: &str| match def.default_value(var) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Resource(r)) => r.path.clone(),
        _ => None,
    };
    Appearance {
        name: text("name").or_else(|| def.path.rsplit('/').next().map(SmolStr::new)),
        icon: text("icon"),
        icon_state: text("icon_state"),
        direction: def
            .default_value("dir")
            .and_then(Value::as_float)
            .map_or(SOUTH, |dir| dir as u8),
        ..Appearance::default()
    }
}

/// Affine transform in `[a, d, b, e, c, f]` order.
#[derive(Clone, Copy, Debug)]
pub struct Transform(pub [f32; 6]);

impl Default for Transform {
    fn default() -> Self {
        Transform([1.0, 0.0, 0.0, 1.0, 0.0, 0.0])
    }
}

impl PartialEq for Transform {
    fn eq(&self, other: &Self) -> bool {
        self.0.map(f32::to_bits) == other.0.map(f32::to_bits)
    }
}

impl Eq for Transform {}

impl Hash for Transform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.map(f32::to_bits).hash(state)
    }
}

/// A visual filter attached to an appearance.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Filter {
    pub kind: SmolStr,
    pub name: Option<SmolStr>,
    pub params: Vec<(SmolStr, Value)>,
}

impl Filter {
    pub fn new(kind: impl Into<SmolStr>) -> Self {
        Filter {
            kind: kind.into(),
            name: None,
            params: vec![],
        }
    }

    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn set_param(&mut self, name: &str, value: Value) {
        match self.params.iter_mut().find(|(k, _)| k == name) {
            Some((_, slot)) => *slot = value,
            None => self.params.push((name.into(), value)),
        }
    }
}

/// An atom's appearance changed; the rendering layer picks these up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppearanceUpdate {
    pub atom: ObjectId,
    pub appearance: AppearanceRef,
}

pub struct AppearanceStore {
    interned: FnvHashSet<Rc<Appearance>>,
    atoms: SecondaryMap<ObjectId, AppearanceRef>,
    default: AppearanceRef,
    updates: Vec<AppearanceUpdate>,
}

impl AppearanceStore {
    pub fn new() -> Self {
        let mut store = AppearanceStore {
            interned: FnvHashSet::default(),
            atoms: SecondaryMap::new(),
            default: ByPtr::alloc(Appearance::default()),
            updates: vec![],
        };
        store.default = store.add_appearance(Appearance::default());
        store
    }

    /// Intern `appearance`, returning the shared record equal to it.
    pub fn add_appearance(&mut self, appearance: Appearance) -> AppearanceRef {
        if let Some(existing) = self.interned.get(&appearance) {
            return ByPtr::new(existing.clone());
        }
        let appearance = Rc::new(appearance);
        self.interned.insert(appearance.clone());
        ByPtr::new(appearance)
    }

    /// The atom's current appearance, or the default one.
    pub fn get_appearance(&self, atom: ObjectId) -> AppearanceRef {
        self.atoms
            .get(atom)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    pub fn set_appearance(&mut self, atom: ObjectId, appearance: Appearance) -> AppearanceRef {
        let appearance = self.add_appearance(appearance);
        let previous = self.atoms.insert(atom, appearance.clone());
        if previous.as_ref() != Some(&appearance) {
            tracing::trace!(?atom, "appearance changed");
            self.updates.push(AppearanceUpdate {
                atom,
                appearance: appearance.clone(),
            });
        }
        appearance
    }

    /// Start editing the atom's appearance. Changes land when the guard is committed or
    /// dropped.
    pub fn update(&mut self, atom: ObjectId) -> AppearanceMut<'_> {
        let original = self.get_appearance(atom);
        let draft = Appearance::clone(&original);
        AppearanceMut {
            store: self,
            atom,
            original,
            draft,
            finished: false,
        }
    }

    pub fn take_updates(&mut self) -> Vec<AppearanceUpdate> {
        std::mem::take(&mut self.updates)
    }

    pub(crate) fn remove_atom(&mut self, atom: ObjectId) {
        self.atoms.remove(atom);
    }

    /// Drop interned records nothing refers to. Returns how many were dropped.
    pub fn prune(&mut self) -> usize {
        let before = self.interned.len();
        loop {
            let len = self.interned.len();
            self.interned.retain(|a| Rc::strong_count(a) > 1);
            if self.interned.len() == len {
                break;
            }
        }
        before - self.interned.len()
    }

    pub fn interned_count(&self) -> usize {
        self.interned.len()
    }
}

impl Default for AppearanceStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A pending edit of one atom's appearance.
///
/// Derefs to a private copy of the appearance. The copy is interned and assigned to the atom
/// on [`commit`](AppearanceMut::commit) or drop; [`discard`](AppearanceMut::discard) throws it
/// away. An edit that leaves the appearance equal to the original changes nothing.
pub struct AppearanceMut<'a> {
    store: &'a mut AppearanceStore,
    atom: ObjectId,
    original: AppearanceRef,
    draft: Appearance,
    finished: bool,
}

impl<'a> AppearanceMut<'a> {
    pub fn commit(mut self) -> AppearanceRef {
        self.finish()
    }

    pub fn discard(mut self) {
        self.finished = true;
    }

    fn finish(&mut self) -> AppearanceRef {
        self.finished = true;
        if self.draft == *self.original {
            return self.original.clone();
        }
        let draft = std::mem::take(&mut self.draft);
        self.store.set_appearance(self.atom, draft)
    }
}

impl<'a> Deref for AppearanceMut<'a> {
    type Target = Appearance;

    fn deref(&self) -> &Appearance {
        &self.draft
    }
}

impl<'a> DerefMut for AppearanceMut<'a> {
    fn deref_mut(&mut self) -> &mut Appearance {
        &mut self.draft
    }
}

impl<'a> Drop for AppearanceMut<'a> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish();
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use slotmap::HopSlotMap;
    use test_log::test;

    use super::*;

    fn atoms(n: usize) -> Vec<ObjectId> {
        let mut map = HopSlotMap::<ObjectId, ()>::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn test_equal_appearances_are_shared() {
        let mut store = AppearanceStore::new();
        let ids = atoms(2);
        for &id in &ids {
            let mut app = store.update(id);
            app.icon = Some("mob.dmi".into());
        }
        assert_eq!(store.get_appearance(ids[0]), store.get_appearance(ids[1]));
        assert_eq!(store.take_updates().len(), 2);
    }

    #[test]
    fn test_edit_is_copy_on_write() {
        let mut store = AppearanceStore::new();
        let id = atoms(1)[0];
        let before = store.get_appearance(id);

        store.update(id).name = Some("crate".into());
        let after = store.get_appearance(id);
        assert_ne!(before, after);
        assert_eq!(before.name, None);
        assert_eq!(after.name.as_deref(), Some("crate"));
    }

    #[test]
    fn test_discard_and_noop_edits_do_not_notify() {
        let mut store = AppearanceStore::new();
        let id = atoms(1)[0];

        let mut app = store.update(id);
        app.direction = 4;
        app.discard();
        store.update(id).direction = SOUTH;

        assert!(store.take_updates().is_empty());
        assert_eq!(store.get_appearance(id).direction, SOUTH);
    }

    #[test]
    fn test_prune_drops_unreferenced_records() {
        let mut store = AppearanceStore::new();
        let id = atoms(1)[0];
        store.update(id).icon_state = Some("open".into());
        store.update(id).icon_state = Some("closed".into());
        store.take_updates();

        assert_eq!(store.interned_count(), 3);
        assert_eq!(store.prune(), 1);
        assert_eq!(store.get_appearance(id).icon_state.as_deref(), Some("closed"));
    }
}
