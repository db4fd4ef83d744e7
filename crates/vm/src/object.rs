use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;

use fnv::FnvHashMap;
use smol_str::SmolStr;

use crate::appearance::Filter;
use crate::client::ConnectionId;
use crate::error::{Result, RuntimeError};
use crate::generator::Generator;
use crate::list::Collection;
use crate::map::Coord;
use crate::matrix::Matrix;
use crate::query::QueryCursor;
use crate::savefile::Savefile;
use crate::tree::TypeRef;
use crate::value::Value;
use crate::vector::Vector;

slotmap::new_key_type! {
    /// Generational handle into the runtime's object table.
    pub struct ObjectId;
}

/// An object owned by the runtime's object table.
pub struct DreamObject {
    pub def: TypeRef,
    pub kind: ObjectKind,
    /// Instance values of declared variables; unset ones fall back to the type default.
    vars: RefCell<FnvHashMap<SmolStr, Value>>,
    /// Lists the factory built for this object's variables, by variable name.
    lists: RefCell<FnvHashMap<SmolStr, ObjectId>>,
    deleted: Cell<bool>,
}

/// Native state backing an object.
pub enum ObjectKind {
    Datum,
    List(RefCell<Box<dyn Collection>>),
    Atom(AtomState),
    Client(ConnectionId),
    World,
    Matrix(Cell<Matrix>),
    Vector(Cell<Vector>),
    Generator(Generator),
    Savefile(RefCell<Savefile>),
    Filter(RefCell<Filter>),
    Query(RefCell<QueryCursor>),
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Datum => "datum",
            ObjectKind::List(_) => "list",
            ObjectKind::Atom(atom) => match atom.role {
                AtomRole::Turf(_) => "turf",
                AtomRole::Area => "area",
                AtomRole::Movable => "movable",
                AtomRole::Image => "image",
            },
            ObjectKind::Client(_) => "client",
            ObjectKind::World => "world",
            ObjectKind::Matrix(_) => "matrix",
            ObjectKind::Vector(_) => "vector",
            ObjectKind::Generator(_) => "generator",
            ObjectKind::Savefile(_) => "savefile",
            ObjectKind::Filter(_) => "filter",
            ObjectKind::Query(_) => "database query",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtomRole {
    Turf(Coord),
    Area,
    Movable,
    Image,
}

/// Location bookkeeping shared by all atoms. Only movables use `loc` and only movables
/// hold children.
pub struct AtomState {
    pub role: AtomRole,
    loc: Cell<Option<ObjectId>>,
    children: RefCell<Vec<ObjectId>>,
}

impl AtomState {
    pub fn new(role: AtomRole) -> Self {
        AtomState {
            role,
            loc: Cell::new(None),
            children: RefCell::new(vec![]),
        }
    }

    pub fn loc(&self) -> Option<ObjectId> {
        self.loc.get()
    }

    pub(crate) fn set_loc(&self, loc: Option<ObjectId>) {
        self.loc.set(loc)
    }

    pub fn children(&self) -> Ref<'_, Vec<ObjectId>> {
        self.children.borrow()
    }

    pub(crate) fn children_mut(&self) -> RefMut<'_, Vec<ObjectId>> {
        self.children.borrow_mut()
    }
}

impl DreamObject {
    pub(crate) fn new(def: TypeRef, kind: ObjectKind) -> Self {
        DreamObject {
            def,
            kind,
            vars: RefCell::new(FnvHashMap::default()),
            lists: RefCell::new(FnvHashMap::default()),
            deleted: Cell::new(false),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.get()
    }

    pub(crate) fn mark_deleted(&self) {
        self.deleted.set(true)
    }

    /// Instance value of `name`, falling back to the type's default.
    pub fn variable_or_default(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.def.default_value(name).cloned()
    }

    /// Store an instance value, returning the previous effective value.
    pub(crate) fn store_variable(&self, name: &str, value: Value) -> Value {
        let old = self.variable_or_default(name).unwrap_or_default();
        self.vars.borrow_mut().insert(name.into(), value);
        old
    }

    pub(crate) fn cached_list(&self, name: &str) -> Option<ObjectId> {
        self.lists.borrow().get(name).copied()
    }

    pub(crate) fn cache_list(&self, name: &str, list: ObjectId) {
        self.lists.borrow_mut().insert(name.into(), list);
    }

    pub(crate) fn take_cached_lists(&self) -> Vec<ObjectId> {
        self.lists.borrow_mut().drain().map(|(_, id)| id).collect()
    }

    pub fn atom(&self) -> Option<&AtomState> {
        if let ObjectKind::Atom(atom) = &self.kind {
            Some(atom)
        } else {
            None
        }
    }

    pub fn is_movable(&self) -> bool {
        self.atom().map_or(false, |a| a.role == AtomRole::Movable)
    }

    pub fn is_turf(&self) -> bool {
        self.atom()
            .map_or(false, |a| matches!(a.role, AtomRole::Turf(_)))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, ObjectKind::List(_))
    }

    /// Shared access to the list backing this object.
    pub fn collection(&self) -> Result<Ref<'_, dyn Collection + 'static>> {
        match &self.kind {
            ObjectKind::List(cell) => cell
                .try_borrow()
                .map(|list| Ref::map(list, as_dyn))
                .map_err(|_| RuntimeError::not_supported("re-entrant list access", "list")),
            _ => Err(RuntimeError::TypeCast {
                value: self.def.path.to_string(),
                expected: "list",
            }),
        }
    }

    /// Exclusive access to the list backing this object.
    pub fn collection_mut(&self) -> Result<RefMut<'_, dyn Collection + 'static>> {
        match &self.kind {
            ObjectKind::List(cell) => cell
                .try_borrow_mut()
                .map(|list| RefMut::map(list, as_dyn_mut))
                .map_err(|_| RuntimeError::not_supported("re-entrant list access", "list")),
            _ => Err(RuntimeError::TypeCast {
                value: self.def.path.to_string(),
                expected: "list",
            }),
        }
    }
}

fn as_dyn(list: &Box<dyn Collection>) -> &(dyn Collection + 'static) {
    &**list
}

fn as_dyn_mut(list: &mut Box<dyn Collection>) -> &mut (dyn Collection + 'static) {
    &mut **list
}

impl fmt::Debug for DreamObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DreamObject")
            .field("type", &self.def.path)
            .field("kind", &self.kind.name())
            .field("deleted", &self.is_deleted())
            .finish()
    }
}
