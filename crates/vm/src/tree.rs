use std::fmt;
use std::rc::Rc;

use dreamrt_util::by_ptr::ByPtr;
use fnv::FnvHashMap;
use smol_str::SmolStr;

use crate::error::{Result, RuntimeError};
use crate::value::Value;

pub type TypeRef = ByPtr<Rc<ObjectDefinition>>;
pub type ProcRef = ByPtr<Rc<ProcDefinition>>;
pub type ResourceRef = ByPtr<Rc<Resource>>;

/// The native behavior an object type is built on. User types inherit it from their parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinKind {
    Datum,
    List,
    Turf,
    Area,
    Movable,
    Image,
    Client,
    World,
    Matrix,
    Vector,
    Generator,
    Savefile,
    Filter,
    Query,
}

impl BuiltinKind {
    /// Whether objects of this kind carry an appearance.
    pub fn has_appearance(self) -> bool {
        matches!(
            self,
            BuiltinKind::Turf | BuiltinKind::Area | BuiltinKind::Movable | BuiltinKind::Image
        )
    }
}

/// A compiled object type.
pub struct ObjectDefinition {
    pub path: SmolStr,
    pub parent: Option<TypeRef>,
    pub kind: BuiltinKind,
    /// Declared variables and their initial values, parent's first.
    variables: Vec<(SmolStr, Value)>,
    var_index: FnvHashMap<SmolStr, usize>,
    /// Global (static) variables visible from this type, with their slot in the globals table.
    globals: Vec<(SmolStr, usize)>,
    pub verbs: Vec<ProcRef>,
}

impl ObjectDefinition {
    pub fn variable_names(&self) -> impl Iterator<Item = &SmolStr> + '_ {
        self.variables.iter().map(|(name, _)| name)
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.var_index.contains_key(name)
    }

    pub fn default_value(&self, name: &str) -> Option<&Value> {
        self.var_index.get(name).map(|&i| &self.variables[i].1)
    }

    pub fn global_names(&self) -> impl Iterator<Item = &SmolStr> + '_ {
        self.globals.iter().map(|(name, _)| name)
    }

    pub fn global_slot(&self, name: &str) -> Option<usize> {
        self.globals
            .iter()
            .find(|(global, _)| global == name)
            .map(|(_, slot)| *slot)
    }

    pub fn is_subtype_of(&self, ancestor: &ObjectDefinition) -> bool {
        if std::ptr::eq(self, ancestor) {
            return true;
        }
        self.parent
            .as_ref()
            .map_or(false, |parent| parent.is_subtype_of(ancestor))
    }
}

impl fmt::Debug for ObjectDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDefinition")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish()
    }
}

#[derive(Debug)]
pub struct ProcDefinition {
    /// Path of the type that declares this proc
    pub owner: SmolStr,
    pub name: SmolStr,
    pub is_verb: bool,
    pub arguments: Vec<SmolStr>,
}

impl fmt::Display for ProcDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let category = if self.is_verb { "verb" } else { "proc" };
        write!(f, "{}/{}/{}", self.owner, category, self.name)
    }
}

/// A file handle: icons, sounds, savefile blobs.
#[derive(Debug)]
pub struct Resource {
    pub id: u32,
    pub path: Option<SmolStr>,
    pub data: Option<Vec<u8>>,
}

/// Every type known to the runtime, and the process-wide globals table.
pub struct ObjectTree {
    types: FnvHashMap<SmolStr, TypeRef>,
    global_names: Vec<SmolStr>,
    globals: Vec<Value>,
    next_resource: u32,
}

const ATOM_VARS: &[&str] = &[
    "name",
    "desc",
    "icon",
    "icon_state",
    "dir",
    "loc",
    "x",
    "y",
    "z",
    "overlays",
    "underlays",
    "filters",
    "verbs",
    "contents",
    "transform",
];

impl ObjectTree {
    pub fn new() -> Self {
        let mut tree = ObjectTree {
            types: FnvHashMap::default(),
            global_names: vec![],
            globals: vec![],
            next_resource: 1,
        };

        let datum = tree.builtin("/datum", None, BuiltinKind::Datum, &["tag"]);
        tree.builtin("/list", Some(&datum), BuiltinKind::List, &["len"]);
        let atom = tree.builtin("/atom", Some(&datum), BuiltinKind::Movable, ATOM_VARS);
        tree.builtin("/turf", Some(&atom), BuiltinKind::Turf, &[]);
        tree.builtin("/area", Some(&atom), BuiltinKind::Area, &[]);
        let movable = tree.builtin("/atom/movable", Some(&atom), BuiltinKind::Movable, &[]);
        tree.builtin("/obj", Some(&movable), BuiltinKind::Movable, &[]);
        tree.builtin("/mob", Some(&movable), BuiltinKind::Movable, &[]);
        tree.builtin(
            "/image",
            Some(&datum),
            BuiltinKind::Image,
            &["name", "icon", "icon_state", "dir", "overlays", "underlays", "transform"],
        );
        tree.builtin(
            "/client",
            Some(&datum),
            BuiltinKind::Client,
            &["ckey", "verbs", "screen", "images"],
        );
        tree.builtin(
            "/world",
            Some(&datum),
            BuiltinKind::World,
            &["name", "contents", "maxx", "maxy", "maxz"],
        );
        tree.builtin(
            "/matrix",
            Some(&datum),
            BuiltinKind::Matrix,
            &["a", "b", "c", "d", "e", "f"],
        );
        tree.builtin(
            "/vector",
            Some(&datum),
            BuiltinKind::Vector,
            &["x", "y", "z", "len", "size"],
        );
        tree.builtin("/generator", Some(&datum), BuiltinKind::Generator, &[]);
        tree.builtin(
            "/savefile",
            Some(&datum),
            BuiltinKind::Savefile,
            &["cd", "eof", "name", "dir"],
        );
        tree.builtin("/dm_filter", Some(&datum), BuiltinKind::Filter, &["name"]);
        tree.builtin("/database/query", Some(&datum), BuiltinKind::Query, &[]);
        tree
    }

    fn builtin(
        &mut self,
        path: &str,
        parent: Option<&TypeRef>,
        kind: BuiltinKind,
        vars: &[&str],
    ) -> TypeRef {
        let mut builder = TypeBuilder {
            tree: self,
            path: path.into(),
            parent: parent.cloned(),
            kind: Some(kind),
            variables: vec![],
            globals: vec![],
            verbs: vec![],
        };
        for var in vars {
            builder = builder.var(*var, Value::Null);
        }
        builder.finish()
    }

    /// Look up a type by path.
    pub fn get(&self, path: &str) -> Result<TypeRef> {
        self.types
            .get(path)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedType(path.to_owned()))
    }

    /// Start declaring a type under `parent`. Redeclaring a path replaces the old type for
    /// objects created afterwards.
    pub fn define(&mut self, path: &str, parent: &str) -> Result<TypeBuilder<'_>> {
        let parent = self.get(parent)?;
        Ok(TypeBuilder {
            tree: self,
            path: path.into(),
            parent: Some(parent),
            kind: None,
            variables: vec![],
            globals: vec![],
            verbs: vec![],
        })
    }

    /// Names of every global variable, in slot order.
    pub fn global_names(&self) -> &[SmolStr] {
        &self.global_names
    }

    pub fn global_slot(&self, name: &str) -> Option<usize> {
        self.global_names.iter().position(|global| global == name)
    }

    pub fn global(&self, name: &str) -> Result<Value> {
        self.global_slot(name)
            .map(|slot| self.globals[slot].clone())
            .ok_or_else(|| RuntimeError::UndefinedGlobal(name.to_owned()))
    }

    pub fn set_global(&mut self, name: &str, value: Value) -> Result<()> {
        let slot = self
            .global_slot(name)
            .ok_or_else(|| RuntimeError::UndefinedGlobal(name.to_owned()))?;
        self.globals[slot] = value;
        Ok(())
    }

    pub(crate) fn global_at(&self, slot: usize) -> Value {
        self.globals[slot].clone()
    }

    pub(crate) fn set_global_at(&mut self, slot: usize, value: Value) {
        self.globals[slot] = value;
    }

    /// Declare a process-wide global. Redeclaring an existing name keeps its slot and value.
    pub fn declare_global(&mut self, name: &str, value: Value) -> usize {
        if let Some(slot) = self.global_slot(name) {
            return slot;
        }
        self.global_names.push(name.into());
        self.globals.push(value);
        self.globals.len() - 1
    }

    pub fn new_proc(&self, owner: &str, name: &str, is_verb: bool, arguments: &[&str]) -> ProcRef {
        ByPtr::alloc(ProcDefinition {
            owner: owner.into(),
            name: name.into(),
            is_verb,
            arguments: arguments.iter().map(|a| SmolStr::new(a)).collect(),
        })
    }

    pub fn new_resource(&mut self, path: Option<&str>, data: Option<Vec<u8>>) -> ResourceRef {
        let id = self.next_resource;
        self.next_resource += 1;
        ByPtr::alloc(Resource {
            id,
            path: path.map(SmolStr::new),
            data,
        })
    }
}

impl Default for ObjectTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects the declarations of one type. See [`ObjectTree::define`].
pub struct TypeBuilder<'a> {
    tree: &'a mut ObjectTree,
    path: SmolStr,
    parent: Option<TypeRef>,
    kind: Option<BuiltinKind>,
    variables: Vec<(SmolStr, Value)>,
    globals: Vec<(SmolStr, Value)>,
    verbs: Vec<ProcRef>,
}

impl<'a> TypeBuilder<'a> {
    /// Declare a variable, or override the default of an inherited one.
    pub fn var(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.push((name.into(), value.into()));
        self
    }

    /// Declare a global variable owned by this type.
    pub fn global(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.globals.push((name.into(), value.into()));
        self
    }

    pub fn verb(mut self, verb: ProcRef) -> Self {
        self.verbs.push(verb);
        self
    }

    pub fn finish(self) -> TypeRef {
        let TypeBuilder {
            tree,
            path,
            parent,
            kind,
            variables: own_variables,
            globals: own_globals,
            verbs: own_verbs,
        } = self;

        let (mut variables, mut globals, mut verbs, inherited_kind) = match &parent {
            Some(parent) => (
                parent.variables.clone(),
                parent.globals.clone(),
                parent.verbs.clone(),
                parent.kind,
            ),
            None => (vec![], vec![], vec![], BuiltinKind::Datum),
        };
        let mut var_index: FnvHashMap<SmolStr, usize> = variables
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();

        for (name, value) in own_variables {
            match var_index.get(&name) {
                Some(&i) => variables[i].1 = value,
                None => {
                    var_index.insert(name.clone(), variables.len());
                    variables.push((name, value));
                }
            }
        }
        for (name, value) in own_globals {
            let slot = tree.declare_global(&name, value);
            globals.push((name, slot));
        }
        verbs.extend(own_verbs);

        let def = ByPtr::alloc(ObjectDefinition {
            path: path.clone(),
            parent,
            kind: kind.unwrap_or(inherited_kind),
            variables,
            var_index,
            globals,
            verbs,
        });
        tracing::trace!(path = %path, "type defined");
        tree.types.insert(path, def.clone());
        def
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn test_inherited_variables_keep_declaration_order() {
        let mut tree = ObjectTree::new();
        let item = tree
            .define("/obj/item", "/obj")
            .unwrap()
            .var("weight", 3)
            .var("name", "item")
            .global("items_made", 0)
            .finish();

        let names: Vec<_> = item.variable_names().map(|n| n.as_str()).collect();
        assert_eq!(&names[..3], &["tag", "name", "desc"]);
        assert_eq!(names.last(), Some(&"weight"));
        assert_eq!(item.default_value("name"), Some(&Value::string("item")));
        assert_eq!(item.kind, BuiltinKind::Movable);

        let slot = item.global_slot("items_made").unwrap();
        assert_eq!(tree.global_names()[slot], "items_made");
        assert!(item.is_subtype_of(&tree.get("/atom/movable").unwrap()));
        assert!(!item.is_subtype_of(&tree.get("/turf").unwrap()));
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let tree = ObjectTree::new();
        assert!(matches!(
            tree.get("/obj/nothing"),
            Err(RuntimeError::UndefinedType(_))
        ));
    }
}
