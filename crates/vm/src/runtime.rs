//! The object table and the engine stores hanging off it.

mod variables;

use std::path::PathBuf;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use slotmap::HopSlotMap;

use crate::appearance::{type_appearance, AppearanceStore};
use crate::client::ClientRegistry;
use crate::deletion::DeletionQueue;
use crate::error::{Result, RuntimeError};
use crate::list::appearance::FilterAttachments;
use crate::map::{Coord, MapStore};
use crate::matrix::Matrix;
use crate::object::{AtomRole, AtomState, DreamObject, ObjectId, ObjectKind};
use crate::query::QueryCursor;
use crate::savefile::SavefileRegistry;
use crate::tree::{BuiltinKind, ObjectTree, TypeRef};
use crate::value::Value;
use crate::vector::Vector;

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Directory relative savefile names resolve against.
    pub savefile_root: PathBuf,
    /// Initial map dimensions as `(maxx, maxy, maxz)`.
    pub map_size: (u32, u32, u32),
    /// Seed for generators. Seeded from entropy when unset.
    pub seed: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            savefile_root: PathBuf::from("."),
            map_size: (0, 0, 0),
            seed: None,
        }
    }
}

/// Everything a running world owns.
///
/// Single-threaded: objects are reference counted without atomics and views into engine stores
/// borrow them without locks. Other threads request deletions through a
/// [`DeletionSender`](crate::deletion::DeletionSender).
pub struct Runtime {
    pub config: RuntimeConfig,
    pub tree: ObjectTree,
    pub appearances: AppearanceStore,
    pub map: MapStore,
    pub clients: ClientRegistry,
    pub(crate) savefiles: SavefileRegistry,
    pub(crate) rng: StdRng,
    pub(crate) filters: FilterAttachments,
    pub(crate) objects: HopSlotMap<ObjectId, Rc<DreamObject>>,
    pub(crate) deletions: DeletionQueue,
    pub(crate) world: ObjectId,
    global_vars: Option<ObjectId>,
    list_type: TypeRef,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let tree = ObjectTree::new();
        let list_type = tree.get("/list")?;
        let world_type = tree.get("/world")?;

        let mut objects = HopSlotMap::with_key();
        let world = objects.insert(Rc::new(DreamObject::new(world_type, ObjectKind::World)));
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let map_size = config.map_size;

        let mut rt = Runtime {
            config,
            tree,
            appearances: AppearanceStore::new(),
            map: MapStore::default(),
            clients: ClientRegistry::default(),
            savefiles: SavefileRegistry::default(),
            rng,
            filters: FilterAttachments::default(),
            objects,
            deletions: DeletionQueue::new(),
            world,
            global_vars: None,
            list_type,
        };

        let area_type = rt.tree.get("/area")?;
        let default_area = rt.new_area(&area_type)?;
        rt.map.set_default_area(default_area);
        rt.resize_map(map_size)?;
        tracing::debug!(?map_size, "runtime started");
        Ok(rt)
    }

    pub fn list_type(&self) -> &TypeRef {
        &self.list_type
    }

    pub fn world(&self) -> ObjectId {
        self.world
    }

    pub(crate) fn insert_object(&mut self, object: Rc<DreamObject>) -> ObjectId {
        let ty = object.def.path.clone();
        let id = self.objects.insert(object);
        tracing::debug!(?id, %ty, "object created");
        id
    }

    /// The live object behind `id`.
    pub fn object(&self, id: ObjectId) -> Result<Rc<DreamObject>> {
        match self.objects.get(id) {
            Some(object) if !object.is_deleted() => Ok(object.clone()),
            _ => Err(RuntimeError::DeletedObject),
        }
    }

    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.object(id).is_ok()
    }

    /// Every live object, in table order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Rc<DreamObject>)> + '_ {
        self.objects.iter().filter(|(_, o)| !o.is_deleted())
    }

    /// Script equality: references to deleted objects compare as `null`.
    pub fn equals(&self, lhs: &Value, rhs: &Value) -> bool {
        self.resolve(lhs) == self.resolve(rhs)
    }

    fn resolve(&self, value: &Value) -> Value {
        match value {
            Value::Object(id) if !self.is_alive(*id) => Value::Null,
            value => value.clone(),
        }
    }

    /// The text an object stringifies to.
    pub fn display_name(&self, id: ObjectId) -> String {
        let object = match self.object(id) {
            Ok(object) => object,
            Err(_) => return String::new(),
        };
        match &object.kind {
            ObjectKind::List(_) => self.list_type.path.to_string(),
            ObjectKind::Atom(_) => self
                .appearances
                .get_appearance(id)
                .name
                .as_ref()
                .map_or_else(String::new, |name| name.to_string()),
            _ => match object.variable_or_default("name") {
                Some(Value::String(name)) => name.to_string(),
                _ => object.def.path.to_string(),
            },
        }
    }

    /// `new type()` for types that need no constructor arguments.
    pub fn new_object(&mut self, def: &TypeRef) -> Result<ObjectId> {
        let kind = match def.kind {
            BuiltinKind::Datum => ObjectKind::Datum,
            BuiltinKind::List => {
                let list = self.new_list();
                return Ok(list.id());
            }
            BuiltinKind::Area => ObjectKind::Atom(AtomState::new(AtomRole::Area)),
            BuiltinKind::Movable => ObjectKind::Atom(AtomState::new(AtomRole::Movable)),
            BuiltinKind::Image => ObjectKind::Atom(AtomState::new(AtomRole::Image)),
            BuiltinKind::Matrix => ObjectKind::Matrix(Matrix::IDENTITY.into()),
            BuiltinKind::Vector => ObjectKind::Vector(Vector::default().into()),
            BuiltinKind::Query => ObjectKind::Query(QueryCursor::new().into()),
            BuiltinKind::Turf
            | BuiltinKind::Client
            | BuiltinKind::World
            | BuiltinKind::Generator
            | BuiltinKind::Savefile
            | BuiltinKind::Filter => {
                return Err(RuntimeError::invalid_arguments(format!(
                    "{} cannot be created without arguments",
                    def.path
                )))
            }
        };
        let has_appearance = def.kind.has_appearance();
        let id = self.insert_object(DreamObject::new(def.clone(), kind).into());
        if has_appearance {
            self.appearances.set_appearance(id, type_appearance(def));
        }
        Ok(id)
    }

    pub fn new_object_path(&mut self, path: &str) -> Result<ObjectId> {
        let def = self.tree.get(path)?;
        self.new_object(&def)
    }

    /// Create a turf at `coord`, replacing the turf there. Movables standing on the cell stay
    /// and now stand on the new turf.
    pub fn new_turf(&mut self, def: &TypeRef, coord: Coord) -> Result<ObjectId> {
        if def.kind != BuiltinKind::Turf {
            return Err(RuntimeError::TypeCast {
                value: def.path.to_string(),
                expected: "turf",
            });
        }
        let object = DreamObject::new(
            def.clone(),
            ObjectKind::Atom(AtomState::new(AtomRole::Turf(coord))),
        );
        let id = self.insert_object(object.into());
        self.appearances.set_appearance(id, type_appearance(def));

        if let Some(old) = self.map.set_turf(coord, id) {
            let movables = self
                .map
                .cell(coord)
                .map(|cell| cell.movables.clone())
                .unwrap_or_default();
            for movable in movables {
                if let Some(atom) = self.objects.get(movable).and_then(|o| o.atom()) {
                    atom.set_loc(Some(id));
                }
            }
            self.delete(old);
        }
        Ok(id)
    }

    pub fn new_area(&mut self, def: &TypeRef) -> Result<ObjectId> {
        if def.kind != BuiltinKind::Area {
            return Err(RuntimeError::TypeCast {
                value: def.path.to_string(),
                expected: "area",
            });
        }
        self.new_object(def)
    }

    pub fn new_matrix(&mut self, matrix: Matrix) -> Result<ObjectId> {
        let def = self.tree.get("/matrix")?;
        let object = DreamObject::new(def, ObjectKind::Matrix(matrix.into()));
        Ok(self.insert_object(object.into()))
    }

    /// The matrix a matrix object holds.
    pub fn matrix_of(&self, value: &Value) -> Option<Matrix> {
        let object = self.object(value.as_object()?).ok()?;
        match &object.kind {
            ObjectKind::Matrix(m) => Some(m.get()),
            _ => None,
        }
    }

    /// The `global.vars` list.
    pub fn global_vars(&mut self) -> Result<Value> {
        if let Some(id) = self.global_vars.filter(|id| self.is_alive(*id)) {
            return Ok(Value::Object(id));
        }
        let list = self.new_list_with(crate::list::vars::GlobalVarsList);
        self.global_vars = Some(list.id());
        Ok(list.value())
    }
}
