//! The variable protocol: how `obj.name` reads and writes resolve.
//!
//! Lookup order is the list factory, then vars the engine computes from its stores, then the
//! object's own value or its type default, then the type's globals.

use smol_str::SmolStr;

use super::Runtime;
use crate::error::{Result, RuntimeError};
use crate::map::Coord;
use crate::matrix::{Matrix, COMPONENTS};
use crate::object::{AtomRole, AtomState, DreamObject, ObjectId, ObjectKind};
use crate::value::Value;

/// Vars backed by a list view. Assigning one replaces the list's contents.
const LIST_VARS: &[&str] = &[
    "overlays",
    "underlays",
    "filters",
    "contents",
    "screen",
    "images",
    "verbs",
];

impl Runtime {
    pub fn get_variable(&mut self, id: ObjectId, name: &str) -> Result<Value> {
        match self.try_get_variable(id, name)? {
            Some(value) => Ok(value),
            None => Err(self.undefined_variable(id, name)),
        }
    }

    /// `Ok(None)` if the object has no var called `name`.
    pub fn try_get_variable(&mut self, id: ObjectId, name: &str) -> Result<Option<Value>> {
        let object = self.object(id)?;
        if let Some(list) = self.special_list(id, &object, name)? {
            return Ok(Some(list.value()));
        }
        if let Some(value) = self.builtin_variable(id, &object, name)? {
            return Ok(Some(value));
        }
        if let Some(value) = object.variable_or_default(name) {
            return Ok(Some(value));
        }
        Ok(object
            .def
            .global_slot(name)
            .map(|slot| self.tree.global_at(slot)))
    }

    pub fn set_variable(&mut self, id: ObjectId, name: &str, value: Value) -> Result<()> {
        let object = self.object(id)?;
        if LIST_VARS.contains(&name) {
            if let Some(list) = self.special_list(id, &object, name)? {
                let values = match &value {
                    Value::Null => vec![],
                    value => match self.try_as_list(value) {
                        Some(source) => source.values(self)?,
                        None => vec![value.clone()],
                    },
                };
                list.cut(self, 1, 0)?;
                for value in values {
                    list.add(self, value)?;
                }
                return Ok(());
            }
        }

        if self.set_builtin_variable(id, &object, name, &value)? {
            return Ok(());
        }
        if object.def.has_variable(name) {
            object.store_variable(name, value);
            return Ok(());
        }
        match object.def.global_slot(name) {
            Some(slot) => {
                self.tree.set_global_at(slot, value);
                Ok(())
            }
            None => Err(self.undefined_variable(id, name)),
        }
    }

    pub fn has_variable(&self, id: ObjectId, name: &str) -> Result<bool> {
        let object = self.object(id)?;
        let builtin = match &object.kind {
            ObjectKind::Filter(filter) => {
                name == "name" || filter.borrow().param(name).is_some()
            }
            _ => false,
        };
        Ok(builtin
            || matches!(name, "type" | "parent_type" | "vars")
            || object.def.has_variable(name)
            || object.def.global_slot(name).is_some())
    }

    /// Declared var names in declaration order. Filters add their parameter names.
    pub fn variable_names(&self, id: ObjectId) -> Result<Vec<SmolStr>> {
        let object = self.object(id)?;
        let mut names: Vec<SmolStr> = object.def.variable_names().cloned().collect();
        if let ObjectKind::Filter(filter) = &object.kind {
            names.extend(filter.borrow().params.iter().map(|(name, _)| name.clone()));
        }
        Ok(names)
    }

    fn undefined_variable(&self, id: ObjectId, name: &str) -> RuntimeError {
        RuntimeError::UndefinedVariable {
            name: name.to_owned(),
            ty: self
                .object(id)
                .map_or_else(|_| "deleted object".to_owned(), |o| o.def.path.to_string()),
        }
    }

    fn builtin_variable(
        &mut self,
        id: ObjectId,
        object: &DreamObject,
        name: &str,
    ) -> Result<Option<Value>> {
        let value = match &object.kind {
            ObjectKind::List(_) if name == "len" => Some(Value::from(self.list(id)?.len(self)?)),
            ObjectKind::Atom(atom) => self.atom_variable(id, atom, name)?,
            ObjectKind::Client(connection) if name == "ckey" => self
                .clients
                .connection(*connection)
                .map(|c| Value::String(c.ckey.clone())),
            ObjectKind::World => {
                let (x, y, z) = self.map.size();
                match name {
                    "maxx" => Some(Value::Float(x as f32)),
                    "maxy" => Some(Value::Float(y as f32)),
                    "maxz" => Some(Value::Float(z as f32)),
                    _ => None,
                }
            }
            ObjectKind::Matrix(matrix) => matrix.get().component(name).map(Value::Float),
            ObjectKind::Vector(vector) => vector.get().var(name),
            ObjectKind::Savefile(_) => match name {
                "cd" => Some(Value::string(self.with_savefile(id, false, |s| s.cd())?)),
                "eof" => Some(Value::Float(0.0)),
                "name" => Some(Value::string(
                    self.with_savefile(id, false, |s| s.path().display().to_string())?,
                )),
                _ => None,
            },
            ObjectKind::Filter(filter) => {
                let filter = filter.borrow();
                match name {
                    "type" => Some(Value::String(filter.kind.clone())),
                    "name" => Some(filter.name.clone().map_or(Value::Null, Value::String)),
                    _ => filter.param(name).cloned(),
                }
            }
            _ => None,
        };
        if value.is_some() {
            return Ok(value);
        }

        Ok(match name {
            "type" => Some(Value::Type(object.def.clone())),
            "parent_type" => Some(
                object
                    .def
                    .parent
                    .clone()
                    .map_or(Value::Null, Value::Type),
            ),
            _ => None,
        })
    }

    fn atom_variable(&mut self, id: ObjectId, atom: &AtomState, name: &str) -> Result<Option<Value>> {
        let appearance = self.appearances.get_appearance(id);
        let text = |s: &Option<SmolStr>| s.clone().map_or(Value::Null, Value::String);
        let value = match name {
            "name" => text(&appearance.name),
            "icon" => text(&appearance.icon),
            "icon_state" => text(&appearance.icon_state),
            "dir" => Value::Float(appearance.direction as f32),
            "transform" => {
                let matrix = Matrix::from_transform(&appearance.transform);
                Value::Object(self.new_matrix(matrix)?)
            }
            "loc" => match atom.role {
                AtomRole::Turf(coord) => self.map.area_at(coord).map_or(Value::Null, Value::Object),
                AtomRole::Movable => atom.loc().map_or(Value::Null, Value::Object),
                AtomRole::Area => Value::Null,
                AtomRole::Image => return Ok(None),
            },
            "x" | "y" | "z" if atom.role != AtomRole::Image => {
                let coord = self.atom_coord(id);
                let component = coord.map_or(0, |c| match name {
                    "x" => c.x,
                    "y" => c.y,
                    _ => c.z,
                });
                Value::Float(component as f32)
            }
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Writes the engine handles itself. `Ok(false)` means the var is an ordinary one.
    fn set_builtin_variable(
        &mut self,
        id: ObjectId,
        object: &DreamObject,
        name: &str,
        value: &Value,
    ) -> Result<bool> {
        if matches!(name, "type" | "parent_type" | "vars") {
            return Err(RuntimeError::not_supported(
                "assigning a read-only var",
                object.kind.name(),
            ));
        }

        match &object.kind {
            ObjectKind::List(_) if name == "len" => {
                let len = value.must_get_as::<f32>()? as i64;
                self.list(id)?.resize(self, len)?;
                Ok(true)
            }
            ObjectKind::Atom(atom) => self.set_atom_variable(id, atom.role, name, value),
            ObjectKind::Client(_) if name == "ckey" => {
                Err(RuntimeError::not_supported("assigning ckey", "client"))
            }
            ObjectKind::World if matches!(name, "maxx" | "maxy" | "maxz") => {
                let n = value.must_get_as::<f32>()?;
                if n < 0.0 {
                    return Err(RuntimeError::invalid_arguments(format!(
                        "invalid map size {}",
                        n
                    )));
                }
                let (mut x, mut y, mut z) = self.map.size();
                match name {
                    "maxx" => x = n as u32,
                    "maxy" => y = n as u32,
                    _ => z = n as u32,
                }
                self.resize_map((x, y, z))?;
                Ok(true)
            }
            ObjectKind::Matrix(matrix) if COMPONENTS.contains(&name) => {
                let mut m = matrix.get();
                m.set_component(name, value.must_get_as::<f32>()?);
                matrix.set(m);
                Ok(true)
            }
            ObjectKind::Vector(vector) => {
                let mut v = vector.get();
                v.set_var(name, value)?;
                vector.set(v);
                Ok(true)
            }
            ObjectKind::Savefile(_) => match name {
                "cd" => {
                    let path = value.stringify(self);
                    self.with_savefile(id, true, |s| s.set_cd(&path))?;
                    Ok(true)
                }
                _ => Err(RuntimeError::invalid_arguments(format!(
                    "cannot assign savefile var {}",
                    name
                ))),
            },
            ObjectKind::Filter(_) => {
                let value = value.clone();
                self.update_filter(id, |filter| match name {
                    "name" => filter.name = value.try_get_as::<SmolStr>(),
                    _ => filter.set_param(name, value),
                })?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn set_atom_variable(
        &mut self,
        id: ObjectId,
        role: AtomRole,
        name: &str,
        value: &Value,
    ) -> Result<bool> {
        match name {
            "name" | "icon" | "icon_state" => {
                let text = match value {
                    Value::Null => None,
                    Value::String(s) => Some(s.clone()),
                    Value::Resource(r) => r.path.clone(),
                    other => Some(SmolStr::new(other.stringify(self))),
                };
                let mut appearance = self.appearances.update(id);
                match name {
                    "name" => appearance.name = text,
                    "icon" => appearance.icon = text,
                    _ => appearance.icon_state = text,
                }
            }
            "dir" => {
                let dir = value.must_get_as::<f32>()?;
                self.appearances.update(id).direction = dir as u8;
            }
            "transform" => {
                let matrix = self.matrix_from_value(value)?;
                self.appearances.update(id).transform = matrix.to_transform();
            }
            "loc" => match role {
                AtomRole::Movable => {
                    let loc = match value {
                        Value::Null => None,
                        Value::Object(target) => Some(*target),
                        other => {
                            return Err(RuntimeError::TypeCast {
                                value: other.to_string(),
                                expected: "atom",
                            })
                        }
                    };
                    self.set_loc(id, loc)?;
                }
                AtomRole::Image => return Ok(false),
                _ => return Err(RuntimeError::not_supported("assigning loc", "turf or area")),
            },
            "x" | "y" | "z" => match role {
                AtomRole::Movable => {
                    let n = value.must_get_as::<f32>()?.max(0.0) as u32;
                    let mut coord = self.atom_coord(id).unwrap_or(Coord::new(0, 0, 0));
                    match name {
                        "x" => coord.x = n,
                        "y" => coord.y = n,
                        _ => coord.z = n,
                    }
                    let turf = self.map.turf_at(coord);
                    self.set_loc(id, turf)?;
                }
                AtomRole::Image => return Ok(false),
                _ => {
                    return Err(RuntimeError::not_supported(
                        "assigning coordinates",
                        "turf or area",
                    ))
                }
            },
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// A matrix object, a list of six numbers, or `null` for the identity.
    fn matrix_from_value(&mut self, value: &Value) -> Result<Matrix> {
        if value.is_null() {
            return Ok(Matrix::IDENTITY);
        }
        if let Some(matrix) = self.matrix_of(value) {
            return Ok(matrix);
        }
        if let Some(list) = self.try_as_list(value) {
            let components: Option<Vec<f32>> =
                list.values(self)?.iter().map(Value::as_float).collect();
            if let Some(c) = components.filter(|c| c.len() == 6) {
                return Ok(Matrix::new(c[0], c[1], c[2], c[3], c[4], c[5]));
            }
        }
        Err(RuntimeError::TypeCast {
            value: value.to_string(),
            expected: "matrix",
        })
    }
}
