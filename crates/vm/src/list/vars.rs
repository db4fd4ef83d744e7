//! `obj.vars` and `global.vars`.

use super::{slot, Collection};
use crate::error::{Result, RuntimeError};
use crate::object::ObjectId;
use crate::runtime::Runtime;
use crate::value::Value;

/// Names of an object's vars, keyed to their values. Holds no storage of its own.
pub struct ObjectVarsList {
    object: ObjectId,
}

impl ObjectVarsList {
    pub fn new(object: ObjectId) -> Self {
        ObjectVarsList { object }
    }

    fn names(&self, rt: &Runtime) -> Result<Vec<Value>> {
        let mut names: Vec<Value> = rt
            .variable_names(self.object)?
            .into_iter()
            .map(Value::String)
            .collect();
        let object = rt.object(self.object)?;
        names.extend(object.def.global_names().cloned().map(Value::String));
        Ok(names)
    }
}

impl Collection for ObjectVarsList {
    fn kind(&self) -> &'static str {
        "vars list"
    }

    fn values(&self, rt: &mut Runtime) -> Result<Vec<Value>> {
        self.names(rt)
    }

    fn is_associative(&self, _rt: &mut Runtime) -> Result<bool> {
        Ok(true)
    }

    fn get_value(&self, rt: &mut Runtime, key: &Value) -> Result<Value> {
        match key {
            Value::String(name) => rt.get_variable(self.object, name),
            Value::Float(_) => {
                let names = self.names(rt)?;
                let index = key.as_index()?.unwrap_or_default();
                Ok(names[slot(index, names.len())?].clone())
            }
            _ => Err(RuntimeError::InvalidIndex(key.to_string())),
        }
    }

    fn set_value(
        &mut self,
        rt: &mut Runtime,
        key: &Value,
        value: Value,
        _allow_growth: bool,
    ) -> Result<()> {
        let name = match key {
            Value::String(name) => name,
            _ => return Err(RuntimeError::InvalidIndex(key.to_string())),
        };
        if !rt.has_variable(self.object, name)? {
            let object = rt.object(self.object)?;
            return Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
                ty: object.def.path.to_string(),
            });
        }
        rt.set_variable(self.object, name, value)
    }

    fn contains_key(&self, rt: &mut Runtime, key: &Value) -> Result<bool> {
        match key {
            Value::String(name) => rt.has_variable(self.object, name),
            _ => Ok(false),
        }
    }

    fn assoc_value(&self, rt: &mut Runtime, key: &Value) -> Result<Option<Value>> {
        match key {
            Value::String(name) => rt.try_get_variable(self.object, name),
            _ => Ok(None),
        }
    }
}

/// Every global var by name, backed by the tree's globals table.
pub struct GlobalVarsList;

impl Collection for GlobalVarsList {
    fn kind(&self) -> &'static str {
        "global vars list"
    }

    fn values(&self, rt: &mut Runtime) -> Result<Vec<Value>> {
        Ok(rt
            .tree
            .global_names()
            .iter()
            .cloned()
            .map(Value::String)
            .collect())
    }

    fn is_associative(&self, _rt: &mut Runtime) -> Result<bool> {
        Ok(true)
    }

    fn get_value(&self, rt: &mut Runtime, key: &Value) -> Result<Value> {
        match key {
            Value::String(name) => rt.tree.global(name),
            Value::Float(_) => {
                let names = rt.tree.global_names();
                let index = key.as_index()?.unwrap_or_default();
                Ok(Value::String(names[slot(index, names.len())?].clone()))
            }
            _ => Err(RuntimeError::InvalidIndex(key.to_string())),
        }
    }

    fn set_value(
        &mut self,
        rt: &mut Runtime,
        key: &Value,
        value: Value,
        _allow_growth: bool,
    ) -> Result<()> {
        match key {
            Value::String(name) => rt.tree.set_global(name, value),
            _ => Err(RuntimeError::InvalidIndex(key.to_string())),
        }
    }

    fn contains_key(&self, rt: &mut Runtime, key: &Value) -> Result<bool> {
        Ok(key.as_str().map_or(false, |name| rt.tree.global_slot(name).is_some()))
    }

    fn assoc_value(&self, rt: &mut Runtime, key: &Value) -> Result<Option<Value>> {
        Ok(key.as_str().and_then(|name| rt.tree.global(name).ok()))
    }
}
