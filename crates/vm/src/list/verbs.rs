//! Verb tables of clients and atoms.

use super::{cut_range, Collection};
use crate::client::ConnectionId;
use crate::error::Result;
use crate::object::ObjectId;
use crate::runtime::Runtime;
use crate::tree::ProcRef;
use crate::value::Value;

fn procs_to_values(procs: &[ProcRef]) -> Vec<Value> {
    procs.iter().cloned().map(Value::Proc).collect()
}

/// A connection's verbs. Every change is pushed to the client registry.
pub struct ClientVerbsList {
    connection: ConnectionId,
    verbs: Vec<ProcRef>,
}

impl ClientVerbsList {
    pub fn new(connection: ConnectionId, verbs: Vec<ProcRef>) -> Self {
        ClientVerbsList { connection, verbs }
    }

    fn notify(&self, rt: &mut Runtime) {
        rt.clients.set_verbs(self.connection, self.verbs.clone());
    }
}

impl Collection for ClientVerbsList {
    fn kind(&self) -> &'static str {
        "client verbs"
    }

    fn values(&self, _rt: &mut Runtime) -> Result<Vec<Value>> {
        Ok(procs_to_values(&self.verbs))
    }

    fn len(&self, _rt: &mut Runtime) -> Result<usize> {
        Ok(self.verbs.len())
    }

    fn add_value(&mut self, rt: &mut Runtime, value: Value) -> Result<()> {
        let verb = value.must_get_as::<ProcRef>()?;
        if !self.verbs.contains(&verb) {
            self.verbs.push(verb);
            self.notify(rt);
        }
        Ok(())
    }

    fn remove_value(&mut self, rt: &mut Runtime, value: &Value) -> Result<()> {
        if let Some(i) = value
            .as_proc()
            .and_then(|verb| self.verbs.iter().rposition(|v| v == verb))
        {
            self.verbs.remove(i);
            self.notify(rt);
        }
        Ok(())
    }

    fn cut(&mut self, rt: &mut Runtime, start: i64, end: i64) -> Result<()> {
        let range = cut_range(start, end, self.verbs.len())?;
        if !range.is_empty() {
            self.verbs.drain(range);
            self.notify(rt);
        }
        Ok(())
    }
}

/// An atom's verbs, stored on its appearance.
pub struct AtomVerbsList {
    atom: ObjectId,
}

impl AtomVerbsList {
    pub fn new(atom: ObjectId) -> Self {
        AtomVerbsList { atom }
    }
}

impl Collection for AtomVerbsList {
    fn kind(&self) -> &'static str {
        "atom verbs"
    }

    fn values(&self, rt: &mut Runtime) -> Result<Vec<Value>> {
        Ok(procs_to_values(&rt.appearances.get_appearance(self.atom).verbs))
    }

    fn add_value(&mut self, rt: &mut Runtime, value: Value) -> Result<()> {
        let verb = value.must_get_as::<ProcRef>()?;
        let mut appearance = rt.appearances.update(self.atom);
        if !appearance.verbs.contains(&verb) {
            appearance.verbs.push(verb);
        }
        Ok(())
    }

    fn remove_value(&mut self, rt: &mut Runtime, value: &Value) -> Result<()> {
        if let Some(verb) = value.as_proc() {
            let mut appearance = rt.appearances.update(self.atom);
            if let Some(i) = appearance.verbs.iter().rposition(|v| v == verb) {
                appearance.verbs.remove(i);
            }
        }
        Ok(())
    }

    fn cut(&mut self, rt: &mut Runtime, start: i64, end: i64) -> Result<()> {
        let mut appearance = rt.appearances.update(self.atom);
        let range = cut_range(start, end, appearance.verbs.len())?;
        appearance.verbs.drain(range);
        Ok(())
    }
}
