use super::{cut_range, Collection};
use crate::client::{ClientObjects, ConnectionId};
use crate::error::{Result, RuntimeError};
use crate::object::{AtomRole, ObjectId};
use crate::runtime::Runtime;
use crate::value::Value;

/// `client.screen` or `client.images`: objects shown to one connection. Keeps the client
/// registry's set in step with its own order.
pub struct ClientObjectsList {
    connection: ConnectionId,
    which: ClientObjects,
    objects: Vec<ObjectId>,
}

impl ClientObjectsList {
    pub fn new(connection: ConnectionId, which: ClientObjects) -> Self {
        ClientObjectsList {
            connection,
            which,
            objects: vec![],
        }
    }

    fn accept(&self, rt: &Runtime, value: &Value) -> Result<ObjectId> {
        let (wanted, expected) = match self.which {
            ClientObjects::Screen => (AtomRole::Movable, "movable"),
            ClientObjects::Images => (AtomRole::Image, "image"),
        };
        let id = value.must_get_as::<ObjectId>()?;
        let object = rt.object(id)?;
        match object.atom() {
            Some(atom) if atom.role == wanted => Ok(id),
            _ => Err(RuntimeError::TypeCast {
                value: object.def.path.to_string(),
                expected,
            }),
        }
    }
}

impl Collection for ClientObjectsList {
    fn kind(&self) -> &'static str {
        match self.which {
            ClientObjects::Screen => "client screen",
            ClientObjects::Images => "client images",
        }
    }

    fn values(&self, _rt: &mut Runtime) -> Result<Vec<Value>> {
        Ok(self.objects.iter().copied().map(Value::Object).collect())
    }

    fn len(&self, _rt: &mut Runtime) -> Result<usize> {
        Ok(self.objects.len())
    }

    fn add_value(&mut self, rt: &mut Runtime, value: Value) -> Result<()> {
        let id = self.accept(rt, &value)?;
        if !self.objects.contains(&id) {
            self.objects.push(id);
            rt.clients.register(self.connection, self.which, id);
        }
        Ok(())
    }

    fn remove_value(&mut self, rt: &mut Runtime, value: &Value) -> Result<()> {
        if let Some(id) = value.as_object() {
            if let Some(i) = self.objects.iter().rposition(|o| *o == id) {
                self.objects.remove(i);
                rt.clients.unregister(self.connection, self.which, id);
            }
        }
        Ok(())
    }

    fn cut(&mut self, rt: &mut Runtime, start: i64, end: i64) -> Result<()> {
        let range = cut_range(start, end, self.objects.len())?;
        for id in self.objects.drain(range) {
            rt.clients.unregister(self.connection, self.which, id);
        }
        Ok(())
    }

    fn forget(&mut self, object: ObjectId) {
        self.objects.retain(|o| *o != object);
    }
}
