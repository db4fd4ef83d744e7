use fnv::FnvHashSet;
use slotmap::SlotMap;
use smol_str::SmolStr;

use crate::error::{Result, RuntimeError};
use crate::object::{DreamObject, ObjectId, ObjectKind};
use crate::runtime::Runtime;
use crate::tree::ProcRef;

slotmap::new_key_type! {
    /// A connected player.
    pub struct ConnectionId;
}

pub struct Connection {
    pub ckey: SmolStr,
    pub client: ObjectId,
    screen: FnvHashSet<ObjectId>,
    images: FnvHashSet<ObjectId>,
    verbs: Vec<ProcRef>,
    verbs_dirty: bool,
}

impl Connection {
    pub fn screen(&self) -> &FnvHashSet<ObjectId> {
        &self.screen
    }

    pub fn images(&self) -> &FnvHashSet<ObjectId> {
        &self.images
    }

    pub fn verbs(&self) -> &[ProcRef] {
        &self.verbs
    }
}

/// Which per-connection object set a client list mirrors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientObjects {
    Screen,
    Images,
}

/// Per-connection state the network layer reads: what is on screen, which images are visible,
/// which verbs are available.
#[derive(Default)]
pub struct ClientRegistry {
    connections: SlotMap<ConnectionId, Connection>,
}

impl ClientRegistry {
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn connections(&self) -> impl Iterator<Item = (ConnectionId, &Connection)> {
        self.connections.iter()
    }

    fn set_of(&mut self, id: ConnectionId, which: ClientObjects) -> Option<&mut FnvHashSet<ObjectId>> {
        let connection = self.connections.get_mut(id)?;
        Some(match which {
            ClientObjects::Screen => &mut connection.screen,
            ClientObjects::Images => &mut connection.images,
        })
    }

    pub(crate) fn register(&mut self, id: ConnectionId, which: ClientObjects, object: ObjectId) {
        if let Some(set) = self.set_of(id, which) {
            set.insert(object);
        }
    }

    pub(crate) fn unregister(&mut self, id: ConnectionId, which: ClientObjects, object: ObjectId) {
        if let Some(set) = self.set_of(id, which) {
            set.remove(&object);
        }
    }

    pub(crate) fn set_verbs(&mut self, id: ConnectionId, verbs: Vec<ProcRef>) {
        if let Some(connection) = self.connections.get_mut(id) {
            connection.verbs = verbs;
            connection.verbs_dirty = true;
        }
    }

    /// The connection's verb list if it changed since the last call.
    pub fn take_verb_update(&mut self, id: ConnectionId) -> Option<Vec<ProcRef>> {
        let connection = self.connections.get_mut(id)?;
        if !std::mem::take(&mut connection.verbs_dirty) {
            return None;
        }
        Some(connection.verbs.clone())
    }

    pub(crate) fn remove(&mut self, id: ConnectionId) -> Option<Connection> {
        self.connections.remove(id)
    }

    /// Drop a deleted object from every screen and image set.
    pub(crate) fn forget(&mut self, object: ObjectId) {
        for (_, connection) in self.connections.iter_mut() {
            connection.screen.remove(&object);
            connection.images.remove(&object);
        }
    }
}

impl Runtime {
    /// Register a new connection and create its `/client` object.
    pub fn connect_client(&mut self, ckey: &str) -> Result<(ConnectionId, ObjectId)> {
        let def = self.tree.get("/client")?;
        let verbs = def.verbs.clone();
        let connection = self.clients.connections.insert(Connection {
            ckey: ckey.into(),
            client: ObjectId::default(),
            screen: FnvHashSet::default(),
            images: FnvHashSet::default(),
            verbs,
            verbs_dirty: true,
        });
        let client = self.insert_object(DreamObject::new(def, ObjectKind::Client(connection)).into());
        if let Some(c) = self.clients.connections.get_mut(connection) {
            c.client = client;
        }
        tracing::debug!(ckey, ?connection, "client connected");
        Ok((connection, client))
    }

    /// Drop a connection by deleting its client object.
    pub fn disconnect_client(&mut self, connection: ConnectionId) {
        if let Some(client) = self.clients.connection(connection).map(|c| c.client) {
            self.delete(client);
        }
    }

    pub(crate) fn client_connection(&self, client: ObjectId) -> Result<ConnectionId> {
        let object = self.object(client)?;
        match object.kind {
            ObjectKind::Client(connection) => Ok(connection),
            _ => Err(RuntimeError::TypeCast {
                value: object.def.path.to_string(),
                expected: "client",
            }),
        }
    }
}
