//! Object deletion and the per-tick work that goes with it.

use std::sync::mpsc;

use crate::object::{AtomRole, ObjectId, ObjectKind};
use crate::runtime::Runtime;

/// Requests deletions from any thread. They happen on the next [`Runtime::tick`].
#[derive(Clone, Debug)]
pub struct DeletionSender(mpsc::Sender<ObjectId>);

impl DeletionSender {
    /// Queue `object` for deletion. Returns `false` if the runtime is gone.
    pub fn delete(&self, object: ObjectId) -> bool {
        self.0.send(object).is_ok()
    }
}

pub(crate) struct DeletionQueue {
    sender: mpsc::Sender<ObjectId>,
    receiver: mpsc::Receiver<ObjectId>,
}

impl DeletionQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        DeletionQueue { sender, receiver }
    }
}

impl Runtime {
    pub fn deletion_sender(&self) -> DeletionSender {
        DeletionSender(self.deletions.sender.clone())
    }

    /// Delete every object queued through a [`DeletionSender`]. Returns how many were queued.
    pub fn process_deletions(&mut self) -> usize {
        let queued: Vec<ObjectId> = self.deletions.receiver.try_iter().collect();
        for &id in &queued {
            self.delete(id);
        }
        queued.len()
    }

    /// End-of-tick housekeeping: queued deletions, then savefile flushes.
    pub fn tick(&mut self) {
        let deleted = self.process_deletions();
        self.savefiles.flush_all();
        tracing::trace!(deleted, "tick");
    }

    /// Delete an object now. Deleting a deleted object does nothing.
    pub fn delete(&mut self, id: ObjectId) {
        let object = match self.objects.get(id) {
            Some(object) if !object.is_deleted() => object.clone(),
            _ => return,
        };
        if id == self.world {
            tracing::warn!("refusing to delete the world");
            return;
        }
        object.mark_deleted();

        match &object.kind {
            ObjectKind::Atom(atom) => match atom.role {
                AtomRole::Movable | AtomRole::Image => {
                    if let Some(container) = atom.loc() {
                        self.detach_from(container, id);
                        atom.set_loc(None);
                    }
                    let children = std::mem::take(&mut *atom.children_mut());
                    for child in children {
                        if let Some(child) = self.objects.get(child).and_then(|o| o.atom()) {
                            child.set_loc(None);
                        }
                    }
                }
                AtomRole::Turf(coord) => {
                    if self.map.turf_at(coord) == Some(id) {
                        for movable in self.map.take_movables(coord) {
                            if let Some(atom) = self.objects.get(movable).and_then(|o| o.atom()) {
                                atom.set_loc(None);
                            }
                        }
                        self.map.clear_turf(coord, id);
                    }
                }
                AtomRole::Area => {
                    let default_area = self.map.default_area();
                    for coord in self.map.cells_in_area(id) {
                        self.map.set_area(coord, default_area);
                    }
                }
            },
            ObjectKind::Client(connection) => {
                self.clients.remove(*connection);
            }
            ObjectKind::Savefile(savefile) => match savefile.try_borrow() {
                Ok(savefile) => self.close_savefile(&savefile),
                Err(_) => tracing::warn!(?id, "savefile deleted while in use; not flushed"),
            },
            ObjectKind::Filter(_) => self.filters.detach(id),
            _ => {}
        }
        for filter in self.filters.stale(id, 0) {
            self.delete(filter);
        }
        self.appearances.remove_atom(id);

        for list in object.take_cached_lists() {
            self.delete(list);
        }
        self.forget_in_clients(id);

        self.objects.remove(id);
        tracing::debug!(?id, ty = %object.def.path, "object deleted");
    }

    /// Drop `id` from every connection's screen and image mirrors.
    fn forget_in_clients(&mut self, id: ObjectId) {
        let clients: Vec<ObjectId> = self.clients.connections().map(|(_, c)| c.client).collect();
        for client in clients {
            let object = match self.objects.get(client) {
                Some(object) => object.clone(),
                None => continue,
            };
            for name in ["screen", "images"] {
                if let Some(list) = object.cached_list(name).and_then(|l| self.list(l).ok()) {
                    list.forget(id);
                }
            }
        }
        self.clients.forget(id);
    }
}
