//! Picks the list variant that backs a list-valued var.

use std::rc::Rc;

use crate::client::ClientObjects;
use crate::error::Result;
use crate::list::appearance::{FiltersList, Layer, OverlaysList};
use crate::list::client::ClientObjectsList;
use crate::list::contents::{AreaContents, MovableContents, TurfContents, WorldContents};
use crate::list::savefile::SavefileDirList;
use crate::list::vars::ObjectVarsList;
use crate::list::verbs::{AtomVerbsList, ClientVerbsList};
use crate::list::{Collection, ListRef};
use crate::object::{AtomRole, DreamObject, ObjectId, ObjectKind};
use crate::runtime::Runtime;

/// Whether a built view is kept on the object or rebuilt on every read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Lifetime {
    Cached,
    Ephemeral,
}

impl Runtime {
    /// The list backing var `name` of `object`, if that var is list-backed.
    pub(crate) fn special_list(
        &mut self,
        id: ObjectId,
        object: &Rc<DreamObject>,
        name: &str,
    ) -> Result<Option<ListRef>> {
        if let Some(cached) = object.cached_list(name) {
            if let Ok(list) = self.list(cached) {
                return Ok(Some(list));
            }
        }

        let (collection, lifetime) = match self.build_view(id, object, name)? {
            Some(view) => view,
            None => return Ok(None),
        };
        let list = self.new_list_boxed(collection);
        if lifetime == Lifetime::Cached {
            object.cache_list(name, list.id());
        }
        tracing::trace!(?id, name, ?lifetime, "list view built");
        Ok(Some(list))
    }

    fn build_view(
        &mut self,
        id: ObjectId,
        object: &DreamObject,
        name: &str,
    ) -> Result<Option<(Box<dyn Collection>, Lifetime)>> {
        use Lifetime::*;

        if name == "vars" {
            return Ok(Some((boxed(ObjectVarsList::new(id)), Cached)));
        }
        let view: (Box<dyn Collection>, Lifetime) = match (&object.kind, name) {
            (ObjectKind::Atom(_), "overlays") => {
                (boxed(OverlaysList::new(id, Layer::Overlays)), Cached)
            }
            (ObjectKind::Atom(_), "underlays") => {
                (boxed(OverlaysList::new(id, Layer::Underlays)), Cached)
            }
            (ObjectKind::Atom(atom), "filters") if atom.role != AtomRole::Image => {
                (boxed(FiltersList::new(id)), Cached)
            }
            (ObjectKind::Atom(atom), "verbs") if atom.role != AtomRole::Image => {
                (boxed(AtomVerbsList::new(id)), Ephemeral)
            }
            (ObjectKind::Atom(atom), "contents") => match atom.role {
                AtomRole::Turf(_) => (boxed(TurfContents::new(id)), Cached),
                AtomRole::Area => (boxed(AreaContents::new(id)), Cached),
                AtomRole::Movable => (boxed(MovableContents::new(id)), Cached),
                AtomRole::Image => return Ok(None),
            },
            (ObjectKind::World, "contents") => (boxed(WorldContents), Ephemeral),
            (ObjectKind::Client(connection), "verbs") => {
                let verbs = self
                    .clients
                    .connection(*connection)
                    .map(|c| c.verbs().to_vec())
                    .unwrap_or_default();
                (boxed(ClientVerbsList::new(*connection, verbs)), Cached)
            }
            (ObjectKind::Client(connection), "screen") => (
                boxed(ClientObjectsList::new(*connection, ClientObjects::Screen)),
                Cached,
            ),
            (ObjectKind::Client(connection), "images") => (
                boxed(ClientObjectsList::new(*connection, ClientObjects::Images)),
                Cached,
            ),
            (ObjectKind::Savefile(_), "dir") => (boxed(SavefileDirList::new(id)), Cached),
            _ => return Ok(None),
        };
        Ok(Some(view))
    }
}

fn boxed(collection: impl Collection + 'static) -> Box<dyn Collection> {
    Box::new(collection)
}
