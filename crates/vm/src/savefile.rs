//! Persistent key-value trees behind `/savefile` objects, stored as JSON.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use base64::Engine;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};
use crate::list::GenericList;
use crate::object::{DreamObject, ObjectId, ObjectKind};
use crate::runtime::Runtime;
use crate::value::Value;

/// One named node: its payload plus child nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveNode {
    #[serde(flatten)]
    pub entry: SaveEntry,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub nodes: BTreeMap<String, SaveNode>,
}

impl SaveNode {
    pub fn dir() -> Self {
        SaveNode::new(SaveEntry::Dir)
    }

    pub fn new(entry: SaveEntry) -> Self {
        SaveNode {
            entry,
            nodes: BTreeMap::new(),
        }
    }

    fn at(&self, path: &[String]) -> Option<&SaveNode> {
        path.iter().try_fold(self, |node, seg| node.nodes.get(seg))
    }

    /// The node at `path`, creating missing directories on the way.
    fn at_or_create(&mut self, path: &[String]) -> &mut SaveNode {
        let mut node = self;
        for seg in path {
            node = node.nodes.entry(seg.clone()).or_insert_with(SaveNode::dir);
        }
        node
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type", rename_all = "lowercase")]
pub enum SaveEntry {
    Dir,
    Primitive {
        value: SavedValue,
    },
    List {
        data: Vec<SavedValue>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assoc: Option<Vec<(SavedValue, SavedValue)>>,
    },
    /// An object referring back to the one being saved.
    Path {
        path: String,
    },
    File {
        name: Option<String>,
        ext: Option<String>,
        length: usize,
        crc32: u32,
        encoding: String,
        data: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SavedValue {
    Null,
    Float(f32),
    String(String),
    Type {
        #[serde(rename = "type")]
        path: String,
    },
}

/// The per-object state of an open savefile.
pub struct Savefile {
    path: PathBuf,
    root: Rc<RefCell<SaveNode>>,
    cd: Vec<String>,
    temporary: bool,
}

impl Savefile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// The current directory, always absolute.
    pub fn cd(&self) -> String {
        format!("/{}", self.cd.join("/"))
    }

    /// Change directory. Relative paths start at the current one; missing directories are
    /// created.
    pub fn set_cd(&mut self, to: &str) {
        let cd = resolve(&self.cd, to);
        self.root.borrow_mut().at_or_create(&cd);
        self.cd = cd;
    }

    /// A copy of the entry under `key`, or the current directory itself.
    pub fn get(&self, key: Option<&str>) -> Option<SaveNode> {
        let root = self.root.borrow();
        match key {
            None => root.at(&self.cd).cloned(),
            Some(key) => root.at(&resolve(&self.cd, key)).cloned(),
        }
    }

    /// Write `entry` under `key`. `None` and `"."` append a `.N` entry to the current
    /// directory. Existing children of the replaced node are kept.
    pub fn set(&mut self, key: Option<&str>, entry: SaveEntry) {
        let mut root = self.root.borrow_mut();
        let (parent, name) = match key {
            None | Some(".") => {
                let dir = root.at_or_create(&self.cd);
                let name = format!(".{}", dir.nodes.len());
                (self.cd.clone(), name)
            }
            Some(key) => {
                let mut path = resolve(&self.cd, key);
                match path.pop() {
                    Some(name) => (path, name),
                    None => return,
                }
            }
        };
        let dir = root.at_or_create(&parent);
        let node = dir.nodes.entry(name).or_insert_with(SaveNode::dir);
        node.entry = entry;
    }

    /// Entry names of the current directory, sorted.
    pub fn dir_names(&self) -> Vec<String> {
        self.root
            .borrow()
            .at(&self.cd)
            .map(|dir| dir.nodes.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn make_dir(&mut self, name: &str) {
        let mut root = self.root.borrow_mut();
        root.at_or_create(&self.cd)
            .nodes
            .entry(name.to_owned())
            .or_insert_with(SaveNode::dir);
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let mut root = self.root.borrow_mut();
        let dir = root.at_or_create(&self.cd);
        let node = dir.nodes.remove(from).ok_or_else(|| {
            RuntimeError::invalid_arguments(format!("no savefile entry named \"{}\"", from))
        })?;
        dir.nodes.insert(to.to_owned(), node);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let mut root = self.root.borrow_mut();
        root.at_or_create(&self.cd).nodes.remove(name).is_some()
    }
}

/// Apply `to` to the directory `cd`. `..` climbs, and stops at the root.
fn resolve(cd: &[String], to: &str) -> Vec<String> {
    let mut path = if to.starts_with('/') {
        vec![]
    } else {
        cd.to_vec()
    };
    for seg in to.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                path.pop();
            }
            seg => path.push(seg.to_owned()),
        }
    }
    path
}

struct OpenTree {
    root: Rc<RefCell<SaveNode>>,
    open: usize,
}

/// Trees of every open savefile, shared by all objects open on the same file.
#[derive(Default)]
pub struct SavefileRegistry {
    trees: FnvHashMap<PathBuf, OpenTree>,
    dirty: BTreeSet<PathBuf>,
    next_temporary: u32,
}

impl SavefileRegistry {
    fn open(&mut self, path: &Path) -> Result<Rc<RefCell<SaveNode>>> {
        if let Some(tree) = self.trees.get_mut(path) {
            tree.open += 1;
            return Ok(tree.root.clone());
        }
        let root = match fs::read_to_string(path) {
            Ok(text) if !text.trim().is_empty() => serde_json::from_str(&text)?,
            Ok(_) => SaveNode::dir(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SaveNode::dir(),
            Err(e) => return Err(e.into()),
        };
        let root = Rc::new(RefCell::new(root));
        self.trees.insert(
            path.to_owned(),
            OpenTree {
                root: root.clone(),
                open: 1,
            },
        );
        Ok(root)
    }

    pub(crate) fn mark_dirty(&mut self, path: &Path) {
        self.dirty.insert(path.to_owned());
    }

    fn flush(&mut self, path: &Path) -> Result<()> {
        if !self.dirty.remove(path) {
            return Ok(());
        }
        let tree = match self.trees.get(path) {
            Some(tree) => tree,
            None => return Ok(()),
        };
        let text = serde_json::to_string(&*tree.root.borrow())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
        tracing::trace!(path = %path.display(), "savefile flushed");
        Ok(())
    }

    /// Write every savefile changed since the last flush. Failures are logged.
    pub fn flush_all(&mut self) {
        let dirty: Vec<PathBuf> = self.dirty.iter().cloned().collect();
        for path in dirty {
            if let Err(e) = self.flush(&path) {
                tracing::error!(path = %path.display(), error = %e, "failed to flush savefile");
            }
        }
    }

    fn close(&mut self, savefile: &Savefile) {
        let path = savefile.path();
        if savefile.temporary {
            self.dirty.remove(path);
            if let Err(e) = fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove temporary savefile");
                }
            }
        } else if let Err(e) = self.flush(path) {
            tracing::error!(path = %path.display(), error = %e, "failed to flush savefile");
        }

        let last = match self.trees.get_mut(path) {
            Some(tree) => {
                tree.open -= 1;
                tree.open == 0
            }
            None => false,
        };
        if last {
            self.trees.remove(path);
        }
    }
}

impl Runtime {
    /// Open a savefile. A relative `name` resolves against the savefile root; no name opens a
    /// temporary savefile removed on close.
    pub fn open_savefile(&mut self, name: Option<&str>) -> Result<ObjectId> {
        let (path, temporary) = match name {
            Some(name) => (self.config.savefile_root.join(name), false),
            None => {
                self.savefiles.next_temporary += 1;
                let name = format!("tmp{}.sav", self.savefiles.next_temporary);
                (self.config.savefile_root.join(name), true)
            }
        };
        let root = self.savefiles.open(&path)?;
        tracing::debug!(path = %path.display(), temporary, "savefile opened");

        let savefile = Savefile {
            path,
            root,
            cd: vec![],
            temporary,
        };
        let def = self.tree.get("/savefile")?;
        let object = DreamObject::new(def, ObjectKind::Savefile(RefCell::new(savefile)));
        Ok(self.insert_object(object.into()))
    }

    /// Run `f` on an open savefile. Marks the file dirty when `write` is set.
    pub(crate) fn with_savefile<R>(
        &mut self,
        id: ObjectId,
        write: bool,
        f: impl FnOnce(&mut Savefile) -> R,
    ) -> Result<R> {
        let object = self.object(id)?;
        let cell = match &object.kind {
            ObjectKind::Savefile(cell) => cell,
            _ => {
                return Err(RuntimeError::TypeCast {
                    value: object.def.path.to_string(),
                    expected: "savefile",
                })
            }
        };
        let mut savefile = cell
            .try_borrow_mut()
            .map_err(|_| RuntimeError::not_supported("re-entrant access", "savefile"))?;
        let result = f(&mut savefile);
        if write {
            self.savefiles.mark_dirty(savefile.path());
        }
        Ok(result)
    }

    /// `savefile[key]`, or the current directory's own value. Missing entries are `Null`.
    pub fn savefile_read(&mut self, id: ObjectId, key: Option<&str>) -> Result<Value> {
        match self.with_savefile(id, false, |s| s.get(key))? {
            Some(node) => self.realize(&node.entry),
            None => Ok(Value::Null),
        }
    }

    /// `savefile[key] = value`, or `savefile << value` with no key.
    pub fn savefile_write(&mut self, id: ObjectId, key: Option<&str>, value: &Value) -> Result<()> {
        let entry = self.save_entry(value)?;
        self.with_savefile(id, true, |s| s.set(key, entry))
    }

    pub(crate) fn close_savefile(&mut self, savefile: &Savefile) {
        self.savefiles.close(savefile);
    }

    fn save_entry(&mut self, value: &Value) -> Result<SaveEntry> {
        let entry = match value {
            Value::Resource(resource) => {
                let data = match (&resource.data, &resource.path) {
                    (Some(data), _) => data.clone(),
                    (None, Some(path)) => fs::read(path.as_str())?,
                    (None, None) => vec![],
                };
                let path = resource.path.as_deref().map(Path::new);
                SaveEntry::File {
                    name: path
                        .and_then(Path::file_stem)
                        .map(|s| s.to_string_lossy().into_owned()),
                    ext: path
                        .and_then(Path::extension)
                        .map(|s| s.to_string_lossy().into_owned()),
                    length: data.len(),
                    crc32: crc32fast::hash(&data),
                    encoding: "base64".to_owned(),
                    data: base64::engine::general_purpose::STANDARD.encode(&data),
                }
            }
            Value::Object(_) => match self.try_as_list(value) {
                Some(list) => {
                    let data = list.values(self)?.iter().map(saved_value).collect();
                    let assoc = if list.is_associative(self)? {
                        let entries = list.assoc_entries(self)?;
                        Some(
                            entries
                                .iter()
                                .map(|(k, v)| (saved_value(k), saved_value(v)))
                                .collect(),
                        )
                    } else {
                        None
                    };
                    SaveEntry::List { data, assoc }
                }
                None => SaveEntry::Primitive {
                    value: SavedValue::Null,
                },
            },
            value => SaveEntry::Primitive {
                value: saved_value(value),
            },
        };
        Ok(entry)
    }

    fn realize(&mut self, entry: &SaveEntry) -> Result<Value> {
        match entry {
            SaveEntry::Dir | SaveEntry::Path { .. } => Ok(Value::Null),
            SaveEntry::Primitive { value } => self.realize_value(value),
            SaveEntry::List { data, assoc } => {
                let values = data
                    .iter()
                    .map(|v| self.realize_value(v))
                    .collect::<Result<Vec<_>>>()?;
                let mut list = GenericList::from_values(values);
                for (key, value) in assoc.iter().flatten() {
                    let key = self.realize_value(key)?;
                    let value = self.realize_value(value)?;
                    list.set_assoc(key, value);
                }
                Ok(self.new_list_with(list).value())
            }
            SaveEntry::File { data, .. } => {
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(data)
                    .map_err(|e| {
                        RuntimeError::invalid_arguments(format!(
                            "savefile file entry is not valid base64: {}",
                            e
                        ))
                    })?;
                Ok(Value::Resource(self.tree.new_resource(None, Some(bytes))))
            }
        }
    }

    fn realize_value(&self, value: &SavedValue) -> Result<Value> {
        Ok(match value {
            SavedValue::Null => Value::Null,
            SavedValue::Float(f) => Value::Float(*f),
            SavedValue::String(s) => Value::string(s),
            SavedValue::Type { path } => Value::Type(self.tree.get(path)?),
        })
    }
}

fn saved_value(value: &Value) -> SavedValue {
    match value {
        Value::Float(f) => SavedValue::Float(*f),
        Value::String(s) => SavedValue::String(s.to_string()),
        Value::Type(t) => SavedValue::Type {
            path: t.path.to_string(),
        },
        _ => SavedValue::Null,
    }
}

#[cfg(test)]
mod test {
    use expect_test::expect;
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    fn scratch() -> Savefile {
        Savefile {
            path: PathBuf::from("scratch.sav"),
            root: Rc::new(RefCell::new(SaveNode::dir())),
            cd: vec![],
            temporary: true,
        }
    }

    fn primitive(value: f32) -> SaveEntry {
        SaveEntry::Primitive {
            value: SavedValue::Float(value),
        }
    }

    #[test]
    fn test_cd_resolves_relative_paths() {
        let mut save = scratch();
        save.set_cd("players/alice");
        assert_eq!(save.cd(), "/players/alice");
        save.set_cd("../bob");
        assert_eq!(save.cd(), "/players/bob");
        save.set_cd("/");
        assert_eq!(save.cd(), "/");
        assert_eq!(save.dir_names(), vec!["players"]);
        save.set_cd("..");
        assert_eq!(save.cd(), "/");
    }

    #[test]
    fn test_missing_reads_do_not_create_entries() {
        let save = scratch();
        assert_eq!(save.get(Some("nothing/here")), None);
        assert!(save.dir_names().is_empty());
    }

    #[test]
    fn test_write_keeps_children_and_appends_anonymous_entries() {
        let mut save = scratch();
        save.set(Some("hp/max"), primitive(100.0));
        save.set(Some("hp"), primitive(42.0));
        assert_eq!(save.get(Some("hp/max")).map(|n| n.entry), Some(primitive(100.0)));
        assert_eq!(save.get(Some("hp")).map(|n| n.entry), Some(primitive(42.0)));

        save.set(None, primitive(1.0));
        save.set(Some("."), primitive(2.0));
        assert_eq!(save.dir_names(), vec![".1", ".2", "hp"]);
    }

    #[test]
    fn test_dir_edits() {
        let mut save = scratch();
        save.make_dir("b");
        save.make_dir("a");
        save.rename("b", "c").unwrap();
        assert_eq!(save.dir_names(), vec!["a", "c"]);
        assert!(save.rename("zzz", "y").is_err());
        assert!(save.remove("a"));
        assert!(!save.remove("a"));
    }

    #[test]
    fn test_json_layout() {
        let mut save = scratch();
        save.set(Some("name"), SaveEntry::Primitive {
            value: SavedValue::String("crate".to_owned()),
        });
        save.set(Some("items"), SaveEntry::List {
            data: vec![SavedValue::Float(1.0), SavedValue::String("key".to_owned())],
            assoc: Some(vec![(
                SavedValue::String("key".to_owned()),
                SavedValue::Type {
                    path: "/obj".to_owned(),
                },
            )]),
        });
        let json = serde_json::to_string(&*save.root.borrow()).unwrap();
        expect![[r#"{"$type":"dir","nodes":{"items":{"$type":"list","data":[1.0,"key"],"assoc":[["key",{"type":"/obj"}]]},"name":{"$type":"primitive","value":"crate"}}}"#]]
            .assert_eq(&json);

        let parsed: SaveNode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, *save.root.borrow());
    }

    #[test]
    fn test_file_entries_carry_checksum_and_base64() {
        let mut rt = Runtime::new(crate::runtime::RuntimeConfig::default()).unwrap();
        let resource = rt.tree.new_resource(None, Some(b"123456789".to_vec()));
        let entry = rt.save_entry(&Value::Resource(resource)).unwrap();
        match &entry {
            SaveEntry::File {
                length,
                crc32,
                data,
                ..
            } => {
                assert_eq!(*length, 9);
                assert_eq!(*crc32, 0xcbf4_3926);
                assert_eq!(data, "MTIzNDU2Nzg5");
            }
            other => panic!("unexpected entry {:?}", other),
        }

        match rt.realize(&entry).unwrap() {
            Value::Resource(read) => assert_eq!(read.data.as_deref(), Some(&b"123456789"[..])),
            other => panic!("unexpected value {:?}", other),
        }

        let broken = SaveEntry::File {
            name: None,
            ext: None,
            length: 1,
            crc32: 0,
            encoding: "base64".to_owned(),
            data: "a".to_owned(),
        };
        assert!(matches!(
            rt.realize(&broken),
            Err(RuntimeError::InvalidArguments(_))
        ));
    }
}
