use smol_str::SmolStr;

use super::{slot, Collection};
use crate::error::Result;
use crate::object::ObjectId;
use crate::runtime::Runtime;
use crate::value::Value;

/// `savefile.dir`: entry names of the current directory, sorted.
pub struct SavefileDirList {
    savefile: ObjectId,
}

impl SavefileDirList {
    pub fn new(savefile: ObjectId) -> Self {
        SavefileDirList { savefile }
    }
}

impl Collection for SavefileDirList {
    fn kind(&self) -> &'static str {
        "savefile directory"
    }

    fn values(&self, rt: &mut Runtime) -> Result<Vec<Value>> {
        let names = rt.with_savefile(self.savefile, false, |s| s.dir_names())?;
        Ok(names.iter().map(Value::string).collect())
    }

    /// Renames the entry at an index.
    fn set_value(
        &mut self,
        rt: &mut Runtime,
        key: &Value,
        value: Value,
        _allow_growth: bool,
    ) -> Result<()> {
        let names = rt.with_savefile(self.savefile, false, |s| s.dir_names())?;
        let index = key.must_get_as::<f32>()? as i64;
        let from = &names[slot(index, names.len())?];
        let to = value.must_get_as::<SmolStr>()?;
        rt.with_savefile(self.savefile, true, |s| s.rename(from, &to))?
    }

    /// Creates a directory.
    fn add_value(&mut self, rt: &mut Runtime, value: Value) -> Result<()> {
        let name = value.must_get_as::<SmolStr>()?;
        rt.with_savefile(self.savefile, true, |s| s.make_dir(&name))
    }

    /// Deletes an entry and everything under it.
    fn remove_value(&mut self, rt: &mut Runtime, value: &Value) -> Result<()> {
        if let Some(name) = value.as_str() {
            rt.with_savefile(self.savefile, true, |s| s.remove(name))?;
        }
        Ok(())
    }
}
