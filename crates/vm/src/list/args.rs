use std::cell::RefCell;
use std::rc::Rc;

use super::{slot, Collection};
use crate::error::{Result, RuntimeError};
use crate::runtime::Runtime;
use crate::value::Value;

/// `args` of a running proc. Shares the argument slots with its [`Frame`](crate::frame::Frame),
/// so the arity is fixed.
pub struct ProcArgsList {
    args: Rc<RefCell<Vec<Value>>>,
}

impl ProcArgsList {
    pub fn new(args: Rc<RefCell<Vec<Value>>>) -> Self {
        ProcArgsList { args }
    }
}

impl Collection for ProcArgsList {
    fn kind(&self) -> &'static str {
        "proc arguments"
    }

    fn values(&self, _rt: &mut Runtime) -> Result<Vec<Value>> {
        Ok(self.args.borrow().clone())
    }

    fn len(&self, _rt: &mut Runtime) -> Result<usize> {
        Ok(self.args.borrow().len())
    }

    fn get_value(&self, _rt: &mut Runtime, key: &Value) -> Result<Value> {
        let args = self.args.borrow();
        match key.as_index()? {
            Some(index) => Ok(args[slot(index, args.len())?].clone()),
            None => Err(RuntimeError::InvalidIndex(key.to_string())),
        }
    }

    fn set_value(
        &mut self,
        _rt: &mut Runtime,
        key: &Value,
        value: Value,
        _allow_growth: bool,
    ) -> Result<()> {
        let mut args = self.args.borrow_mut();
        match key.as_index()? {
            Some(index) => {
                let i = slot(index, args.len())?;
                args[i] = value;
                Ok(())
            }
            None => Err(RuntimeError::InvalidIndex(key.to_string())),
        }
    }
}
