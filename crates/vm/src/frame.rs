use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Result, RuntimeError};
use crate::list::args::ProcArgsList;
use crate::list::ListRef;
use crate::object::ObjectId;
use crate::runtime::Runtime;
use crate::tree::ProcRef;
use crate::value::Value;

/// The live state of one proc call.
pub struct Frame {
    /// The proc this frame is running.
    pub proc: ProcRef,
    pub src: Option<ObjectId>,
    pub usr: Option<ObjectId>,
    /// Argument slots, shared with any `args` list handed out for this frame.
    args: Rc<RefCell<Vec<Value>>>,
    stack: Vec<Value>,
}

impl Frame {
    /// Create a frame with one slot per declared argument. Extra positional arguments get
    /// slots of their own; missing ones are `Null`.
    pub fn new(proc: ProcRef, src: Option<ObjectId>, usr: Option<ObjectId>, mut args: Vec<Value>) -> Self {
        if args.len() < proc.arguments.len() {
            args.resize(proc.arguments.len(), Value::Null);
        }
        Self {
            proc,
            src,
            usr,
            args: Rc::new(RefCell::new(args)),
            stack: vec![],
        }
    }

    pub fn pop(&mut self) -> Result<Value> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeError::invalid_arguments("popping empty stack"))
    }

    pub fn push(&mut self, val: Value) {
        self.stack.push(val);
    }

    pub fn pop2(&mut self) -> Result<(Value, Value)> {
        let rhs = self.pop()?;
        let lhs = self.pop()?;
        Ok((lhs, rhs))
    }

    /// Number of argument slots.
    pub fn arity(&self) -> usize {
        self.args.borrow().len()
    }

    /// Argument by declared name.
    pub fn argument(&self, name: &str) -> Option<Value> {
        let index = self.proc.arguments.iter().position(|a| a == name)?;
        self.args.borrow().get(index).cloned()
    }

    pub fn set_argument(&self, name: &str, value: Value) -> Result<()> {
        let index = self
            .proc
            .arguments
            .iter()
            .position(|a| a == name)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_owned(),
                ty: self.proc.to_string(),
            })?;
        self.args.borrow_mut()[index] = value;
        Ok(())
    }

    /// Snapshot of all argument slots.
    pub fn arguments(&self) -> Vec<Value> {
        self.args.borrow().clone()
    }

    /// The `args` list: a window onto this frame's argument slots.
    pub fn args_list(&self, rt: &mut Runtime) -> ListRef {
        rt.new_list_with(ProcArgsList::new(self.args.clone()))
    }
}
