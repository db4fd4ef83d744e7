//! Binary operators, dispatched on the left-hand operand.

use smol_str::SmolStr;

use crate::error::{Result, RuntimeError};
use crate::list::{GenericList, ListRef};
use crate::matrix::Matrix;
use crate::object::ObjectKind;
use crate::runtime::Runtime;
use crate::value::Value;
use crate::vector::Vector;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// `|`
    Or,
    /// `&`
    And,
    /// `+=`
    Append,
    /// `-=`
    Remove,
    /// `*=`
    Scale,
    /// `/=`
    Shrink,
    /// `|=`
    Combine,
    /// `&=`
    Mask,
    /// `~=`
    Equivalent,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Or => "|",
            BinaryOp::And => "&",
            BinaryOp::Append => "+=",
            BinaryOp::Remove => "-=",
            BinaryOp::Scale => "*=",
            BinaryOp::Shrink => "/=",
            BinaryOp::Combine => "|=",
            BinaryOp::Mask => "&=",
            BinaryOp::Equivalent => "~=",
        }
    }

    /// The plain operator a compound assignment applies when it cannot mutate its target.
    fn non_mutating(self) -> BinaryOp {
        match self {
            BinaryOp::Append => BinaryOp::Add,
            BinaryOp::Remove => BinaryOp::Subtract,
            BinaryOp::Scale => BinaryOp::Multiply,
            BinaryOp::Shrink => BinaryOp::Divide,
            BinaryOp::Combine => BinaryOp::Or,
            BinaryOp::Mask => BinaryOp::And,
            op => op,
        }
    }
}

fn invalid(op: BinaryOp, lhs: &Value, rhs: &Value) -> RuntimeError {
    RuntimeError::InvalidOperation {
        op: op.symbol(),
        lhs: lhs.to_string(),
        rhs: rhs.to_string(),
    }
}

impl Runtime {
    /// Evaluate `lhs op rhs`. Compound operators on lists, matrices and vectors mutate `lhs`
    /// and return it.
    pub fn binary_op(&mut self, op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
        if let Value::Object(id) = lhs {
            let object = self.object(*id)?;
            return match &object.kind {
                ObjectKind::List(_) => {
                    let list = self.list(*id)?;
                    self.list_op(op, &list, rhs)
                }
                ObjectKind::Matrix(cell) => {
                    let result = self.matrix_op(op, cell.get(), lhs, rhs)?;
                    match result {
                        Operand::Matrix(m) if is_in_place(op) => {
                            cell.set(m);
                            Ok(lhs.clone())
                        }
                        result => self.realize_operand(result),
                    }
                }
                ObjectKind::Vector(cell) => {
                    let result = self.vector_op(op, cell.get(), lhs, rhs)?;
                    match result {
                        Operand::Vector(v) if matches!(op, BinaryOp::Append | BinaryOp::Remove) => {
                            cell.set(v);
                            Ok(lhs.clone())
                        }
                        result => self.realize_operand(result),
                    }
                }
                _ => Err(invalid(op, lhs, rhs)),
            };
        }

        // Numbers scale matrices and vectors from either side.
        if let (Value::Float(k), BinaryOp::Multiply) = (lhs, op) {
            if let Some(m) = self.matrix_of(rhs) {
                return Ok(Value::Object(self.new_matrix(m.scalar(*k))?));
            }
            if let Some(v) = self.vector_value(rhs) {
                return Ok(Value::Object(self.new_vector(v.scale(*k))?));
            }
        }
        self.scalar_op(op.non_mutating(), lhs, rhs)
    }

    fn scalar_op(&mut self, op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
        let number = |v: &Value| match v {
            Value::Null => Some(0.0),
            Value::Float(f) => Some(*f),
            _ => None,
        };
        if op == BinaryOp::Equivalent {
            return Ok(Value::bool(self.equals(lhs, rhs)));
        }

        match (op, lhs, rhs) {
            (BinaryOp::Add, Value::String(a), Value::String(b)) => {
                let mut s = a.to_string();
                s.push_str(b);
                Ok(Value::String(SmolStr::new(s)))
            }
            (BinaryOp::Add | BinaryOp::Subtract, value, Value::Null) => Ok(value.clone()),
            (BinaryOp::Add, Value::Null, value @ Value::String(_)) => Ok(value.clone()),
            _ => {
                let (a, b) = match (number(lhs), number(rhs)) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(invalid(op, lhs, rhs)),
                };
                let result = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Subtract => a - b,
                    BinaryOp::Multiply => a * b,
                    BinaryOp::Divide if b == 0.0 => return Err(RuntimeError::DivideByZero),
                    BinaryOp::Divide => a / b,
                    BinaryOp::Or => ((a as i32) | (b as i32)) as f32,
                    BinaryOp::And => ((a as i32) & (b as i32)) as f32,
                    _ => return Err(invalid(op, lhs, rhs)),
                };
                Ok(Value::Float(result))
            }
        }
    }

    /// Values an operand contributes to a list operation: a list's elements, nothing for
    /// `null`, the value itself otherwise.
    fn operand_values(&mut self, value: &Value) -> Result<Vec<Value>> {
        match value {
            Value::Null => Ok(vec![]),
            value => match self.try_as_list(value) {
                Some(list) => list.values(self),
                None => Ok(vec![value.clone()]),
            },
        }
    }

    fn operand_snapshot(&mut self, value: &Value) -> Result<GenericList> {
        match self.try_as_list(value) {
            Some(list) => list.snapshot(self, 1, 0),
            None => Ok(GenericList::from_values(self.operand_values(value)?)),
        }
    }

    fn list_op(&mut self, op: BinaryOp, lhs: &ListRef, rhs: &Value) -> Result<Value> {
        match op {
            BinaryOp::Add => {
                let mut result = lhs.snapshot(self, 1, 0)?;
                for value in self.operand_values(rhs)? {
                    result.push(value);
                }
                Ok(self.new_list_with(result).value())
            }
            BinaryOp::Subtract => {
                let mut result = lhs.snapshot(self, 1, 0)?;
                for value in self.operand_values(rhs)? {
                    while result.remove(&value) {}
                }
                Ok(self.new_list_with(result).value())
            }
            BinaryOp::Or => {
                let left = lhs.snapshot(self, 1, 0)?;
                let right = self.operand_snapshot(rhs)?;
                Ok(self.new_list_with(left.union(&right)).value())
            }
            BinaryOp::And => {
                let keep = self.operand_values(rhs)?;
                let left = lhs.snapshot(self, 1, 0)?;
                let mut result = GenericList::new();
                for value in left.values().iter().filter(|v| keep.contains(v)) {
                    result.push(value.clone());
                }
                for (key, value) in left.assoc_entries() {
                    if result.contains(&key) {
                        result.set_assoc(key, value);
                    }
                }
                Ok(self.new_list_with(result).value())
            }
            BinaryOp::Append => {
                for value in self.operand_values(rhs)? {
                    lhs.add(self, value)?;
                }
                Ok(lhs.value())
            }
            BinaryOp::Remove => {
                for value in self.operand_values(rhs)? {
                    lhs.remove(self, &value)?;
                }
                Ok(lhs.value())
            }
            BinaryOp::Combine => {
                let right = self.operand_snapshot(rhs)?;
                for value in right.values() {
                    if !lhs.contains(self, value)? {
                        lhs.add(self, value.clone())?;
                    }
                }
                for (key, value) in right.assoc_entries() {
                    lhs.set(self, &key, value)?;
                }
                Ok(lhs.value())
            }
            BinaryOp::Mask => {
                let keep = self.operand_values(rhs)?;
                for value in lhs.values(self)? {
                    if !keep.contains(&value) {
                        lhs.remove(self, &value)?;
                    }
                }
                Ok(lhs.value())
            }
            BinaryOp::Equivalent => {
                let left = lhs.snapshot(self, 1, 0)?;
                let equal = match self.try_as_list(rhs) {
                    Some(right) => {
                        let right = right.snapshot(self, 1, 0)?;
                        left.values() == right.values()
                            && left.assoc_entries() == right.assoc_entries()
                    }
                    None => false,
                };
                Ok(Value::bool(equal))
            }
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Scale | BinaryOp::Shrink => {
                Err(invalid(op, &lhs.value(), rhs))
            }
        }
    }

    fn matrix_op(&mut self, op: BinaryOp, m: Matrix, lhs: &Value, rhs: &Value) -> Result<Operand> {
        let other = self.matrix_of(rhs);
        let result = match (op.non_mutating(), other, rhs) {
            (BinaryOp::Add, Some(r), _) => m.add(&r),
            (BinaryOp::Subtract, Some(r), _) => m.subtract(&r),
            (BinaryOp::Multiply, Some(r), _) => m.multiply(&r),
            (BinaryOp::Multiply, None, Value::Float(k)) => m.scalar(*k),
            (BinaryOp::Divide, None, Value::Float(k)) if *k == 0.0 => {
                return Err(RuntimeError::DivideByZero)
            }
            (BinaryOp::Divide, None, Value::Float(k)) => m.scalar(1.0 / k),
            (BinaryOp::Divide, Some(r), _) => match r.invert() {
                Some(inverse) => m.multiply(&inverse),
                None => return Err(invalid(op, lhs, rhs)),
            },
            (BinaryOp::Equivalent, Some(r), _) => return Ok(Operand::Value(Value::bool(m == r))),
            (BinaryOp::Equivalent, None, _) => return Ok(Operand::Value(Value::bool(false))),
            _ => return Err(invalid(op, lhs, rhs)),
        };
        Ok(Operand::Matrix(result))
    }

    fn vector_op(&mut self, op: BinaryOp, v: Vector, lhs: &Value, rhs: &Value) -> Result<Operand> {
        let other = self.vector_value(rhs);
        let result = match (op.non_mutating(), other, rhs) {
            (BinaryOp::Add, Some(r), _) => v.zip(&r, |a, b| a + b),
            (BinaryOp::Add, None, Value::Float(k)) => v.zip(&Vector::new_3d(*k, *k, *k), |a, b| a + b),
            (BinaryOp::Subtract, Some(r), _) => v.zip(&r, |a, b| a - b),
            (BinaryOp::Subtract, None, Value::Float(k)) => {
                v.zip(&Vector::new_3d(*k, *k, *k), |a, b| a - b)
            }
            (BinaryOp::Multiply, Some(r), _) => v.zip(&r, |a, b| a * b),
            (BinaryOp::Multiply, None, Value::Float(k)) => v.scale(*k),
            (BinaryOp::Divide, Some(r), _) => v.divide(&r)?,
            (BinaryOp::Divide, None, Value::Float(k)) if *k == 0.0 => {
                return Err(RuntimeError::DivideByZero)
            }
            (BinaryOp::Divide, None, Value::Float(k)) => v.scale(1.0 / k),
            (BinaryOp::Equivalent, other, _) => {
                return Ok(Operand::Value(Value::bool(other == Some(v))))
            }
            _ => return Err(invalid(op, lhs, rhs)),
        };
        // A scalar operand never makes a 2-D vector 3-D.
        let result = if v.is_3d() || other.map_or(false, |r| r.is_3d()) {
            result
        } else {
            Vector::new_2d(result.x, result.y)
        };
        Ok(Operand::Vector(result))
    }

    /// A vector object's value.
    fn vector_value(&self, value: &Value) -> Option<Vector> {
        let object = self.object(value.as_object()?).ok()?;
        match &object.kind {
            ObjectKind::Vector(v) => Some(v.get()),
            _ => None,
        }
    }

    fn realize_operand(&mut self, operand: Operand) -> Result<Value> {
        Ok(match operand {
            Operand::Value(value) => value,
            Operand::Matrix(m) => Value::Object(self.new_matrix(m)?),
            Operand::Vector(v) => Value::Object(self.new_vector(v)?),
        })
    }
}

/// Result of a matrix or vector operator before it lands in an object.
enum Operand {
    Value(Value),
    Matrix(Matrix),
    Vector(Vector),
}

fn is_in_place(op: BinaryOp) -> bool {
    matches!(
        op,
        BinaryOp::Append | BinaryOp::Remove | BinaryOp::Scale | BinaryOp::Shrink
    )
}
