use crate::error::{Result, RuntimeError};
use crate::object::{DreamObject, ObjectId, ObjectKind};
use crate::runtime::Runtime;
use crate::value::Value;

/// A 2-D or 3-D vector. `z` reads as 0 and ignores writes while the vector is 2-D.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vector {
    pub x: f32,
    pub y: f32,
    z: f32,
    is_3d: bool,
}

impl Vector {
    pub fn new_2d(x: f32, y: f32) -> Self {
        Vector {
            x,
            y,
            z: 0.0,
            is_3d: false,
        }
    }

    pub fn new_3d(x: f32, y: f32, z: f32) -> Self {
        Vector {
            x,
            y,
            z,
            is_3d: true,
        }
    }

    pub fn z(&self) -> f32 {
        if self.is_3d {
            self.z
        } else {
            0.0
        }
    }

    pub fn set_z(&mut self, z: f32) {
        if self.is_3d {
            self.z = z;
        }
    }

    pub fn is_3d(&self) -> bool {
        self.is_3d
    }

    pub fn len(&self) -> usize {
        if self.is_3d {
            3
        } else {
            2
        }
    }

    pub fn size(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z() * self.z()).sqrt()
    }

    /// Rescale to magnitude `size`. A zero vector stays zero.
    pub fn set_size(&mut self, size: f32) {
        let magnitude = self.size();
        if magnitude == 0.0 {
            return;
        }
        self.x = self.x / magnitude * size;
        self.y = self.y / magnitude * size;
        let z = self.z() / magnitude * size;
        self.set_z(z);
    }

    /// Parse `"x,y"` or `"x,y,z"`; `x` also works as a delimiter.
    pub fn parse(s: &str) -> Option<Vector> {
        let components = s
            .split(|c| c == ',' || c == 'x')
            .map(|c| c.trim().parse::<f32>().ok())
            .collect::<Option<Vec<_>>>()?;
        Vector::from_components(&components)
    }

    pub fn from_components(c: &[f32]) -> Option<Vector> {
        match *c {
            [x, y] => Some(Vector::new_2d(x, y)),
            [x, y, z] => Some(Vector::new_3d(x, y, z)),
            _ => None,
        }
    }

    /// Component-wise combination; the result is 3-D if either side is.
    pub fn zip(&self, rhs: &Vector, op: impl Fn(f32, f32) -> f32) -> Vector {
        Vector {
            x: op(self.x, rhs.x),
            y: op(self.y, rhs.y),
            z: op(self.z(), rhs.z()),
            is_3d: self.is_3d || rhs.is_3d,
        }
    }

    pub fn scale(&self, k: f32) -> Vector {
        Vector {
            x: self.x * k,
            y: self.y * k,
            z: self.z() * k,
            is_3d: self.is_3d,
        }
    }

    pub fn divide(&self, rhs: &Vector) -> Result<Vector> {
        if rhs.x == 0.0 || rhs.y == 0.0 || (self.is_3d && rhs.z() == 0.0) {
            return Err(RuntimeError::DivideByZero);
        }
        Ok(self.zip(rhs, |l, r| if r == 0.0 { 0.0 } else { l / r }))
    }

    /// Value of a vector var; `None` for names vectors don't have.
    pub fn var(&self, name: &str) -> Option<Value> {
        let v = match name {
            "x" => self.x,
            "y" => self.y,
            "z" => self.z(),
            "len" => self.len() as f32,
            "size" => self.size(),
            _ => return None,
        };
        Some(Value::Float(v))
    }

    pub fn set_var(&mut self, name: &str, value: &Value) -> Result<()> {
        let v = value.must_get_as::<f32>()?;
        match name {
            "x" => self.x = v,
            "y" => self.y = v,
            "z" => self.set_z(v),
            "size" => self.set_size(v),
            "len" if v == 2.0 || v == 3.0 => {
                self.is_3d = v == 3.0;
            }
            "len" => {
                return Err(RuntimeError::invalid_arguments(format!(
                    "invalid vector len {}",
                    value
                )))
            }
            _ => {
                return Err(RuntimeError::UndefinedVariable {
                    name: name.to_owned(),
                    ty: "/vector".to_owned(),
                })
            }
        }
        Ok(())
    }
}

impl Runtime {
    pub fn new_vector(&mut self, vector: Vector) -> Result<ObjectId> {
        let def = self.tree.get("/vector")?;
        let object = DreamObject::new(def, ObjectKind::Vector(vector.into()));
        Ok(self.insert_object(object.into()))
    }

    /// `new /vector(...)`: two or three numbers, a string, a list of numbers or another
    /// vector.
    pub fn new_vector_from(&mut self, args: &[Value]) -> Result<ObjectId> {
        let vector = self.vector_from_args(args)?;
        self.new_vector(vector)
    }

    pub fn vector_from_args(&mut self, args: &[Value]) -> Result<Vector> {
        let bad_arguments = || {
            RuntimeError::invalid_arguments(format!(
                "bad vector arguments ({})",
                args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ")
            ))
        };

        match args {
            [Value::Float(_), ..] if args.len() == 2 || args.len() == 3 => {
                let components = args
                    .iter()
                    .map(|a| a.must_get_as::<f32>())
                    .collect::<Result<Vec<_>>>()?;
                Vector::from_components(&components).ok_or_else(bad_arguments)
            }
            [Value::String(s)] => Vector::parse(s).ok_or_else(bad_arguments),
            [value @ Value::Object(_)] => self.vector_of(value)?.ok_or_else(bad_arguments),
            _ => Err(bad_arguments()),
        }
    }

    /// The vector a vector object or a list of 2 or 3 numbers stands for.
    pub fn vector_of(&mut self, value: &Value) -> Result<Option<Vector>> {
        let id = match value.as_object() {
            Some(id) => id,
            None => return Ok(None),
        };
        let object = self.object(id)?;
        match &object.kind {
            ObjectKind::Vector(v) => Ok(Some(v.get())),
            ObjectKind::List(_) => {
                let values = self.list(id)?.values(self)?;
                let components: Option<Vec<f32>> = values.iter().map(Value::as_float).collect();
                Ok(components.as_deref().and_then(Vector::from_components))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Vector::parse("1,2"), Some(Vector::new_2d(1.0, 2.0)));
        assert_eq!(Vector::parse("3x4x5"), Some(Vector::new_3d(3.0, 4.0, 5.0)));
        assert_eq!(Vector::parse("1"), None);
        assert_eq!(Vector::parse("a,b"), None);
    }

    #[test]
    fn test_len_and_size_vars() {
        let mut v = Vector::new_2d(3.0, 4.0);
        assert_eq!(v.var("size"), Some(Value::Float(5.0)));

        v.set_var("z", &Value::Float(9.0)).unwrap();
        assert_eq!(v.z(), 0.0);
        v.set_var("len", &Value::Float(3.0)).unwrap();
        assert_eq!(v.len(), 3);
        assert!(v.set_var("len", &Value::Float(2.5)).is_err());

        v.set_var("size", &Value::Float(10.0)).unwrap();
        assert_eq!((v.x, v.y), (6.0, 8.0));
        assert!(matches!(
            v.set_var("name", &Value::Float(1.0)),
            Err(RuntimeError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn test_divide_by_zero_component() {
        let v = Vector::new_2d(1.0, 1.0);
        assert!(matches!(
            v.divide(&Vector::new_2d(0.0, 1.0)),
            Err(RuntimeError::DivideByZero)
        ));
        assert_eq!(
            v.divide(&Vector::new_2d(2.0, 4.0)).unwrap(),
            Vector::new_2d(0.5, 0.25)
        );
    }
}
