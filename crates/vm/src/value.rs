use std::fmt;
use std::hash::{Hash, Hasher};

use smol_str::SmolStr;

use crate::appearance::AppearanceRef;
use crate::error::{Result, RuntimeError};
use crate::object::ObjectId;
use crate::runtime::Runtime;
use crate::tree::{ProcRef, ResourceRef, TypeRef};

/// A value any script expression can hold.
///
/// Values are immutable; cloning one is either a copy or a reference-count bump. An
/// [`Object`](Value::Object) is a key into the runtime's object table and does not keep the
/// object alive.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Float(f32),
    String(SmolStr),
    Object(ObjectId),
    Type(TypeRef),
    Proc(ProcRef),
    Resource(ResourceRef),
    Appearance(AppearanceRef),
}

static_assertions::const_assert!(std::mem::size_of::<Value>() <= 32);

pub const TRUE: Value = Value::Float(1.0);
pub const FALSE: Value = Value::Float(0.0);

impl Value {
    pub fn bool(b: bool) -> Value {
        if b {
            TRUE
        } else {
            FALSE
        }
    }

    pub fn string(s: impl AsRef<str>) -> Value {
        Value::String(SmolStr::new(s))
    }

    /// Returns `true` if the value is [`Null`].
    ///
    /// [`Null`]: Value::Null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` if the value is [`Float`].
    ///
    /// [`Float`]: Value::Float
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float(..))
    }

    pub fn as_float(&self) -> Option<f32> {
        if let Self::Float(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(v) = self {
            Some(v.as_str())
        } else {
            None
        }
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        if let Self::Object(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    pub fn as_proc(&self) -> Option<&ProcRef> {
        if let Self::Proc(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn try_into_string(self) -> Result<SmolStr, Self> {
        if let Self::String(v) = self {
            Ok(v)
        } else {
            Err(self)
        }
    }

    /// Non-failing extraction of a specific variant.
    pub fn try_get_as<T: FromValue>(&self) -> Option<T> {
        T::from_value(self)
    }

    /// Extract a specific variant, failing with a type-cast error on mismatch.
    pub fn must_get_as<T: FromValue>(&self) -> Result<T> {
        T::from_value(self).ok_or_else(|| RuntimeError::TypeCast {
            value: self.to_string(),
            expected: T::EXPECTED,
        })
    }

    /// Convert this value to a script boolean.
    ///
    /// The falsy values are:
    ///
    /// - `null`, and references to deleted objects
    /// - `0`
    /// - `""`
    pub fn is_truthy(&self, rt: &Runtime) -> bool {
        match self {
            Value::Null => false,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Object(id) => rt.is_alive(*id),
            Value::Type(_) | Value::Proc(_) | Value::Resource(_) | Value::Appearance(_) => true,
        }
    }

    /// The text a script sees when this value is embedded in a string.
    pub fn stringify(&self, rt: &Runtime) -> String {
        match self {
            Value::Null | Value::Appearance(_) => String::new(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => s.to_string(),
            Value::Type(t) => t.path.to_string(),
            Value::Proc(p) => p.to_string(),
            Value::Resource(r) => r
                .path
                .as_ref()
                .map_or_else(|| r.id.to_string(), |p| p.to_string()),
            Value::Object(id) => rt.display_name(*id),
        }
    }

    /// Interpret this value as a 1-based list index.
    ///
    /// Floats are truncated toward zero. Returns `Ok(None)` for values that key the hash part
    /// instead.
    pub fn as_index(&self) -> Result<Option<i64>> {
        match self {
            Value::Float(f) if f.is_finite() => Ok(Some(f.trunc() as i64)),
            Value::Float(_) => Err(RuntimeError::InvalidIndex(self.to_string())),
            _ => Ok(None),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Proc(a), Value::Proc(b)) => a == b,
            (Value::Resource(a), Value::Resource(b)) => a == b,
            (Value::Appearance(a), Value::Appearance(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Float(f) => {
                // Keep `0.0 == -0.0` and every NaN on one bucket.
                let normalized = if f.is_nan() {
                    f32::NAN
                } else if *f == 0.0 {
                    0.0
                } else {
                    *f
                };
                normalized.to_bits().hash(state)
            }
            Value::String(s) => s.hash(state),
            Value::Object(id) => id.hash(state),
            Value::Type(t) => t.hash(state),
            Value::Proc(p) => p.hash(state),
            Value::Resource(r) => r.hash(state),
            Value::Appearance(a) => a.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Float(v) => f.write_str(&format_float(*v)),
            Value::String(s) => write!(f, "{:?}", s.as_str()),
            Value::Object(id) => write!(f, "object({:?})", id),
            Value::Type(t) => f.write_str(&t.path),
            Value::Proc(p) => write!(f, "{}", p),
            Value::Resource(r) => write!(f, "resource({})", r.id),
            Value::Appearance(_) => f.write_str("appearance"),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Float(v as f32)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Float(v as f32)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(SmolStr::new(v))
    }
}

impl From<SmolStr> for Value {
    fn from(v: SmolStr) -> Self {
        Value::String(v)
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Value::Object(v)
    }
}

impl From<TypeRef> for Value {
    fn from(v: TypeRef) -> Self {
        Value::Type(v)
    }
}

impl From<ProcRef> for Value {
    fn from(v: ProcRef) -> Self {
        Value::Proc(v)
    }
}

impl From<AppearanceRef> for Value {
    fn from(v: AppearanceRef) -> Self {
        Value::Appearance(v)
    }
}

/// Variants that can be pulled out of a [`Value`].
pub trait FromValue: Sized {
    /// Name of the expected type in type-cast errors.
    const EXPECTED: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! from_value_variant {
    ($ty:ty, $variant:ident, $expected:literal) => {
        impl FromValue for $ty {
            const EXPECTED: &'static str = $expected;

            fn from_value(value: &Value) -> Option<Self> {
                if let Value::$variant(v) = value {
                    Some(v.clone())
                } else {
                    None
                }
            }
        }
    };
}

from_value_variant!(f32, Float, "float");
from_value_variant!(SmolStr, String, "string");
from_value_variant!(ObjectId, Object, "object");
from_value_variant!(TypeRef, Type, "type");
from_value_variant!(ProcRef, Proc, "proc");
from_value_variant!(ResourceRef, Resource, "resource");
from_value_variant!(AppearanceRef, Appearance, "appearance");

impl FromValue for i32 {
    const EXPECTED: &'static str = "integer";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_float().map(|f| f as i32)
    }
}

/// Format a float the way scripts print numbers.
///
/// Six significant digits, except integral values from one million up to 2^24 which keep
/// eight so they print exactly.
pub fn format_float(v: f32) -> String {
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    if v.is_nan() {
        return "nan".to_owned();
    }
    if v > 16_777_216.0 {
        return format_general(v, 6);
    }
    if v >= 1_000_000.0 && v.trunc() == v {
        return format_general(v, 8);
    }
    format_general(v, 6)
}

/// `printf`-style `%g` with the given number of significant digits.
fn format_general(v: f32, precision: usize) -> String {
    if v == 0.0 {
        return "0".to_owned();
    }
    let scientific = format!("{:.*e}", precision - 1, v);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((&scientific, "0"));
    let exponent: i32 = exponent.parse().unwrap_or_default();

    if exponent < -5 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, v)).to_owned()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

#[cfg(test)]
mod test {
    use expect_test::expect;
    use test_log::test;

    use super::*;

    #[test]
    fn test_format_float() {
        let printed = [
            0.0,
            1.5,
            -2.25,
            1.0 / 3.0,
            123_456.7,
            1_000_000.0,
            16_777_216.0,
            30_000_000.0,
            0.000_012_5,
            0.000_001_25,
            f32::INFINITY,
            f32::NEG_INFINITY,
            f32::NAN,
        ]
        .iter()
        .map(|v| format_float(*v))
        .collect::<Vec<_>>()
        .join(" ");
        expect!["0 1.5 -2.25 0.333333 123457 1000000 16777216 3e+07 0.0000125 1.25e-06 inf -inf nan"]
            .assert_eq(&printed);
    }

    #[test]
    fn test_must_get_as_reports_expected_type() {
        let err = Value::string("abc").must_get_as::<f32>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "value \"abc\" was not the expected type of float"
        );
        assert_eq!(Value::Float(2.9).must_get_as::<i32>().unwrap(), 2);
        assert_eq!(Value::Null.try_get_as::<SmolStr>(), None);
    }

    #[test]
    fn test_equality_and_hash_agree() {
        use std::collections::HashSet;

        assert_eq!(Value::Float(f32::NAN), Value::Float(f32::NAN));
        assert_eq!(Value::Float(0.0), Value::Float(-0.0));
        assert_ne!(Value::Float(1.0), Value::string("1"));
        assert_ne!(Value::Null, Value::Float(0.0));

        let set: HashSet<Value> = [Value::Float(0.0), Value::Float(-0.0), Value::Null]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_index_truncates() {
        assert_eq!(Value::Float(2.7).as_index().unwrap(), Some(2));
        assert_eq!(Value::string("2").as_index().unwrap(), None);
        assert!(matches!(
            Value::Float(f32::NAN).as_index(),
            Err(RuntimeError::InvalidIndex(_))
        ));
    }
}
