use std::f32::consts::TAU;

use rand::Rng;

use crate::error::{Result, RuntimeError};
use crate::object::{DreamObject, ObjectId, ObjectKind};
use crate::runtime::Runtime;
use crate::value::Value;
use crate::vector::Vector;

/// How samples spread between the low and high bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Distribution {
    /// Always the high bound.
    Constant,
    Uniform,
    /// Gaussian centred between the bounds with six deviations spanning them, clamped.
    Normal,
    /// Density grows linearly toward the high bound.
    Linear,
    /// Density grows quadratically toward the high bound.
    Square,
}

impl Distribution {
    /// The script-level distribution constant. Unknown numbers mean [`Distribution::Normal`].
    pub fn from_number(n: i32) -> Self {
        match n {
            0 => Distribution::Uniform,
            2 => Distribution::Linear,
            3 => Distribution::Square,
            _ => Distribution::Normal,
        }
    }

    pub fn sample(self, rng: &mut impl Rng, low: f32, high: f32) -> f32 {
        match self {
            Distribution::Constant => high,
            Distribution::Uniform => low + rng.gen::<f32>() * (high - low),
            Distribution::Normal => {
                let mean = (low + high) / 2.0;
                let deviation = (high - low) / 6.0;
                (mean + deviation * gaussian(rng)).max(low).min(high)
            }
            Distribution::Linear => rng.gen::<f32>().sqrt() * (high - low) + low,
            Distribution::Square => rng.gen::<f32>().cbrt() * (high - low) + low,
        }
    }
}

/// Standard normal sample (Box-Muller).
fn gaussian(rng: &mut impl Rng) -> f32 {
    let u1 = 1.0 - rng.gen::<f32>();
    let u2 = rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

/// A random value source as built by `generator(type, a, b, distribution)`.
#[derive(Clone, Debug, PartialEq)]
pub enum Generator {
    Num { low: f32, high: f32, dist: Distribution },
    /// A point on a ring with radius in `[low, high]`.
    Circle { low: f32, high: f32, dist: Distribution },
    Sphere { low: f32, high: f32, dist: Distribution },
    /// A point on the segment between the two vectors.
    Vector { low: Vector, high: Vector, dist: Distribution },
    /// Each axis sampled independently.
    Box { low: Vector, high: Vector, dist: Distribution },
    /// A point inside `high` but outside `low`, centred on the origin.
    Square { low: Vector, high: Vector, dist: Distribution },
    Cube { low: Vector, high: Vector, dist: Distribution },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    Num(f32),
    Vector(Vector),
}

impl Generator {
    pub fn type_name(&self) -> &'static str {
        match self {
            Generator::Num { .. } => "num",
            Generator::Circle { .. } => "circle",
            Generator::Sphere { .. } => "sphere",
            Generator::Vector { .. } => "vector",
            Generator::Box { .. } => "box",
            Generator::Square { .. } => "square",
            Generator::Cube { .. } => "cube",
        }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> Sample {
        match *self {
            Generator::Num { low, high, dist } => Sample::Num(dist.sample(rng, low, high)),
            Generator::Circle { low, high, dist } => {
                let theta = rng.gen::<f32>() * TAU;
                let r = dist.sample(rng, low, high);
                Sample::Vector(Vector::new_2d(theta.cos() * r, theta.sin() * r))
            }
            Generator::Sphere { low, high, dist } => {
                let theta = rng.gen::<f32>() * TAU;
                let phi = rng.gen::<f32>() * TAU / 2.0;
                let r = dist.sample(rng, low, high);
                Sample::Vector(Vector::new_3d(
                    theta.cos() * phi.sin() * r,
                    theta.sin() * phi.sin() * r,
                    phi.cos() * r,
                ))
            }
            Generator::Vector { low, high, dist } => {
                let t = dist.sample(rng, 0.0, 1.0);
                Sample::Vector(low.zip(&high, |l, h| l + (h - l) * t))
            }
            Generator::Box { low, high, dist } => {
                let x = dist.sample(rng, low.x, high.x);
                let y = dist.sample(rng, low.y, high.y);
                if low.is_3d() || high.is_3d() {
                    let z = dist.sample(rng, low.z(), high.z());
                    Sample::Vector(Vector::new_3d(x, y, z))
                } else {
                    Sample::Vector(Vector::new_2d(x, y))
                }
            }
            Generator::Square { low, high, dist } => {
                let x = dist.sample(rng, -high.x, high.x);
                let y = dist.sample(rng, -high.y, high.y);
                let y = avoid_inner(rng, dist, x, low.x, y, low.y, high.y);
                Sample::Vector(Vector::new_2d(x, y))
            }
            Generator::Cube { low, high, dist } => {
                let x = dist.sample(rng, -high.x, high.x);
                let y = dist.sample(rng, -high.y, high.y);
                let z = dist.sample(rng, -high.z(), high.z());
                let y = avoid_inner(rng, dist, x, low.x, y, low.y, high.y);
                let z = avoid_inner(rng, dist, y, low.y, z, low.z(), high.z());
                Sample::Vector(Vector::new_3d(x, y, z))
            }
        }
    }
}

/// If `prev` fell inside the inner bound, resample `next` on one side of its inner bound so
/// the point lands outside the hole.
fn avoid_inner(
    rng: &mut impl Rng,
    dist: Distribution,
    prev: f32,
    prev_low: f32,
    next: f32,
    low: f32,
    high: f32,
) -> f32 {
    if prev.abs() >= prev_low {
        return next;
    }
    if rng.gen::<u8>() > 128 {
        dist.sample(rng, -high, -low)
    } else {
        dist.sample(rng, low, high)
    }
}

impl Runtime {
    /// `generator(type, a, b, distribution)`.
    pub fn new_generator(&mut self, args: &[Value]) -> Result<ObjectId> {
        let generator = self.generator_from_args(args)?;
        let def = self.tree.get("/generator")?;
        let object = DreamObject::new(def, ObjectKind::Generator(generator));
        Ok(self.insert_object(object.into()))
    }

    fn generator_from_args(&mut self, args: &[Value]) -> Result<Generator> {
        let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
        let ty = arg(0);
        let (a, b) = (arg(1), arg(2));
        let dist = Distribution::from_number(arg(3).try_get_as::<i32>().unwrap_or(1));

        let generator = match ty.as_str() {
            Some(name @ ("num" | "circle" | "sphere")) => {
                let low = a.as_float().unwrap_or_default();
                let high = b.as_float().unwrap_or(1.0);
                match name {
                    "num" => Generator::Num { low, high, dist },
                    "circle" => Generator::Circle { low, high, dist },
                    _ => Generator::Sphere { low, high, dist },
                }
            }
            Some(name @ ("vector" | "box" | "square" | "cube")) => {
                let low = self.vector_of(&a)?.unwrap_or_default();
                let high = self.vector_of(&b)?.unwrap_or_default();
                match name {
                    "vector" => Generator::Vector { low, high, dist },
                    "box" => Generator::Box { low, high, dist },
                    "square" => Generator::Square { low, high, dist },
                    _ => Generator::Cube { low, high, dist },
                }
            }
            _ => {
                return Err(RuntimeError::invalid_arguments(format!(
                    "invalid generator type {}",
                    ty
                )))
            }
        };
        Ok(generator)
    }

    /// Draw one value from a generator object. Vector samples become new vector objects.
    pub fn generate(&mut self, generator: ObjectId) -> Result<Value> {
        let object = self.object(generator)?;
        let sample = match &object.kind {
            ObjectKind::Generator(g) => g.sample(&mut self.rng),
            _ => {
                return Err(RuntimeError::TypeCast {
                    value: object.def.path.to_string(),
                    expected: "generator",
                })
            }
        };
        match sample {
            Sample::Num(n) => Ok(Value::Float(n)),
            Sample::Vector(v) => Ok(Value::Object(self.new_vector(v)?)),
        }
    }
}
