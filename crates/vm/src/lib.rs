pub mod appearance;
pub mod client;
pub mod deletion;
pub mod error;
mod factory;
pub mod frame;
pub mod generator;
pub mod list;
pub mod map;
pub mod matrix;
pub mod object;
pub mod operators;
pub mod query;
pub mod runtime;
pub mod savefile;
pub mod tree;
pub mod value;
pub mod vector;

#[cfg(test)]
mod test;

pub use error::{Result, RuntimeError};
pub use runtime::{Runtime, RuntimeConfig};
pub use value::Value;
