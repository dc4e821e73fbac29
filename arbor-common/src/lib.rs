//! Basic types shared by arbor crates.
extern crate self as arbor_common;

mod atom;
pub mod counter;
mod data;

pub use crate::{atom::Atom, data::Data};
pub use arbor_common_macros::Data;
