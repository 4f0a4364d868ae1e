//! Type definitions for metric names.

mod name;

pub use self::name::*;
