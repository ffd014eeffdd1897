//! Customer record schema
//!
//! This module defines the raw record fields the pipeline understands and the
//! frozen training schema that every encoded record is aligned against.

mod columns;
mod training;

pub use columns::*;
pub use training::*;
