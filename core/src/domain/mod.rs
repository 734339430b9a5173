//! Domain model
//!
//! - `value_objects`: validated primitives (email, question type)
//! - `aggregates`: events, forms, questions, submissions

pub mod aggregates;
pub mod value_objects;

pub use aggregates::*;
pub use value_objects::*;
