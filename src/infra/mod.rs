//! Infrastructure layer
//!
//! Handles all I/O operations: filesystem, staging tree, artifact files and
//! external processes. This module is the only place where side effects occur.

pub mod artifact;
pub mod filesystem;
pub mod staging;
pub mod tools;
