//! Configuration and constants

pub mod defaults;
pub mod layout;
