//! Common utilities shared across macro modules.
//!
//! This module provides shared helper functions that are used by multiple
//! derive macros (InsertModel, UpdateModel, Model).

pub mod syn_types;
