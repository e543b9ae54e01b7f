//! Domain Layer
//!
//! Core scheduling logic, independent of any window or toolkit.

pub mod task;
