//! droid-bootstrap library - exposes the command modules for testing

pub mod commands;
pub mod common;
pub mod errors;

pub use common::GlobalOpts;
