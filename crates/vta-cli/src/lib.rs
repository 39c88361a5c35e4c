//! Command-line front end for the VTA codec.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
