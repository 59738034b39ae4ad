//! Library side of the `tabio` command: argument definitions, command
//! implementations, and logging setup.

pub mod cli;
pub mod commands;
pub mod logging;
