// src/exec/mod.rs

//! Process execution layer.
//!
//! Every external tool (build driver, simulator control, manifest reader,
//! log stream) is launched through [`Executor`], either streaming
//! ([`Executor::execute`]) or buffered ([`Executor::run_silent`]).

pub mod command;
pub mod output;
pub mod tool;

pub use command::{command_exists, Executor};
pub use output::{OutputLine, OutputOrigin, ProcessStream};
pub use tool::ToolCommand;
