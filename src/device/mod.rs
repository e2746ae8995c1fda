// src/device/mod.rs

//! Simulator inventory and lifecycle.

pub mod control;
pub mod simctl;
pub mod types;

pub use control::DeviceControl;
pub use simctl::Simctl;
pub use types::{Device, DeviceState, DeviceTypeInfo, RuntimeInfo};
