//! External circuit simulator backend for pcbtherm.
//!
//! The thermal network is written as a SPICE netlist, solved by an external
//! simulator (Xyce by default) and the node voltages of the ASCII raw output
//! are read back as temperatures.
//!
//! This crate provides:
//! - Netlist emission with a node name table ([`Netlist`])
//! - A scoped simulator subprocess with a timeout ([`ScopedProcess`])
//! - An ASCII raw file parser ([`RawData`])
//! - The [`ExternalCircuitBackend`] solver backend

pub mod backend;
pub mod config;
pub mod error;
pub mod netlist;
pub mod raw;
pub mod runner;

pub use backend::ExternalCircuitBackend;
pub use config::{Analysis, SimFiles, SpiceConfig};
pub use error::{Result, SpiceError};
pub use netlist::Netlist;
pub use raw::{RawData, RawVariable};
pub use runner::{ScopedProcess, is_simulator_available, run_simulator, simulator_version};
