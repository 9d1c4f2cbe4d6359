//! sigscope: recover a contract's external interface from deployed bytecode.
//!
//! Disassembles EVM code, pattern-matches function selectors and event
//! topics, and resolves them to text through a local SQLite cache backed by
//! remote signature databases.

pub mod utils;

pub mod batch;
pub mod config;
pub mod decoder;
pub mod disassembler;
pub mod errors;
pub mod parser;
pub mod remote;
pub mod service;
pub mod signature;
pub mod store;
pub mod sync;
