//! Core env logic: request codec, patching, wrapper detection, resolution,
//! failure recovery, temp artifacts and shell hand-off.

pub mod artifacts;
pub mod codegen;
pub mod config;
pub mod error;
pub mod executor;
pub mod patch;
pub mod recovery;
pub mod request;
pub mod resolver;
pub mod types;
pub mod wrapper;
