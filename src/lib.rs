//! rez-env: resolve a package request into a sourceable environment.
//!
//! Merges the requested packages with the running context, drives an
//! external resolver, and hands the baked environment to a new shell.

pub mod cli;
pub mod core;
pub mod transport;
