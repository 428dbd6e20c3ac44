//! Core utilities for the Sable renderer.
//!
//! This crate provides the thread-safe pooled slot allocator that backs
//! stable object handles throughout the renderer. Pool misuse is reported
//! in-band (absence, `false` returns) rather than through an error type:
//! stale-handle races are expected and benign under concurrent use.

pub mod pool;

pub use pool::{PoolHandle, SlotPool};
