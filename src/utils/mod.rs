//! Utilities for memory-efficient data structures.
//!
//! This module provides low-level utilities used internally by the reactor.
//! In particular, it exposes a [`Slab`] used for fast indexed storage of
//! registrations with reuse of freed slots.

mod slab;

pub(crate) use slab::Slab;
