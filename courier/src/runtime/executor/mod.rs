//! Worker threads and the pool that owns them.

pub(crate) mod core;
pub(crate) mod worker;
