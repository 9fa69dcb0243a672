//! Provider backend implementations.

pub mod google;
pub mod memory;
