//! Common test utilities and fixtures.

pub mod memory;
pub mod server;

#[allow(unused_imports)]
pub use memory::*;
#[allow(unused_imports)]
pub use server::*;
