//! # Runtime Module
//!
//! Runtime components for the Landing Zone Controller, including initialization,
//! watch loop, and error handling.

pub mod context;
pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use context::*;
pub use error_policy::*;
pub use initialization::*;
pub use watch_loop::*;
