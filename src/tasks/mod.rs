//! Background Tasks Module
//!
//! # Tasks
//! - Expiry sweep: Removes expired entries from embedded stores at a fixed interval

mod sweeper;

pub use sweeper::spawn_expiry_sweeper;
