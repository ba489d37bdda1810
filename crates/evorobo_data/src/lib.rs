//! Plain data types shared by the evorobo crates.
//!
//! Everything here is serde-serializable and free of behaviour beyond small
//! helpers; the logic operating on these types lives in `evorobo_core`.

pub mod data;

pub use data::*;
