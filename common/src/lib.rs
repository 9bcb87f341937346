//! Types shared by the Stick Frames pipeline and its binary.

pub mod config;
pub mod landmarks;
pub mod protocol;
