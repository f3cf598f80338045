pub mod cache;
pub mod cli;
pub mod config;
pub mod files;
pub mod flock;
pub mod git;
pub mod locator;
pub mod tree;

mod api;

pub use api::{Repofetch, RepofetchBuilder, WriteReport, WriteStatus};
