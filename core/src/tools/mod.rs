//! Collaborators the dispatcher runs actions through
//!
//! HTTP fetches, rooted file reads, shell execution and the built-in routines.

pub mod builtin;
pub mod filesystem;
pub mod shell;
pub mod web;

pub use builtin::Builtin;
pub use filesystem::read_rooted;
pub use shell::{CommandRunner, ShellOutput, ShellRunner};
pub use web::{Fetcher, HttpFetcher};
