//! Device-side concerns: OS classification, command execution, parsing.

pub mod os;
pub mod parsers;
pub mod runner;

pub use os::DeviceOs;
pub use parsers::ParsedOutput;
pub use runner::{DeviceCommandRunner, candidate_usernames, hop_command};
