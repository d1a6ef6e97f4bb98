//! Types shared between the repository service, the view controller and hosts.

pub mod domain;
pub mod error;
pub mod protocol;
pub mod resource;

pub use resource::Resource;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
