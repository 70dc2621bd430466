pub mod catalog;
pub mod domain;
pub mod error;

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod domain_tests;

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod catalog_tests;
