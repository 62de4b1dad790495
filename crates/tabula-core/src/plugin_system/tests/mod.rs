mod support;

pub mod manifest_tests;
pub mod resolver_tests;
