pub mod allocation;
pub mod attributes;
pub mod config;
pub mod error;
pub mod lineup;
pub mod model;
pub mod scoring;
pub mod signup;
pub mod store;
pub mod validation;
