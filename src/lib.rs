// Library exports for linkstand
// This allows integration tests and external code to use linkstand modules

pub mod auth;
pub mod billing;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod media;
pub mod profile;
pub mod routes;
pub mod state;
pub mod validate;
