// Library for the binary and for integration tests

pub mod config;
pub mod docker_repo;
pub mod error;
pub mod export;
pub mod history_repo;
pub mod merger;
pub mod models;
pub mod ports_repo;
pub mod probe_repo;
pub mod registry;
pub mod routes;
pub mod scheduler;
pub mod snapshot;
pub mod version;
