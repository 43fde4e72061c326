pub mod acme;
pub mod backup;
pub mod certs;
pub mod clock;
pub mod config;
pub mod exec;
pub mod nginx;
pub mod paths;
pub mod registry;
pub mod templates;
pub mod tracing;
