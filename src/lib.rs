pub mod battles;
pub mod config;
pub mod errors;
pub mod models;
pub mod profile_client;
pub mod retry;
pub mod routes;
pub mod scoring;
pub mod state;
pub mod store;
pub mod teams;
pub mod telemetry;
