// Service configuration (file, env, runtime)
pub mod config;

// Domain errors
pub mod error;

// Greenhouses, sensors and readings
pub mod model;

// Liveness classification
pub mod status;

// Registry and telemetry persistence
pub mod store;

// Dashboard aggregation
pub mod engine;

// API key extraction
pub mod auth;

// HTTP APIs
pub mod api;
