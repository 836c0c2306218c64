//! HTTP handler bodies, one module per resource.

pub mod alerts;
pub mod devices;
pub mod ingest;
pub mod locations;
pub mod rules;
