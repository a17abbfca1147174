//! Lead Intake API Library
//!
//! Receives lead-capture form submissions (wedding and event inquiries),
//! normalizes them and creates one record per submission in Airtable.
//!
//! # Modules
//!
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `airtable_client`: Airtable REST client.
//! - `config`: Configuration management.
//! - `cors`: Cross-origin headers middleware.
//! - `errors`: Error handling types.
//! - `handlers`: Application state, health check and router.
//! - `lead_handler`: Lead submission handler and select-option retry.
//! - `lead_models`: Inbound submission and outbound record models.
//! - `normalize`: Field normalization.
//! - `select_fields`: Fixed-choice column resolution.

pub mod core;
pub mod integrations;

pub mod airtable_client;
pub mod config;
pub mod cors;
pub mod errors;
pub mod handlers;
pub mod lead_handler;
pub mod lead_models;
pub mod normalize;
pub mod select_fields;
