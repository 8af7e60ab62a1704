//! Pickup Assist — e-waste pickup intake wizard core.

pub mod address;
pub mod classify;
pub mod config;
pub mod draft;
pub mod engine;
pub mod error;
pub mod schedule;
pub mod server;
pub mod session;
pub mod validators;
