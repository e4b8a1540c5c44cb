//! Shared models and collaborator ports

pub mod models;
pub mod ports;
