pub mod catalog;
pub mod fallback;
pub mod orchestrator;
pub mod profile;
pub mod provider;
pub mod service;
pub mod webhook;
