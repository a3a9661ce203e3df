//! Purity-enforcing bilingual (English/Arabic) legal translation gateway.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod feedback;
pub mod gateway;
pub mod i18n;
pub mod monitor;
pub mod purity;
pub mod retry;
pub mod scheduler;
pub mod security;
pub mod server;
pub mod terminology;
pub mod translation;
