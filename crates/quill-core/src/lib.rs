//! Core quill library (API client, session, config, formatting).

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod datetime;
pub mod http;
pub mod logging;
pub mod session;
pub mod storage;
pub mod token;
