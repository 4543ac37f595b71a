//! # Taskboard API Server Library
//!
//! This library provides the HTTP surface of the taskboard backend: cookie
//! sessions, tasks, boards with invitations, and notifications.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request extractors with `{ "message" }` rejections
//! - `middleware`: Session guard and security headers
//! - `routes`: API route handlers
//! - `views`: Populated response shapes

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod views;
