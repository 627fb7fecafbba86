//! API Module
//!
//! HTTP handlers and routing for the demo page server.
//!
//! # Endpoints
//! - `GET /pages/*path` - Serve a page, `x-isr-cache` says how
//! - `DELETE /pages/*path` - Invalidate a page
//! - `GET /stats` - ISR statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
