//! MedBridge Server - HTTP REST API for the donation engine
//!
//! This crate exposes the [`medbridge`] engine over HTTP:
//!
//! - **Donations**: Donor intake and administrator review
//! - **Matching**: The rate-limited matching trigger and stored mappings
//! - **Claims**: Exclusive claims on approved donations
//! - **Recipients**: Organization profiles and requirement lists
//! - **Health & Metrics**: Liveness/readiness probes and Prometheus metrics
//!
//! Bearer tokens are mapped to callers in the server configuration; an
//! unknown or missing token is an anonymous caller, which the engine
//! rejects with 401 wherever a role is required.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! ## Public
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe
//! - `GET /metrics` - Prometheus metrics
//!
//! ## Bearer token
//!
//! - `POST /api/v1/donations` - Submit a donation
//! - `GET /api/v1/donations/mine` - The caller's donations
//! - `GET /api/v1/donations/pending` - Review queue
//! - `GET /api/v1/donations/inventory` - Approved and claimed donations
//! - `GET /api/v1/donations/{id}` - One donation
//! - `POST /api/v1/donations/{id}/approve` - Approve and match
//! - `POST /api/v1/donations/{id}/reject` - Reject
//! - `POST /api/v1/map-donation` - Rerun matching
//! - `GET /api/v1/donations/{id}/mappings` - Stored mappings
//! - `POST /api/v1/donations/{id}/claim` - Claim
//! - `GET|PATCH /api/v1/recipients/me` - Recipient profile
//! - `POST /api/v1/recipients/me/requirements` - Add requirement
//! - `PUT|DELETE /api/v1/recipients/me/requirements/{entry_id}` - Edit or remove
//! - `GET /api/v1/recipients/me/available` - Matched approved donations
//! - `GET /api/v1/recipients/me/claims` - The caller's claims

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
