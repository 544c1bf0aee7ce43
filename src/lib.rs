//! Incident desk - incident-response backend
//!
//! Resolves abstract capabilities to tools advertised by a remote agent,
//! aggregates commits, logs, tickets and chat into an incident context, and
//! synthesizes a rule-based report with suggested remediation actions.

pub mod config;
pub mod error;
pub mod handlers;
pub mod incident;
pub mod notify;
pub mod persistence;
pub mod sources;
pub mod state;
pub mod tooling;

// Re-export key types for convenience
pub use config::Config;
pub use error::{AppError, Result};
pub use handlers::api_router;
pub use incident::{synthesize, IncidentContext, IncidentReport, IncidentWorkflow};
pub use state::AppState;
pub use tooling::{ConnectionManager, Registry};
