//! Incident evidence, its aggregation and the report and actions derived from it.

pub mod actions;
pub mod aggregator;
pub mod model;
pub mod report;
pub mod workflow;

pub use actions::{ActionDispatcher, ActionIntent, ActionOutcome, ServiceContext};
pub use aggregator::{load_evidence, ContextAggregator};
pub use model::{
    ChatMessage, Commit, IncidentContext, IncidentReport, LogEntry, LogLevel, SourceType, Ticket,
};
pub use report::synthesize;
pub use workflow::{IncidentDetails, IncidentWorkflow, NewIncident, OpenedIncident};
