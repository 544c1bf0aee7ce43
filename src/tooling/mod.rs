//! Remote agent tooling: discovery, capability resolution and invocation.
//!
//! The agent advertises a dynamic set of tools. This module keeps a
//! per-connection [`Registry`] snapshot, resolves abstract capabilities to
//! concrete tool names by keyword, and performs call-and-collect round trips.

pub mod connection;
pub mod http;
pub mod invoker;
pub mod registry;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

pub use connection::{AgentConnection, ConnectionManager, ConnectionState};
pub use http::HttpConnector;
pub use invoker::{Invoker, RawResult};
pub use registry::{resolve_tool, Capability, Registry};
pub use types::{ContentBlock, ToolCallResult, ToolConnector, ToolDescriptor, ToolSession};
