use crate::error::Result;
use crate::incident::model::ChatMessage;
use crate::sources::DataSources;

impl DataSources {
    /// Chat messages mentioning `query`.
    ///
    /// No chat search capability is wired up yet, so this always yields an
    /// empty collection and never contacts the agent.
    pub async fn chat_messages(&self, query: &str) -> Result<Vec<ChatMessage>> {
        tracing::debug!(query, "Chat search not available, returning no messages");
        Ok(Vec::new())
    }
}
