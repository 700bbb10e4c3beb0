//! Response DTOs.

use serde::{Deserialize, Serialize};

use chatline_core::types::pagination::PageRequest;
use chatline_entity::message::MessageView;

/// Paginated message history response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    /// Messages in ascending creation order.
    pub messages: Vec<MessageView>,
    /// Paging metadata.
    pub pagination: PaginationMeta,
}

/// Paging metadata echoed to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Page number (1-based).
    pub page: u64,
    /// Page size used.
    pub limit: u64,
    /// Whether another page likely exists.
    pub has_more: bool,
}

impl MessagesResponse {
    /// Builds the response, inferring `has_more` from a full page.
    pub fn new(messages: Vec<MessageView>, request: &PageRequest) -> Self {
        let has_more = messages.len() as u64 == request.limit();
        Self {
            messages,
            pagination: PaginationMeta {
                page: request.page.max(1),
                limit: request.limit(),
                has_more,
            },
        }
    }
}
