pub mod export;
pub mod forms;
pub mod health;
pub mod hospitals;
pub mod studies;
pub mod submissions;
pub mod users;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Confirmation returned by delete and unassign endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
