use serde::{Deserialize, Serialize};

use super::availability::Availability;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: String,
    pub display_name: String,
    /// `None` means always available during default hours.
    pub availability: Option<Availability>,
}
