use serde::{Deserialize, Serialize};

use crate::{api::ProjectId, Timestamp};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub version_count: u32,
    pub created_at: Timestamp,
}
