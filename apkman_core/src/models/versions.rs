use serde::{Deserialize, Serialize};

use crate::{
    api::{ProjectId, VersionId},
    Timestamp,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Version {
    pub id: VersionId,
    pub version_string: String,
    #[serde(default)]
    pub file_count: u32,
    pub project_id: Option<ProjectId>,
    pub created_at: Option<Timestamp>,
}
