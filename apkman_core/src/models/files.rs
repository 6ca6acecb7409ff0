use serde::{Deserialize, Serialize};

use crate::{
    api::{FileId, UserId, VersionId},
    Timestamp,
};

/// An uploaded APK, as listed under a version.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApkFile {
    pub id: FileId,
    pub filename: String,
    pub file_size: u64,
    pub uploaded_at: Timestamp,
    pub uploader_name: Option<String>,
    pub version_id: Option<VersionId>,
    pub uploaded_by: Option<UserId>,
}
