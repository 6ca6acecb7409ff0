use serde::{Deserialize, Serialize};

use crate::Timestamp;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct DashboardStats {
    pub total_projects: u64,
    pub total_versions: u64,
    pub total_files: u64,
    pub total_storage_bytes: u64,
    pub total_storage_mb: Option<f64>,
    pub download_trends: Option<Vec<DownloadTrend>>,
    pub recent_downloads: Option<Vec<RecentDownload>>,
}

/// Download count for one day, `date` as sent by the server (`YYYY-MM-DD`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DownloadTrend {
    pub date: String,
    pub count: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecentDownload {
    pub ip_address: String,
    pub filename: String,
    pub downloaded_at: Timestamp,
}
