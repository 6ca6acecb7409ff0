use std::path::{Path, PathBuf};

use crate::error::{ClientError, ClientResult};

pub const APK_EXTENSION: &str = ".apk";

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedApk {
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
}

pub fn is_apk(filename: &str) -> bool {
    filename.to_lowercase().ends_with(APK_EXTENSION)
}

/// Validates a picked file. The extension is checked before the file is touched.
pub fn select_apk<P>(path: P) -> ClientResult<SelectedApk>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let filename = path
        .file_name()
        .map(|x| x.to_string_lossy().to_string())
        .unwrap_or_default();
    if !is_apk(&filename) {
        return Err(ClientError::InvalidFile(
            "Only .apk files are allowed".to_string(),
        ));
    }
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(ClientError::InvalidFile(format!("{} is not a file", filename)));
    }
    Ok(SelectedApk {
        path: path.to_path_buf(),
        filename,
        size: metadata.len(),
    })
}

/// Turns bytes handed to the transport into whole percentages.
///
/// Percentages only ever increase and each value is reported once.
pub struct ProgressTracker<F> {
    sent: u64,
    total: u64,
    last: Option<u8>,
    on_progress: F,
}

impl<F> ProgressTracker<F>
where
    F: FnMut(u8),
{
    pub fn new(total: u64, on_progress: F) -> Self {
        ProgressTracker {
            sent: 0,
            total,
            last: None,
            on_progress,
        }
    }

    pub fn start(&mut self) {
        self.report(0);
    }

    pub fn advance(&mut self, bytes: u64) {
        self.sent = (self.sent + bytes).min(self.total);
        let percent = if self.total == 0 {
            100
        } else {
            ((self.sent * 100 + self.total / 2) / self.total) as u8
        };
        self.report(percent);
    }

    /// Called once the server accepted the upload.
    pub fn finish(&mut self) {
        self.report(100);
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }

    fn report(&mut self, percent: u8) {
        if self.last.map(|x| percent > x).unwrap_or(true) {
            self.last = Some(percent);
            (self.on_progress)(percent);
        }
    }
}
