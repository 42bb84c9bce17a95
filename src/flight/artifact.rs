//! 実行結果の保存（JSON + フルページスクリーンショット）

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::error::ScraperError;

use super::context::RunContext;
use super::types::{FlightOffer, SnapshotOutcome};

pub const RECORDS_FILE_NAME: &str = "flight_results_dom_fallback.json";
pub const SNAPSHOT_FILE_NAME: &str = "flight_results_verified.png";

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
    debug: bool,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            debug: false,
        }
    }

    /// スクリーンショット保存失敗時にbase64でログへ出す
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn records_path(&self) -> PathBuf {
        self.output_dir.join(RECORDS_FILE_NAME)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.output_dir.join(SNAPSHOT_FILE_NAME)
    }

    /// レコードを保存（失敗は致命的）
    pub fn write_records(&self, offers: &[FlightOffer]) -> Result<PathBuf, ScraperError> {
        let path = self.records_path();
        let persist = |e: &dyn std::fmt::Display| {
            error!("Failed to save flight results: {}", e);
            ScraperError::Persist(format!("{}: {}", path.display(), e))
        };

        std::fs::create_dir_all(&self.output_dir).map_err(|e| persist(&e))?;
        let json = serde_json::to_string_pretty(offers).map_err(|e| persist(&e))?;
        std::fs::write(&path, json).map_err(|e| persist(&e))?;

        info!("Saved {} flights to {}", offers.len(), path.display());
        Ok(path)
    }

    /// スクリーンショットを保存（失敗しても実行は続ける）
    pub async fn capture_snapshot(&self, ctx: &RunContext<'_>) -> Result<SnapshotOutcome, ScraperError> {
        let image = match ctx.step(ctx.driver.screenshot()).await {
            Ok(image) => image,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                warn!("Failed to capture screenshot: {}", e);
                return Ok(SnapshotOutcome::Failed(e.to_string()));
            }
        };

        let path = self.snapshot_path();
        match write_file(&path, &image) {
            Ok(()) => {
                info!("Screenshot saved as {}", path.display());
                Ok(SnapshotOutcome::Saved(path))
            }
            Err(e) => {
                warn!("Failed to save screenshot {}: {}", path.display(), e);
                if self.debug {
                    use base64::Engine;
                    let encoded = base64::engine::general_purpose::STANDARD.encode(&image);
                    debug!("Result screenshot: data:image/png;base64,{}", encoded);
                }
                Ok(SnapshotOutcome::Failed(e.to_string()))
            }
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}
