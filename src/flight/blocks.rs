//! 価格を含む要素をフライト候補ブロックとして取り出す

use tracing::{debug, info};

use crate::error::ScraperError;

use super::context::RunContext;

pub struct BlockExtractor {
    marker: String,
}

impl BlockExtractor {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// 文書順（上から下）の候補ブロック
    pub async fn extract(&self, ctx: &RunContext<'_>) -> Result<Vec<String>, ScraperError> {
        info!("Extracting visible flight text blocks...");
        let raw = ctx
            .step(ctx.driver.marked_blocks(&self.marker))
            .await
            .map_err(|e| match e {
                ScraperError::Cancelled => e,
                other => ScraperError::Extraction(other.to_string()),
            })?;
        info!("Found {} potential flight containers", raw.len());

        Ok(self.retain_marked(raw))
    }

    /// 読み取りまでにDOMが変わることがあるので、トリム後に再確認する
    pub fn retain_marked(&self, raw: Vec<String>) -> Vec<String> {
        raw.into_iter()
            .filter_map(|text| {
                let trimmed = text.trim();
                if trimmed.contains(self.marker.as_str()) {
                    Some(trimmed.to_string())
                } else {
                    debug!("Dropping block without currency marker");
                    None
                }
            })
            .collect()
    }
}
