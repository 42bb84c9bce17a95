//! フライト検索の一連の処理
//!
//! open → navigate → 入力 → 結果待ち → ブロック抽出 → 解析 → 組み立て → 保存 → close

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{ScraperConfig, SiteProfile};
use crate::error::ScraperError;
use crate::traits::{BrowserDriver, Clock, FieldParser, SessionLauncher, SystemClock};

use super::artifact::ArtifactWriter;
use super::assembler::assemble;
use super::blocks::BlockExtractor;
use super::browser::ChromiumLauncher;
use super::context::RunContext;
use super::input::InputBinder;
use super::parser::HeuristicFieldParser;
use super::readiness::ContentReadyDetector;
use super::types::{DateBinding, FlightQuery, FlightSearchOutcome, SearchStamp, SnapshotOutcome};

pub struct FlightSearchPipeline {
    launcher: Arc<dyn SessionLauncher>,
    profile: SiteProfile,
    parser: Arc<dyn FieldParser>,
    clock: Arc<dyn Clock>,
    writer: ArtifactWriter,
}

impl FlightSearchPipeline {
    pub fn new(
        launcher: Arc<dyn SessionLauncher>,
        profile: SiteProfile,
        writer: ArtifactWriter,
    ) -> Self {
        let parser = HeuristicFieldParser::new(profile.operators.as_slice(), &profile.currency_marker);
        Self {
            launcher,
            profile,
            parser: Arc::new(parser),
            clock: Arc::new(SystemClock),
            writer,
        }
    }

    /// Chromium + BudgetTicket の構成
    pub fn chromium(config: ScraperConfig) -> Self {
        let writer = ArtifactWriter::new(&config.output_dir).with_debug(config.debug);
        Self::new(
            Arc::new(ChromiumLauncher::new(config)),
            SiteProfile::default(),
            writer,
        )
    }

    pub fn with_parser(mut self, parser: Arc<dyn FieldParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 検索を1回実行。セッションは成功・失敗・キャンセルのどの場合も閉じる。
    pub async fn run(
        &self,
        query: &FlightQuery,
        cancel: &CancellationToken,
    ) -> Result<FlightSearchOutcome, ScraperError> {
        info!(
            "Flight search: {} -> {} on {}",
            query.origin, query.destination, query.journey_date
        );

        let session = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScraperError::Cancelled),
            session = self.launcher.open() => session?,
        };

        let result = self.drive(session.as_ref(), query, cancel).await;

        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }

        match &result {
            Ok(outcome) => info!("Flight search finished: {} flights", outcome.total_flights()),
            Err(e) => warn!("Flight search failed: {}", e),
        }
        result
    }

    async fn drive(
        &self,
        driver: &dyn BrowserDriver,
        query: &FlightQuery,
        cancel: &CancellationToken,
    ) -> Result<FlightSearchOutcome, ScraperError> {
        let ctx = RunContext::new(driver, self.clock.as_ref(), cancel);
        let mut diagnostics = Vec::new();

        ctx.step(driver.navigate(&self.profile.url)).await?;

        let binder = InputBinder::new(&self.profile);
        binder.select_origin(&ctx, &query.origin).await?;
        binder.select_destination(&ctx, &query.destination).await?;
        let date_binding = binder.select_date(&ctx, query.journey_date).await?;
        if let DateBinding::Skipped(reason) = &date_binding {
            diagnostics.push(format!("date picker skipped: {}", reason));
        }
        binder.submit(&ctx).await?;

        let poll_attempts = ContentReadyDetector::from_profile(&self.profile)
            .wait_until_ready(&ctx)
            .await?;

        let blocks = BlockExtractor::new(self.profile.currency_marker.as_str())
            .extract(&ctx)
            .await?;
        let partials = blocks
            .iter()
            .map(|block| self.parser.parse(block))
            .collect();

        let stamp = SearchStamp::new(query, self.clock.now());
        let offers = assemble(partials, &stamp);

        let records_path = self.writer.write_records(&offers)?;
        let snapshot = self.writer.capture_snapshot(&ctx).await?;
        if let SnapshotOutcome::Failed(reason) = &snapshot {
            diagnostics.push(format!("snapshot not saved: {}", reason));
        }

        Ok(FlightSearchOutcome {
            offers,
            records_path,
            snapshot,
            date_binding,
            poll_attempts,
            diagnostics,
        })
    }
}
