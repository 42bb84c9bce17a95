use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower::limit::ConcurrencyLimit;
use tower::Service;
use tracing::{error, info};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::flight::{FlightOffer, FlightQuery, FlightSearchOutcome, FlightSearchPipeline};

/// 検索リクエスト（`journey_date` は YYYY-MM-DD）
#[derive(Debug, Clone)]
pub struct FlightSearchRequest {
    pub origin: String,
    pub destination: String,
    pub journey_date: String,
    pub cancel: CancellationToken,
}

impl FlightSearchRequest {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        journey_date: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            journey_date: journey_date.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// 呼び出し側から中断できるようにする
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl TryFrom<&FlightSearchRequest> for FlightQuery {
    type Error = ScraperError;

    fn try_from(req: &FlightSearchRequest) -> Result<Self, Self::Error> {
        FlightQuery::parse(&req.origin, &req.destination, &req.journey_date)
    }
}

/// 呼び出し元に返すJSONペイロード
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FlightSearchResponse {
    Success {
        total_flights: usize,
        data: Vec<FlightOffer>,
    },
    Failure {
        error: String,
        traceback: String,
    },
}

impl From<Result<FlightSearchOutcome, ScraperError>> for FlightSearchResponse {
    fn from(result: Result<FlightSearchOutcome, ScraperError>) -> Self {
        match result {
            Ok(outcome) => FlightSearchResponse::Success {
                total_flights: outcome.total_flights(),
                data: outcome.offers,
            },
            Err(e) => FlightSearchResponse::Failure {
                error: e.to_string(),
                traceback: e.trace(),
            },
        }
    }
}

impl FlightSearchResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, FlightSearchResponse::Success { .. })
    }
}

/// tower::Serviceを実装したフライト検索サービス
///
/// リクエストごとに独立したブラウザセッションを開く。
#[derive(Clone)]
pub struct FlightSearchService {
    pipeline: Arc<FlightSearchPipeline>,
}

impl FlightSearchService {
    pub fn new(pipeline: FlightSearchPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }

    /// Chromiumで実行し、同時セッション数を設定値で制限する
    pub fn chromium(config: ScraperConfig) -> ConcurrencyLimit<Self> {
        let max = config.max_concurrent_sessions;
        Self::new(FlightSearchPipeline::chromium(config)).bounded(max)
    }

    /// 同時に実行する検索の上限
    pub fn bounded(self, max_concurrent_sessions: usize) -> ConcurrencyLimit<Self> {
        ConcurrencyLimit::new(self, max_concurrent_sessions.max(1))
    }
}

impl Service<FlightSearchRequest> for FlightSearchService {
    type Response = FlightSearchOutcome;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: FlightSearchRequest) -> Self::Future {
        info!(
            "Flight search request: {} -> {} ({})",
            req.origin, req.destination, req.journey_date
        );
        let pipeline = self.pipeline.clone();

        Box::pin(async move {
            let query = FlightQuery::try_from(&req)?;
            let result = pipeline.run(&query, &req.cancel).await;

            if let Err(e) = &result {
                error!("Exception occurred during scraping:\n{}", e.trace());
            }
            result
        })
    }
}
