//! 検索結果の表示待ち
//!
//! `Waiting` から始まり、成功マーカーを検出すると `Ready`、
//! 上限回数を超えると `TimedOut` に遷移する（どちらも終端状態）。

use std::time::Duration;

use tracing::{debug, info};

use crate::config::SiteProfile;
use crate::error::ScraperError;

use super::context::RunContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Waiting { attempts: u32 },
    Ready { attempts: u32 },
    TimedOut { attempts: u32 },
}

impl Readiness {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Readiness::Waiting { .. })
    }
}

/// ページ内容に成功マーカーが含まれるかの判定
pub trait MarkerPredicate: Send + Sync {
    fn is_present(&self, page_text: &str) -> bool;
}

/// いずれかの文字列を含めば成功
#[derive(Debug, Clone)]
pub struct AnyMarker(pub Vec<String>);

impl MarkerPredicate for AnyMarker {
    fn is_present(&self, page_text: &str) -> bool {
        self.0.iter().any(|marker| page_text.contains(marker.as_str()))
    }
}

pub struct ContentReadyDetector<P: MarkerPredicate> {
    predicate: P,
    max_attempts: u32,
    interval: Duration,
    state: Readiness,
}

impl ContentReadyDetector<AnyMarker> {
    pub fn from_profile(profile: &SiteProfile) -> Self {
        Self::new(
            AnyMarker(profile.success_markers.clone()),
            profile.max_poll_attempts,
            profile.poll_interval,
        )
    }
}

impl<P: MarkerPredicate> ContentReadyDetector<P> {
    pub fn new(predicate: P, max_attempts: u32, interval: Duration) -> Self {
        Self {
            predicate,
            max_attempts,
            interval,
            state: Readiness::Waiting { attempts: 0 },
        }
    }

    pub fn state(&self) -> Readiness {
        self.state
    }

    /// 1回分の観測で状態を進める。`None` は読み取り失敗（未検出扱い）。
    pub fn observe(&mut self, page_text: Option<&str>) -> Readiness {
        if let Readiness::Waiting { attempts } = self.state {
            let attempts = attempts + 1;
            let found = page_text.is_some_and(|text| self.predicate.is_present(text));
            self.state = if found {
                Readiness::Ready { attempts }
            } else if attempts >= self.max_attempts {
                Readiness::TimedOut { attempts }
            } else {
                Readiness::Waiting { attempts }
            };
        }
        self.state
    }

    /// 結果が表示されるまでポーリング。検出までの回数を返す。
    pub async fn wait_until_ready(&mut self, ctx: &RunContext<'_>) -> Result<u32, ScraperError> {
        info!("Waiting dynamically for flight results to appear...");
        loop {
            let page_text = match ctx.step(ctx.driver.page_text()).await {
                Ok(text) => Some(text),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    debug!("Page read failed during polling: {}", e);
                    None
                }
            };

            match self.observe(page_text.as_deref()) {
                Readiness::Ready { attempts } => {
                    info!("Flights detected on attempt {}", attempts);
                    return Ok(attempts);
                }
                Readiness::Waiting { attempts } => {
                    if attempts % 10 == 0 {
                        info!(
                            "Still waiting for results... ({}/{})",
                            attempts, self.max_attempts
                        );
                    }
                    ctx.pause(self.interval).await?;
                }
                Readiness::TimedOut { attempts } => {
                    ctx.pause(self.interval).await?;
                    return Err(ScraperError::ContentTimeout { attempts });
                }
            }
        }
    }
}
