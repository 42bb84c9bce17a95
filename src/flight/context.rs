//! 1回の実行で共有するセッション・時計・キャンセルトークン

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::ScraperError;
use crate::traits::{BrowserDriver, Clock};

pub struct RunContext<'a> {
    pub driver: &'a dyn BrowserDriver,
    pub clock: &'a dyn Clock,
    pub cancel: &'a CancellationToken,
}

impl<'a> RunContext<'a> {
    pub fn new(
        driver: &'a dyn BrowserDriver,
        clock: &'a dyn Clock,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            driver,
            clock,
            cancel,
        }
    }

    /// ブラウザ操作をキャンセル可能にして実行
    pub async fn step<T, F>(&self, fut: F) -> Result<T, ScraperError>
    where
        F: Future<Output = Result<T, ScraperError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(ScraperError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ScraperError::Cancelled),
            result = fut => result,
        }
    }

    /// 固定時間の待機
    pub async fn pause(&self, duration: Duration) -> Result<(), ScraperError> {
        self.step(async {
            self.clock.sleep(duration).await;
            Ok(())
        })
        .await
    }
}
