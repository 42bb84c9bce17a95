//! テスト用のモックドライバと時計

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use crate::config::SiteProfile;
use crate::error::ScraperError;
use crate::traits::{BrowserDriver, Clock, Locator, SessionLauncher};

#[derive(Default)]
struct DriverState {
    page_texts: Mutex<VecDeque<String>>,
    blocks: Mutex<Vec<String>>,
    missing: Mutex<HashSet<Locator>>,
    calendar: Mutex<Vec<String>>,
    calendar_index: AtomicUsize,
    navigation_error: Mutex<Option<String>>,
    screenshot_error: Mutex<bool>,
    actions: Mutex<Vec<String>>,
    page_reads: AtomicUsize,
    closes: AtomicUsize,
}

/// 操作を記録し、あらかじめ決めた内容を返すドライバ
#[derive(Clone, Default)]
pub struct ScriptedDriver {
    state: Arc<DriverState>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// ポーリングごとに返すページ内容（尽きたら最後の値を返し続ける）
    pub fn with_page_texts(self, texts: &[&str]) -> Self {
        *self.state.page_texts.lock().unwrap() = texts.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_blocks(self, blocks: &[&str]) -> Self {
        *self.state.blocks.lock().unwrap() = blocks.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn with_missing(self, locator: Locator) -> Self {
        self.state.missing.lock().unwrap().insert(locator);
        self
    }

    /// 日付ピッカーの月表示（先頭から表示し、次/前ボタンで移動）
    pub fn with_calendar(self, months: &[&str]) -> Self {
        *self.state.calendar.lock().unwrap() = months.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_navigation_error(self, message: &str) -> Self {
        *self.state.navigation_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn with_screenshot_error(self) -> Self {
        *self.state.screenshot_error.lock().unwrap() = true;
        self
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.actions.lock().unwrap().clone()
    }

    pub fn page_reads(&self) -> usize {
        self.state.page_reads.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    fn record(&self, action: String) {
        self.state.actions.lock().unwrap().push(action);
    }

    fn check(&self, locator: &Locator) -> Result<(), ScraperError> {
        if self.state.missing.lock().unwrap().contains(locator) {
            return Err(ScraperError::ElementNotFound(format!("{:?}", locator)));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        self.record(format!("navigate {}", url));
        match self.state.navigation_error.lock().unwrap().clone() {
            Some(message) => Err(ScraperError::Navigation(message)),
            None => Ok(()),
        }
    }

    async fn wait_for(&self, locator: &Locator, _timeout: Duration) -> Result<(), ScraperError> {
        self.check(locator)
    }

    async fn click(&self, locator: &Locator) -> Result<(), ScraperError> {
        self.check(locator)?;
        self.record(format!("click {:?}", locator));

        let profile = SiteProfile::default();
        let months = self.state.calendar.lock().unwrap().len();
        let index = &self.state.calendar_index;
        if *locator == profile.next_month && index.load(Ordering::SeqCst) + 1 < months {
            index.fetch_add(1, Ordering::SeqCst);
        } else if *locator == profile.prev_month && index.load(Ordering::SeqCst) > 0 {
            index.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> Result<(), ScraperError> {
        self.check(locator)?;
        self.record(format!("clear {:?}", locator));
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), ScraperError> {
        self.check(locator)?;
        self.record(format!("type {}", text));
        Ok(())
    }

    async fn press_key(&self, locator: &Locator, key: &str) -> Result<(), ScraperError> {
        self.check(locator)?;
        self.record(format!("key {}", key));
        Ok(())
    }

    async fn texts(&self, locator: &Locator) -> Result<Vec<String>, ScraperError> {
        if *locator != SiteProfile::default().month_label {
            return Ok(Vec::new());
        }
        let calendar = self.state.calendar.lock().unwrap();
        Ok(calendar
            .get(self.state.calendar_index.load(Ordering::SeqCst))
            .cloned()
            .into_iter()
            .collect())
    }

    async fn page_text(&self) -> Result<String, ScraperError> {
        self.state.page_reads.fetch_add(1, Ordering::SeqCst);
        let mut texts = self.state.page_texts.lock().unwrap();
        if texts.len() > 1 {
            Ok(texts.pop_front().unwrap_or_default())
        } else {
            Ok(texts.front().cloned().unwrap_or_default())
        }
    }

    async fn marked_blocks(&self, marker: &str) -> Result<Vec<String>, ScraperError> {
        self.record(format!("blocks {}", marker));
        Ok(self.state.blocks.lock().unwrap().clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        if *self.state.screenshot_error.lock().unwrap() {
            return Err(ScraperError::Session("screenshot failed".to_string()));
        }
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn close(&self) -> Result<(), ScraperError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 同じモックドライバを返すランチャー
pub struct ScriptedLauncher {
    pub driver: ScriptedDriver,
}

#[async_trait]
impl SessionLauncher for ScriptedLauncher {
    async fn open(&self) -> Result<Box<dyn BrowserDriver>, ScraperError> {
        Ok(Box::new(self.driver.clone()))
    }
}

/// 待機せずに待機時間だけ記録する時計
#[derive(Default)]
pub struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clock for RecordingClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }

    fn now(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, 6, 0, 0).unwrap()
    }
}

/// N回目の待機でキャンセルを発火させる時計
pub struct CancellingClock {
    cancel: CancellationToken,
    cancel_on: usize,
    sleeps: AtomicUsize,
}

impl CancellingClock {
    pub fn new(cancel: CancellationToken, cancel_on: usize) -> Self {
        Self {
            cancel,
            cancel_on,
            sleeps: AtomicUsize::new(0),
        }
    }

    pub fn sleeps(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Clock for CancellingClock {
    async fn sleep(&self, _duration: Duration) {
        let count = self.sleeps.fetch_add(1, Ordering::SeqCst) + 1;
        if count >= self.cancel_on {
            self.cancel.cancel();
        }
    }

    fn now(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, 6, 0, 0).unwrap()
    }
}

/// テスト用の一時ディレクトリ
pub fn temp_output_dir(name: &str) -> std::path::PathBuf {
    let unique_id = format!(
        "{}-{}-{}",
        name,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    );
    std::env::temp_dir().join(format!("flight-scraper-{}", unique_id))
}
