use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ScraperError;
use crate::flight::PartialOffer;

/// 要素の探し方
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// `input[placeholder='...']`
    Placeholder(String),
    /// テキストを含む `<label>`
    Label(String),
    Css(String),
    XPath(String),
}

/// ブラウザ操作の抽象（CDP実装とテスト用モックを差し替える）
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// URLへ遷移（2xx以外はエラー）
    async fn navigate(&self, url: &str) -> Result<(), ScraperError>;

    /// 要素が操作可能になるまで待機
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> Result<(), ScraperError>;

    async fn click(&self, locator: &Locator) -> Result<(), ScraperError>;

    async fn clear(&self, locator: &Locator) -> Result<(), ScraperError>;

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), ScraperError>;

    async fn press_key(&self, locator: &Locator, key: &str) -> Result<(), ScraperError>;

    /// 一致する全要素のテキスト（見つからなければ空）
    async fn texts(&self, locator: &Locator) -> Result<Vec<String>, ScraperError>;

    /// 現在描画されているページの内容
    async fn page_text(&self) -> Result<String, ScraperError>;

    /// `marker` を含む要素のテキスト（文書順）
    async fn marked_blocks(&self, marker: &str) -> Result<Vec<String>, ScraperError>;

    /// フルページのPNG
    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError>;

    /// セッション終了（何度呼んでも安全）
    async fn close(&self) -> Result<(), ScraperError>;
}

/// ブラウザセッションの起動
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserDriver>, ScraperError>;
}

/// 待機と現在時刻（テストでは記録用の実装に差し替える）
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);

    fn now(&self) -> DateTime<Utc>;
}

/// tokio タイマーを使う通常の時計
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// ブロックテキストからフィールドを取り出す（副作用なし）
pub trait FieldParser: Send + Sync {
    fn parse(&self, block: &str) -> PartialOffer;
}
