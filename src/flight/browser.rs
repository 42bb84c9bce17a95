//! Chrome DevTools Protocol によるブラウザ操作

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::runtime::Handle;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::{BrowserDriver, Locator, SessionLauncher};

/// 要素待機のポーリング間隔
const ELEMENT_POLL_INTERVAL_MS: u64 = 250;

/// ナビゲーションのHTTPステータス（取得できなければ0）
const NAVIGATION_STATUS_JS: &str = r#"
    (() => {
        const entry = performance.getEntriesByType('navigation')[0];
        return entry && entry.responseStatus ? entry.responseStatus : 0;
    })()
"#;

/// 要素が表示されていてサイズを持つか
const IS_VISIBLE_JS: &str = r#"
    function() {
        const rect = this.getBoundingClientRect();
        const style = window.getComputedStyle(this);
        return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden';
    }
"#;

const CLEAR_VALUE_JS: &str = r#"
    function() {
        this.value = '';
        this.dispatchEvent(new Event('input', { bubbles: true }));
    }
"#;

/// ブラウザを起動してセッションを作る
pub struct ChromiumLauncher {
    config: ScraperConfig,
    runtime: Option<Handle>,
}

impl ChromiumLauncher {
    pub fn new(config: ScraperConfig) -> Self {
        Self {
            config,
            runtime: None,
        }
    }

    /// CDPイベントハンドラを実行するランタイム（未指定なら現在のランタイム）
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    fn browser_config(&self, user_data_dir: &Path) -> Result<BrowserConfig, ScraperError> {
        let (width, height) = self.config.window_size;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .user_data_dir(user_data_dir)
            .request_timeout(self.config.navigation_timeout);

        if let Some(chrome) = &self.config.chrome_executable {
            builder = builder.chrome_executable(chrome);
        }

        if !self.config.headless {
            builder = builder.with_head();
        }

        builder = builder
            .no_sandbox()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");

        if self.config.debug {
            builder = builder.arg("--enable-logging=stderr").arg("--v=1");
        }

        builder
            .build()
            .map_err(|e| ScraperError::Session(format!("ブラウザ設定エラー: {}", e)))
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn open(&self) -> Result<Box<dyn BrowserDriver>, ScraperError> {
        info!("Initializing browser...");

        let runtime = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|e| ScraperError::Session(e.to_string()))?,
        };

        // セッションごとにユーザーデータディレクトリを分ける
        let unique_id = format!(
            "{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        );
        let user_data_dir = std::env::temp_dir().join(format!("flight-scraper-{}", unique_id));

        let browser_config = self.browser_config(&user_data_dir)?;

        let (mut browser, mut handler) = timeout(self.config.launch_timeout, Browser::launch(browser_config))
            .await
            .map_err(|_| {
                ScraperError::Session(format!(
                    "browser did not start within {:?}",
                    self.config.launch_timeout
                ))
            })?
            .map_err(|e| ScraperError::Session(e.to_string()))?;

        let handler_task = runtime.spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(ScraperError::Session(e.to_string()));
            }
        };

        info!("Browser initialized successfully");
        Ok(Box::new(ChromiumSession {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task,
            navigation_timeout: self.config.navigation_timeout,
            user_data_dir,
        }))
    }
}

/// 1つのブラウザプロセスと1ページ
pub struct ChromiumSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: JoinHandle<()>,
    navigation_timeout: Duration,
    user_data_dir: PathBuf,
}

impl ChromiumSession {
    async fn element(&self, locator: &Locator) -> Result<Element, ScraperError> {
        let found = match locator {
            Locator::Placeholder(placeholder) => {
                self.page
                    .find_element(format!("input[placeholder={}]", css_string(placeholder)))
                    .await
            }
            Locator::Label(text) => {
                self.page
                    .find_xpath(format!(
                        "//label[contains(normalize-space(.), {})]",
                        xpath_literal(text)
                    ))
                    .await
            }
            Locator::Css(selector) => self.page.find_element(selector.as_str()).await,
            Locator::XPath(xpath) => self.page.find_xpath(xpath.as_str()).await,
        };
        found.map_err(|e| ScraperError::ElementNotFound(format!("{:?}: {}", locator, e)))
    }

    async fn is_visible(element: &Element) -> bool {
        match element.call_js_fn(IS_VISIBLE_JS, false).await {
            Ok(returns) => returns
                .result
                .value
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
            Err(e) => {
                debug!("Visibility check failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl BrowserDriver for ChromiumSession {
    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        info!("Opening {}...", url);
        timeout(self.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| {
                ScraperError::Navigation(format!(
                    "{} did not respond within {:?}",
                    url, self.navigation_timeout
                ))
            })?
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;

        let status: u16 = self
            .page
            .evaluate(NAVIGATION_STATUS_JS)
            .await
            .map(|v| v.into_value().unwrap_or(0))
            .unwrap_or(0);

        if status != 0 && !(200..300).contains(&status) {
            return Err(ScraperError::Navigation(format!("{} returned HTTP {}", url, status)));
        }
        debug!("Navigation complete: status={}", status);
        Ok(())
    }

    async fn wait_for(&self, locator: &Locator, wait: Duration) -> Result<(), ScraperError> {
        let start = std::time::Instant::now();
        loop {
            let last_error = match self.element(locator).await {
                Ok(element) => {
                    if Self::is_visible(&element).await {
                        return Ok(());
                    }
                    ScraperError::ElementNotFound(format!("{:?}: not visible", locator))
                }
                Err(e) => e,
            };

            if start.elapsed() > wait {
                return Err(last_error);
            }
            sleep(Duration::from_millis(ELEMENT_POLL_INTERVAL_MS)).await;
        }
    }

    async fn click(&self, locator: &Locator) -> Result<(), ScraperError> {
        self.element(locator)
            .await?
            .click()
            .await
            .map_err(|e| ScraperError::InputBinding(format!("click {:?}: {}", locator, e)))?;
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> Result<(), ScraperError> {
        self.element(locator)
            .await?
            .call_js_fn(CLEAR_VALUE_JS, false)
            .await
            .map_err(|e| ScraperError::InputBinding(format!("clear {:?}: {}", locator, e)))?;
        Ok(())
    }

    async fn type_text(&self, locator: &Locator, text: &str) -> Result<(), ScraperError> {
        self.element(locator)
            .await?
            .type_str(text)
            .await
            .map_err(|e| ScraperError::InputBinding(format!("type {:?}: {}", locator, e)))?;
        Ok(())
    }

    async fn press_key(&self, locator: &Locator, key: &str) -> Result<(), ScraperError> {
        self.element(locator)
            .await?
            .press_key(key)
            .await
            .map_err(|e| ScraperError::InputBinding(format!("key {} {:?}: {}", key, locator, e)))?;
        Ok(())
    }

    async fn texts(&self, locator: &Locator) -> Result<Vec<String>, ScraperError> {
        let nodes = match locator {
            Locator::Placeholder(placeholder) => format!(
                "Array.from(document.querySelectorAll({}))",
                serde_json::to_string(&format!("input[placeholder={}]", css_string(placeholder)))?
            ),
            Locator::Css(selector) => format!(
                "Array.from(document.querySelectorAll({}))",
                serde_json::to_string(selector)?
            ),
            Locator::Label(text) => xpath_nodes_js(&format!(
                "//label[contains(normalize-space(.), {})]",
                xpath_literal(text)
            ))?,
            Locator::XPath(xpath) => xpath_nodes_js(xpath)?,
        };
        let script = format!(
            "(() => {}.map(el => (el.innerText || el.textContent || '').trim()))()",
            nodes
        );

        self.page
            .evaluate(script.as_str())
            .await
            .map_err(|e| ScraperError::Extraction(format!("{:?}: {}", locator, e)))?
            .into_value::<Vec<String>>()
            .map_err(|e| ScraperError::Extraction(e.to_string()))
    }

    async fn page_text(&self) -> Result<String, ScraperError> {
        self.page
            .content()
            .await
            .map_err(|e| ScraperError::Extraction(format!("page.content() failed: {}", e)))
    }

    async fn marked_blocks(&self, marker: &str) -> Result<Vec<String>, ScraperError> {
        let script = format!(
            r#"
            (() => {{
                const marker = {};
                return Array.from(document.querySelectorAll('div'))
                    .map(div => div.innerText || '')
                    .filter(text => text.includes(marker));
            }})()
            "#,
            serde_json::to_string(marker)?
        );

        self.page
            .evaluate(script.as_str())
            .await
            .map_err(|e| ScraperError::Extraction(e.to_string()))?
            .into_value::<Vec<String>>()
            .map_err(|e| ScraperError::Extraction(e.to_string()))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ScraperError> {
        self.page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
            .map_err(|e| ScraperError::Session(format!("screenshot failed: {}", e)))
    }

    async fn close(&self) -> Result<(), ScraperError> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };
        info!("Closing browser...");

        if let Err(e) = browser.close().await {
            warn!("Failed to close browser cleanly: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("Failed to wait for browser process: {}", e);
        }
        self.handler_task.abort();

        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            debug!("Failed to remove user data dir: {}", e);
        }

        info!("Browser closed");
        Ok(())
    }
}

/// CSS属性セレクタ用の文字列リテラル
fn css_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// XPath文字列リテラル（引用符を含む場合は concat で組み立てる）
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        format!("'{}'", value)
    } else if !value.contains('"') {
        format!("\"{}\"", value)
    } else {
        let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// XPathに一致するノードを配列で返すJS式
fn xpath_nodes_js(xpath: &str) -> Result<String, ScraperError> {
    Ok(format!(
        r#"(() => {{
            const found = document.evaluate({}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
            return Array.from({{ length: found.snapshotLength }}, (_, i) => found.snapshotItem(i));
        }})()"#,
        serde_json::to_string(xpath)?
    ))
}
