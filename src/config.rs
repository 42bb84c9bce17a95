use std::path::PathBuf;
use std::time::Duration;

use crate::traits::Locator;

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub output_dir: PathBuf,
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub window_size: (u32, u32),
    /// ブラウザ起動の上限時間
    pub launch_timeout: Duration,
    /// ページ遷移の上限時間
    pub navigation_timeout: Duration,
    pub debug: bool,
    /// 同時に起動できるブラウザセッション数
    pub max_concurrent_sessions: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            headless: true,
            chrome_executable: None,
            window_size: (1280, 800),
            launch_timeout: Duration::from_secs(30),
            navigation_timeout: Duration::from_secs(90),
            debug: false,
            max_concurrent_sessions: 2,
        }
    }
}

impl ScraperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// CHROME_PATH / CHROMIUM_PATH からChromeのパスを取得
    pub fn from_env() -> Self {
        let chrome_executable = std::env::var("CHROME_PATH")
            .or_else(|_| std::env::var("CHROMIUM_PATH"))
            .ok()
            .map(PathBuf::from);

        Self {
            chrome_executable,
            ..Default::default()
        }
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_executable = Some(path.into());
        self
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_max_concurrent_sessions(mut self, max: usize) -> Self {
        self.max_concurrent_sessions = max.max(1);
        self
    }
}

/// 対象サイトのフォーム構造と判定ルール
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub url: String,
    pub origin_input: Locator,
    pub destination_input: Locator,
    pub date_trigger: Locator,
    /// 日付セルのクラス名（`td.<class>` の中から日で探す）
    pub date_cell_class: String,
    /// カレンダーの年月表示（例: "Dec 2025"）
    pub month_label: Locator,
    pub next_month: Locator,
    pub prev_month: Locator,
    /// 目的の月まで送る最大回数
    pub max_month_steps: u32,
    pub submit_button: Locator,
    /// 結果表示の判定に使う文字列（どれか1つでも含まれればOK）
    pub success_markers: Vec<String>,
    /// 価格ブロックの判定に使う通貨記号
    pub currency_marker: String,
    /// 航空会社名の候補
    pub operators: Vec<String>,
    pub keystroke_delay: Duration,
    /// オートコンプリートの候補表示待ち
    pub settle_interval: Duration,
    pub input_timeout: Duration,
    pub date_picker_timeout: Duration,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::budget_ticket()
    }
}

impl SiteProfile {
    pub fn budget_ticket() -> Self {
        Self {
            url: "https://www.budgetticket.in".to_string(),
            origin_input: Locator::Placeholder("Select Origin City".to_string()),
            destination_input: Locator::Placeholder("Select Destination City".to_string()),
            date_trigger: Locator::Label("Departure".to_string()),
            date_cell_class: "available".to_string(),
            month_label: Locator::Css("th.month".to_string()),
            next_month: Locator::Css("th.next.available".to_string()),
            prev_month: Locator::Css("th.prev.available".to_string()),
            max_month_steps: 12,
            submit_button: Locator::Css("input[type='submit'][value='Search']".to_string()),
            success_markers: vec![
                "₹".to_string(),
                "Air India".to_string(),
                "IndiGo".to_string(),
            ],
            currency_marker: "₹".to_string(),
            operators: [
                "IndiGo",
                "Air India",
                "Vistara",
                "SpiceJet",
                "Akasa",
                "Go First",
                "Alliance Air",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            keystroke_delay: Duration::from_millis(100),
            settle_interval: Duration::from_millis(1500),
            input_timeout: Duration::from_secs(30),
            date_picker_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_secs(2),
            max_poll_attempts: 60,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_poll(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = interval;
        self.max_poll_attempts = max_attempts;
        self
    }
}
