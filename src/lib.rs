//! フライト検索スクレイパーライブラリ
//!
//! - BudgetTicket の検索フォームをブラウザで操作
//! - 非同期に描画される検索結果を待機してテキストからフライト情報を抽出
//! - 結果をJSONとスクリーンショットで保存
//!
//! # 使用例
//!
//! ```rust,ignore
//! use flight_scraper::{FlightSearchRequest, FlightSearchResponse, FlightSearchService, ScraperConfig};
//! use tower::{Service, ServiceExt};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScraperConfig::from_env().with_output_dir("./results");
//!     let mut service = FlightSearchService::chromium(config);
//!
//!     let request = FlightSearchRequest::new("Bangalore", "Delhi", "2025-12-12");
//!     let result = service.ready().await.unwrap().call(request).await;
//!
//!     let response = FlightSearchResponse::from(result);
//!     println!("{}", serde_json::to_string_pretty(&response).unwrap());
//! }
//! ```

pub mod config;
pub mod error;
pub mod flight;
pub mod service;
pub mod traits;

// 主要な型をリエクスポート
pub use config::{ScraperConfig, SiteProfile};
pub use error::ScraperError;
pub use flight::{FlightOffer, FlightQuery, FlightSearchOutcome, FlightSearchPipeline};
pub use service::{FlightSearchRequest, FlightSearchResponse, FlightSearchService};
pub use traits::{BrowserDriver, Clock, FieldParser, Locator, SessionLauncher, SystemClock};
