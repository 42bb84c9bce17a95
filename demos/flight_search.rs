use std::sync::Arc;

use flight_scraper::flight::{ArtifactWriter, ChromiumLauncher};
use flight_scraper::{
    FlightSearchPipeline, FlightSearchRequest, FlightSearchResponse, FlightSearchService,
    ScraperConfig, SiteProfile,
};
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};

#[tokio::main]
async fn main() {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter("info,flight_scraper=debug")
        .init();

    // 引数: <origin> <destination> <YYYY-MM-DD>
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (origin, destination, date) = match args.as_slice() {
        [o, d, date] => (o.clone(), d.clone(), date.clone()),
        _ => ("Bangalore".to_string(), "Delhi".to_string(), "2025-12-12".to_string()),
    };

    let config = ScraperConfig::from_env()
        .with_output_dir("./results")
        .with_headless(false); // デバッグ用に表示モード

    // CDPハンドラはこのランタイムで動かす
    let launcher = ChromiumLauncher::new(config.clone()).with_runtime(tokio::runtime::Handle::current());
    let writer = ArtifactWriter::new(&config.output_dir).with_debug(config.debug);
    let pipeline = FlightSearchPipeline::new(Arc::new(launcher), SiteProfile::default(), writer);
    let mut service = FlightSearchService::new(pipeline).bounded(config.max_concurrent_sessions);

    // Ctrl+C で実行中の検索を中断
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    println!("=== Flight Search: {} -> {} ({}) ===", origin, destination, date);

    let request = FlightSearchRequest::new(origin, destination, date).with_cancellation(cancel);
    let result = match service.ready().await {
        Ok(svc) => svc.call(request).await,
        Err(e) => Err(e),
    };

    let response = FlightSearchResponse::from(result);
    match serde_json::to_string_pretty(&response) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("エラー: {}", e),
    }
}
