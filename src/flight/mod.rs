//! BudgetTicket フライト検索スクレイパーモジュール
//!
//! 検索フォームを操作し、非同期に描画される検索結果のテキストから
//! フライト情報を取り出してJSONに保存する

mod artifact;
mod assembler;
mod blocks;
mod browser;
mod context;
mod input;
mod parser;
mod pipeline;
mod readiness;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use artifact::{ArtifactWriter, RECORDS_FILE_NAME, SNAPSHOT_FILE_NAME};
pub use assembler::assemble;
pub use blocks::BlockExtractor;
pub use browser::{ChromiumLauncher, ChromiumSession};
pub use context::RunContext;
pub use input::InputBinder;
pub use parser::HeuristicFieldParser;
pub use pipeline::FlightSearchPipeline;
pub use readiness::{AnyMarker, ContentReadyDetector, MarkerPredicate, Readiness};
pub use types::{
    DateBinding, FlightOffer, FlightQuery, FlightSearchOutcome, PartialOffer, SearchStamp,
    SnapshotOutcome,
};
