use std::error::Error as _;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザセッションエラー: {0}")]
    Session(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("入力エラー: {0}")]
    InputBinding(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("タイムアウト: {attempts}回のポーリングで検索結果が表示されませんでした")]
    ContentTimeout { attempts: u32 },

    #[error("抽出エラー: {0}")]
    Extraction(String),

    #[error("保存エラー: {0}")]
    Persist(String),

    #[error("不正なリクエスト: {0}")]
    InvalidRequest(String),

    #[error("キャンセルされました")]
    Cancelled,

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("JSONエラー: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScraperError {
    /// 実行を中断すべきエラーか（キャンセルは常に致命的）
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScraperError::Cancelled)
    }

    /// source チェーンを含む診断用トレース
    pub fn trace(&self) -> String {
        let mut trace = format!("{:?}", self);
        let mut source = self.source();
        while let Some(cause) = source {
            trace.push_str(&format!("\ncaused by: {}", cause));
            source = cause.source();
        }
        trace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_includes_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only fs");
        let err = ScraperError::from(io);
        let trace = err.trace();
        assert!(trace.starts_with("FileIO"));
        assert!(trace.contains("caused by: read-only fs"));
    }

    #[test]
    fn test_content_timeout_display() {
        let err = ScraperError::ContentTimeout { attempts: 60 };
        assert!(err.to_string().contains("60"));
        assert!(!err.is_cancelled());
        assert!(ScraperError::Cancelled.is_cancelled());
    }
}
