//! フライト検索の型定義

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::error::ScraperError;

/// 実行時刻のフォーマット（例: 2025-12-12T08:15:00Z）
pub const SEARCH_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// 検索条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightQuery {
    pub origin: String,
    pub destination: String,
    pub journey_date: NaiveDate,
}

impl FlightQuery {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        journey_date: NaiveDate,
    ) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
            journey_date,
        }
    }

    /// `YYYY-MM-DD` 形式の日付文字列から作成
    pub fn parse(origin: &str, destination: &str, journey_date: &str) -> Result<Self, ScraperError> {
        let origin = origin.trim();
        let destination = destination.trim();
        if origin.is_empty() || destination.is_empty() {
            return Err(ScraperError::InvalidRequest(
                "origin and destination must not be empty".to_string(),
            ));
        }

        let journey_date = NaiveDate::parse_from_str(journey_date.trim(), "%Y-%m-%d")
            .map_err(|e| {
                ScraperError::InvalidRequest(format!("journey_date '{}': {}", journey_date, e))
            })?;

        Ok(Self::new(origin, destination, journey_date))
    }
}

/// 必須項目チェック前のレコード
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialOffer {
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub price: Option<String>,
    pub raw_text: String,
}

impl PartialOffer {
    pub fn is_complete(&self) -> bool {
        self.airline.is_some() && self.price.is_some()
    }
}

/// 1回の実行で全レコードに付与するメタデータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchStamp {
    pub origin: String,
    pub destination: String,
    pub searched_at: DateTime<Utc>,
}

impl SearchStamp {
    pub fn new(query: &FlightQuery, searched_at: DateTime<Utc>) -> Self {
        Self {
            origin: query.origin.clone(),
            destination: query.destination.clone(),
            searched_at,
        }
    }

    pub fn formatted(&self) -> String {
        self.searched_at.format(SEARCH_TIMESTAMP_FORMAT).to_string()
    }
}

/// 出力レコード（組み立て後は変更不可）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct FlightOffer {
    airline: String,
    flight_number: Option<String>,
    departure_time: Option<String>,
    arrival_time: Option<String>,
    price: String,
    raw_text: String,
    #[serde(rename = "searchdatetime")]
    search_timestamp: String,
    origin: String,
    destination: String,
}

impl FlightOffer {
    /// 航空会社と価格が揃っている場合のみ作成
    pub fn from_partial(partial: PartialOffer, stamp: &SearchStamp) -> Option<Self> {
        let PartialOffer {
            airline,
            flight_number,
            departure_time,
            arrival_time,
            price,
            raw_text,
        } = partial;

        Some(Self {
            airline: airline?,
            flight_number,
            departure_time,
            arrival_time,
            price: price?,
            raw_text,
            search_timestamp: stamp.formatted(),
            origin: stamp.origin.clone(),
            destination: stamp.destination.clone(),
        })
    }

    pub fn airline(&self) -> &str {
        &self.airline
    }

    pub fn flight_number(&self) -> Option<&str> {
        self.flight_number.as_deref()
    }

    pub fn departure_time(&self) -> Option<&str> {
        self.departure_time.as_deref()
    }

    pub fn arrival_time(&self) -> Option<&str> {
        self.arrival_time.as_deref()
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn search_timestamp(&self) -> &str {
        &self.search_timestamp
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

/// 日付ピッカー操作の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateBinding {
    Applied,
    /// サイトのデフォルト日付で続行
    Skipped(String),
}

/// スクリーンショット保存の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Saved(PathBuf),
    Failed(String),
}

/// 1回の検索実行の結果
#[derive(Debug, Clone)]
pub struct FlightSearchOutcome {
    pub offers: Vec<FlightOffer>,
    pub records_path: PathBuf,
    pub snapshot: SnapshotOutcome,
    pub date_binding: DateBinding,
    /// 結果表示までのポーリング回数
    pub poll_attempts: u32,
    /// 致命的でない問題の記録
    pub diagnostics: Vec<String>,
}

impl FlightSearchOutcome {
    pub fn total_flights(&self) -> usize {
        self.offers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stamp() -> SearchStamp {
        SearchStamp {
            origin: "Bangalore".to_string(),
            destination: "Delhi".to_string(),
            searched_at: Utc.with_ymd_and_hms(2025, 12, 1, 9, 30, 5).unwrap(),
        }
    }

    #[test]
    fn test_query_parse() {
        let query = FlightQuery::parse(" Bangalore ", "Delhi", "2025-12-12").unwrap();
        assert_eq!(query.origin, "Bangalore");
        assert_eq!(query.journey_date, NaiveDate::from_ymd_opt(2025, 12, 12).unwrap());
    }

    #[test]
    fn test_query_parse_rejects_bad_input() {
        assert!(matches!(
            FlightQuery::parse("Bangalore", "Delhi", "12/12/2025"),
            Err(ScraperError::InvalidRequest(_))
        ));
        assert!(matches!(
            FlightQuery::parse("", "Delhi", "2025-12-12"),
            Err(ScraperError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_from_partial_requires_airline_and_price() {
        let partial = PartialOffer {
            airline: Some("IndiGo".to_string()),
            price: None,
            raw_text: "IndiGo 08:15".to_string(),
            ..Default::default()
        };
        assert!(FlightOffer::from_partial(partial, &stamp()).is_none());

        let partial = PartialOffer {
            airline: None,
            price: Some("₹4,599".to_string()),
            raw_text: "₹4,599".to_string(),
            ..Default::default()
        };
        assert!(FlightOffer::from_partial(partial, &stamp()).is_none());
    }

    #[test]
    fn test_offer_json_field_names() {
        let partial = PartialOffer {
            airline: Some("IndiGo".to_string()),
            price: Some("₹4,599".to_string()),
            departure_time: Some("08:15".to_string()),
            raw_text: "IndiGo 08:15 ₹4,599".to_string(),
            ..Default::default()
        };
        let offer = FlightOffer::from_partial(partial, &stamp()).unwrap();
        let json = serde_json::to_value(&offer).unwrap();
        let obj = json.as_object().unwrap();

        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "airline",
                "arrival_time",
                "departure_time",
                "destination",
                "flight_number",
                "origin",
                "price",
                "raw_text",
                "searchdatetime",
            ]
        );
        assert_eq!(obj["searchdatetime"], "2025-12-01T09:30:05Z");
        assert!(obj["flight_number"].is_null());
    }
}
