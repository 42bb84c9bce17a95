//! ブロックテキストのヒューリスティック解析
//!
//! 1. 航空会社: 既知の社名（大文字小文字・空白の揺れを許容）
//! 2. 便名: 1〜2文字の記号 + 任意のハイフン + 2〜4桁
//! 3. 価格: 通貨記号 + 数字（カンマ可）
//! 4. 時刻: 1つ目を出発、2つ目を到着とみなす
//!
//! 時刻の順序はブロックのレイアウトで検証していないため、
//! 出発と到着が逆に表示されるサイトでは取り違える。

use std::sync::LazyLock;

use regex::Regex;

use crate::traits::FieldParser;

use super::types::PartialOffer;

static FLIGHT_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:[A-Z]{1,2}|[0-9][A-Z]|[A-Z][0-9])-?\d{2,4}\b")
        .expect("invalid regex: flight number")
});

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{1,2}:\d{2}\b").expect("invalid regex: time"));

pub struct HeuristicFieldParser {
    airline: Option<Regex>,
    price: Regex,
}

impl HeuristicFieldParser {
    /// `operators` の社名と `currency` 記号で解析器を作成
    pub fn new<S: AsRef<str>>(operators: &[S], currency: &str) -> Self {
        let names: Vec<String> = operators
            .iter()
            .map(|name| {
                name.as_ref()
                    .split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s*")
            })
            .filter(|pattern| !pattern.is_empty())
            .collect();

        let airline = (!names.is_empty()).then(|| {
            Regex::new(&format!(r"(?i)(?:{})", names.join("|")))
                .expect("escaped operator names form a valid regex")
        });

        Self {
            airline,
            price: Regex::new(&format!(r"{}\s?\d[\d,]*", regex::escape(currency)))
                .expect("escaped currency forms a valid regex"),
        }
    }
}

impl Default for HeuristicFieldParser {
    fn default() -> Self {
        Self::new(
            &[
                "IndiGo",
                "Air India",
                "Vistara",
                "SpiceJet",
                "Akasa",
                "Go First",
                "Alliance Air",
            ],
            "₹",
        )
    }
}

impl FieldParser for HeuristicFieldParser {
    fn parse(&self, block: &str) -> PartialOffer {
        let first = |re: &Regex| re.find(block).map(|m| m.as_str().to_string());

        let mut times = TIME_RE.find_iter(block).map(|m| m.as_str().to_string());
        let departure_time = times.next();
        let arrival_time = times.next();

        PartialOffer {
            airline: self.airline.as_ref().and_then(first),
            flight_number: first(&*FLIGHT_NUMBER_RE),
            departure_time,
            arrival_time,
            price: first(&self.price),
            raw_text: block.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_block() {
        let parser = HeuristicFieldParser::default();
        let offer = parser.parse("IndiGo 6E-204 08:15 10:30 ₹4,599");

        assert_eq!(offer.airline.as_deref(), Some("IndiGo"));
        assert_eq!(offer.flight_number.as_deref(), Some("6E-204"));
        assert_eq!(offer.departure_time.as_deref(), Some("08:15"));
        assert_eq!(offer.arrival_time.as_deref(), Some("10:30"));
        assert_eq!(offer.price.as_deref(), Some("₹4,599"));
        assert_eq!(offer.raw_text, "IndiGo 6E-204 08:15 10:30 ₹4,599");
    }

    #[test]
    fn test_parse_is_deterministic() {
        let parser = HeuristicFieldParser::default();
        let text = "Air India\nAI-101\n6:05\n8:40\n₹ 12,340";
        assert_eq!(parser.parse(text), parser.parse(text));
    }

    #[test]
    fn test_airline_case_and_whitespace_tolerant() {
        let parser = HeuristicFieldParser::default();
        assert_eq!(
            parser.parse("AIRINDIA AI101 ₹5,000").airline.as_deref(),
            Some("AIRINDIA")
        );
        assert_eq!(
            parser.parse("go   first G8-112 ₹3,999").airline.as_deref(),
            Some("go   first")
        );
        assert_eq!(parser.parse("Emirates ₹30,000").airline, None);
    }

    #[test]
    fn test_first_match_wins() {
        let parser = HeuristicFieldParser::default();
        let offer = parser.parse("SpiceJet SG-8169 ₹3,100 IndiGo 6E-22 ₹4,000");
        assert_eq!(offer.airline.as_deref(), Some("SpiceJet"));
        assert_eq!(offer.flight_number.as_deref(), Some("SG-8169"));
        assert_eq!(offer.price.as_deref(), Some("₹3,100"));
    }

    #[test]
    fn test_times_extra_occurrences_ignored() {
        let parser = HeuristicFieldParser::default();
        let offer = parser.parse("Akasa QP 1:05 3:20 2h 15m 23:59 ₹2,499");
        assert_eq!(offer.departure_time.as_deref(), Some("1:05"));
        assert_eq!(offer.arrival_time.as_deref(), Some("3:20"));
    }

    #[test]
    fn test_single_time_leaves_arrival_absent() {
        let parser = HeuristicFieldParser::default();
        let offer = parser.parse("Vistara 07:00 ₹9,999");
        assert_eq!(offer.departure_time.as_deref(), Some("07:00"));
        assert_eq!(offer.arrival_time, None);
        assert_eq!(offer.flight_number, None);
    }

    #[test]
    fn test_no_currency_no_price() {
        let parser = HeuristicFieldParser::default();
        let offer = parser.parse("IndiGo 6E-204 08:15 10:30 Sold out");
        assert_eq!(offer.price, None);
        assert!(!offer.is_complete());
    }

    #[test]
    fn test_custom_operator_set() {
        let parser = HeuristicFieldParser::new(&["Star Air"], "$");
        let offer = parser.parse("star air S5-118 $ 120");
        assert_eq!(offer.airline.as_deref(), Some("star air"));
        assert_eq!(offer.price.as_deref(), Some("$ 120"));

        let empty = HeuristicFieldParser::new::<&str>(&[], "$");
        assert_eq!(empty.parse("Star Air $120").airline, None);
    }
}
