use tracing::{debug, info};

use super::types::{FlightOffer, PartialOffer, SearchStamp};

/// 航空会社と価格が揃ったものだけを入力順のままレコードにする。
/// 同じ内容のブロックもまとめない（一意なIDがないため）。
pub fn assemble(partials: Vec<PartialOffer>, stamp: &SearchStamp) -> Vec<FlightOffer> {
    let candidates = partials.len();
    let offers: Vec<FlightOffer> = partials
        .into_iter()
        .filter_map(|partial| {
            let offer = FlightOffer::from_partial(partial, stamp);
            if offer.is_none() {
                debug!("Skipping candidate without airline or price");
            }
            offer
        })
        .collect();

    info!("Extracted {} flights from {} candidates", offers.len(), candidates);
    offers
}
