//! 検索フォームへの入力

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use crate::config::SiteProfile;
use crate::error::ScraperError;
use crate::traits::Locator;

use super::context::RunContext;
use super::types::DateBinding;

pub struct InputBinder<'a> {
    profile: &'a SiteProfile,
}

impl<'a> InputBinder<'a> {
    pub fn new(profile: &'a SiteProfile) -> Self {
        Self { profile }
    }

    pub async fn select_origin(&self, ctx: &RunContext<'_>, city: &str) -> Result<(), ScraperError> {
        info!("Selecting origin city: {}", city);
        self.select_city(ctx, &self.profile.origin_input, city)
            .await
            .map_err(|e| binding_error("origin", e))
    }

    pub async fn select_destination(
        &self,
        ctx: &RunContext<'_>,
        city: &str,
    ) -> Result<(), ScraperError> {
        info!("Selecting destination city: {}", city);
        self.select_city(ctx, &self.profile.destination_input, city)
            .await
            .map_err(|e| binding_error("destination", e))
    }

    /// 日付ピッカーは操作できなければサイトのデフォルト日付で続行する
    pub async fn select_date(
        &self,
        ctx: &RunContext<'_>,
        date: NaiveDate,
    ) -> Result<DateBinding, ScraperError> {
        info!("Selecting departure date: {}", date);
        match self.try_select_date(ctx, date).await {
            Ok(binding) => Ok(binding),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                warn!("Date picker not interactive, using site default date: {}", e);
                Ok(DateBinding::Skipped(e.to_string()))
            }
        }
    }

    pub async fn submit(&self, ctx: &RunContext<'_>) -> Result<(), ScraperError> {
        info!("Clicking search button...");
        let button = &self.profile.submit_button;
        let result = async {
            ctx.step(ctx.driver.wait_for(button, self.profile.input_timeout))
                .await?;
            ctx.step(ctx.driver.click(button)).await
        }
        .await;
        result.map_err(|e| binding_error("search button", e))
    }

    async fn select_city(
        &self,
        ctx: &RunContext<'_>,
        input: &Locator,
        city: &str,
    ) -> Result<(), ScraperError> {
        let driver = ctx.driver;
        ctx.step(driver.wait_for(input, self.profile.input_timeout))
            .await?;
        ctx.step(driver.click(input)).await?;
        ctx.step(driver.clear(input)).await?;

        // 1文字ずつ入力してオートコンプリートを発火させる
        let mut buf = [0u8; 4];
        for ch in city.chars() {
            ctx.step(driver.type_text(input, ch.encode_utf8(&mut buf)))
                .await?;
            ctx.pause(self.profile.keystroke_delay).await?;
        }

        ctx.pause(self.profile.settle_interval).await?;
        ctx.step(driver.press_key(input, "ArrowDown")).await?;
        ctx.step(driver.press_key(input, "Enter")).await?;
        debug!("City selected: {}", city);
        Ok(())
    }

    async fn try_select_date(
        &self,
        ctx: &RunContext<'_>,
        date: NaiveDate,
    ) -> Result<DateBinding, ScraperError> {
        let driver = ctx.driver;
        let trigger = &self.profile.date_trigger;
        ctx.step(driver.wait_for(trigger, self.profile.date_picker_timeout))
            .await?;
        ctx.step(driver.click(trigger)).await?;
        ctx.pause(self.profile.settle_interval).await?;

        let target = month_start(date);
        for step in 0..=self.profile.max_month_steps {
            let labels = ctx.step(driver.texts(&self.profile.month_label)).await?;
            let shown: Vec<(String, NaiveDate)> = labels
                .into_iter()
                .filter_map(|label| parse_month_label(&label).map(|month| (label, month)))
                .collect();
            debug!("Date picker shows: {:?}", shown);

            if let Some((label, _)) = shown.iter().find(|(_, month)| *month == target) {
                let cell = day_cell(&self.profile.date_cell_class, label, date);
                ctx.step(driver.wait_for(&cell, self.profile.date_picker_timeout))
                    .await?;
                ctx.step(driver.click(&cell)).await?;
                debug!("Date cell clicked: {:?}", cell);
                return Ok(DateBinding::Applied);
            }

            let (Some((_, first)), Some((_, last))) = (shown.first(), shown.last()) else {
                break;
            };
            if step == self.profile.max_month_steps {
                break;
            }

            let nav = if target > *last {
                &self.profile.next_month
            } else if target < *first {
                &self.profile.prev_month
            } else {
                break;
            };
            let moved = async {
                ctx.step(driver.wait_for(nav, self.profile.date_picker_timeout))
                    .await?;
                ctx.step(driver.click(nav)).await
            }
            .await;
            match moved {
                Ok(()) => ctx.pause(self.profile.settle_interval).await?,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    debug!("Cannot change date picker month: {}", e);
                    break;
                }
            }
        }

        warn!("Requested month {} not shown in date picker", target.format("%b %Y"));
        Ok(DateBinding::Skipped(MONTH_NOT_DISPLAYED.to_string()))
    }
}

const MONTH_NOT_DISPLAYED: &str = "requested month not displayed";

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// "Dec 2025" / "December 2025" をその月の1日に変換
fn parse_month_label(label: &str) -> Option<NaiveDate> {
    let text = format!("1 {}", label.split_whitespace().collect::<Vec<_>>().join(" "));
    NaiveDate::parse_from_str(&text, "%d %b %Y")
        .or_else(|_| NaiveDate::parse_from_str(&text, "%d %B %Y"))
        .ok()
}

/// 指定月のカレンダー表の中で、テキストが日と一致する `td.<class>`
pub fn day_cell(class: &str, month_label: &str, date: NaiveDate) -> Locator {
    Locator::XPath(format!(
        "//table[.//th[contains(concat(' ', normalize-space(@class), ' '), ' month ') and normalize-space(.)='{}']]\
         //td[contains(concat(' ', normalize-space(@class), ' '), ' {} ') and normalize-space(.)='{}']",
        month_label.trim(),
        class,
        date.day()
    ))
}

fn binding_error(field: &str, e: ScraperError) -> ScraperError {
    match e {
        ScraperError::Cancelled => ScraperError::Cancelled,
        other => ScraperError::InputBinding(format!("{}: {}", field, other)),
    }
}
