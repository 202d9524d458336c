//! Market row model.
//!
//! Mirrors the `markets` table populated by the market sync job. The sync job
//! owns the schema; this crate only reads it.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sports_recon_core::{MarketStatus, RawMarket};

/// One row of the `markets` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MarketRecord {
    /// Contract ticker, e.g. `KXNFLGAME-25NOV16KCDEN-KC`
    pub ticker: String,
    /// Free-text market title
    pub title: String,
    /// `active` or `closed`
    pub status: String,
    /// Price of the "yes" contract (0.0 to 1.0)
    pub yes_price: Decimal,
    /// Price of the "no" contract (0.0 to 1.0)
    pub no_price: Decimal,
    /// Contracts traded
    pub volume: i64,
    /// Contracts outstanding
    pub open_interest: i64,
    pub close_time: DateTime<Utc>,
}

impl TryFrom<MarketRecord> for RawMarket {
    type Error = anyhow::Error;

    fn try_from(record: MarketRecord) -> Result<Self> {
        let status: MarketStatus = record
            .status
            .parse()
            .with_context(|| format!("market {}", record.ticker))?;
        let volume = u64::try_from(record.volume)
            .with_context(|| format!("negative volume on {}", record.ticker))?;
        let open_interest = u64::try_from(record.open_interest)
            .with_context(|| format!("negative open interest on {}", record.ticker))?;

        Ok(RawMarket {
            ticker: record.ticker,
            title: record.title,
            status,
            yes_price: record.yes_price,
            no_price: record.no_price,
            volume,
            open_interest,
            close_time: record.close_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_record() -> MarketRecord {
        MarketRecord {
            ticker: "KXNFLGAME-25NOV16KCDEN-KC".to_string(),
            title: "Kansas City at Denver Winner?".to_string(),
            status: "active".to_string(),
            yes_price: dec!(0.57),
            no_price: dec!(0.44),
            volume: 125_000,
            open_interest: 40_000,
            close_time: Utc.with_ymd_and_hms(2025, 11, 16, 21, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_record_converts_to_raw_market() {
        let market = RawMarket::try_from(sample_record()).unwrap();
        assert_eq!(market.status, MarketStatus::Active);
        assert_eq!(market.volume, 125_000);
        assert_eq!(market.price_sum(), dec!(1.01));
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let mut record = sample_record();
        record.status = "suspended".to_string();
        let err = RawMarket::try_from(record).unwrap_err();
        assert!(format!("{err:#}").contains("KXNFLGAME-25NOV16KCDEN-KC"));
    }

    #[test]
    fn test_negative_volume_is_rejected() {
        let mut record = sample_record();
        record.volume = -1;
        assert!(RawMarket::try_from(record).is_err());
    }
}
