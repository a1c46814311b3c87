use rust_decimal::prelude::*;

/// Unrealized P&L of a position at `current_price`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PnL {
    pub pnl: f64,
    pub pnl_percent: f64,
}

/// `pnl_percent = (current - entry) / entry * 100`, `pnl = size * pnl_percent / 100`.
/// Both are zero when the entry price is not positive.
pub fn unrealized(size: f64, entry_price: f64, current_price: f64) -> PnL {
    let entry = to_decimal(entry_price);
    if entry <= Decimal::ZERO {
        return PnL {
            pnl: 0.0,
            pnl_percent: 0.0,
        };
    }

    let hundred = Decimal::ONE_HUNDRED;
    let pnl_percent = (to_decimal(current_price) - entry) / entry * hundred;
    let pnl = to_decimal(size) * pnl_percent / hundred;

    PnL {
        pnl: pnl.round_dp(8).to_f64().unwrap_or(0.0),
        pnl_percent: pnl_percent.round_dp(4).to_f64().unwrap_or(0.0),
    }
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_gain() {
        let p = unrealized(100.0, 2.0, 3.0);
        assert_eq!(p.pnl_percent, 50.0);
        assert_eq!(p.pnl, 50.0);
    }

    #[test]
    fn test_loss() {
        let p = unrealized(250.0, 0.0004, 0.0003);
        assert_eq!(p.pnl_percent, -25.0);
        assert_eq!(p.pnl, -62.5);
    }

    #[test]
    fn test_zero_entry() {
        let p = unrealized(100.0, 0.0, 5.0);
        assert_eq!(p, PnL { pnl: 0.0, pnl_percent: 0.0 });
    }

    #[test]
    fn test_no_float_drift() {
        // 0.1 + 0.2 style drift would leave 10.000000000000002 here
        let p = unrealized(10.0, 0.1, 0.2);
        assert_eq!(Decimal::from_f64(p.pnl).unwrap(), dec!(10));
    }
}
