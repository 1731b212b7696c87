//! Pure sizing math for percentage-of-portfolio orders.
//!
//! All sizing is lot-aware: quantities truncate to whole lots of 100
//! shares, never rounding up, so a computed buy can never exceed the cash
//! it was sized against and a computed sell can never exceed the usable
//! volume.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Minimum tradable unit for this market, in shares.
pub const LOT_SIZE: i64 = 100;

/// Truncate a share count to the lot boundary; never negative.
#[must_use]
pub const fn floor_to_lot(shares: i64) -> i64 {
    if shares <= 0 {
        0
    } else {
        (shares / LOT_SIZE) * LOT_SIZE
    }
}

/// Shares purchasable with `value` at `price`, floored to a whole lot.
///
/// `floor(value / price / 100) * 100`; zero for non-positive inputs.
#[must_use]
pub fn lot_quantity(value: Decimal, price: Decimal) -> i64 {
    if price <= Decimal::ZERO || value <= Decimal::ZERO {
        return 0;
    }
    let lots = (value / price / Decimal::from(LOT_SIZE))
        .floor()
        .to_i64()
        .unwrap_or(0);
    lots.max(0) * LOT_SIZE
}

/// Clamp a target buy value to the cash actually available.
#[must_use]
pub fn clamp_to_cash(value: Decimal, cash: Decimal) -> Decimal {
    value.min(cash)
}

/// Shares to sell for a fraction of the usable volume, floored to a lot.
#[must_use]
pub fn sell_quantity(usable_volume: i64, pct: Decimal) -> i64 {
    if usable_volume <= 0 || pct <= Decimal::ZERO {
        return 0;
    }
    let lots = (Decimal::from(usable_volume) * pct / Decimal::from(LOT_SIZE))
        .floor()
        .to_i64()
        .unwrap_or(0);
    lots.max(0) * LOT_SIZE
}

/// Reverse-repo quantity for idle cash: lots of 10 units of 100-yuan face
/// value, `floor(cash / 100 / 10) * 10`.
#[must_use]
pub fn repo_quantity(cash: Decimal) -> i64 {
    if cash <= Decimal::ZERO {
        return 0;
    }
    let lots = (cash / Decimal::from(1000)).floor().to_i64().unwrap_or(0);
    lots.max(0) * 10
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn floor_to_lot_truncates() {
        assert_eq!(floor_to_lot(250), 200);
        assert_eq!(floor_to_lot(100), 100);
        assert_eq!(floor_to_lot(99), 0);
        assert_eq!(floor_to_lot(0), 0);
        assert_eq!(floor_to_lot(-50), 0);
    }

    #[test]
    fn target_pct_scenario_full_value() {
        // 10% of 100k at 10.00 with 50k cash: 10k buys 1000 shares.
        let value = clamp_to_cash(dec!(100000) * dec!(0.1), dec!(50000));
        assert_eq!(value, dec!(10000));
        assert_eq!(lot_quantity(value, dec!(10.00)), 1000);
    }

    #[test]
    fn target_pct_scenario_clamped_by_cash() {
        // Same request with only 5k cash clamps to 500 shares.
        let value = clamp_to_cash(dec!(100000) * dec!(0.1), dec!(5000));
        assert_eq!(value, dec!(5000));
        assert_eq!(lot_quantity(value, dec!(10.00)), 500);
    }

    #[test]
    fn sell_pct_scenario_floors_odd_volume() {
        // Selling all of 250 usable shares floors to 200.
        assert_eq!(sell_quantity(250, dec!(1.0)), 200);
        assert_eq!(sell_quantity(250, dec!(0.5)), 100);
        assert_eq!(sell_quantity(99, dec!(1.0)), 0);
    }

    #[test]
    fn lot_quantity_degenerate_inputs() {
        assert_eq!(lot_quantity(dec!(1000), Decimal::ZERO), 0);
        assert_eq!(lot_quantity(Decimal::ZERO, dec!(10)), 0);
        assert_eq!(lot_quantity(dec!(-1000), dec!(10)), 0);
    }

    #[test]
    fn repo_quantity_lots_of_ten() {
        assert_eq!(repo_quantity(dec!(123456)), 1230);
        assert_eq!(repo_quantity(dec!(999)), 0);
        assert_eq!(repo_quantity(dec!(1000)), 10);
        assert_eq!(repo_quantity(Decimal::ZERO), 0);
    }

    proptest! {
        #[test]
        fn lot_quantity_is_bounded_multiple_of_lot(
            value in 0.0f64..1e9,
            price in 0.01f64..10_000.0,
        ) {
            let value = Decimal::try_from(value).unwrap();
            let price = Decimal::try_from(price).unwrap();
            let quantity = lot_quantity(value, price);

            prop_assert!(quantity >= 0);
            prop_assert_eq!(quantity % LOT_SIZE, 0);
            // Never buys more than the value affords.
            prop_assert!(Decimal::from(quantity) * price <= value + Decimal::from_scientific("1e-9").unwrap());
        }

        #[test]
        fn buy_value_never_exceeds_cash(
            total in 0.0f64..1e9,
            cash in 0.0f64..1e9,
            pct in 0.0f64..1.0,
        ) {
            let total = Decimal::try_from(total).unwrap();
            let cash = Decimal::try_from(cash).unwrap();
            let pct = Decimal::try_from(pct).unwrap();

            let value = clamp_to_cash(total * pct, cash);
            prop_assert!(value <= cash);
        }

        #[test]
        fn sell_quantity_bounded_by_usable(
            usable in 0i64..10_000_000,
            pct in 0.0f64..1.0,
        ) {
            let pct = Decimal::try_from(pct).unwrap();
            let quantity = sell_quantity(usable, pct);

            prop_assert!(quantity >= 0);
            prop_assert!(quantity <= usable);
            prop_assert_eq!(quantity % LOT_SIZE, 0);
        }
    }
}
