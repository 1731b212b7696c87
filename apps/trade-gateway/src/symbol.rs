//! Symbol normalization for the Shanghai/Shenzhen/Beijing venues.
//!
//! A bare instrument code like `600000` trades on exactly one venue, and the
//! venue is a pure function of the numeric prefix. Two suffix conventions
//! coexist:
//!
//! | Convention | Shanghai | Shenzhen | Beijing | Used by |
//! |------------|----------|----------|---------|---------|
//! | market     | `.SH`    | `.SZ`    | `.BJ`   | order submission |
//! | data       | `.SS`    | `.SZ`    | `.BJ`   | instrument-detail lookups |
//!
//! Both normalizers strip any existing suffix before reclassifying, which
//! makes them idempotent by construction.

use rust_decimal::Decimal;

/// The exchange an instrument trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    /// Shanghai Stock Exchange.
    Shanghai,
    /// Shenzhen Stock Exchange.
    Shenzhen,
    /// Beijing Stock Exchange.
    Beijing,
}

impl Venue {
    /// Suffix used by the order-submission path.
    #[must_use]
    pub const fn market_suffix(self) -> &'static str {
        match self {
            Self::Shanghai => "SH",
            Self::Shenzhen => "SZ",
            Self::Beijing => "BJ",
        }
    }

    /// Suffix used by the data-query helpers.
    #[must_use]
    pub const fn data_suffix(self) -> &'static str {
        match self {
            Self::Shanghai => "SS",
            Self::Shenzhen => "SZ",
            Self::Beijing => "BJ",
        }
    }
}

/// Code prefixes that route to Shanghai.
const SHANGHAI_PREFIXES: &[&str] = &[
    "50", "51", "60", "73", "90", "110", "113", "132", "204", "78",
];

/// Code prefixes that route to Shenzhen.
const SHENZHEN_PREFIXES: &[&str] = &[
    "00", "12", "13", "18", "15", "16", "20", "30", "39", "115", "1318",
];

/// Classify a bare instrument code into its venue.
///
/// Rules are checked in order; codes carrying a lowercase `sh`/`sz` venue tag
/// are honored as-is, everything else is matched by numeric prefix. Unmatched
/// codes default to Shenzhen.
#[must_use]
pub fn classify(code: &str) -> Venue {
    if code.starts_with("sh") {
        return Venue::Shanghai;
    }
    if code.starts_with("sz") {
        return Venue::Shenzhen;
    }
    if SHANGHAI_PREFIXES.iter().any(|p| code.starts_with(p)) {
        return Venue::Shanghai;
    }
    if SHENZHEN_PREFIXES.iter().any(|p| code.starts_with(p)) {
        return Venue::Shenzhen;
    }
    if code.starts_with('5') || code.starts_with('6') {
        return Venue::Shanghai;
    }
    if code.starts_with('8') || code.starts_with('4') || code.starts_with('9') {
        return Venue::Beijing;
    }
    Venue::Shenzhen
}

/// Strip any venue suffix (everything after the last `.`).
fn bare_code(code: &str) -> &str {
    match code.rfind('.') {
        Some(idx) => &code[..idx],
        None => code,
    }
}

/// Venue-qualified symbol in the order-submission convention (`600000.SH`).
#[must_use]
pub fn market_symbol(code: &str) -> String {
    let bare = bare_code(code);
    format!("{bare}.{}", classify(bare).market_suffix())
}

/// Venue-qualified symbol in the data-query convention (`600000.SS`).
#[must_use]
pub fn data_symbol(code: &str) -> String {
    let bare = bare_code(code);
    format!("{bare}.{}", classify(bare).data_suffix())
}

/// Daily (upper, lower) price limits from the previous close.
///
/// ChiNext (`300`) and STAR (`688`) instruments move within ±20%, everything
/// else within ±10%. Limits are rounded to 2 decimal places.
#[must_use]
pub fn price_band(code: &str, preclose: Decimal) -> (Decimal, Decimal) {
    let bare = bare_code(code);
    let (up, down) = if bare.starts_with("300") || bare.starts_with("688") {
        (Decimal::new(12, 1), Decimal::new(8, 1))
    } else {
        (Decimal::new(11, 1), Decimal::new(9, 1))
    };
    ((preclose * up).round_dp(2), (preclose * down).round_dp(2))
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn classify_by_prefix() {
        assert_eq!(classify("600000"), Venue::Shanghai);
        assert_eq!(classify("510300"), Venue::Shanghai);
        assert_eq!(classify("000001"), Venue::Shenzhen);
        assert_eq!(classify("300750"), Venue::Shenzhen);
        assert_eq!(classify("830799"), Venue::Beijing);
        assert_eq!(classify("430047"), Venue::Beijing);
    }

    #[test]
    fn classify_listed_prefixes_win_over_first_char() {
        // 90 routes to Shanghai even though 9 alone would be Beijing.
        assert_eq!(classify("900901"), Venue::Shanghai);
        // 39 routes to Shenzhen before the Beijing fallback sees the 3.
        assert_eq!(classify("399001"), Venue::Shenzhen);
    }

    #[test]
    fn classify_venue_tag_honored() {
        assert_eq!(classify("sh600000"), Venue::Shanghai);
        assert_eq!(classify("sz000001"), Venue::Shenzhen);
    }

    #[test]
    fn classify_default_is_shenzhen() {
        assert_eq!(classify("7x"), Venue::Shenzhen);
        assert_eq!(classify(""), Venue::Shenzhen);
    }

    #[test]
    fn market_symbol_qualifies() {
        assert_eq!(market_symbol("600000"), "600000.SH");
        assert_eq!(market_symbol("000001"), "000001.SZ");
        assert_eq!(market_symbol("830799"), "830799.BJ");
    }

    #[test]
    fn data_symbol_uses_ss_for_shanghai() {
        assert_eq!(data_symbol("600000"), "600000.SS");
        assert_eq!(data_symbol("000001"), "000001.SZ");
        assert_eq!(data_symbol("830799"), "830799.BJ");
    }

    #[test]
    fn normalization_is_idempotent() {
        for code in ["600000", "000001", "830799", "510300"] {
            let once = market_symbol(code);
            assert_eq!(market_symbol(&once), once);
            let once = data_symbol(code);
            assert_eq!(data_symbol(&once), once);
        }
    }

    #[test]
    fn existing_suffix_is_stripped_before_reclassifying() {
        // A wrong or foreign suffix never survives normalization.
        assert_eq!(market_symbol("600000.SZ"), "600000.SH");
        assert_eq!(market_symbol("600000.XSHG"), "600000.SH");
        assert_eq!(data_symbol("600000.SH"), "600000.SS");
    }

    #[test]
    fn price_band_main_board() {
        let (up, down) = price_band("600000", dec!(10.00));
        assert_eq!(up, dec!(11.00));
        assert_eq!(down, dec!(9.00));
    }

    #[test]
    fn price_band_wide_boards() {
        let (up, down) = price_band("300750", dec!(10.00));
        assert_eq!(up, dec!(12.00));
        assert_eq!(down, dec!(8.00));

        let (up, down) = price_band("688111.SH", dec!(55.55));
        assert_eq!(up, dec!(66.66));
        assert_eq!(down, dec!(44.44));
    }

    proptest::proptest! {
        #[test]
        fn idempotent_for_any_numeric_code(code in "[0-9]{1,6}") {
            let once = market_symbol(&code);
            proptest::prop_assert_eq!(market_symbol(&once), once.clone());
            let data_once = data_symbol(&code);
            proptest::prop_assert_eq!(data_symbol(&data_once), data_once);
        }

        #[test]
        fn classification_ignores_existing_suffix(code in "[0-9]{6}", suffix in "(SH|SZ|BJ|SS|XSHG)") {
            let qualified = format!("{code}.{suffix}");
            proptest::prop_assert_eq!(market_symbol(&qualified), market_symbol(&code));
        }
    }
}
