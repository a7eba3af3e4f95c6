//! Symbol classification for the Chinese A-share markets.
//!
//! Bare six-digit codes carry no exchange information; the market and the
//! instrument class are derived from the numeric prefix. The prefix tables
//! are part of the exchange numbering plan and change rarely.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Market {
    /// Shanghai Stock Exchange.
    Sh,
    /// Shenzhen Stock Exchange.
    Sz,
    /// Beijing Stock Exchange.
    Bj,
}

impl Market {
    /// Exchange suffix used in qualified codes, e.g. "000001.SZ".
    pub fn suffix(self) -> &'static str {
        match self {
            Market::Sh => "SH",
            Market::Sz => "SZ",
            Market::Bj => "BJ",
        }
    }
}

const SH_PREFIXES: &[&str] = &["50", "51", "60", "73", "90", "110", "113", "132", "204", "78"];
const SZ_PREFIXES: &[&str] = &["00", "12", "13", "18", "15", "16", "20", "30", "39", "115"];

// Convertible bond code ranges per exchange.
const SH_BOND_PREFIXES: &[&str] = &["110", "111", "113", "118"];
const SZ_BOND_PREFIXES: &[&str] = &["123", "127", "128"];

fn bare_code(code: &str) -> &str {
    match code.find('.') {
        Some(idx) => &code[..idx],
        None => code,
    }
}

/// Determine the market a code trades on.
///
/// Codes already carrying an `sh`/`sz` text prefix are taken at face value;
/// everything else goes through the prefix tables. The longer Shanghai
/// prefixes are checked first so that e.g. "110" does not fall into the
/// Shenzhen "11" bucket.
pub fn market_of(code: &str) -> Market {
    if code.starts_with("sh") {
        return Market::Sh;
    }
    if code.starts_with("sz") {
        return Market::Sz;
    }
    let code = bare_code(code);
    if SH_PREFIXES.iter().any(|p| code.starts_with(p)) {
        return Market::Sh;
    }
    if SZ_PREFIXES.iter().any(|p| code.starts_with(p)) {
        return Market::Sz;
    }
    match code.as_bytes().first() {
        Some(b'5') | Some(b'6') => Market::Sh,
        Some(b'4') | Some(b'8') | Some(b'9') => Market::Bj,
        _ => Market::Sz,
    }
}

/// Exchange-qualified form of a code: "600036" -> "600036.SH".
///
/// An existing dot suffix is stripped and rebuilt, so already-qualified
/// codes pass through unchanged.
pub fn qualified(code: &str) -> String {
    let market = market_of(code);
    format!("{}.{}", bare_code(code), market.suffix())
}

pub fn is_convertible_bond(code: &str) -> bool {
    let code = bare_code(code);
    SH_BOND_PREFIXES.iter().any(|p| code.starts_with(p))
        || SZ_BOND_PREFIXES.iter().any(|p| code.starts_with(p))
}

/// Minimum tradable multiple: 10 units for convertible bonds, 100 shares
/// otherwise.
pub fn lot_size(code: &str) -> u64 {
    if is_convertible_bond(code) {
        10
    } else {
        100
    }
}

/// Human unit label for error messages: 张 for bonds, 股 for shares.
pub fn unit_name(code: &str) -> &'static str {
    if is_convertible_bond(code) {
        "张"
    } else {
        "股"
    }
}

/// Daily price limits from the previous close: ±20% on the ChiNext and STAR
/// boards (300/688 prefixes), ±10% elsewhere. Rounded to cents.
pub fn price_limits(code: &str, preclose: f64) -> (f64, f64) {
    let code = bare_code(code);
    let band = if code.starts_with("300") || code.starts_with("688") {
        0.2
    } else {
        0.1
    };
    let round2 = |v: f64| (v * 100.0).round() / 100.0;
    (round2(preclose * (1.0 + band)), round2(preclose * (1.0 - band)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_classification() {
        assert_eq!(market_of("600036"), Market::Sh);
        assert_eq!(market_of("000001"), Market::Sz);
        assert_eq!(market_of("300750"), Market::Sz);
        assert_eq!(market_of("110038"), Market::Sh);
        assert_eq!(market_of("123456"), Market::Sz);
        assert_eq!(market_of("830799"), Market::Bj);
        assert_eq!(market_of("sh600000"), Market::Sh);
    }

    #[test]
    fn qualification_strips_existing_suffix() {
        assert_eq!(qualified("600036"), "600036.SH");
        assert_eq!(qualified("000001.SZ"), "000001.SZ");
        assert_eq!(qualified("131810"), "131810.SZ");
    }

    #[test]
    fn convertible_bond_lots() {
        assert!(is_convertible_bond("110038"));
        assert!(is_convertible_bond("123077.SZ"));
        assert!(!is_convertible_bond("600036"));
        assert_eq!(lot_size("110038"), 10);
        assert_eq!(lot_size("000001"), 100);
    }

    #[test]
    fn price_limit_bands() {
        assert_eq!(price_limits("600036", 10.0), (11.0, 9.0));
        assert_eq!(price_limits("300750", 10.0), (12.0, 8.0));
        assert_eq!(price_limits("688981", 50.0), (60.0, 40.0));
    }
}
