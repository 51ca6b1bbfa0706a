//! Formatting utilities: token units, USD values, icon URLs.

use alloy::primitives::U256;

/// Parse an on-chain quantity. Accepts `0x`-prefixed hex or a decimal
/// integer string; anything else (fractions, exponents, garbage) is `None`.
pub fn parse_quantity(raw: &str) -> Option<U256> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        if hex.is_empty() {
            return Some(U256::ZERO);
        }
        return U256::from_str_radix(hex, 16).ok();
    }
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_str_radix(raw, 10).ok()
}

/// Render a raw integer amount with `decimals` fractional digits.
///
/// Trailing fractional zeros are trimmed but one digit always remains,
/// so `1_500_000` at 6 decimals is `"1.5"` and `100` at 0 is `"100.0"`.
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return format!("{digits}.0");
    }

    let padded = if digits.len() <= decimals {
        format!("{}{digits}", "0".repeat(decimals + 1 - digits.len()))
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac = frac_part.trim_end_matches('0');
    let frac = if frac.is_empty() { "0" } else { frac };
    format!("{int_part}.{frac}")
}

/// Best-effort high-resolution icon: swap the `/small/` or `/thumb/` path
/// segment of a CoinGecko image URL for `/large/`.
///
/// `primary` is tried first, then `fallback`. `None` when neither URL
/// carries a segment to rewrite.
pub fn derive_large_from(primary: Option<&str>, fallback: Option<&str>) -> Option<String> {
    fn rewrite(url: &str) -> Option<String> {
        let large = url
            .replacen("/small/", "/large/", 1)
            .replacen("/thumb/", "/large/", 1);
        (large != url).then_some(large)
    }

    [primary, fallback]
        .into_iter()
        .flatten()
        .filter(|s| !s.is_empty())
        .find_map(rewrite)
}

/// `$1,234.56` style, two decimals.
pub fn format_usd(value: f64) -> String {
    let negative = value < 0.0;
    let cents = format!("{:.2}", value.abs());
    let (int_part, frac) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${grouped}.{frac}", if negative { "-" } else { "" })
}

/// Signed percentage with two decimals, e.g. `+3.10%`.
pub fn format_pct(value: f64) -> String {
    format!("{value:+.2}%")
}

/// `0x1234…abcd` for narrow table columns.
pub fn shorten_address(address: &str) -> String {
    if address.len() <= 12 {
        return address.to_string();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}
