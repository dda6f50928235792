//! Number formatting shared by chart annotations and template filters.
//!
//! We keep formatting code in one place so chart labels and report tables
//! always agree. Every `*_opt` helper renders an absent value as `–`, so a
//! missing figure never looks like a zero.

/// Rendered in place of an absent value.
pub const MISSING: &str = "–";

/// `12345.678` -> `12,345.7` (with `decimals = 1`).
pub fn grouped(value: f64, decimals: usize) -> String {
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let mut out = String::with_capacity(raw.len() + int_part.len() / 3 + 1);
    // "-0" after rounding is printed as "0".
    let is_zero = raw.chars().all(|c| c == '0' || c == '.');
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Explicit sign: `+1.2`, `-0.4`, `0.0`.
pub fn signed(value: f64, decimals: usize) -> String {
    let body = grouped(value, decimals);
    if value > 0.0 && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("+{body}")
    } else {
        body
    }
}

pub fn num_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| grouped(v, decimals))
}

/// Millions of EUR: `1,234.5 M€`.
pub fn meur_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{} M€", grouped(v, decimals)))
}

/// A fraction rendered as a percentage: `0.123` -> `12.3%`.
pub fn pct_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{}%", grouped(v * 100.0, decimals)))
}

/// A value already in percent points: `25.3` -> `25.3%`.
pub fn pctpt_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{}%", grouped(v, decimals)))
}

pub fn signed_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| signed(v, decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(grouped(0.0, 0), "0");
        assert_eq!(grouped(999.0, 0), "999");
        assert_eq!(grouped(1000.0, 0), "1,000");
        assert_eq!(grouped(1234567.891, 2), "1,234,567.89");
        assert_eq!(grouped(-12345.0, 0), "-12,345");
        assert_eq!(grouped(-0.04, 1), "0.0");
    }

    #[test]
    fn signs() {
        assert_eq!(signed(3.0, 1), "+3.0");
        assert_eq!(signed(-3.0, 1), "-3.0");
        assert_eq!(signed(0.0, 1), "0.0");
        assert_eq!(signed(0.01, 1), "0.0");
    }

    #[test]
    fn missing_values_render_as_dash() {
        assert_eq!(num_opt(None, 0), MISSING);
        assert_eq!(meur_opt(None, 1), MISSING);
        assert_eq!(pct_opt(None, 1), MISSING);
        assert_eq!(signed_opt(None, 1), MISSING);
        assert_eq!(num_opt(Some(0.0), 0), "0");
    }

    #[test]
    fn units() {
        assert_eq!(meur_opt(Some(1234.56), 1), "1,234.6 M€");
        assert_eq!(pct_opt(Some(0.1), 1), "10.0%");
        assert_eq!(pct_opt(Some(-0.055), 1), "-5.5%");
        assert_eq!(pctpt_opt(Some(25.3), 1), "25.3%");
        assert_eq!(pctpt_opt(None, 1), MISSING);
    }
}
