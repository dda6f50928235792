//! Small numeric aggregations shared by the normalizer and the chart builders.
//!
//! Every helper that divides returns `None` for a zero (or absent)
//! denominator, so "no data" never renders as `0`.

/// `num / den`, `None` when the denominator is zero or non-finite.
pub fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 || !den.is_finite() || !num.is_finite() {
        return None;
    }
    Some(num / den)
}

/// `part` as a percentage of `total`.
pub fn share_pct(part: f64, total: f64) -> Option<f64> {
    ratio(part, total).map(|r| r * 100.0)
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    ratio(values.iter().sum(), values.len() as f64)
}

/// Sum of all components; `None` if any component is absent (or there are none).
pub fn sum_all(values: &[Option<f64>]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.iter().copied().sum()
}

/// Median of the finite values; `None` when there are none.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Parse a spreadsheet number such as `12,345`, `-1,5%` or `3.2 %`.
///
/// A comma is a thousands separator unless it is the only separator and is
/// followed by one or two digits, in which case it is a decimal comma.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = if cleaned.contains('.') {
        cleaned.replace(',', "")
    } else if let Some((_, frac)) = cleaned.rsplit_once(',') {
        if cleaned.matches(',').count() == 1 && (1..=2).contains(&frac.len()) {
            cleaned.replace(',', ".")
        } else {
            cleaned.replace(',', "")
        }
    } else {
        cleaned
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
