//! Row selection and conversion of raw rows into canonical records.

use std::collections::BTreeMap;

use crate::domain::{Cell, MetricRecord, Period, RawRow, TaggedLabel, parse_month_key};
use crate::normalize::schema::{KeyKind, QueryDef, key_text};

pub const VALUE_ALIAS: &str = "value";

/// Convert one raw row into a canonical record.
///
/// Declared columns are renamed to their canonical field names. Lenient
/// schemas pass the remaining columns through under their source label, and
/// `value_column` (if any) is additionally exposed as `value`.
pub fn to_record(def: &QueryDef, row: &RawRow, value_column: Option<&str>) -> MetricRecord {
    let schema = &def.schema;
    let mut rec = MetricRecord::new(def.name, schema.unit);

    if let Some(key) = key_text(def, row) {
        match schema.key_kind {
            KeyKind::MonthStart => {
                rec.period = parse_month_key(key);
            }
            KeyKind::YearStart => {
                rec.period = parse_month_key(key).map(|p| Period::annual(p.year()));
            }
            KeyKind::MonthLabel => {
                let tagged = TaggedLabel::parse(key);
                rec.period = tagged.period();
                rec.forecast = tagged.is_forecast;
                rec.label = Some(tagged.label);
            }
            KeyKind::RowName | KeyKind::FirstText => {
                rec.label = Some(key.trim().to_string());
            }
        }
    }

    for column in schema.columns {
        let cell = row.get(column.label).and_then(Cell::from_json);
        rec.values.insert(column.field.to_string(), cell);
    }

    if !schema.strict {
        for (label, value) in row {
            let declared = label == schema.key || schema.columns.iter().any(|c| c.label == label);
            if !declared {
                rec.values.insert(label.clone(), Cell::from_json(value));
            }
        }
    }

    if let Some(col) = value_column {
        let cell = row.get(col).and_then(Cell::from_json);
        rec.values.insert(VALUE_ALIAS.to_string(), cell);
    }

    rec
}

/// The row for `period`, matched exactly on the query's key column.
///
/// Short-label keys are compared after stripping the forecast marker; an
/// actual row wins over a forecast row for the same month.
pub fn find_period_row<'a>(def: &QueryDef, rows: &'a [RawRow], period: Period) -> Option<&'a RawRow> {
    match def.schema.key_kind {
        KeyKind::MonthStart => {
            let target = period.month_start_key();
            rows.iter().find(|r| key_text(def, r) == Some(target.as_str()))
        }
        KeyKind::YearStart => {
            let target = period.year_start_key();
            rows.iter().find(|r| key_text(def, r) == Some(target.as_str()))
        }
        KeyKind::MonthLabel => {
            let target = period.month_label();
            let mut forecast_match = None;
            for row in rows {
                let Some(key) = key_text(def, row) else { continue };
                let tagged = TaggedLabel::parse(key);
                if tagged.label != target {
                    continue;
                }
                if !tagged.is_forecast {
                    return Some(row);
                }
                forecast_match.get_or_insert(row);
            }
            forecast_match
        }
        KeyKind::RowName | KeyKind::FirstText => None,
    }
}

/// The previous calendar year's row of a YTD query.
pub fn find_prev_year_row<'a>(def: &QueryDef, rows: &'a [RawRow], period: Period) -> Option<&'a RawRow> {
    let target = period.prev_year_start_key();
    rows.iter().find(|r| key_text(def, r) == Some(target.as_str()))
}

/// The first `n` rows in source order. Upstream ranking is trusted.
pub fn top_n(rows: &[RawRow], n: usize) -> &[RawRow] {
    &rows[..rows.len().min(n)]
}

/// Rows whose key is in `names`, in `names` order; names without a row are skipped.
pub fn allow_listed<'a>(def: &QueryDef, rows: &'a [RawRow], names: &[&str]) -> Vec<&'a RawRow> {
    let by_name: BTreeMap<&str, &RawRow> = rows
        .iter()
        .filter_map(|r| Some((key_text(def, r)?, r)))
        .collect();
    names.iter().filter_map(|n| by_name.get(n).copied()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::schema::lookup;
    use serde_json::json;

    fn rows(v: serde_json::Value) -> Vec<RawRow> {
        v.as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn month_start_match_is_exact() {
        let def = lookup("uute kogujate arv kuus").unwrap();
        let data = rows(json!([
            {"kuu: Month": "2024-12-01", "n": 1},
            {"kuu: Month": "2025-01-01", "n": 2},
        ]));
        let jan = Period::monthly(2025, 1).unwrap();
        let feb = Period::monthly(2025, 2).unwrap();
        assert_eq!(find_period_row(def, &data, jan), Some(&data[1]));
        assert_eq!(find_period_row(def, &data, feb), None);
    }

    #[test]
    fn aum_label_prefers_actual_rows() {
        let def = lookup("AUM (koos ootel vahetuste ja väljumistega)").unwrap();
        let data = rows(json!([
            {"month": "prog:Mar-25", "kuu lõpu AUM (M EUR)": 1.0},
            {"month": "Mar-25", "kuu lõpu AUM (M EUR)": 2.0},
            {"month": "prog:Apr-25", "kuu lõpu AUM (M EUR)": 3.0},
        ]));
        let mar = Period::monthly(2025, 3).unwrap();
        let apr = Period::monthly(2025, 4).unwrap();
        assert_eq!(find_period_row(def, &data, mar), Some(&data[1]));
        assert_eq!(find_period_row(def, &data, apr), Some(&data[2]));

        let rec = to_record(def, &data[2], None);
        assert!(rec.forecast);
        assert_eq!(rec.label.as_deref(), Some("Apr-25"));
        assert_eq!(rec.number("aum"), Some(3.0));
        assert_eq!(rec.number("growth_12m_pct"), None);
    }

    #[test]
    fn ytd_rows_by_year_start() {
        let def = lookup("uute kogujate arv YTD").unwrap();
        let data = rows(json!([
            {"reporting_year": "2024-01-01", "count": 900},
            {"reporting_year": "2025-01-01", "count": 1000},
        ]));
        let p = Period::monthly(2025, 6).unwrap();
        assert_eq!(find_period_row(def, &data, p), Some(&data[1]));
        assert_eq!(find_prev_year_row(def, &data, p), Some(&data[0]));
        let rec = to_record(def, &data[1], Some("count"));
        assert_eq!(rec.period, Some(Period::annual(2025)));
        assert_eq!(rec.number("value"), Some(1000.0));
        assert_eq!(rec.number("count"), Some(1000.0));
    }

    #[test]
    fn top_n_keeps_source_order() {
        let data = rows(json!([{"fond": "b"}, {"fond": "a"}, {"fond": "c"}]));
        assert_eq!(top_n(&data, 2), &data[..2]);
        assert_eq!(top_n(&data, 10).len(), 3);
    }

    #[test]
    fn allow_list_order_and_unknowns() {
        let def = lookup("Tuleva finantstulemused").unwrap();
        let data = rows(json!([
            {"Eur": "puhaskasum", "2025": 10},
            {"Eur": "mingi muu rida", "2025": 99},
            {"Eur": "tööjõukulud", "2025": -5},
        ]));
        let picked = allow_listed(def, &data, &["tööjõukulud", "litsentsitasu", "puhaskasum"]);
        assert_eq!(picked, vec![&data[2], &data[0]]);
    }

    #[test]
    fn strict_schema_drops_nothing_declared() {
        let def = lookup("kogujate arv kuus").unwrap();
        let data = rows(json!([{
            "kuu: Month": "2025-01-01",
            "ainult II sammas": 100,
            "ainult III sammas": 20,
            "II ja III sammas": 5,
            "YoY, %": null
        }]));
        let rec = to_record(def, &data[0], None);
        assert_eq!(rec.period, Period::monthly(2025, 1).ok());
        assert_eq!(rec.number("pillar_ii_only"), Some(100.0));
        assert_eq!(rec.values.get("yoy_pct"), Some(&None));
    }
}
