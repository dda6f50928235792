//! Explicit per-query schemas.
//!
//! Each dashboard card the report knows about is declared here with:
//!
//! - its key column (which row identifies which period / line item)
//! - the value columns it must carry, mapped to canonical names
//! - whether undeclared columns are an error (`strict`)
//! - for cards without declared columns, the single metric column exposed
//!   as `value` (zero or several candidates is a violation)
//! - how the normalizer selects from it (point-in-time, YTD, top-N, ...)
//!
//! Data files are validated against these declarations when they are loaded,
//! so an upstream rename shows up as a clear diagnostic instead of a blank
//! figure in the report.

use std::collections::BTreeSet;

use serde_json::Value;
use thiserror::Error;

use crate::domain::{Field, RawRow, SeriesKey, Unit};

/// How a query's key column identifies rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Month-start date, e.g. `2025-01-01`.
    MonthStart,
    /// Calendar-year start date, e.g. `2025-01-01`.
    YearStart,
    /// Short month label with optional forecast marker, e.g. `prog:Feb-25`.
    MonthLabel,
    /// Free-text row name (growth source, line item).
    RowName,
    /// First text-valued column of the row, whatever its header (fund name).
    FirstText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: &'static str,
    pub label: &'static str,
}

const fn col(field: &'static str, label: &'static str) -> ColumnSpec {
    ColumnSpec { field, label }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySchema {
    pub key: &'static str,
    pub key_kind: KeyKind,
    pub columns: &'static [ColumnSpec],
    pub strict: bool,
    pub unit: Unit,
}

/// How the normalizer turns a query's rows into context fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The row matching the report period.
    PointInTime(Field),
    /// The row for the current year start, optionally the previous one too.
    Ytd { current: Field, previous: Option<Field> },
    /// First `n` rows in source order.
    TopN { field: Field, n: usize },
    /// All rows in source order.
    Sequence(Field),
    /// Allow-listed rows by key, in allow-list order.
    AllowList { field: Field, names: &'static [&'static str] },
}

/// Derived values computed after selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derive {
    /// `total` = sum of the three pillar composition columns.
    PillarTotal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDef {
    pub name: &'static str,
    pub schema: QuerySchema,
    pub selection: Selection,
    pub series: Option<SeriesKey>,
    pub derive: Option<Derive>,
}

pub const SWITCHING_TOP_N: usize = 10;

pub const FINANCIAL_LINE_ITEMS: &[&str] = &[
    "brutomarginaal pärast litsentsitasu",
    "tööjõukulud",
    "mitmesugused tegevuskulud",
    "EBITDA/ärikasum",
    "puhaskasum",
    "litsentsitasu",
];

pub const MONTH_KEY: &str = "kuu: Month";
pub const YEAR_KEY: &str = "reporting_year";

pub const SAVERS_COLUMNS: &[ColumnSpec] = &[
    col("pillar_ii_only", "ainult II sammas"),
    col("pillar_iii_only", "ainult III sammas"),
    col("both", "II ja III sammas"),
    col("yoy_pct", "YoY, %"),
];

const AUM_COLUMNS: &[ColumnSpec] = &[
    col("aum", "kuu lõpu AUM (M EUR)"),
    col("growth_12m_pct", "AUM 12 kuu kasv %"),
    col("organic_growth_pct", "AUM 12 kuu kasv sissemaksetest ja -vahetustest %"),
];

const GROWTH_COLUMNS: &[ColumnSpec] = &[col("value", "väärtus")];

const fn monthly(unit: Unit) -> QuerySchema {
    QuerySchema {
        key: MONTH_KEY,
        key_kind: KeyKind::MonthStart,
        columns: &[],
        strict: false,
        unit,
    }
}

const fn ytd(unit: Unit) -> QuerySchema {
    QuerySchema {
        key: YEAR_KEY,
        key_kind: KeyKind::YearStart,
        columns: &[],
        strict: false,
        unit,
    }
}

const fn rows(key: &'static str, unit: Unit) -> QuerySchema {
    QuerySchema {
        key,
        key_kind: KeyKind::RowName,
        columns: &[],
        strict: false,
        unit,
    }
}

/// Fund rankings: the header of the fund-name column is not fixed upstream.
const fn funds() -> QuerySchema {
    QuerySchema {
        key: "",
        key_kind: KeyKind::FirstText,
        columns: &[],
        strict: false,
        unit: Unit::Raw,
    }
}

const GROWTH: QuerySchema = QuerySchema {
    key: "kasvuallikas",
    key_kind: KeyKind::RowName,
    columns: GROWTH_COLUMNS,
    strict: true,
    unit: Unit::Millions,
};

const fn point(name: &'static str, schema: QuerySchema, field: Field) -> QueryDef {
    QueryDef {
        name,
        schema,
        selection: Selection::PointInTime(field),
        series: None,
        derive: None,
    }
}

const fn ytd_point(name: &'static str, unit: Unit, field: Field) -> QueryDef {
    QueryDef {
        name,
        schema: ytd(unit),
        selection: Selection::Ytd {
            current: field,
            previous: None,
        },
        series: None,
        derive: None,
    }
}

/// Every query the monthly report understands, keyed by dashboard card name.
pub static QUERIES: &[QueryDef] = &[
    QueryDef {
        name: "AUM (koos ootel vahetuste ja väljumistega)",
        schema: QuerySchema {
            key: "month",
            key_kind: KeyKind::MonthLabel,
            columns: AUM_COLUMNS,
            strict: false,
            unit: Unit::Millions,
        },
        selection: Selection::PointInTime(Field::Aum),
        series: Some(SeriesKey::Aum),
        derive: None,
    },
    // Savers
    QueryDef {
        name: "kogujate arv kuus",
        schema: QuerySchema {
            key: MONTH_KEY,
            key_kind: KeyKind::MonthStart,
            columns: SAVERS_COLUMNS,
            strict: true,
            unit: Unit::Raw,
        },
        selection: Selection::PointInTime(Field::Savers),
        series: Some(SeriesKey::Savers),
        derive: Some(Derive::PillarTotal),
    },
    QueryDef {
        name: "uute kogujate arv kuus",
        schema: monthly(Unit::Raw),
        selection: Selection::PointInTime(Field::NewSavers),
        series: Some(SeriesKey::NewSavers),
        derive: None,
    },
    QueryDef {
        name: "uute kogujate arv YTD",
        schema: ytd(Unit::Raw),
        selection: Selection::Ytd {
            current: Field::NewSaversYtd,
            previous: Some(Field::NewSaversYtdPrev),
        },
        series: None,
        derive: None,
    },
    ytd_point("uute II samba kogujate arv YTD", Unit::Raw, Field::NewSaversIiYtd),
    ytd_point("uute III samba kogujate arv YTD", Unit::Raw, Field::NewSaversIiiYtd),
    // Contributions
    QueryDef {
        name: "II samba sissemaksete summa kuus, M EUR",
        schema: monthly(Unit::Millions),
        selection: Selection::PointInTime(Field::IiContributions),
        series: Some(SeriesKey::IiContributions),
        derive: None,
    },
    point(
        "III samba sissemaksete summa kuus, M EUR",
        monthly(Unit::Millions),
        Field::IiiContributions,
    ),
    ytd_point("II s sissemaksed YTD", Unit::Millions, Field::IiContributionsYtd),
    ytd_point("III s sissemaksed YTD", Unit::Millions, Field::IiiContributionsYtd),
    point(
        "III samba sissemakse tegijate arv kuus",
        monthly(Unit::Raw),
        Field::IiiContributors,
    ),
    point("II samba maksemäära muutmine", monthly(Unit::Raw), Field::RateChanges),
    // Fund switching
    QueryDef {
        name: "II samba vahetajate arv kuus",
        schema: monthly(Unit::Raw),
        selection: Selection::PointInTime(Field::Switchers),
        series: Some(SeriesKey::Switchers),
        derive: None,
    },
    point(
        "II samba vahetajate ületoodava vara maht kuus, M EUR",
        monthly(Unit::Millions),
        Field::SwitchersAum,
    ),
    ytd_point("II s vahetajate arv YTD", Unit::Raw, Field::SwitchersYtd),
    ytd_point("II s vahetustega ületoodav vara YTD", Unit::Millions, Field::SwitchersAumYtd),
    QueryDef {
        name: "II samba vahetusavalduste arv pangafondidesse sel vahetusperioodil",
        schema: funds(),
        selection: Selection::TopN {
            field: Field::SwitchingTo,
            n: SWITCHING_TOP_N,
        },
        series: None,
        derive: None,
    },
    QueryDef {
        name: "II samba vahetusavalduste arv lähtefondi järgi sel vahetusperioodil",
        schema: funds(),
        selection: Selection::TopN {
            field: Field::SwitchingFrom,
            n: SWITCHING_TOP_N,
        },
        series: None,
        derive: None,
    },
    // Outflows
    point(
        "II samba lahkujate varade maht kuus, M EUR",
        monthly(Unit::Millions),
        Field::IiLeavers,
    ),
    point(
        "II samba väljujate varade maht kuus, M EUR",
        monthly(Unit::Millions),
        Field::IiExiters,
    ),
    point(
        "III sambast välja võetud varade maht kuus, M EUR",
        monthly(Unit::Millions),
        Field::IiiWithdrawals,
    ),
    ytd_point("II s vahetustega väljaminevad varad YTD", Unit::Millions, Field::IiLeaversYtd),
    ytd_point("II s raha väljavõtmised YTD", Unit::Millions, Field::IiExitersYtd),
    ytd_point("III s väljavõetud varad YTD", Unit::Millions, Field::IiiWithdrawalsYtd),
    // Growth sources (waterfall inputs)
    QueryDef {
        name: "Kasvuallikad eelmisel kuul (tegelik), M EUR",
        schema: GROWTH,
        selection: Selection::Sequence(Field::GrowthActual),
        series: Some(SeriesKey::GrowthMonth),
        derive: None,
    },
    QueryDef {
        name: "Kasvuallikad YTD (tegelik), M EUR",
        schema: GROWTH,
        selection: Selection::Sequence(Field::GrowthYtd),
        series: Some(SeriesKey::GrowthYtd),
        derive: None,
    },
    QueryDef {
        name: "Kasvuallikad (aasta lõpu prognoos), M EUR",
        schema: GROWTH,
        selection: Selection::Sequence(Field::GrowthForecast),
        series: None,
        derive: None,
    },
    // Financial results
    QueryDef {
        name: "Tuleva finantstulemused",
        schema: rows("Eur", Unit::Eur),
        selection: Selection::AllowList {
            field: Field::Financials,
            names: FINANCIAL_LINE_ITEMS,
        },
        series: None,
        derive: None,
    },
];

pub fn lookup(name: &str) -> Option<&'static QueryDef> {
    QUERIES.iter().find(|q| q.name == name)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("'{query}': row {row} has no key column '{label}'")]
    MissingKey {
        query: String,
        row: usize,
        label: String,
    },
    #[error("'{query}': row {row} has no column '{label}' (renamed upstream?)")]
    MissingColumn {
        query: String,
        row: usize,
        label: String,
    },
    #[error("'{query}': unexpected column '{label}'")]
    UnknownColumn { query: String, label: String },
    #[error("'{query}': no numeric value column")]
    NoValueColumn { query: String },
    #[error("'{query}': ambiguous value column, candidates: {}", .candidates.join(", "))]
    AmbiguousValueColumn { query: String, candidates: Vec<String> },
}

/// The row's key text, if the row has one.
pub fn key_text<'a>(def: &QueryDef, row: &'a RawRow) -> Option<&'a str> {
    match def.schema.key_kind {
        KeyKind::FirstText => row.values().find_map(Value::as_str),
        _ => row.get(def.schema.key)?.as_str(),
    }
}

fn is_key(def: &QueryDef, row: &RawRow, label: &str) -> bool {
    match def.schema.key_kind {
        KeyKind::FirstText => row.iter().find(|(_, v)| v.is_string()).map(|(k, _)| k.as_str()) == Some(label),
        _ => label == def.schema.key,
    }
}

/// Check `rows` against the query's schema. Rows are numbered from 1.
pub fn validate_rows(def: &QueryDef, rows: &[RawRow]) -> Vec<SchemaViolation> {
    let schema = &def.schema;
    let mut out = Vec::new();
    let mut unknown = BTreeSet::new();

    for (idx, row) in rows.iter().enumerate() {
        let line = idx + 1;
        let has_key = match schema.key_kind {
            KeyKind::FirstText => key_text(def, row).is_some(),
            _ => row.contains_key(schema.key),
        };
        if !has_key {
            out.push(SchemaViolation::MissingKey {
                query: def.name.to_string(),
                row: line,
                label: schema.key.to_string(),
            });
        }
        for column in schema.columns {
            if !row.contains_key(column.label) {
                out.push(SchemaViolation::MissingColumn {
                    query: def.name.to_string(),
                    row: line,
                    label: column.label.to_string(),
                });
            }
        }
        if schema.strict {
            for label in row.keys() {
                let declared =
                    label == schema.key || schema.columns.iter().any(|c| c.label == label);
                if !declared {
                    unknown.insert(label.clone());
                }
            }
        }
    }

    out.extend(unknown.into_iter().map(|label| SchemaViolation::UnknownColumn {
        query: def.name.to_string(),
        label,
    }));

    if schema.columns.is_empty() && !rows.is_empty() {
        let candidates = metric_columns(def, rows);
        match candidates.len() {
            1 => {}
            0 => out.push(SchemaViolation::NoValueColumn {
                query: def.name.to_string(),
            }),
            _ => out.push(SchemaViolation::AmbiguousValueColumn {
                query: def.name.to_string(),
                candidates: candidates.into_iter().map(str::to_string).collect(),
            }),
        }
    }
    out
}

/// Non-key columns holding only numbers or nulls, with at least one number.
fn metric_columns<'a>(def: &QueryDef, rows: &'a [RawRow]) -> Vec<&'a str> {
    let mut numeric: Vec<&'a str> = Vec::new();
    let mut rejected: BTreeSet<&'a str> = BTreeSet::new();
    for row in rows {
        for (label, value) in row {
            let label = label.as_str();
            if is_key(def, row, label) {
                continue;
            }
            match value {
                Value::Number(_) => {
                    if !numeric.contains(&label) {
                        numeric.push(label);
                    }
                }
                Value::Null => {}
                _ => {
                    rejected.insert(label);
                }
            }
        }
    }
    numeric.retain(|label| !rejected.contains(label));
    numeric
}

/// The single metric column of a lenient query, exposed as `value`.
///
/// `None` when the schema declares its columns or when there is no unique
/// metric column; `validate_rows` reports the latter.
pub fn value_column<'a>(def: &QueryDef, rows: &'a [RawRow]) -> Option<&'a str> {
    if !def.schema.columns.is_empty() {
        return None;
    }
    match metric_columns(def, rows).as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}
