use std::cell::RefCell;
use std::collections::BTreeMap;

use serde_json::{Value, json};

use board_reports::app::pipeline::{
    build_annual_report, fetch_annual_report_data, fetch_monthly_data, save_annual_data, save_monthly_data,
};
use board_reports::data::{CardInfo, CardSource, RangeSource, SourceError};
use board_reports::domain::{Period, RawRow};
use board_reports::io::{AnnualLayout, MonthlyLayout, read_annual_data, read_monthly_data};

struct FakeDashboard {
    cards: Vec<(CardInfo, Result<Vec<RawRow>, SourceError>)>,
    executed: RefCell<Vec<u64>>,
}

impl FakeDashboard {
    fn new(cards: Vec<(u64, &str, Result<Value, SourceError>)>) -> Self {
        let cards = cards
            .into_iter()
            .map(|(card_id, name, rows)| {
                let info = CardInfo {
                    card_id,
                    name: name.to_string(),
                    description: String::new(),
                    display: "table".to_string(),
                };
                let rows = rows.map(|v| {
                    v.as_array()
                        .unwrap()
                        .iter()
                        .map(|r| r.as_object().unwrap().clone())
                        .collect()
                });
                (info, rows)
            })
            .collect();
        Self {
            cards,
            executed: RefCell::new(Vec::new()),
        }
    }
}

impl CardSource for FakeDashboard {
    fn list_cards(&self) -> Result<Vec<CardInfo>, SourceError> {
        Ok(self.cards.iter().map(|(info, _)| info.clone()).collect())
    }

    fn execute_card(&self, card_id: u64) -> Result<Vec<RawRow>, SourceError> {
        self.executed.borrow_mut().push(card_id);
        self.cards
            .iter()
            .find(|(info, _)| info.card_id == card_id)
            .map(|(_, rows)| rows.clone())
            .unwrap_or_else(|| Err(SourceError::NotFound(format!("card {card_id}"))))
    }
}

struct FakeSheet(BTreeMap<&'static str, Result<Vec<Vec<String>>, SourceError>>);

impl RangeSource for FakeSheet {
    fn range(&self, name: &str) -> Result<Vec<Vec<String>>, SourceError> {
        self.0
            .get(name)
            .cloned()
            .unwrap_or_else(|| Err(SourceError::NotFound(name.to_string())))
    }
}

fn ranges(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(l, r)| (l.to_string(), r.to_string())).collect()
}

#[test]
fn monthly_fetch_records_rows_kpis_and_errors() {
    let source = FakeDashboard::new(vec![
        (1, "uute kogujate arv kuus", Ok(json!([{"kuu: Month": "2025-01-01", "uued kogujad": 300}]))),
        (2, "aktiivsed kogujad", Ok(json!([{"count": 81234}]))),
        (3, "kogujate arv kuus", Err(SourceError::Transport("timeout".into()))),
        (4, "Kasvuallikad YTD (tegelik), M EUR", Ok(json!([
            {"kasvuallikas": "sissemaksed", "väärtus": 12.5},
            {"kasvuallikas": "tootlus", "väärtus": -3.0}
        ]))),
    ]);
    let period = Period::monthly(2025, 1).unwrap();
    let data = fetch_monthly_data(&source, period).unwrap();

    assert_eq!((data.year, data.month), (2025, 1));
    assert_eq!(data.month_name.as_deref(), Some("January"));
    assert_eq!(*source.executed.borrow(), vec![1, 2, 3, 4]);

    assert_eq!(data.kpis["aktiivsed kogujad"], json!(81234));
    assert_eq!(data.kpis["uute kogujate arv kuus"], json!({"kuu: Month": "2025-01-01", "uued kogujad": 300}));
    assert!(!data.kpis.contains_key("Kasvuallikad YTD (tegelik), M EUR"));

    let failed = &data.cards["kogujate arv kuus"];
    assert_eq!(failed.card_id, Some(3));
    assert!(failed.data.is_none());
    assert!(failed.error.as_deref().unwrap().contains("timeout"));
    assert_eq!(data.rows("Kasvuallikad YTD (tegelik), M EUR").unwrap().len(), 2);

    let dir = tempfile::tempdir().unwrap();
    let layout = MonthlyLayout::new(dir.path(), period);
    let path = save_monthly_data(&layout, &data).unwrap();
    assert_eq!(read_monthly_data(&path, "").unwrap(), data);
}

#[test]
fn monthly_fetch_aborts_on_auth_failure() {
    let source = FakeDashboard::new(vec![
        (1, "a", Err(SourceError::Auth(401))),
        (2, "b", Ok(json!([]))),
    ]);
    let err = fetch_monthly_data(&source, Period::monthly(2025, 1).unwrap()).unwrap_err();
    assert_eq!(err, SourceError::Auth(401));
    assert_eq!(*source.executed.borrow(), vec![1]);
}

#[test]
fn annual_fetch_maps_missing_range_to_none() {
    let mut sheet = BTreeMap::new();
    sheet.insert("AUM", Ok(vec![vec!["1 234,5".to_string()]]));
    sheet.insert("TULUD", Ok(vec![]));
    let source = FakeSheet(sheet);

    let data = fetch_annual_report_data(
        &source,
        &ranges(&[("aum", "AUM"), ("revenue", "TULUD"), ("savers", "KOGUJAD")]),
    )
    .unwrap();

    assert_eq!(data.len(), 3);
    assert_eq!(data["aum"], Some(json!("1 234,5")));
    assert_eq!(data["revenue"], None);
    assert_eq!(data["savers"], None);
}

#[test]
fn annual_fetch_aborts_on_auth_failure() {
    let mut sheet = BTreeMap::new();
    sheet.insert("AUM", Err(SourceError::Auth(403)));
    let err = fetch_annual_report_data(&FakeSheet(sheet), &ranges(&[("aum", "AUM")])).unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn annual_fetch_then_build() {
    let mut sheet = BTreeMap::new();
    sheet.insert("AUM", Ok(vec![vec!["1 234,5".to_string()]]));
    let data = fetch_annual_report_data(&FakeSheet(sheet), &ranges(&[("aum", "AUM"), ("savers", "KOGUJAD")])).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let layout = AnnualLayout::new(dir.path(), 2025);
    let saved = save_annual_data(&layout, &data).unwrap();
    assert_eq!(read_annual_data(&saved, "").unwrap(), data);

    std::fs::create_dir_all(layout.charts_dir()).unwrap();
    std::fs::write(layout.charts_dir().join("chart_7_aum_growth.svg"), "<svg/>").unwrap();

    let out = build_annual_report(&layout).unwrap();
    assert_eq!(out, layout.output_file());
    let md = std::fs::read_to_string(out).unwrap();
    assert!(md.contains("# Tuleva aastaaruanne 2025"));
    assert!(md.contains("| Varade maht | 1,234.5 M€ |"));
    assert!(md.contains("| Kogujate arv | – |"));
    assert!(md.contains("![Kasvuallikad](charts/chart_7_aum_growth.svg)"));
    assert!(!md.contains("chart_3_determined_savers"));
}
