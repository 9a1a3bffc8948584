use chrono::NaiveDate;
use csv_diff::{csv::Csv, csv_diff::CsvByteDiff};
use eyre::Context;
use girder_lib::{
    execute_balances, execute_materials, BalanceRequest, CurrencyId, Grouping, MaterialRequest,
    ProjectionMode, Rate, TenantId,
};
use glob::glob;
use std::{
    fs::File,
    io::{BufReader, Cursor},
    path::Path,
};

const BALANCES: &str = "tests/test-cases/balances";

fn open(path: impl AsRef<Path>) -> BufReader<File> {
    BufReader::new(File::open(path).unwrap())
}

fn assert_csv_eq(name: &str, actual: &[u8], expected_path: &Path) {
    let expected = std::fs::read(expected_path).unwrap();
    let csv_byte_diff = CsvByteDiff::new().unwrap();

    let mut diff = csv_byte_diff
        .diff(
            Csv::new(Cursor::new(actual)),
            Csv::new(Cursor::new(&expected)),
        )
        .with_context(|| {
            format!(
                "Failed to diff csv ({name}), actual.len() = {} and expected.len() = {}",
                actual.len(),
                expected.len()
            )
        })
        .unwrap();

    diff.sort_by_line();

    assert!(
        diff.as_slice().is_empty(),
        "{name} didn't match {expected_path:?}\n{diff:#?}\nactual:\n{}",
        String::from_utf8_lossy(actual)
    );
}

fn run_balances(case: &str, request: BalanceRequest) {
    let dir = Path::new(BALANCES);
    let mut actual = Vec::new();

    execute_balances(
        &request,
        open(dir.join("categories.csv")),
        open(dir.join("currencies.csv")),
        open(dir.join("movements.csv")),
        &mut actual,
    )
    .unwrap();

    assert_csv_eq(case, &actual, &dir.join(format!("{case}.output.csv")));
}

fn request() -> BalanceRequest {
    BalanceRequest::new(TenantId(1), CurrencyId(1), CurrencyId(2))
}

#[test]
fn wallet_balances_in_origin_currency() {
    run_balances("wallets-origin", request());
}

#[test]
fn partner_balances_normalized() {
    let mut request = request();
    request.grouping = Grouping::Counterparty;
    request.mode = ProjectionMode::Normalized;
    run_balances("partners-normalized", request);
}

#[test]
fn project_balance_in_alternate_currency_for_a_window() {
    let mut request = request();
    request.grouping = Grouping::All;
    request.mode = ProjectionMode::Alternate;
    request.alternate_rate = Some(Rate::from_num(1000));
    request.from = NaiveDate::from_ymd_opt(2024, 2, 1);
    request.to = NaiveDate::from_ymd_opt(2024, 3, 31);
    run_balances("project-alternate", request);
}

#[test]
fn run_material_cases() {
    let mut cases = glob("tests/test-cases/materials/*.scaling.csv")
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    cases.sort();
    assert!(!cases.is_empty());

    for scaling in cases {
        let file_name = scaling.file_name().unwrap().to_string_lossy();
        let case = file_name.trim_end_matches(".scaling.csv");
        let dir = scaling.parent().unwrap();

        let acquired_path = dir.join(format!("{case}.acquired.csv"));
        let acquired = acquired_path.exists().then(|| open(&acquired_path));

        let mut actual = Vec::new();
        execute_materials(
            &MaterialRequest::default(),
            open(&scaling),
            open(dir.join(format!("{case}.ratios.csv"))),
            acquired,
            &mut actual,
        )
        .unwrap();

        assert_csv_eq(case, &actual, &dir.join(format!("{case}.output.csv")));
    }
}
