use chrono::NaiveDate;
use tracing::info;

use kakeibo::model::EntryKind;
use kakeibo::oracle::PriceOracle;
use kakeibo::providers::coingecko::CoinGeckoProvider;
use kakeibo::providers::dexscreener::DexScreenerProvider;
use kakeibo::providers::metals::{ChartCurrencyProvider, MetalChartProvider};
use kakeibo::sheet::RowStore;
use kakeibo::sheet::book::SheetBook;
use kakeibo::sheet::client::SheetClient;
use kakeibo::sheet::memory::MemorySheet;
use kakeibo::{summary, valuation};

mod test_utils {
    use std::collections::HashMap;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    pub async fn oracle_against(mock_server: &MockServer) -> PriceOracle {
        let uri = mock_server.uri();
        PriceOracle::new(
            CoinGeckoProvider::new(
                &uri,
                "JPY",
                [("BTC".to_string(), "bitcoin".to_string())]
                    .into_iter()
                    .collect(),
            ),
            DexScreenerProvider::new(&uri),
            MetalChartProvider::new(&uri),
            Box::new(ChartCurrencyProvider::new(&uri)),
            HashMap::new(),
            "JPY",
        )
    }

    pub async fn mount_batch_prices(mock_server: &MockServer, body: &str) {
        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(mock_server)
            .await;
    }

    pub async fn seeded_book() -> SheetBook<MemorySheet> {
        let sheet = MemorySheet::new();
        sheet
            .seed(vec![
                vec!["Date", "Kind", "Category", "Amount", "Memo"],
                vec!["2025-01-05", "income", "Salary", "300,000", ""],
                vec!["2025-01-10", "expense", "Food", "45000", "groceries"],
            ])
            .await;
        let book = SheetBook::new(sheet.clone());
        // Holdings live in a side range of the same sheet.
        sheet
            .write_range(
                "I1",
                vec![
                    vec!["Symbol".to_string(), "Quantity".to_string()],
                    vec!["BTC".to_string(), "0.01".to_string()],
                ],
            )
            .await
            .unwrap();
        book
    }
}

#[test_log::test(tokio::test)]
async fn test_full_valuation_pipeline() {
    let mock_server = wiremock::MockServer::start().await;
    test_utils::mount_batch_prices(&mock_server, r#"{"bitcoin": {"jpy": 12000000.0}}"#).await;
    let oracle = test_utils::oracle_against(&mock_server).await;
    let book = test_utils::seeded_book().await;

    let entries = book.load_ledger().await.unwrap();
    let holdings = book.load_holdings().await.unwrap();
    info!(entries = entries.len(), holdings = holdings.len(), "Loaded sheet data");

    let as_of = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
    let cash = valuation::cash_balance(&entries, as_of);
    assert_eq!(cash, 255_000);

    let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
    let quotes = oracle.fetch_quotes(&symbols).await;
    let snapshot = valuation::AssetSnapshot {
        cash,
        holdings: valuation::value_holdings(&holdings, &quotes),
    };

    assert_eq!(snapshot.holdings_total(), 120_000.0);
    assert_eq!(snapshot.total(), 375_000.0);
    assert!(!snapshot.has_unpriced());

    let rendered = summary::render_snapshot(&snapshot, "JPY");
    assert!(rendered.contains("375,000"));
    assert!(rendered.contains("32.0%"));
}

#[test_log::test(tokio::test)]
async fn test_price_outage_degrades_to_cash_only_with_warning() {
    let mock_server = wiremock::MockServer::start().await;
    // No routes mounted: every price request fails.
    let oracle = test_utils::oracle_against(&mock_server).await;
    let book = test_utils::seeded_book().await;

    let entries = book.load_ledger().await.unwrap();
    let holdings = book.load_holdings().await.unwrap();

    let as_of = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
    let cash = valuation::cash_balance(&entries, as_of);
    let symbols: Vec<String> = holdings.iter().map(|h| h.symbol.clone()).collect();
    let quotes = oracle.fetch_quotes(&symbols).await;

    let snapshot = valuation::AssetSnapshot {
        cash,
        holdings: valuation::value_holdings(&holdings, &quotes),
    };

    // Valuation proceeds; the total is the cash floor, never an error.
    assert_eq!(snapshot.total(), 255_000.0);
    assert!(snapshot.has_unpriced());
    let rendered = summary::render_snapshot(&snapshot, "JPY");
    assert!(rendered.contains("understated"));
}

#[test_log::test(tokio::test)]
async fn test_sheet_client_backed_book_loads_typed_records() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, ResponseTemplate};

    let mock_server = wiremock::MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/sheets/household/values/A1:E"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"values": [
                ["Date", "Kind", "Category", "Amount", "Memo"],
                ["2025-02-01", "income", "Salary", "300,000", ""],
                ["", "expense", "Food", "800", "dropped: no date"],
                ["2025-02-03", "expense", "Food/Lunch", "1,200", "soba"]
            ]}"#,
        ))
        .mount(&mock_server)
        .await;

    let client = SheetClient::new(&mock_server.uri(), "household").unwrap();
    let book = SheetBook::new(client);
    let entries = book.load_ledger().await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].position, 1);
    assert_eq!(entries[0].amount, 300_000);
    // The blank-date row was dropped but still consumed position 2.
    assert_eq!(entries[1].position, 3);
    assert_eq!(entries[1].kind, EntryKind::Expense);
    assert_eq!(entries[1].category, "Food");
    assert_eq!(entries[1].subcategory.as_deref(), Some("Lunch"));
}

#[test_log::test(tokio::test)]
async fn test_sheet_outage_surfaces_connection_error() {
    // Point at a closed port; the adapter must fail loudly, not degrade.
    let client = SheetClient::new("http://127.0.0.1:9", "household").unwrap();
    let book = SheetBook::new(client);

    let result = book.load_ledger().await;
    assert!(result.is_err());
    assert!(format!("{:#}", result.unwrap_err()).contains("Failed to load ledger"));
}
