use super::ui;
use crate::core::money;
use crate::core::rate::RateRow;
use anyhow::{Result, bail};
use comfy_table::Cell;

/// Renders the query result as a table. An empty result is the caller-visible
/// "no rate data available" failure.
pub fn display(rows: &[RateRow]) -> Result<()> {
    if rows.is_empty() {
        bail!("no exchange rate data available");
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Rate"),
        ui::header_cell("Source"),
    ]);

    for row in rows {
        table.add_row(vec![
            Cell::new(&row.currency_code),
            ui::value_cell(&money::format_value(row.rate, money::MAX_PRECISION, 0)),
            Cell::new(ui::style_text(&row.source, ui::StyleType::Subtle)),
        ]);
    }

    println!("{}\n", ui::style_text("Exchange Rates", ui::StyleType::Title));
    println!("{table}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate::ExchangeRate;

    #[test]
    fn test_display_rejects_empty_result() {
        let err = display(&[]).unwrap_err();
        assert_eq!(err.to_string(), "no exchange rate data available");
    }

    #[test]
    fn test_display_renders_rows() {
        let rows = vec![
            RateRow::from(&ExchangeRate::new("EUR", 47_868_000_000, "a.example.com")),
            RateRow::from(&ExchangeRate::new("USD", 51_230_000_000, "a.example.com")),
        ];
        assert!(display(&rows).is_ok());
    }
}
