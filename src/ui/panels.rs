use std::fmt::Write as _;

use anyhow::Result;
use colored::Colorize;

use crate::data::model::{Catalog, CategoricalColumn};
use crate::rank::{BestPurchase, Outcome, Recommendation};
use crate::ui::table;

/// Rendering switches that do not affect the computation.
#[derive(Debug, Clone)]
pub struct DisplayOptions {
    /// Manufacturer shown in the narrative.
    pub make: String,
    /// Colour the profit/loss word.
    pub color: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        DisplayOptions {
            make: "BMW".into(),
            color: false,
        }
    }
}

/// `12345` → `$12,345`; negative amounts keep their sign.
pub fn currency(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{sign}${grouped}")
}

// ---------------------------------------------------------------------------
// Options panel
// ---------------------------------------------------------------------------

/// Budget bounds and the selectable values of each filterable column.
pub fn options_panel(catalog: &Catalog) -> String {
    let bounds = catalog.price_bounds();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Budget: {} to {}",
        currency(bounds.min),
        currency(bounds.max)
    );
    for column in [
        CategoricalColumn::Fuel,
        CategoricalColumn::PaintColor,
        CategoricalColumn::CarType,
    ] {
        let _ = writeln!(out, "{}: {}", column.name(), catalog.options(column).join(", "));
    }
    let _ = writeln!(out, "features: 1 to 8");
    out
}

// ---------------------------------------------------------------------------
// Result panels
// ---------------------------------------------------------------------------

/// Two-sentence purchase advice for the best candidate.
pub fn best_purchase_narrative(best: &BestPurchase, display: &DisplayOptions) -> String {
    let label = best.outcome.label();
    let word = match (display.color, best.outcome) {
        (false, _) => label.to_string(),
        (true, Outcome::Profit) => label.green().to_string(),
        (true, Outcome::Loss) => label.red().to_string(),
    };
    format!(
        "Based on your preferences and usage, you should purchase a {:.1} years old {} {} for around {}.\n\
         This can potentially sell for around {}, leaving you with a {word} of {}.",
        best.age,
        display.make,
        best.model_key,
        currency(best.price),
        currency(best.resale_price),
        currency(best.profit.abs()),
    )
}

/// Full text report: count, ranked table and best option.
pub fn report(rec: &Recommendation, display: &DisplayOptions) -> Result<String> {
    let mut out = format!("Cars available: {}\n", rec.count);
    match &rec.best {
        None => {
            out.push_str("There are no cars available that meet your preferences.\n");
        }
        Some(best) => {
            out.push_str(&table::ranked_table(&rec.ranked)?);
            out.push_str("\n\nBest option\n");
            out.push_str(&best_purchase_narrative(best, display));
            out.push('\n');
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::tests::listing;
    use crate::data::projection::Prediction;
    use crate::rank::{recommend, Candidate};

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(currency(0), "$0");
        assert_eq!(currency(999), "$999");
        assert_eq!(currency(1_000), "$1,000");
        assert_eq!(currency(12_345_678), "$12,345,678");
        assert_eq!(currency(-2_000), "-$2,000");
    }

    #[test]
    fn loss_narrative_uses_absolute_amount() {
        let mut car = listing(4, 20_000);
        car.age = 4.3;
        let rec = recommend(vec![Candidate::new(car, Prediction::new(18_500, 20_000))], None);
        let text = best_purchase_narrative(rec.best.as_ref().unwrap(), &DisplayOptions::default());
        assert_eq!(
            text,
            "Based on your preferences and usage, you should purchase a 4.3 years old BMW 320 \
             for around $20,000.\nThis can potentially sell for around $18,500, leaving you \
             with a loss of $1,500."
        );
    }

    #[test]
    fn colored_narrative_wraps_outcome() {
        let rec = recommend(
            vec![Candidate::new(listing(1, 10_000), Prediction::new(12_000, 10_000))],
            None,
        );
        let display = DisplayOptions {
            make: "Mini".into(),
            color: true,
        };
        colored::control::set_override(true);
        let text = best_purchase_narrative(rec.best.as_ref().unwrap(), &display);
        assert!(text.contains("old Mini 320"));
        assert!(text.contains(&format!("{} of $2,000", "profit".green())));
        assert!(text.contains("\x1b[32m"));
    }

    #[test]
    fn empty_report_says_no_cars() {
        let text = report(&recommend(Vec::new(), None), &DisplayOptions::default()).unwrap();
        assert_eq!(
            text,
            "Cars available: 0\nThere are no cars available that meet your preferences.\n"
        );
    }

    #[test]
    fn options_panel_lists_catalog_values() {
        let mut petrol = listing(1, 9_500);
        petrol.fuel = "petrol".into();
        let catalog = Catalog::from_listings(vec![listing(0, 30_000), petrol]).unwrap();
        let text = options_panel(&catalog);
        assert!(text.starts_with("Budget: $9,500 to $30,000\n"));
        assert!(text.contains("fuel: diesel, petrol\n"));
    }
}
