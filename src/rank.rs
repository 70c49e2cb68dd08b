use serde::Serialize;

use crate::data::model::Listing;
use crate::data::projection::Prediction;

/// A listing that passed the filters, with its resale estimate attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    #[serde(flatten)]
    pub listing: Listing,
    pub resale_price: i64,
    pub profit: i64,
}

impl Candidate {
    pub fn new(listing: Listing, prediction: Prediction) -> Self {
        Candidate {
            listing,
            resale_price: prediction.resale_price,
            profit: prediction.profit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Profit,
    Loss,
}

impl Outcome {
    /// Break-even counts as profit.
    pub fn of(profit: i64) -> Self {
        if profit < 0 {
            Outcome::Loss
        } else {
            Outcome::Profit
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Profit => "profit",
            Outcome::Loss => "loss",
        }
    }
}

/// Summary of the top-ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestPurchase {
    pub index: u64,
    pub age: f64,
    pub model_key: String,
    pub price: i64,
    pub resale_price: i64,
    pub profit: i64,
    pub outcome: Outcome,
}

impl From<&Candidate> for BestPurchase {
    fn from(c: &Candidate) -> Self {
        BestPurchase {
            index: c.listing.index,
            age: c.listing.age,
            model_key: c.listing.model_key.clone(),
            price: c.listing.price,
            resale_price: c.resale_price,
            profit: c.profit,
            outcome: Outcome::of(c.profit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    /// Number of candidates, independent of any display limit.
    pub count: usize,
    pub ranked: Vec<Candidate>,
    /// `None` means no car matches the preferences.
    pub best: Option<BestPurchase>,
}

impl Recommendation {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Sort by profit, highest first. The sort is stable, so equal profits
/// keep their catalog order.
pub fn rank(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.profit.cmp(&a.profit));
    candidates
}

/// Rank `candidates` and pick the best purchase. `limit` only trims the
/// returned table.
pub fn recommend(candidates: Vec<Candidate>, limit: Option<usize>) -> Recommendation {
    let count = candidates.len();
    let mut ranked = rank(candidates);
    let best = ranked.first().map(BestPurchase::from);
    if let Some(limit) = limit {
        ranked.truncate(limit);
    }
    Recommendation { count, ranked, best }
}
