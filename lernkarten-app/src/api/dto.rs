use lernkarten_core::{Card, CardId, StatsSummary};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct NewCardIn {
    pub front: String,
    pub back: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewIn {
    pub card_id: CardId,
    pub quality: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOut {
    pub card: Card,
    pub interval_days: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOut {
    pub cards: usize,
    pub accuracy: f64,
    pub streak_days: u32,
    pub due_forecast: Vec<u32>,
    pub summary: StatsSummary,
}

#[derive(Serialize)]
pub struct ErrorOut {
    pub error: String,
}
