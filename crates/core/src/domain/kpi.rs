use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KpiRecord {
    /// Calendar month, `YYYY-MM`.
    pub month: String,
    pub spend: Option<Decimal>,
    pub satisfaction_score: Option<f64>,
    pub churn_risk: Option<f64>,
    pub open_tickets: Option<i64>,
    pub renewal_due: bool,
}

/// KPI history ordered ascending by month. The last record is the most recent month.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KpiSeries(Vec<KpiRecord>);

impl KpiSeries {
    pub fn from_unordered(mut records: Vec<KpiRecord>) -> Self {
        records.sort_by(|left, right| left.month.cmp(&right.month));
        Self(records)
    }

    pub fn latest(&self) -> Option<&KpiRecord> {
        self.0.last()
    }

    pub fn records(&self) -> &[KpiRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn trend(&self, metric: KpiMetric) -> Option<Trend> {
        let first = self.0.iter().find_map(|record| metric.value(record))?;
        let last = self.0.iter().rev().find_map(|record| metric.value(record))?;
        if self.0.iter().filter(|record| metric.value(record).is_some()).count() < 2 {
            return None;
        }

        let delta = last - first;
        let tolerance = first.abs() * 0.02;
        Some(if delta > tolerance {
            Trend::Up
        } else if delta < -tolerance {
            Trend::Down
        } else {
            Trend::Flat
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KpiMetric {
    Spend,
    Satisfaction,
    ChurnRisk,
}

impl KpiMetric {
    pub fn label(self) -> &'static str {
        match self {
            Self::Spend => "spend",
            Self::Satisfaction => "satisfaction",
            Self::ChurnRisk => "churn",
        }
    }

    fn value(self, record: &KpiRecord) -> Option<f64> {
        match self {
            Self::Spend => record.spend.and_then(|spend| spend.to_string().parse::<f64>().ok()),
            Self::Satisfaction => record.satisfaction_score,
            Self::ChurnRisk => record.churn_risk,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Up => "▲",
            Self::Down => "▼",
            Self::Flat => "▬",
        }
    }
}
