use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub i64);

/// Read-only profile snapshot, fetched once per run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientProfile {
    pub client_id: ClientId,
    pub company_name: String,
    pub industry: String,
    pub region: String,
    pub owner_name: String,
    pub lifecycle_stage: Option<String>,
    pub deal_stage: Option<String>,
    pub lifetime_value: Option<Decimal>,
    pub created_at: Option<String>,
}

impl ClientProfile {
    pub fn overview_line(&self) -> String {
        format!(
            "{} | {} | {} (Owner: {})",
            self.company_name, self.industry, self.region, self.owner_name
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub contact_id: i64,
    pub client_id: ClientId,
    pub full_name: String,
    pub title: Option<String>,
    pub email: Option<String>,
    pub is_primary: bool,
}
