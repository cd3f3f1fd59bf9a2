use tokio::sync::RwLock;

use precall_core::domain::account::{ClientProfile, Contact};
use precall_core::domain::interaction::{sort_interactions, InteractionRecord};
use precall_core::domain::kpi::{KpiRecord, KpiSeries};
use precall_core::domain::ticket::{sort_tickets, Ticket};

use super::{AccountRepository, RepositoryError};

/// Everything known about one client, as held by [`InMemoryAccountRepository`] and as
/// written by the demo seed.
#[derive(Clone, Debug)]
pub struct AccountRecord {
    pub profile: ClientProfile,
    pub contacts: Vec<Contact>,
    pub kpis: Vec<KpiRecord>,
    pub interactions: Vec<InteractionRecord>,
    pub tickets: Vec<Ticket>,
}

#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<Vec<AccountRecord>>,
}

impl InMemoryAccountRepository {
    pub fn with_accounts(accounts: Vec<AccountRecord>) -> Self {
        Self { accounts: RwLock::new(accounts) }
    }

    pub async fn insert(&self, account: AccountRecord) {
        self.accounts.write().await.push(account);
    }

    async fn find(&self, client_name: &str) -> Option<AccountRecord> {
        let needle = client_name.trim().to_lowercase();
        let accounts = self.accounts.read().await;
        accounts.iter().find(|account| account.profile.company_name.to_lowercase() == needle).cloned()
    }
}

#[async_trait::async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn client_overview(
        &self,
        client_name: &str,
    ) -> Result<Option<ClientProfile>, RepositoryError> {
        Ok(self.find(client_name).await.map(|account| account.profile))
    }

    async fn kpi_snapshot(
        &self,
        client_name: &str,
        months: u32,
    ) -> Result<KpiSeries, RepositoryError> {
        let Some(account) = self.find(client_name).await else {
            return Ok(KpiSeries::default());
        };

        let mut records = account.kpis;
        records.sort_by(|left, right| right.month.cmp(&left.month));
        records.truncate(months as usize);
        Ok(KpiSeries::from_unordered(records))
    }

    async fn recent_interactions(
        &self,
        client_name: &str,
        limit: u32,
    ) -> Result<Vec<InteractionRecord>, RepositoryError> {
        let Some(account) = self.find(client_name).await else {
            return Ok(Vec::new());
        };

        let mut interactions = account.interactions;
        sort_interactions(&mut interactions);
        interactions.truncate(limit as usize);
        Ok(interactions)
    }

    async fn open_tickets(
        &self,
        client_name: &str,
        status: Option<&str>,
    ) -> Result<Vec<Ticket>, RepositoryError> {
        let Some(account) = self.find(client_name).await else {
            return Ok(Vec::new());
        };

        let mut tickets = account
            .tickets
            .into_iter()
            .filter(|ticket| status.map_or(true, |wanted| ticket.status.as_str() == wanted))
            .collect::<Vec<_>>();
        sort_tickets(&mut tickets);
        Ok(tickets)
    }

    async fn list_clients(&self, limit: u32) -> Result<Vec<ClientProfile>, RepositoryError> {
        let accounts = self.accounts.read().await;
        let mut profiles =
            accounts.iter().map(|account| account.profile.clone()).collect::<Vec<_>>();
        profiles.sort_by_key(|profile| profile.company_name.to_lowercase());
        profiles.truncate(limit as usize);
        Ok(profiles)
    }
}
