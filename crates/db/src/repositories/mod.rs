use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use precall_core::domain::account::ClientProfile;
use precall_core::domain::interaction::InteractionRecord;
use precall_core::domain::kpi::KpiSeries;
use precall_core::domain::ticket::Ticket;

pub mod account;
pub mod memory;

pub use account::SqlAccountRepository;
pub use memory::{AccountRecord, InMemoryAccountRepository};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read-side lookups for one client account. Every method resolves the client by
/// case-insensitive company name; an unknown name yields `None` or an empty collection.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn client_overview(
        &self,
        client_name: &str,
    ) -> Result<Option<ClientProfile>, RepositoryError>;

    /// The `months` most recent records, returned ascending by month.
    async fn kpi_snapshot(&self, client_name: &str, months: u32)
        -> Result<KpiSeries, RepositoryError>;

    /// Newest first.
    async fn recent_interactions(
        &self,
        client_name: &str,
        limit: u32,
    ) -> Result<Vec<InteractionRecord>, RepositoryError>;

    /// Open, then Pending, then the rest; newest first within each status. `status` is an
    /// exact-match filter.
    async fn open_tickets(
        &self,
        client_name: &str,
        status: Option<&str>,
    ) -> Result<Vec<Ticket>, RepositoryError>;

    async fn list_clients(&self, limit: u32) -> Result<Vec<ClientProfile>, RepositoryError>;
}

#[async_trait]
impl<T> AccountRepository for Arc<T>
where
    T: AccountRepository + ?Sized,
{
    async fn client_overview(
        &self,
        client_name: &str,
    ) -> Result<Option<ClientProfile>, RepositoryError> {
        (**self).client_overview(client_name).await
    }

    async fn kpi_snapshot(
        &self,
        client_name: &str,
        months: u32,
    ) -> Result<KpiSeries, RepositoryError> {
        (**self).kpi_snapshot(client_name, months).await
    }

    async fn recent_interactions(
        &self,
        client_name: &str,
        limit: u32,
    ) -> Result<Vec<InteractionRecord>, RepositoryError> {
        (**self).recent_interactions(client_name, limit).await
    }

    async fn open_tickets(
        &self,
        client_name: &str,
        status: Option<&str>,
    ) -> Result<Vec<Ticket>, RepositoryError> {
        (**self).open_tickets(client_name, status).await
    }

    async fn list_clients(&self, limit: u32) -> Result<Vec<ClientProfile>, RepositoryError> {
        (**self).list_clients(limit).await
    }
}
