use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use precall_core::domain::account::{ClientId, ClientProfile};
use precall_core::domain::interaction::InteractionRecord;
use precall_core::domain::kpi::{KpiRecord, KpiSeries};
use precall_core::domain::parse_timestamp;
use precall_core::domain::ticket::{Ticket, TicketPriority, TicketStatus};

use super::{AccountRepository, RepositoryError};
use crate::DbPool;

const CLIENT_COLUMNS: &str = "client_id, company_name, industry, region, owner_name, \
     lifecycle_stage, deal_stage, lifetime_value, created_at";

pub struct SqlAccountRepository {
    pool: DbPool,
}

impl SqlAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T>(row: &SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
}

fn decode_timestamp(row: &SqliteRow, column: &str) -> Result<chrono::NaiveDateTime, RepositoryError> {
    let raw: String = decode(row, column)?;
    parse_timestamp(&raw)
        .ok_or_else(|| RepositoryError::Decode(format!("{column}: unparseable timestamp `{raw}`")))
}

fn to_decimal(value: Option<f64>) -> Option<Decimal> {
    value.and_then(Decimal::from_f64).map(|amount| amount.round_dp(2))
}

fn row_to_profile(row: &SqliteRow) -> Result<ClientProfile, RepositoryError> {
    Ok(ClientProfile {
        client_id: ClientId(decode(row, "client_id")?),
        company_name: decode(row, "company_name")?,
        industry: decode(row, "industry")?,
        region: decode(row, "region")?,
        owner_name: decode(row, "owner_name")?,
        lifecycle_stage: decode(row, "lifecycle_stage")?,
        deal_stage: decode(row, "deal_stage")?,
        lifetime_value: to_decimal(decode(row, "lifetime_value")?),
        created_at: decode(row, "created_at")?,
    })
}

fn row_to_kpi(row: &SqliteRow) -> Result<KpiRecord, RepositoryError> {
    let renewal_due: Option<i64> = decode(row, "renewal_due")?;
    Ok(KpiRecord {
        month: decode(row, "month")?,
        spend: to_decimal(decode(row, "spend")?),
        satisfaction_score: decode(row, "satisfaction_score")?,
        churn_risk: decode(row, "churn_risk")?,
        open_tickets: decode(row, "open_tickets")?,
        renewal_due: renewal_due.unwrap_or(0) != 0,
    })
}

fn row_to_interaction(row: &SqliteRow) -> Result<InteractionRecord, RepositoryError> {
    Ok(InteractionRecord {
        timestamp: decode_timestamp(row, "timestamp")?,
        channel: decode(row, "channel")?,
        owner_name: decode(row, "owner_name")?,
        sentiment: decode(row, "sentiment")?,
        notes: decode(row, "notes")?,
    })
}

fn row_to_ticket(row: &SqliteRow) -> Result<Ticket, RepositoryError> {
    let status: String = decode(row, "status")?;
    let priority: String = decode(row, "priority")?;
    let resolved_at: Option<String> = decode(row, "resolved_at")?;

    Ok(Ticket {
        ticket_id: decode(row, "ticket_id")?,
        category: decode(row, "category")?,
        status: TicketStatus::from(status),
        opened_at: decode_timestamp(row, "opened_at")?,
        resolved_at: resolved_at.as_deref().and_then(parse_timestamp),
        resolution_time_days: decode(row, "resolution_time_days")?,
        priority: TicketPriority::from(priority),
    })
}

#[async_trait::async_trait]
impl AccountRepository for SqlAccountRepository {
    async fn client_overview(
        &self,
        client_name: &str,
    ) -> Result<Option<ClientProfile>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients \
             WHERE company_name LIKE ?1 COLLATE NOCASE \
             ORDER BY client_id LIMIT 1"
        ))
        .bind(client_name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_profile).transpose()
    }

    async fn kpi_snapshot(
        &self,
        client_name: &str,
        months: u32,
    ) -> Result<KpiSeries, RepositoryError> {
        let rows = sqlx::query(
            "WITH tgt AS (
               SELECT client_id FROM clients
               WHERE company_name LIKE ?1 COLLATE NOCASE
               ORDER BY client_id LIMIT 1
             )
             SELECT m.month,
                    CASE WHEN typeof(m.spend) IN ('integer', 'real')
                         THEN CAST(m.spend AS REAL) END AS spend,
                    m.satisfaction_score, m.churn_risk,
                    m.open_tickets, m.renewal_due
             FROM metrics m
             JOIN tgt ON tgt.client_id = m.client_id
             ORDER BY m.month DESC
             LIMIT ?2",
        )
        .bind(client_name)
        .bind(i64::from(months))
        .fetch_all(&self.pool)
        .await?;

        let records = rows.iter().map(row_to_kpi).collect::<Result<Vec<_>, _>>()?;
        Ok(KpiSeries::from_unordered(records))
    }

    async fn recent_interactions(
        &self,
        client_name: &str,
        limit: u32,
    ) -> Result<Vec<InteractionRecord>, RepositoryError> {
        let rows = sqlx::query(
            "WITH tgt AS (
               SELECT client_id FROM clients
               WHERE company_name LIKE ?1 COLLATE NOCASE
               ORDER BY client_id LIMIT 1
             )
             SELECT i.timestamp, i.channel, i.owner_name, i.sentiment, i.notes
             FROM interactions i
             JOIN tgt ON tgt.client_id = i.client_id
             ORDER BY i.timestamp DESC
             LIMIT ?2",
        )
        .bind(client_name)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_interaction).collect()
    }

    async fn open_tickets(
        &self,
        client_name: &str,
        status: Option<&str>,
    ) -> Result<Vec<Ticket>, RepositoryError> {
        let rows = sqlx::query(
            "WITH tgt AS (
               SELECT client_id FROM clients
               WHERE company_name LIKE ?1 COLLATE NOCASE
               ORDER BY client_id LIMIT 1
             )
             SELECT t.ticket_id, t.category, t.status, t.opened_at, t.resolved_at,
                    t.resolution_time_days, t.priority
             FROM tickets t
             JOIN tgt ON tgt.client_id = t.client_id
             WHERE (?2 IS NULL OR t.status = ?2)
             ORDER BY
               CASE t.status WHEN 'Open' THEN 0 WHEN 'Pending' THEN 1 ELSE 2 END,
               t.opened_at DESC",
        )
        .bind(client_name)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_ticket).collect()
    }

    async fn list_clients(&self, limit: u32) -> Result<Vec<ClientProfile>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY company_name COLLATE NOCASE LIMIT ?1"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_profile).collect()
    }
}

#[cfg(test)]
mod tests {
    use precall_core::domain::ticket::TicketStatus;

    use super::SqlAccountRepository;
    use crate::fixtures::DemoDataset;
    use crate::repositories::AccountRepository;
    use crate::{connect_with_settings, migrations};

    async fn seeded_repo() -> SqlAccountRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        DemoDataset::load(&pool).await.expect("seed");
        SqlAccountRepository::new(pool)
    }

    #[tokio::test]
    async fn client_lookup_ignores_case_and_misses_cleanly() {
        let repo = seeded_repo().await;

        let profile = repo.client_overview("acme ltd").await.expect("lookup");
        assert_eq!(profile.map(|p| p.company_name), Some("Acme Ltd".to_string()));

        let missing = repo.client_overview("Ghost Corp").await.expect("lookup");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn kpi_snapshot_returns_latest_months_ascending() {
        let repo = seeded_repo().await;

        let series = repo.kpi_snapshot("Acme Ltd", 3).await.expect("kpis");
        let months = series.records().iter().map(|r| r.month.as_str()).collect::<Vec<_>>();
        assert_eq!(months, vec!["2024-04", "2024-05", "2024-06"]);
        assert_eq!(series.latest().and_then(|r| r.churn_risk), Some(20.0));
    }

    #[tokio::test]
    async fn interactions_are_newest_first_and_limited() {
        let repo = seeded_repo().await;

        let interactions = repo.recent_interactions("Acme Ltd", 2).await.expect("interactions");
        assert_eq!(interactions.len(), 2);
        assert!(interactions[0].timestamp > interactions[1].timestamp);
    }

    #[tokio::test]
    async fn tickets_put_open_before_pending_before_rest() {
        let repo = seeded_repo().await;

        let tickets = repo.open_tickets("Acme Ltd", None).await.expect("tickets");
        let ranks = tickets.iter().map(|t| t.status.sort_rank()).collect::<Vec<_>>();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);
        for pair in tickets.windows(2) {
            if pair[0].status.sort_rank() == pair[1].status.sort_rank() {
                assert!(pair[0].opened_at >= pair[1].opened_at);
            }
        }

        let pending = repo.open_tickets("Acme Ltd", Some("Pending")).await.expect("pending");
        assert!(!pending.is_empty());
        assert!(pending.iter().all(|t| t.status == TicketStatus::Pending));
    }

    #[tokio::test]
    async fn unknown_client_yields_empty_collections() {
        let repo = seeded_repo().await;

        assert!(repo.kpi_snapshot("Ghost Corp", 3).await.expect("kpis").is_empty());
        assert!(repo.recent_interactions("Ghost Corp", 5).await.expect("interactions").is_empty());
        assert!(repo.open_tickets("Ghost Corp", None).await.expect("tickets").is_empty());
    }

    #[tokio::test]
    async fn list_clients_is_sorted_by_name() {
        let repo = seeded_repo().await;

        let names = repo
            .list_clients(10)
            .await
            .expect("list")
            .into_iter()
            .map(|p| p.company_name)
            .collect::<Vec<_>>();
        let mut sorted = names.clone();
        sorted.sort_by_key(|name| name.to_lowercase());
        assert_eq!(names, sorted);
        assert!(names.contains(&"Initech".to_string()));
    }
}
