use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use precall_core::domain::account::{ClientId, ClientProfile, Contact};
use precall_core::domain::interaction::InteractionRecord;
use precall_core::domain::kpi::KpiRecord;
use precall_core::domain::parse_timestamp;
use precall_core::domain::ticket::{Ticket, TicketPriority, TicketStatus};

use crate::connection::DbPool;
use crate::repositories::{AccountRecord, RepositoryError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

struct SeedClient {
    client_id: i64,
    company_name: &'static str,
    industry: &'static str,
    region: &'static str,
    owner_name: &'static str,
    lifecycle_stage: &'static str,
    deal_stage: &'static str,
    lifetime_value: Option<f64>,
    created_at: &'static str,
    contacts: &'static [SeedContact],
    kpis: &'static [SeedKpi],
    interactions: &'static [SeedInteraction],
    tickets: &'static [SeedTicket],
}

struct SeedContact {
    full_name: &'static str,
    title: &'static str,
    email: &'static str,
    is_primary: bool,
}

struct SeedKpi {
    month: &'static str,
    spend: f64,
    satisfaction_score: f64,
    churn_risk: f64,
    open_tickets: i64,
    renewal_due: bool,
}

struct SeedInteraction {
    timestamp: &'static str,
    channel: &'static str,
    sentiment: &'static str,
    notes: &'static str,
}

struct SeedTicket {
    ticket_id: i64,
    category: &'static str,
    status: &'static str,
    opened_at: &'static str,
    resolved_at: Option<&'static str>,
    priority: &'static str,
}

const fn kpi(
    month: &'static str,
    spend: f64,
    satisfaction_score: f64,
    churn_risk: f64,
    open_tickets: i64,
    renewal_due: bool,
) -> SeedKpi {
    SeedKpi { month, spend, satisfaction_score, churn_risk, open_tickets, renewal_due }
}

const SEED_CLIENTS: &[SeedClient] = &[
    SeedClient {
        client_id: 1,
        company_name: "Acme Ltd",
        industry: "Manufacturing",
        region: "EMEA",
        owner_name: "Dana Reyes",
        lifecycle_stage: "Customer",
        deal_stage: "Renewal",
        lifetime_value: Some(185_000.0),
        created_at: "2021-03-15 10:00:00",
        contacts: &[
            SeedContact {
                full_name: "Helen Park",
                title: "VP Operations",
                email: "helen.park@acme.example",
                is_primary: true,
            },
            SeedContact {
                full_name: "Tom Becker",
                title: "IT Manager",
                email: "tom.becker@acme.example",
                is_primary: false,
            },
        ],
        kpis: &[
            kpi("2024-01", 10_200.0, 4.4, 8.0, 1, false),
            kpi("2024-02", 10_650.0, 4.3, 9.5, 1, false),
            kpi("2024-03", 11_100.0, 4.2, 11.0, 2, false),
            kpi("2024-04", 11_480.0, 4.1, 13.0, 2, false),
            kpi("2024-05", 11_900.0, 4.0, 17.0, 2, false),
            kpi("2024-06", 12_345.6, 3.9, 20.0, 3, true),
        ],
        interactions: &[
            SeedInteraction {
                timestamp: "2024-06-12 15:00:00",
                channel: "Meeting",
                sentiment: "Negative",
                notes: "QBR: ops team frustrated by ERP integration outages during month-end close",
            },
            SeedInteraction {
                timestamp: "2024-05-28 09:30:00",
                channel: "Call",
                sentiment: "Neutral",
                notes: "Asked for renewal pricing options and a multi-year discount",
            },
            SeedInteraction {
                timestamp: "2024-05-03 11:00:00",
                channel: "Email",
                sentiment: "Positive",
                notes: "Shared SSO rollout plan; IT wants a sandbox before go-live",
            },
            SeedInteraction {
                timestamp: "2024-04-10 14:00:00",
                channel: "Call",
                sentiment: "Positive",
                notes: "Confirmed second plant will onboard in Q3",
            },
        ],
        tickets: &[
            SeedTicket {
                ticket_id: 101,
                category: "Integration",
                status: "Open",
                opened_at: "2024-06-10 08:15:00",
                resolved_at: None,
                priority: "High",
            },
            SeedTicket {
                ticket_id: 102,
                category: "Billing",
                status: "Open",
                opened_at: "2024-05-20 13:40:00",
                resolved_at: None,
                priority: "Medium",
            },
            SeedTicket {
                ticket_id: 103,
                category: "Access",
                status: "Pending",
                opened_at: "2024-06-02 10:05:00",
                resolved_at: None,
                priority: "Low",
            },
            SeedTicket {
                ticket_id: 104,
                category: "Onboarding",
                status: "Resolved",
                opened_at: "2024-03-01 09:00:00",
                resolved_at: Some("2024-03-04 09:00:00"),
                priority: "Medium",
            },
        ],
    },
    SeedClient {
        client_id: 2,
        company_name: "Globex Corporation",
        industry: "Energy",
        region: "North America",
        owner_name: "Marcus Lee",
        lifecycle_stage: "Customer",
        deal_stage: "Expansion",
        lifetime_value: Some(420_000.0),
        created_at: "2019-09-02 16:20:00",
        contacts: &[SeedContact {
            full_name: "Ines Duarte",
            title: "Head of Procurement",
            email: "ines.duarte@globex.example",
            is_primary: true,
        }],
        kpis: &[
            kpi("2024-03", 31_000.0, 4.6, 5.0, 0, false),
            kpi("2024-04", 31_200.0, 4.7, 4.5, 1, false),
            kpi("2024-05", 33_800.0, 4.7, 4.0, 0, false),
            kpi("2024-06", 35_250.0, 4.8, 3.5, 0, false),
        ],
        interactions: &[
            SeedInteraction {
                timestamp: "2024-06-18 16:00:00",
                channel: "Meeting",
                sentiment: "Positive",
                notes: "Exploring analytics add-on for three regional sites",
            },
            SeedInteraction {
                timestamp: "2024-05-30 10:00:00",
                channel: "Email",
                sentiment: "Positive",
                notes: "Procurement requested security questionnaire for expansion",
            },
        ],
        tickets: &[SeedTicket {
            ticket_id: 201,
            category: "Reporting",
            status: "Resolved",
            opened_at: "2024-04-11 12:00:00",
            resolved_at: Some("2024-04-12 18:00:00"),
            priority: "Low",
        }],
    },
    SeedClient {
        client_id: 3,
        company_name: "Initech",
        industry: "Software",
        region: "APAC",
        owner_name: "Priya Nair",
        lifecycle_stage: "Onboarding",
        deal_stage: "Implementation",
        lifetime_value: Some(65_000.0),
        created_at: "2024-01-08 08:00:00",
        contacts: &[SeedContact {
            full_name: "Bill Lumbergh",
            title: "Division VP",
            email: "bill.lumbergh@initech.example",
            is_primary: true,
        }],
        kpis: &[
            kpi("2024-04", 4_800.0, 3.8, 12.0, 1, false),
            kpi("2024-05", 5_100.0, 3.7, 14.0, 2, false),
            kpi("2024-06", 5_050.0, 3.6, 16.5, 2, false),
        ],
        interactions: &[SeedInteraction {
            timestamp: "2024-06-05 13:30:00",
            channel: "Call",
            sentiment: "Neutral",
            notes: "Data migration slipping two weeks; champion wants weekly check-ins",
        }],
        tickets: &[
            SeedTicket {
                ticket_id: 301,
                category: "Data Migration",
                status: "Pending",
                opened_at: "2024-05-27 09:45:00",
                resolved_at: None,
                priority: "High",
            },
            SeedTicket {
                ticket_id: 302,
                category: "Access",
                status: "Open",
                opened_at: "2024-06-03 11:20:00",
                resolved_at: None,
                priority: "Low",
            },
        ],
    },
    SeedClient {
        client_id: 4,
        company_name: "Umbrella Health",
        industry: "Healthcare",
        region: "LATAM",
        owner_name: "Sam Ortiz",
        lifecycle_stage: "Prospect",
        deal_stage: "Discovery",
        lifetime_value: None,
        created_at: "2024-05-20 12:00:00",
        contacts: &[],
        kpis: &[],
        interactions: &[SeedInteraction {
            timestamp: "2024-06-14 17:00:00",
            channel: "Meeting",
            sentiment: "Positive",
            notes: "Intro call; evaluating vendors for patient-intake automation",
        }],
        tickets: &[],
    },
];

/// A sample meeting-note file written by `precall seed` when the notes directory is empty.
#[derive(Clone, Copy, Debug)]
pub struct DemoNote {
    pub file_name: &'static str,
    pub body: &'static str,
}

pub const DEMO_NOTES: &[DemoNote] = &[
    DemoNote {
        file_name: "acme_ltd_2024-06-12_qbr.txt",
        body: "Quarterly business review with Acme Ltd. Helen Park raised repeated ERP \
integration outages during month-end close and asked for a remediation plan before \
renewal. Spend is up but satisfaction is slipping. Action: engineering lead to join \
next call with a root-cause summary.",
    },
    DemoNote {
        file_name: "acme_ltd_2024-05-28_renewal.txt",
        body: "Renewal discussion with Acme Ltd procurement. They want multi-year pricing \
options and a discount tied to the second plant onboarding in Q3. Billing ticket about \
duplicate invoices is still open and came up twice.",
    },
    DemoNote {
        file_name: "globex_corporation_2024-06-18_expansion.txt",
        body: "Globex Corporation is exploring the analytics add-on for three regional sites. \
Procurement needs the security questionnaire completed; champion is positive and wants a \
proposal by end of July.",
    },
    DemoNote {
        file_name: "initech_2024-06-05_onboarding.txt",
        body: "Initech onboarding status: data migration is two weeks behind because of \
legacy schema issues. Bill asked for weekly check-ins and escalation on the pending \
high-priority migration ticket.",
    },
];

#[derive(Clone, Debug, Default)]
pub struct SeedResult {
    pub clients_seeded: Vec<&'static str>,
    pub metrics_seeded: usize,
    pub interactions_seeded: usize,
    pub tickets_seeded: usize,
}

#[derive(Clone, Debug, Default)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

/// Deterministic demo accounts covering a churn-risk renewal, a healthy expansion,
/// a slipping onboarding and a prospect with no KPI history.
pub struct DemoDataset;

impl DemoDataset {
    pub fn client_names() -> Vec<&'static str> {
        SEED_CLIENTS.iter().map(|client| client.company_name).collect()
    }

    pub fn accounts() -> Result<Vec<AccountRecord>, RepositoryError> {
        SEED_CLIENTS.iter().map(account_record).collect()
    }

    /// Replaces all account data with the demo dataset inside one transaction.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        for table in ["tickets", "interactions", "metrics", "contacts", "clients"] {
            sqlx::query(&format!("DELETE FROM {table}")).execute(&mut *tx).await?;
        }

        let mut result = SeedResult::default();
        for (client, account) in SEED_CLIENTS.iter().zip(Self::accounts()?) {
            let profile = &account.profile;
            sqlx::query(
                "INSERT INTO clients (client_id, company_name, industry, region, owner_name,
                    lifecycle_stage, deal_stage, lifetime_value, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(profile.client_id.0)
            .bind(&profile.company_name)
            .bind(&profile.industry)
            .bind(&profile.region)
            .bind(&profile.owner_name)
            .bind(&profile.lifecycle_stage)
            .bind(&profile.deal_stage)
            .bind(profile.lifetime_value.and_then(|value| value.to_f64()))
            .bind(&profile.created_at)
            .execute(&mut *tx)
            .await?;

            for contact in &account.contacts {
                sqlx::query(
                    "INSERT INTO contacts (client_id, full_name, title, email, is_primary)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .bind(profile.client_id.0)
                .bind(&contact.full_name)
                .bind(&contact.title)
                .bind(&contact.email)
                .bind(contact.is_primary)
                .execute(&mut *tx)
                .await?;
            }

            for record in &account.kpis {
                sqlx::query(
                    "INSERT INTO metrics (client_id, month, spend, satisfaction_score,
                        churn_risk, open_tickets, renewal_due)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .bind(profile.client_id.0)
                .bind(&record.month)
                .bind(record.spend.and_then(|value| value.to_f64()))
                .bind(record.satisfaction_score)
                .bind(record.churn_risk)
                .bind(record.open_tickets)
                .bind(record.renewal_due)
                .execute(&mut *tx)
                .await?;
            }

            for interaction in &account.interactions {
                sqlx::query(
                    "INSERT INTO interactions (client_id, timestamp, channel, owner_name,
                        sentiment, notes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .bind(profile.client_id.0)
                .bind(interaction.timestamp.format(TIMESTAMP_FORMAT).to_string())
                .bind(&interaction.channel)
                .bind(&interaction.owner_name)
                .bind(&interaction.sentiment)
                .bind(&interaction.notes)
                .execute(&mut *tx)
                .await?;
            }

            for ticket in &account.tickets {
                sqlx::query(
                    "INSERT INTO tickets (ticket_id, client_id, category, status, opened_at,
                        resolved_at, resolution_time_days, priority)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .bind(ticket.ticket_id)
                .bind(profile.client_id.0)
                .bind(&ticket.category)
                .bind(ticket.status.as_str())
                .bind(ticket.opened_at.format(TIMESTAMP_FORMAT).to_string())
                .bind(ticket.resolved_at.map(|at| at.format(TIMESTAMP_FORMAT).to_string()))
                .bind(ticket.resolution_time_days)
                .bind(ticket.priority.as_str())
                .execute(&mut *tx)
                .await?;
            }

            result.clients_seeded.push(client.company_name);
            result.metrics_seeded += account.kpis.len();
            result.interactions_seeded += account.interactions.len();
            result.tickets_seeded += account.tickets.len();
        }

        tx.commit().await?;
        tracing::info!(
            event_name = "db.seed.loaded",
            clients = result.clients_seeded.len(),
            metrics = result.metrics_seeded,
            interactions = result.interactions_seeded,
            tickets = result.tickets_seeded,
            "demo dataset loaded"
        );
        Ok(result)
    }

    /// Checks that every seeded client exists with the expected row counts.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for client in SEED_CLIENTS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM clients WHERE client_id = ?1 AND company_name = ?2)",
            )
            .bind(client.client_id)
            .bind(client.company_name)
            .fetch_one(pool)
            .await?;
            checks.push((format!("{}: client", client.company_name), exists == 1));

            for (table, expected) in [
                ("contacts", client.contacts.len()),
                ("metrics", client.kpis.len()),
                ("interactions", client.interactions.len()),
                ("tickets", client.tickets.len()),
            ] {
                let count: i64 = sqlx::query_scalar(&format!(
                    "SELECT COUNT(1) FROM {table} WHERE client_id = ?1"
                ))
                .bind(client.client_id)
                .fetch_one(pool)
                .await?;
                checks.push((format!("{}: {table}", client.company_name), count == expected as i64));
            }
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }
}

fn timestamp(raw: &str) -> Result<chrono::NaiveDateTime, RepositoryError> {
    parse_timestamp(raw)
        .ok_or_else(|| RepositoryError::Decode(format!("fixture timestamp `{raw}` is invalid")))
}

fn account_record(client: &SeedClient) -> Result<AccountRecord, RepositoryError> {
    let client_id = ClientId(client.client_id);
    let profile = ClientProfile {
        client_id,
        company_name: client.company_name.to_string(),
        industry: client.industry.to_string(),
        region: client.region.to_string(),
        owner_name: client.owner_name.to_string(),
        lifecycle_stage: Some(client.lifecycle_stage.to_string()),
        deal_stage: Some(client.deal_stage.to_string()),
        lifetime_value: client.lifetime_value.and_then(Decimal::from_f64),
        created_at: Some(client.created_at.to_string()),
    };

    let contacts = client
        .contacts
        .iter()
        .enumerate()
        .map(|(index, contact)| Contact {
            contact_id: client.client_id * 100 + index as i64,
            client_id,
            full_name: contact.full_name.to_string(),
            title: Some(contact.title.to_string()),
            email: Some(contact.email.to_string()),
            is_primary: contact.is_primary,
        })
        .collect();

    let kpis = client
        .kpis
        .iter()
        .map(|record| KpiRecord {
            month: record.month.to_string(),
            spend: Decimal::from_f64(record.spend).map(|amount| amount.round_dp(2)),
            satisfaction_score: Some(record.satisfaction_score),
            churn_risk: Some(record.churn_risk),
            open_tickets: Some(record.open_tickets),
            renewal_due: record.renewal_due,
        })
        .collect();

    let interactions = client
        .interactions
        .iter()
        .map(|interaction| {
            Ok(InteractionRecord {
                timestamp: timestamp(interaction.timestamp)?,
                channel: interaction.channel.to_string(),
                owner_name: client.owner_name.to_string(),
                sentiment: Some(interaction.sentiment.to_string()),
                notes: Some(interaction.notes.to_string()),
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    let tickets = client
        .tickets
        .iter()
        .map(|ticket| {
            let opened_at = timestamp(ticket.opened_at)?;
            let resolved_at = ticket.resolved_at.map(timestamp).transpose()?;
            let resolution_time_days = resolved_at
                .map(|resolved| (resolved - opened_at).num_minutes() as f64 / (60.0 * 24.0))
                .map(|days| (days * 10.0).round() / 10.0);
            Ok(Ticket {
                ticket_id: ticket.ticket_id,
                category: ticket.category.to_string(),
                status: TicketStatus::from(ticket.status.to_string()),
                opened_at,
                resolved_at,
                resolution_time_days,
                priority: TicketPriority::from(ticket.priority.to_string()),
            })
        })
        .collect::<Result<Vec<_>, RepositoryError>>()?;

    Ok(AccountRecord { profile, contacts, kpis, interactions, tickets })
}

#[cfg(test)]
mod tests {
    use precall_core::domain::client_slug;

    use super::{DemoDataset, DEMO_NOTES};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn load_then_verify_reports_all_present() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let result = DemoDataset::load(&pool).await.expect("load");
        assert_eq!(result.clients_seeded, DemoDataset::client_names());

        let verification = DemoDataset::verify(&pool).await.expect("verify");
        assert!(verification.all_present, "failed checks: {:?}", verification.checks);
    }

    #[tokio::test]
    async fn load_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");

        DemoDataset::load(&pool).await.expect("first load");
        DemoDataset::load(&pool).await.expect("second load");

        let clients: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM clients").fetch_one(&pool).await.expect("count");
        assert_eq!(clients as usize, DemoDataset::client_names().len());
    }

    #[test]
    fn demo_notes_are_named_after_client_slugs() {
        for note in DEMO_NOTES {
            let matches_client = DemoDataset::client_names()
                .into_iter()
                .any(|name| note.file_name.starts_with(&client_slug(name)));
            assert!(matches_client, "{} should start with a client slug", note.file_name);
        }
    }

    #[test]
    fn acme_latest_month_trips_every_risk_flag() {
        let accounts = DemoDataset::accounts().expect("accounts");
        let acme = accounts
            .iter()
            .find(|account| account.profile.company_name == "Acme Ltd")
            .expect("acme");
        let latest = acme.kpis.iter().max_by(|a, b| a.month.cmp(&b.month)).expect("kpis");

        assert_eq!(latest.churn_risk, Some(20.0));
        assert_eq!(latest.open_tickets, Some(3));
        assert!(acme.tickets.iter().any(|ticket| ticket.is_high_priority_pending()));
    }
}
