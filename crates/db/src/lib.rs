pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{DemoDataset, DemoNote, SeedResult, VerificationResult, DEMO_NOTES};
pub use repositories::{
    AccountRecord, AccountRepository, InMemoryAccountRepository, RepositoryError,
    SqlAccountRepository,
};
