use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub timestamp: NaiveDateTime,
    pub channel: String,
    pub owner_name: String,
    pub sentiment: Option<String>,
    pub notes: Option<String>,
}

impl InteractionRecord {
    pub fn note_text(&self) -> Option<&str> {
        self.notes.as_deref().map(str::trim).filter(|note| !note.is_empty())
    }
}

/// Most recent first.
pub fn sort_interactions(records: &mut [InteractionRecord]) {
    records.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
}

#[cfg(test)]
mod tests {
    use crate::domain::parse_timestamp;

    use super::{sort_interactions, InteractionRecord};

    fn interaction(timestamp: &str, notes: Option<&str>) -> InteractionRecord {
        InteractionRecord {
            timestamp: parse_timestamp(timestamp).expect("timestamp"),
            channel: "Call".to_string(),
            owner_name: "Dana Reyes".to_string(),
            sentiment: Some("Positive".to_string()),
            notes: notes.map(str::to_string),
        }
    }

    #[test]
    fn sorts_most_recent_first() {
        let mut records = vec![
            interaction("2024-05-01 09:00:00", None),
            interaction("2024-06-01 09:00:00", None),
            interaction("2024-05-15 09:00:00", None),
        ];
        sort_interactions(&mut records);

        let months = records
            .iter()
            .map(|record| record.timestamp.format("%m-%d").to_string())
            .collect::<Vec<_>>();
        assert_eq!(months, vec!["06-01", "05-15", "05-01"]);
    }

    #[test]
    fn blank_notes_are_treated_as_missing() {
        assert_eq!(interaction("2024-05-01", Some("   ")).note_text(), None);
        assert_eq!(
            interaction("2024-05-01", Some(" Asked about SSO ")).note_text(),
            Some("Asked about SSO")
        );
    }
}
