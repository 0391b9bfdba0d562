//! Certificate identifiers.

use chrono::NaiveDate;

/// Mints certificate IDs. Implementations must be collision-free across
/// concurrent callers without coordinating with each other.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random (v4) UUIDs: 122 random bits per ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Hex characters of the ID carried in a generated certificate number.
pub const NUMBER_SUFFIX_LEN: usize = 12;

/// Human-facing number derived from the ID: `<prefix>-<YYYYMMDD>-<12 hex>`,
/// the first twelve hex digits of the ID, uppercased.
pub fn certificate_number(prefix: &str, issue_date: NaiveDate, certificate_id: &str) -> String {
    let suffix: String = certificate_id
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(NUMBER_SUFFIX_LEN)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("{prefix}-{}-{suffix}", issue_date.format("%Y%m%d"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn ten_thousand_sequential_ids_are_unique() {
        let ids = UuidGenerator;
        let minted: HashSet<String> = (0..10_000).map(|_| ids.next_id()).collect();
        assert_eq!(minted.len(), 10_000);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn ten_thousand_concurrent_ids_are_unique() {
        let ids = Arc::new(UuidGenerator);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let ids = Arc::clone(&ids);
            handles.push(tokio::spawn(async move {
                (0..1_250).map(|_| ids.next_id()).collect::<Vec<_>>()
            }));
        }

        let mut minted = HashSet::new();
        for handle in handles {
            for id in handle.await.unwrap() {
                assert!(minted.insert(id), "duplicate certificate ID minted");
            }
        }
        assert_eq!(minted.len(), 10_000);
    }

    #[test]
    fn certificate_number_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let number = certificate_number("CERT", date, "0b7c5c1e-3d57-4a52-9a55-3f1a0f2b9d10");
        assert_eq!(number, "CERT-20240309-0B7C5C1E3D57");
        let suffix = number.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), NUMBER_SUFFIX_LEN);
    }
}
