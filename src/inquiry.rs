use std::path::PathBuf;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::engine::EngineError;
use crate::model::Inquiry;
use crate::snapshot;

pub const ACKNOWLEDGEMENT: &str =
    "Thank you for your inquiry! We will contact you shortly with an offer.";

/// Append-only log of contact/requirements submissions.
///
/// Unlike the calendar, a failed save here is not fatal: the entry stays in
/// memory and is written out with the next successful append.
pub struct InquiryLog {
    path: PathBuf,
    entries: Mutex<Vec<Inquiry>>,
}

impl InquiryLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        let entries: Vec<Inquiry> = snapshot::read_json(&path)
            .map_err(|e| EngineError::persistence(&path, e))?
            .unwrap_or_default();
        info!("inquiry log loaded from {} ({} entries)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Record `inquiry` and return the acknowledgement for the requester.
    pub async fn append(&self, inquiry: Inquiry) -> String {
        let reference = inquiry.id.map(|id| id.to_string());
        let mut entries = self.entries.lock().await;
        entries.push(inquiry);
        match snapshot::write_json_atomic(&self.path, &*entries) {
            Ok(()) => info!("inquiry {} recorded", reference.as_deref().unwrap_or("-")),
            Err(e) => warn!(
                "inquiry {} kept in memory only, save to {} failed: {e}",
                reference.as_deref().unwrap_or("-"),
                self.path.display()
            ),
        }
        match reference {
            Some(r) => format!("{ACKNOWLEDGEMENT} Reference: {r}."),
            None => ACKNOWLEDGEMENT.to_string(),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Copy of all entries in insertion order.
    pub async fn entries(&self) -> Vec<Inquiry> {
        self.entries.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContactType, SpaceCategory};
    use chrono::Utc;
    use std::fs;
    use ulid::Ulid;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("spacebook_test_inquiry_{name}_{}", Ulid::new()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn inquiry(name: &str) -> Inquiry {
        let mut requirements = serde_json::Map::new();
        requirements.insert("attendees".into(), serde_json::json!(40));
        Inquiry {
            id: Some(Ulid::new()),
            timestamp: Utc::now(),
            name: name.into(),
            contact_type: ContactType::Email,
            contact_value: format!("{name}@example.com"),
            space_type: SpaceCategory::Hall,
            requirements,
        }
    }

    #[tokio::test]
    async fn append_persists_in_order() {
        let path = test_dir("order").join("inquiries.json");
        let log = InquiryLog::open(&path).unwrap();
        let first = inquiry("ana");
        let second = inquiry("marko");

        let ack = log.append(first.clone()).await;
        assert!(ack.starts_with(ACKNOWLEDGEMENT));
        assert!(ack.contains(&first.id.unwrap().to_string()));
        log.append(second.clone()).await;

        let reopened = InquiryLog::open(&path).unwrap();
        assert_eq!(reopened.entries().await, vec![first, second]);
    }

    #[tokio::test]
    async fn file_uses_documented_field_names() {
        let path = test_dir("fields").join("inquiries.json");
        let log = InquiryLog::open(&path).unwrap();
        log.append(inquiry("ivana")).await;

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let record = &raw[0];
        for field in ["timestamp", "name", "contact_type", "contact_value", "space_type", "requirements"] {
            assert!(record.get(field).is_some(), "missing {field}");
        }
        assert_eq!(record["contact_type"], "email");
        assert_eq!(record["space_type"], "hall");
        assert_eq!(record["requirements"]["attendees"], 40);
    }

    #[tokio::test]
    async fn save_failure_still_acknowledges() {
        let dir = test_dir("degraded");
        let log = InquiryLog::open(dir.join("inquiries.json")).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        let ack = log.append(inquiry("petra")).await;
        assert!(ack.starts_with(ACKNOWLEDGEMENT));
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn entry_kept_in_memory_is_saved_by_next_append() {
        let dir = test_dir("retry");
        let path = dir.join("inquiries.json");
        let log = InquiryLog::open(&path).unwrap();
        fs::remove_dir_all(&dir).unwrap();
        log.append(inquiry("luka")).await;

        fs::create_dir_all(&dir).unwrap();
        log.append(inquiry("maja")).await;

        let reopened = InquiryLog::open(&path).unwrap();
        let names: Vec<_> = reopened.entries().await.into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["luka", "maja"]);
    }

    #[tokio::test]
    async fn legacy_records_without_id_load() {
        let path = test_dir("legacy").join("inquiries.json");
        fs::write(
            &path,
            r#"[{"timestamp": "2024-11-12T09:15:00Z", "name": "Ana", "contact_type": "phone",
                "contact_value": "+385 91 123 4567", "space_type": "office", "requirements": {}}]"#,
        )
        .unwrap();
        let log = InquiryLog::open(&path).unwrap();
        let entries = log.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, None);
        assert_eq!(entries[0].contact_type, ContactType::Phone);
    }

    #[test]
    fn corrupt_log_fails_to_open() {
        let path = test_dir("corrupt").join("inquiries.json");
        fs::write(&path, "[{").unwrap();
        assert!(matches!(InquiryLog::open(&path), Err(EngineError::Persistence(_))));
    }
}
