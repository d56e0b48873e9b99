use crate::detect::Change;
use leadbridge_common::error::BridgeResult;
use leadbridge_db::lead::models::Lead;
use leadbridge_db::lead::repositories::LeadRepository;

#[derive(Debug, Default)]
pub struct WriteStats {
    pub created: u64,
    pub updated: u64,
    /// `(external_ref, reason)` for rows that failed even individually.
    pub failed: Vec<(String, String)>,
}

/// Accumulates a page's creates and updates, then applies them in chunks.
///
/// Creates go through duplicate-tolerant bulk inserts, so a row another run
/// raced in is skipped rather than an error. Updates run in small
/// transactions; a failed chunk falls back to per-item statements so one
/// poisoned row does not block its chunk-mates.
pub struct BatchWriter {
    creates: Vec<Lead>,
    updates: Vec<Lead>,
    create_chunk: usize,
    update_chunk: usize,
}

impl BatchWriter {
    pub fn new(create_chunk: usize, update_chunk: usize) -> Self {
        Self {
            creates: Vec::new(),
            updates: Vec::new(),
            create_chunk: create_chunk.max(1),
            update_chunk: update_chunk.max(1),
        }
    }

    pub fn stage(&mut self, lead: Lead, change: Change) {
        match change {
            Change::Create => self.creates.push(lead),
            Change::Update => self.updates.push(lead),
            Change::Unchanged => {}
        }
    }

    pub fn pending(&self) -> (usize, usize) {
        (self.creates.len(), self.updates.len())
    }

    pub async fn apply<L: LeadRepository + ?Sized>(self, repo: &L) -> BridgeResult<WriteStats> {
        let mut stats = WriteStats::default();

        for chunk in self.creates.chunks(self.create_chunk) {
            stats.created += repo.insert_many(chunk).await?;
        }

        for chunk in self.updates.chunks(self.update_chunk) {
            match repo.update_many(chunk).await {
                Ok(()) => stats.updated += chunk.len() as u64,
                Err(e) => {
                    tracing::warn!(
                        rows = chunk.len(),
                        error = %e,
                        "update chunk failed, retrying rows individually"
                    );
                    for lead in chunk {
                        match repo.update_one(lead).await {
                            Ok(()) => stats.updated += 1,
                            Err(e) => {
                                tracing::warn!(
                                    external_ref = %lead.external_ref,
                                    error = %e,
                                    "update failed for row, skipping"
                                );
                                stats
                                    .failed
                                    .push((lead.external_ref.clone(), e.to_string()));
                            }
                        }
                    }
                }
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use leadbridge_common::error::BridgeError;
    use leadbridge_db::lead::models::LeadSnapshot;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct MockLeadRepo {
        stored: Mutex<HashMap<String, Lead>>,
        insert_calls: Mutex<Vec<usize>>,
        update_chunk_calls: Mutex<Vec<usize>>,
        update_one_calls: Mutex<usize>,
        poisoned: HashSet<String>,
    }

    impl MockLeadRepo {
        fn with_poisoned(refs: &[&str]) -> Self {
            Self {
                poisoned: refs.iter().map(|r| r.to_string()).collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl LeadRepository for MockLeadRepo {
        async fn snapshots_by_refs(&self, _refs: &[String]) -> BridgeResult<Vec<LeadSnapshot>> {
            Ok(Vec::new())
        }

        async fn insert_many(&self, leads: &[Lead]) -> BridgeResult<u64> {
            self.insert_calls.lock().unwrap().push(leads.len());
            let mut stored = self.stored.lock().unwrap();
            let mut inserted = 0;
            for lead in leads {
                if !stored.contains_key(&lead.external_ref) {
                    stored.insert(lead.external_ref.clone(), lead.clone());
                    inserted += 1;
                }
            }
            Ok(inserted)
        }

        async fn update_many(&self, leads: &[Lead]) -> BridgeResult<()> {
            self.update_chunk_calls.lock().unwrap().push(leads.len());
            if leads.iter().any(|l| self.poisoned.contains(&l.external_ref)) {
                // Whole transaction rolls back
                return Err(BridgeError::Database("deadlock detected".to_string()));
            }
            let mut stored = self.stored.lock().unwrap();
            for lead in leads {
                stored.insert(lead.external_ref.clone(), lead.clone());
            }
            Ok(())
        }

        async fn update_one(&self, lead: &Lead) -> BridgeResult<()> {
            *self.update_one_calls.lock().unwrap() += 1;
            if self.poisoned.contains(&lead.external_ref) {
                return Err(BridgeError::Database("value too long".to_string()));
            }
            self.stored
                .lock()
                .unwrap()
                .insert(lead.external_ref.clone(), lead.clone());
            Ok(())
        }
    }

    fn make_lead(external_ref: &str) -> Lead {
        let now = Utc::now();
        Lead {
            id: Uuid::new_v4(),
            external_ref: external_ref.to_string(),
            owner_account_id: Uuid::new_v4(),
            territory: "North".to_string(),
            lifecycle_status: "new".to_string(),
            subject_name: "Someone".to_string(),
            contact_phone: None,
            alt_phone: None,
            email: None,
            address: None,
            city: None,
            state: None,
            postal_code: None,
            treatment: "skin".to_string(),
            sub_treatment: None,
            source_channel: None,
            campaign: None,
            budget: None,
            is_hot: false,
            detail: None,
            follow_up_on: None,
            enquired_at: None,
            entered_at: None,
            source_updated_at: None,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn creates_are_chunked() {
        let repo = MockLeadRepo::default();
        let mut writer = BatchWriter::new(2, 25);
        for i in 0..5 {
            writer.stage(make_lead(&i.to_string()), Change::Create);
        }

        let stats = writer.apply(&repo).await.unwrap();
        assert_eq!(stats.created, 5);
        assert_eq!(*repo.insert_calls.lock().unwrap(), vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn unchanged_rows_are_not_staged() {
        let repo = MockLeadRepo::default();
        let mut writer = BatchWriter::new(10, 10);
        writer.stage(make_lead("1"), Change::Create);
        writer.stage(make_lead("2"), Change::Unchanged);
        writer.stage(make_lead("3"), Change::Update);
        assert_eq!(writer.pending(), (1, 1));

        let stats = writer.apply(&repo).await.unwrap();
        assert_eq!(stats.created, 1);
        assert_eq!(stats.updated, 1);
    }

    #[tokio::test]
    async fn duplicate_create_races_are_tolerated() {
        let repo = MockLeadRepo::default();
        // Another run already created ref "1"
        repo.insert_many(&[make_lead("1")]).await.unwrap();

        let mut writer = BatchWriter::new(10, 10);
        writer.stage(make_lead("1"), Change::Create);
        writer.stage(make_lead("2"), Change::Create);

        let stats = writer.apply(&repo).await.unwrap();
        assert_eq!(stats.created, 1);
        assert!(stats.failed.is_empty());
    }

    #[tokio::test]
    async fn poisoned_update_chunk_falls_back_to_per_item() {
        let repo = MockLeadRepo::with_poisoned(&["2"]);
        let mut writer = BatchWriter::new(10, 3);
        for i in 0..3 {
            writer.stage(make_lead(&i.to_string()), Change::Update);
        }

        let stats = writer.apply(&repo).await.unwrap();
        // Chunk-mates landed despite the poisoned row
        assert_eq!(stats.updated, 2);
        assert_eq!(stats.failed.len(), 1);
        assert_eq!(stats.failed[0].0, "2");
        assert_eq!(*repo.update_one_calls.lock().unwrap(), 3);

        let stored = repo.stored.lock().unwrap();
        assert!(stored.contains_key("0"));
        assert!(stored.contains_key("1"));
        assert!(!stored.contains_key("2"));
    }

    #[tokio::test]
    async fn healthy_update_chunks_stay_transactional() {
        let repo = MockLeadRepo::default();
        let mut writer = BatchWriter::new(10, 2);
        for i in 0..5 {
            writer.stage(make_lead(&i.to_string()), Change::Update);
        }

        let stats = writer.apply(&repo).await.unwrap();
        assert_eq!(stats.updated, 5);
        assert_eq!(*repo.update_chunk_calls.lock().unwrap(), vec![2, 2, 1]);
        assert_eq!(*repo.update_one_calls.lock().unwrap(), 0);
    }
}
