//! In-memory job records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use scheduler_core::{Job, JobFilter, JobId, JobStats, JobStatus, JobType};

use crate::selector::scheduling_key;

#[derive(Debug, Clone)]
struct Entry {
    job: Job,
    seq: u64,
}

/// Every job the scheduler knows about, keyed by ID.
#[derive(Debug, Default)]
pub struct JobStore {
    entries: HashMap<JobId, Entry>,
    next_seq: u64,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, job: Job) -> JobId {
        let id = job.id;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(id, Entry { job, seq });
        id
    }

    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.entries.get(&id).map(|e| &e.job)
    }

    pub fn get_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.entries.get_mut(&id).map(|e| &mut e.job)
    }

    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        self.entries.remove(&id).map(|e| e.job)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending jobs paired with their insertion sequence, unordered.
    pub fn pending(&self) -> impl Iterator<Item = (&Job, u64)> {
        self.entries
            .values()
            .filter(|e| e.job.status == JobStatus::Pending)
            .map(|e| (&e.job, e.seq))
    }

    /// Jobs matching `filter`, in scheduling order.
    pub fn list(&self, filter: &JobFilter) -> Vec<Job> {
        let mut matching: Vec<&Entry> = self
            .entries
            .values()
            .filter(|e| filter.matches(&e.job))
            .collect();
        matching.sort_by_key(|e| scheduling_key(&e.job, e.seq));

        matching
            .into_iter()
            .take(filter.limit.unwrap_or(usize::MAX))
            .map(|e| e.job.clone())
            .collect()
    }

    pub fn stats(&self, registered_types: Vec<JobType>) -> JobStats {
        let mut stats = JobStats {
            total: self.entries.len(),
            registered_types,
            ..Default::default()
        };
        for entry in self.entries.values() {
            match entry.job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Delete terminal jobs that finished at or before `cutoff`.
    pub fn remove_terminal_before(&mut self, cutoff: DateTime<Utc>) -> Vec<JobId> {
        let expired: Vec<JobId> = self
            .entries
            .values()
            .filter(|e| e.job.status.is_terminal())
            .filter(|e| e.job.completed_at.unwrap_or(e.job.created_at) <= cutoff)
            .map(|e| e.job.id)
            .collect();

        for id in &expired {
            self.entries.remove(id);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use scheduler_core::{JobData, Priority};

    fn job(job_type: JobType, priority: Priority, created_at: DateTime<Utc>) -> Job {
        Job::new(job_type, JobData::default(), created_at).with_priority(priority)
    }

    #[test]
    fn list_orders_by_priority_then_age() {
        let t0 = Utc::now();
        let mut store = JobStore::new();
        let low = store.insert(job(JobType::BimAnalysis, Priority::Low, t0));
        let medium_late = store.insert(job(
            JobType::BimAnalysis,
            Priority::Medium,
            t0 + Duration::seconds(2),
        ));
        let medium_early = store.insert(job(
            JobType::CostEstimation,
            Priority::Medium,
            t0 + Duration::seconds(1),
        ));
        let critical = store.insert(job(
            JobType::CostEstimation,
            Priority::Critical,
            t0 + Duration::seconds(3),
        ));

        let ids: Vec<JobId> = store.list(&JobFilter::default()).iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![critical, medium_early, medium_late, low]);

        let bim: Vec<JobId> = store
            .list(&JobFilter::job_type(JobType::BimAnalysis))
            .iter()
            .map(|j| j.id)
            .collect();
        assert_eq!(bim, vec![medium_late, low]);

        let limited = store.list(&JobFilter {
            limit: Some(1),
            ..Default::default()
        });
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].id, critical);
    }

    #[test]
    fn stats_count_each_status() {
        let t0 = Utc::now();
        let mut store = JobStore::new();
        store.insert(job(JobType::ClashDetection, Priority::Medium, t0));
        let done = store.insert(job(JobType::ClashDetection, Priority::Medium, t0));
        let failed = store.insert(job(JobType::ClashDetection, Priority::Medium, t0));

        if let Some(j) = store.get_mut(done) {
            j.status = JobStatus::Completed;
        }
        if let Some(j) = store.get_mut(failed) {
            j.status = JobStatus::Failed;
        }

        let stats = store.stats(vec![JobType::ClashDetection]);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.processing, 0);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.registered_types, vec![JobType::ClashDetection]);
    }

    #[test]
    fn sweep_respects_cutoff_and_skips_live_jobs() {
        let t0 = Utc::now();
        let mut store = JobStore::new();
        let pending = store.insert(job(JobType::ComplianceCheck, Priority::Low, t0));
        let old = store.insert(job(JobType::ComplianceCheck, Priority::Low, t0));
        let fresh = store.insert(job(JobType::ComplianceCheck, Priority::Low, t0));

        for (id, at) in [(old, t0), (fresh, t0 + Duration::minutes(30))] {
            if let Some(j) = store.get_mut(id) {
                j.status = JobStatus::Completed;
                j.completed_at = Some(at);
            }
        }

        let removed = store.remove_terminal_before(t0 + Duration::minutes(10));
        assert_eq!(removed, vec![old]);
        assert!(store.get(pending).is_some());
        assert!(store.get(fresh).is_some());
        assert!(store.remove_terminal_before(t0 + Duration::minutes(10)).is_empty());
        assert_eq!(store.len(), 2);
    }
}
