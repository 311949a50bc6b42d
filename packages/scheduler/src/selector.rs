//! Picks the next job to run.

use chrono::{DateTime, Utc};
use scheduler_core::{Job, JobId, JobStatus};

/// Total scheduling order: priority tier, then creation time, then insertion.
pub type SchedulingKey = (u8, DateTime<Utc>, u64);

/// Key under which a job sorts. `seq` is the store's insertion counter and
/// only matters when two jobs share a tier and a timestamp.
pub fn scheduling_key(job: &Job, seq: u64) -> SchedulingKey {
    (job.priority.rank(), job.created_at, seq)
}

/// Select the minimum pending job by [`scheduling_key`].
///
/// Job type, attempts and payload are deliberately ignored, so a steady
/// stream of high-priority work can starve low-priority jobs.
pub fn select_next<'a, I>(candidates: I) -> Option<JobId>
where
    I: IntoIterator<Item = (&'a Job, u64)>,
{
    candidates
        .into_iter()
        .filter(|(job, _)| job.status == JobStatus::Pending)
        .min_by_key(|(job, seq)| scheduling_key(job, *seq))
        .map(|(job, _)| job.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use scheduler_core::{JobData, JobType, Priority};

    fn job(priority: Priority, created_at: DateTime<Utc>) -> Job {
        Job::new(JobType::DocumentAnalysis, JobData::default(), created_at).with_priority(priority)
    }

    #[test]
    fn critical_beats_older_low() {
        let t0 = Utc::now();
        let low = job(Priority::Low, t0);
        let critical = job(Priority::Critical, t0 + Duration::seconds(5));

        let picked = select_next([(&low, 0), (&critical, 1)]);
        assert_eq!(picked, Some(critical.id));

        let picked = select_next([(&critical, 1), (&low, 0)]);
        assert_eq!(picked, Some(critical.id));
    }

    #[test]
    fn equal_priority_is_fifo() {
        let t0 = Utc::now();
        let first = job(Priority::Medium, t0);
        let second = job(Priority::Medium, t0 + Duration::milliseconds(1));

        assert_eq!(select_next([(&second, 1), (&first, 0)]), Some(first.id));
    }

    #[test]
    fn identical_timestamps_fall_back_to_insertion_order() {
        let t0 = Utc::now();
        let first = job(Priority::High, t0);
        let second = job(Priority::High, t0);

        assert_eq!(select_next([(&second, 8), (&first, 7)]), Some(first.id));
    }

    #[test]
    fn non_pending_jobs_are_skipped() {
        let t0 = Utc::now();
        let mut running = job(Priority::Critical, t0);
        running.status = JobStatus::Processing;
        let mut done = job(Priority::Critical, t0);
        done.status = JobStatus::Completed;
        let waiting = job(Priority::Low, t0);

        assert_eq!(
            select_next([(&running, 0), (&done, 1), (&waiting, 2)]),
            Some(waiting.id)
        );
        assert_eq!(select_next([(&running, 0), (&done, 1)]), None);
        assert_eq!(select_next(std::iter::empty()), None);
    }
}
