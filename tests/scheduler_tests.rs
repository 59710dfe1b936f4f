//! End-to-end scheduling tests over a scripted worker fleet.
//!
//! These tests validate that:
//! - Dispatch pairs scheduled jobs with available workers and records the
//!   assignment exclusively.
//! - The health monitor demotes a worker only after the configured number of
//!   consecutive failed probes, and its jobs go back to the pool.
//! - The scanner harvests finished jobs and reschedules lost ones.
//! - Result aggregation verifies plaintexts and is idempotent under replay.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crack_master::comms::{ProbeFailure, ProbeOutcome, PushOutcome, StatusOutcome, WorkerClient};
use crack_master::config::DispatchPolicy;
use crack_master::keyspace::SubRange;
use crack_master::model::{HashStatus, JobStatus, WorkerStatus};
use crack_master::protocol::{CrackOutcome, CrackRequest, CrackResult, CrackStatus, WorkerSignal};
use crack_master::scheduler::{HealthMonitor, JobDispatcher, ProgressScanner, ResultAggregator};
use crack_master::store::Store;

// md5("050-1234567")
const DIGEST: &str = "519595c185061cd0709ea7d63cc99674";
const PASSWORD: &str = "050-1234567";

/// Scripted fleet standing in for real workers. Behavior is keyed by worker
/// address; everything defaults to a healthy, accepting worker.
#[derive(Default)]
struct MockFleet {
    unreachable: Mutex<HashSet<String>>,
    busy: Mutex<HashSet<String>>,
    push_rules: Mutex<HashMap<(String, String), PushOutcome>>,
    status_rules: Mutex<HashMap<String, StatusOutcome>>,
    pushes: Mutex<Vec<(String, CrackRequest)>>,
}

impl MockFleet {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn set_unreachable(&self, address: &str, down: bool) {
        let mut unreachable = self.unreachable.lock().unwrap();
        if down {
            unreachable.insert(address.to_string());
        } else {
            unreachable.remove(address);
        }
    }

    fn set_busy_signal(&self, address: &str) {
        self.busy.lock().unwrap().insert(address.to_string());
    }

    /// Scripts the outcome of pushing the job whose range starts at `start`.
    fn set_push_outcome(&self, address: &str, start: &str, outcome: PushOutcome) {
        self.push_rules
            .lock()
            .unwrap()
            .insert((address.to_string(), start.to_string()), outcome);
    }

    fn set_status(&self, address: &str, outcome: StatusOutcome) {
        self.status_rules
            .lock()
            .unwrap()
            .insert(address.to_string(), outcome);
    }

    fn pushes(&self) -> Vec<(String, CrackRequest)> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkerClient for MockFleet {
    async fn probe_health(&self, address: &str) -> ProbeOutcome {
        if self.unreachable.lock().unwrap().contains(address) {
            return ProbeOutcome::Failed(ProbeFailure::Connection);
        }
        if self.busy.lock().unwrap().contains(address) {
            return ProbeOutcome::Reported(WorkerSignal::Busy);
        }
        ProbeOutcome::Reported(WorkerSignal::Available)
    }

    async fn push_job(&self, address: &str, request: &CrackRequest) -> PushOutcome {
        self.pushes
            .lock()
            .unwrap()
            .push((address.to_string(), request.clone()));
        let key = (address.to_string(), request.start_range.to_string());
        self.push_rules
            .lock()
            .unwrap()
            .get(&key)
            .copied()
            .unwrap_or(PushOutcome::Accepted)
    }

    async fn query_status(&self, address: &str, _digest: &str, _range: &SubRange) -> StatusOutcome {
        self.status_rules
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or(StatusOutcome::Failed(ProbeFailure::Connection))
    }
}

fn range(start: &str, end: &str) -> SubRange {
    SubRange::new(start.parse().unwrap(), end.parse().unwrap())
}

/// Store with one hash split into the given job ranges.
fn store_with_jobs(ranges: &[SubRange]) -> (Arc<Store>, i64) {
    let store = Arc::new(Store::open_in_memory().unwrap());
    store.add_digests(&[DIGEST.to_string()]).unwrap();
    let hash_id = store.hash_by_digest(DIGEST).unwrap().unwrap().id;
    store
        .create_jobs_for_hash(hash_id, ranges.iter().copied())
        .unwrap();
    (store, hash_id)
}

fn dispatcher(store: &Arc<Store>, fleet: &Arc<MockFleet>, policy: DispatchPolicy) -> JobDispatcher {
    JobDispatcher::new(
        Arc::clone(store),
        Arc::clone(fleet) as Arc<dyn WorkerClient>,
        policy,
    )
}

fn monitor(store: &Arc<Store>, fleet: &Arc<MockFleet>, threshold: u32) -> HealthMonitor {
    HealthMonitor::new(
        Arc::clone(store),
        Arc::clone(fleet) as Arc<dyn WorkerClient>,
        threshold,
    )
}

fn scanner(store: &Arc<Store>, fleet: &Arc<MockFleet>, threshold: u32) -> ProgressScanner {
    ProgressScanner::new(
        Arc::clone(store),
        Arc::clone(fleet) as Arc<dyn WorkerClient>,
        threshold,
    )
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn dispatch_assigns_oldest_job_and_marks_worker_busy() {
    let r1 = range("050-0000000", "050-0000049");
    let r2 = range("050-0000050", "050-0000099");
    let (store, hash_id) = store_with_jobs(&[r1, r2]);
    let fleet = MockFleet::new();
    let worker_id = store.register_worker("10.0.0.1", 8000).unwrap();

    let placed = dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced)
        .dispatch_pass()
        .await
        .unwrap();
    assert_eq!(placed, 1);

    let job = store.job_by_range(hash_id, &r1).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::InProgress);
    assert_eq!(job.worker_id, Some(worker_id));
    // Second job stays queued for the next free worker.
    let waiting = store.job_by_range(hash_id, &r2).unwrap().unwrap();
    assert_eq!(waiting.status, JobStatus::Scheduled);

    let worker = store.worker(worker_id).unwrap().unwrap();
    assert_eq!(worker.status, WorkerStatus::Busy);

    let pushes = fleet.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].0, "10.0.0.1:8000");
    assert_eq!(pushes[0].1.hashes, vec![DIGEST.to_string()]);
    assert_eq!(pushes[0].1.start_range, r1.start);
}

#[tokio::test]
async fn dispatch_skips_worker_that_went_unreachable() {
    let (store, _) = store_with_jobs(&[range("050-0000000", "050-0000049")]);
    let fleet = MockFleet::new();
    let worker_id = store.register_worker("10.0.0.1", 8000).unwrap();
    fleet.set_unreachable("10.0.0.1:8000", true);

    let placed = dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced)
        .dispatch_pass()
        .await
        .unwrap();
    assert_eq!(placed, 0);
    assert!(fleet.pushes().is_empty());

    // Demotion is the health monitor's call, not the dispatcher's.
    let job = store.scheduled_jobs(1).unwrap().remove(0);
    assert_eq!(job.status, JobStatus::Scheduled);
    assert_eq!(
        store.worker(worker_id).unwrap().unwrap().status,
        WorkerStatus::Available
    );
}

#[tokio::test]
async fn stop_policy_ends_the_pass_at_the_first_unplaced_job() {
    let r1 = range("050-0000000", "050-0000049");
    let r2 = range("050-0000050", "050-0000099");
    let (store, hash_id) = store_with_jobs(&[r1, r2]);
    let fleet = MockFleet::new();
    store.register_worker("10.0.0.1", 8000).unwrap();
    store.register_worker("10.0.0.2", 8000).unwrap();
    // Nobody takes the oldest job; the second would be accepted.
    fleet.set_push_outcome("10.0.0.1:8000", "050-0000000", PushOutcome::Rejected);
    fleet.set_push_outcome("10.0.0.2:8000", "050-0000000", PushOutcome::Rejected);

    let placed = dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced)
        .dispatch_pass()
        .await
        .unwrap();
    assert_eq!(placed, 0);
    assert_eq!(
        store.job_by_range(hash_id, &r2).unwrap().unwrap().status,
        JobStatus::Scheduled
    );
}

#[tokio::test]
async fn skip_policy_moves_past_an_unplaced_job() {
    let r1 = range("050-0000000", "050-0000049");
    let r2 = range("050-0000050", "050-0000099");
    let (store, hash_id) = store_with_jobs(&[r1, r2]);
    let fleet = MockFleet::new();
    store.register_worker("10.0.0.1", 8000).unwrap();
    store.register_worker("10.0.0.2", 8000).unwrap();
    fleet.set_push_outcome("10.0.0.1:8000", "050-0000000", PushOutcome::Rejected);
    fleet.set_push_outcome("10.0.0.2:8000", "050-0000000", PushOutcome::Rejected);
    fleet.set_push_outcome("10.0.0.2:8000", "050-0000050", PushOutcome::Rejected);

    let placed = dispatcher(&store, &fleet, DispatchPolicy::SkipUnplaced)
        .dispatch_pass()
        .await
        .unwrap();
    assert_eq!(placed, 1);
    assert_eq!(
        store.job_by_range(hash_id, &r1).unwrap().unwrap().status,
        JobStatus::Scheduled
    );
    assert_eq!(
        store.job_by_range(hash_id, &r2).unwrap().unwrap().status,
        JobStatus::InProgress
    );
}

// =============================================================================
// Health monitoring
// =============================================================================

#[tokio::test]
async fn worker_is_demoted_after_threshold_failures_and_its_job_rescheduled() {
    let r1 = range("050-0000000", "050-0000049");
    let (store, hash_id) = store_with_jobs(&[r1]);
    let fleet = MockFleet::new();
    let worker_id = store.register_worker("10.0.0.1", 8000).unwrap();
    dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced)
        .dispatch_pass()
        .await
        .unwrap();

    fleet.set_unreachable("10.0.0.1:8000", true);
    let health = monitor(&store, &fleet, 5);
    for _ in 0..4 {
        health.tick().await.unwrap();
        assert_eq!(
            store.worker(worker_id).unwrap().unwrap().status,
            WorkerStatus::Busy
        );
    }
    health.tick().await.unwrap();

    let worker = store.worker(worker_id).unwrap().unwrap();
    assert_eq!(worker.status, WorkerStatus::Unavailable);
    assert_eq!(worker.failed_checks, 5);
    let job = store.job_by_range(hash_id, &r1).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Scheduled);
    assert_eq!(job.worker_id, None);
}

#[tokio::test]
async fn one_successful_probe_recovers_an_unavailable_worker() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let fleet = MockFleet::new();
    let worker_id = store.register_worker("10.0.0.1", 8000).unwrap();
    fleet.set_unreachable("10.0.0.1:8000", true);

    let health = monitor(&store, &fleet, 2);
    health.tick().await.unwrap();
    health.tick().await.unwrap();
    assert_eq!(
        store.worker(worker_id).unwrap().unwrap().status,
        WorkerStatus::Unavailable
    );

    fleet.set_unreachable("10.0.0.1:8000", false);
    health.tick().await.unwrap();
    let worker = store.worker(worker_id).unwrap().unwrap();
    assert_eq!(worker.status, WorkerStatus::Available);
    assert_eq!(worker.failed_checks, 0);
}

#[tokio::test]
async fn busy_worker_reporting_idle_is_freed_for_dispatch() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let fleet = MockFleet::new();
    let worker_id = store.register_worker("10.0.0.1", 8000).unwrap();
    store
        .set_worker_status(worker_id, WorkerStatus::Busy)
        .unwrap();

    monitor(&store, &fleet, 5).tick().await.unwrap();
    assert_eq!(
        store.worker(worker_id).unwrap().unwrap().status,
        WorkerStatus::Available
    );
}

#[tokio::test]
async fn worker_still_reporting_busy_stays_busy() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let fleet = MockFleet::new();
    let worker_id = store.register_worker("10.0.0.1", 8000).unwrap();
    store
        .set_worker_status(worker_id, WorkerStatus::Busy)
        .unwrap();
    fleet.set_busy_signal("10.0.0.1:8000");

    monitor(&store, &fleet, 5).tick().await.unwrap();
    assert_eq!(
        store.worker(worker_id).unwrap().unwrap().status,
        WorkerStatus::Busy
    );
}

// =============================================================================
// Result aggregation
// =============================================================================

fn found_result(r: SubRange, password: &str) -> CrackResult {
    CrackResult {
        range_start: r.start,
        range_end: r.end,
        results: HashMap::from([(DIGEST.to_string(), CrackOutcome::Found(password.to_string()))]),
    }
}

fn not_found_result(r: SubRange) -> CrackResult {
    CrackResult {
        range_start: r.start,
        range_end: r.end,
        results: HashMap::from([(DIGEST.to_string(), CrackOutcome::not_found())]),
    }
}

#[tokio::test]
async fn verified_crack_completes_the_hash_and_frees_the_worker() {
    let r1 = range("050-1234500", "050-1234599");
    let r2 = range("050-1234600", "050-1234699");
    let (store, hash_id) = store_with_jobs(&[r1, r2]);
    let fleet = MockFleet::new();
    let worker_id = store.register_worker("10.0.0.1", 8000).unwrap();
    dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced)
        .dispatch_pass()
        .await
        .unwrap();

    let aggregator = ResultAggregator::new(Arc::clone(&store));
    let report = aggregator.apply(&found_result(r1, PASSWORD)).unwrap();
    assert_eq!(report.cracked, 1);
    assert_eq!(report.completed, 1);

    let hash = store.hash_by_id(hash_id).unwrap().unwrap();
    assert_eq!(hash.status, HashStatus::Cracked);
    assert_eq!(hash.plaintext.as_deref(), Some(PASSWORD));
    assert!(hash.cracked_at.is_some());

    // The sibling job is deleted outright; nothing left to search.
    assert!(store.job_by_range(hash_id, &r2).unwrap().is_none());
    assert_eq!(
        store.worker(worker_id).unwrap().unwrap().status,
        WorkerStatus::Available
    );
}

#[tokio::test]
async fn replaying_a_crack_result_changes_nothing() {
    let r1 = range("050-1234500", "050-1234599");
    let (store, hash_id) = store_with_jobs(&[r1]);
    let fleet = MockFleet::new();
    store.register_worker("10.0.0.1", 8000).unwrap();
    dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced)
        .dispatch_pass()
        .await
        .unwrap();

    let aggregator = ResultAggregator::new(Arc::clone(&store));
    aggregator.apply(&found_result(r1, PASSWORD)).unwrap();
    let replay = aggregator.apply(&found_result(r1, PASSWORD)).unwrap();
    assert_eq!(replay.cracked, 0);
    assert_eq!(replay.completed, 0);
    assert_eq!(
        store.hash_by_id(hash_id).unwrap().unwrap().status,
        HashStatus::Cracked
    );
}

#[tokio::test]
async fn replayed_not_found_result_leaves_a_worker_busy_with_its_next_job() {
    let r1 = range("050-0000000", "050-0000049");
    let r2 = range("050-0000050", "050-0000099");
    let (store, hash_id) = store_with_jobs(&[r1, r2]);
    let fleet = MockFleet::new();
    let worker_id = store.register_worker("10.0.0.1", 8000).unwrap();
    let d = dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced);
    d.dispatch_pass().await.unwrap();

    let aggregator = ResultAggregator::new(Arc::clone(&store));
    aggregator.apply(&not_found_result(r1)).unwrap();

    // The freed worker picks up the sibling job.
    assert_eq!(d.dispatch_pass().await.unwrap(), 1);
    assert_eq!(
        store.worker(worker_id).unwrap().unwrap().status,
        WorkerStatus::Busy
    );

    // The worker retries its earlier report; the completed job absorbs it
    // without touching the worker's current assignment.
    let replay = aggregator.apply(&not_found_result(r1)).unwrap();
    assert_eq!(replay.completed, 0);
    assert_eq!(
        store.worker(worker_id).unwrap().unwrap().status,
        WorkerStatus::Busy
    );
    assert_eq!(
        store.job_by_range(hash_id, &r2).unwrap().unwrap().status,
        JobStatus::InProgress
    );
}

#[tokio::test]
async fn unverifiable_plaintext_is_discarded() {
    let r1 = range("050-1234500", "050-1234599");
    let (store, hash_id) = store_with_jobs(&[r1]);
    let fleet = MockFleet::new();
    store.register_worker("10.0.0.1", 8000).unwrap();
    dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced)
        .dispatch_pass()
        .await
        .unwrap();

    let aggregator = ResultAggregator::new(Arc::clone(&store));
    let report = aggregator.apply(&found_result(r1, "050-9999999")).unwrap();
    assert_eq!(report.cracked, 0);
    assert_eq!(report.completed, 0);

    // The lie is dropped whole: hash still being searched, job still out.
    let hash = store.hash_by_id(hash_id).unwrap().unwrap();
    assert_eq!(hash.status, HashStatus::InProgress);
    assert_eq!(hash.plaintext, None);
    assert_eq!(
        store.job_by_range(hash_id, &r1).unwrap().unwrap().status,
        JobStatus::InProgress
    );
}

#[tokio::test]
async fn exhausting_every_range_marks_the_hash_uncracked() {
    let r1 = range("050-0000000", "050-0000049");
    let r2 = range("050-0000050", "050-0000099");
    let (store, hash_id) = store_with_jobs(&[r1, r2]);
    let fleet = MockFleet::new();
    store.register_worker("10.0.0.1", 8000).unwrap();
    store.register_worker("10.0.0.2", 8000).unwrap();
    dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced)
        .dispatch_pass()
        .await
        .unwrap();

    let aggregator = ResultAggregator::new(Arc::clone(&store));
    let report = aggregator.apply(&not_found_result(r1)).unwrap();
    assert_eq!(report.exhausted, 0);
    assert_eq!(
        store.hash_by_id(hash_id).unwrap().unwrap().status,
        HashStatus::InProgress
    );

    let report = aggregator.apply(&not_found_result(r2)).unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(report.exhausted, 1);
    assert_eq!(
        store.hash_by_id(hash_id).unwrap().unwrap().status,
        HashStatus::UnCracked
    );
}

#[tokio::test]
async fn results_for_unknown_digests_or_ranges_are_ignored() {
    let r1 = range("050-0000000", "050-0000049");
    let (store, _) = store_with_jobs(&[r1]);
    let aggregator = ResultAggregator::new(Arc::clone(&store));

    let stray = CrackResult {
        range_start: r1.start,
        range_end: r1.end,
        results: HashMap::from([(
            "ffffffffffffffffffffffffffffffff".to_string(),
            CrackOutcome::not_found(),
        )]),
    };
    assert_eq!(aggregator.apply(&stray).unwrap().completed, 0);

    // Known digest, range the master never created.
    let stray = not_found_result(range("051-0000000", "051-0000049"));
    assert_eq!(aggregator.apply(&stray).unwrap().completed, 0);
}

// =============================================================================
// Reconciliation scanning
// =============================================================================

#[tokio::test]
async fn scan_harvests_a_finished_job_whose_report_was_lost() {
    let r1 = range("050-1234500", "050-1234599");
    let (store, hash_id) = store_with_jobs(&[r1]);
    let fleet = MockFleet::new();
    let worker_id = store.register_worker("10.0.0.1", 8000).unwrap();
    dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced)
        .dispatch_pass()
        .await
        .unwrap();

    fleet.set_status(
        "10.0.0.1:8000",
        StatusOutcome::Reported(CrackStatus {
            status: "Completed".to_string(),
            hashes: HashMap::from([(
                DIGEST.to_string(),
                CrackOutcome::Found(PASSWORD.to_string()),
            )]),
        }),
    );

    let summary = scanner(&store, &fleet, 5).scan().await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.rescheduled, 0);
    assert_eq!(
        store.hash_by_id(hash_id).unwrap().unwrap().status,
        HashStatus::Cracked
    );
    assert_eq!(
        store.worker(worker_id).unwrap().unwrap().status,
        WorkerStatus::Available
    );
}

#[tokio::test]
async fn scan_leaves_a_running_job_alone() {
    let r1 = range("050-0000000", "050-0000049");
    let (store, hash_id) = store_with_jobs(&[r1]);
    let fleet = MockFleet::new();
    store.register_worker("10.0.0.1", 8000).unwrap();
    dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced)
        .dispatch_pass()
        .await
        .unwrap();

    fleet.set_status(
        "10.0.0.1:8000",
        StatusOutcome::Reported(CrackStatus {
            status: "InProgress".to_string(),
            hashes: HashMap::new(),
        }),
    );

    let summary = scanner(&store, &fleet, 5).scan().await.unwrap();
    assert_eq!(summary, Default::default());
    assert_eq!(
        store.job_by_range(hash_id, &r1).unwrap().unwrap().status,
        JobStatus::InProgress
    );
}

#[tokio::test]
async fn scan_reschedules_a_job_the_worker_forgot() {
    let r1 = range("050-0000000", "050-0000049");
    let (store, hash_id) = store_with_jobs(&[r1]);
    let fleet = MockFleet::new();
    let worker_id = store.register_worker("10.0.0.1", 8000).unwrap();
    dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced)
        .dispatch_pass()
        .await
        .unwrap();

    fleet.set_status("10.0.0.1:8000", StatusOutcome::NotFound);

    let summary = scanner(&store, &fleet, 5).scan().await.unwrap();
    assert_eq!(summary.rescheduled, 1);
    let job = store.job_by_range(hash_id, &r1).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Scheduled);
    assert_eq!(job.worker_id, None);
    // The worker is alive, just amnesiac: it stays dispatchable.
    assert_eq!(
        store.worker(worker_id).unwrap().unwrap().status,
        WorkerStatus::Available
    );
}

#[tokio::test]
async fn scan_counts_unreachable_workers_toward_demotion() {
    let r1 = range("050-0000000", "050-0000049");
    let (store, hash_id) = store_with_jobs(&[r1]);
    let fleet = MockFleet::new();
    let worker_id = store.register_worker("10.0.0.1", 8000).unwrap();
    dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced)
        .dispatch_pass()
        .await
        .unwrap();

    // Default mock status outcome is a connection failure.
    let summary = scanner(&store, &fleet, 1).scan().await.unwrap();
    assert_eq!(summary.rescheduled, 1);
    assert_eq!(
        store.job_by_range(hash_id, &r1).unwrap().unwrap().status,
        JobStatus::Scheduled
    );
    assert_eq!(
        store.worker(worker_id).unwrap().unwrap().status,
        WorkerStatus::Unavailable
    );
}

#[tokio::test]
async fn rescheduled_job_can_be_dispatched_to_another_worker() {
    let r1 = range("050-0000000", "050-0000049");
    let (store, hash_id) = store_with_jobs(&[r1]);
    let fleet = MockFleet::new();
    let first = store.register_worker("10.0.0.1", 8000).unwrap();
    let d = dispatcher(&store, &fleet, DispatchPolicy::StopOnUnplaced);
    d.dispatch_pass().await.unwrap();

    fleet.set_status("10.0.0.1:8000", StatusOutcome::NotFound);
    scanner(&store, &fleet, 5).scan().await.unwrap();

    let second = store.register_worker("10.0.0.2", 8000).unwrap();
    // First worker is still in the pool; either may take the retry, but the
    // job must land exactly once.
    let placed = d.dispatch_pass().await.unwrap();
    assert_eq!(placed, 1);
    let job = store.job_by_range(hash_id, &r1).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::InProgress);
    assert!(job.worker_id == Some(first) || job.worker_id == Some(second));
}
