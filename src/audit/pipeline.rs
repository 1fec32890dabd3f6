//! Audit run orchestration.
//!
//! Orchestrates:
//! 1. Acquiring one access token for the run
//! 2. Listing commitments of each type
//! 3. Fetching usage per commitment with bounded concurrency
//! 4. Evaluating usage against the policy
//! 5. Writing the report exactly once
//!
//! Inventory and usage failures are recorded and skipped. Only
//! authentication and report-write failures end the run with an error. When
//! the run deadline passes, whatever was collected is still written, and the
//! commitments and types the run never got to are counted in the summary.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::error::{AuditError, FailedStage};
use super::evaluator::Policy;
use super::report::{Report, ReportWriter};
use crate::billing::{AccessToken, BillingError, BillingSource, TokenProvider};
use crate::types::{CommitmentType, Finding};

/// Progress of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Authenticated,
    Evaluating(CommitmentType),
    Aggregated,
    Written,
    Done,
    Failed(FailedStage),
}

/// Knobs for one run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub kinds: Vec<CommitmentType>,
    pub policy: Policy,
    /// Maximum usage fetches in flight at once.
    pub concurrency: usize,
    /// Wall-clock budget for the whole run.
    pub deadline: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            kinds: CommitmentType::ALL.to_vec(),
            policy: Policy::default(),
            concurrency: 8,
            deadline: None,
        }
    }
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub report_path: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub findings: usize,
    pub commitments_evaluated: usize,
    pub skipped_commitments: usize,
    pub failed_types: Vec<CommitmentType>,
    /// Usage records that had no utilization and were counted as fully used.
    pub defaulted_records: usize,
    pub timed_out: bool,
    /// Commitments listed but still unevaluated when the deadline passed.
    pub unevaluated_commitments: usize,
    /// Types the run never listed because the deadline passed first.
    pub unreached_types: Vec<CommitmentType>,
    pub diagnostics: Vec<AuditError>,
}

impl RunSummary {
    /// Everything the report is missing: skipped and unevaluated commitments,
    /// plus commitment types that failed to list or were never reached.
    pub fn partial_failures(&self) -> usize {
        self.skipped_commitments
            + self.unevaluated_commitments
            + self.failed_types.len()
            + self.unreached_types.len()
    }
}

/// Findings and recoverable failures gathered while evaluating.
#[derive(Default)]
struct Collected {
    findings: Vec<Finding>,
    commitments_evaluated: usize,
    skipped_commitments: usize,
    failed_types: Vec<CommitmentType>,
    defaulted_records: usize,
    timed_out: bool,
    unevaluated_commitments: usize,
    unreached_types: Vec<CommitmentType>,
    diagnostics: Vec<AuditError>,
}

/// Audit pipeline over a token provider and a billing source.
pub struct Pipeline<T, B> {
    tokens: T,
    source: B,
    writer: ReportWriter,
    options: PipelineOptions,
    state: RunState,
}

impl<T: TokenProvider, B: BillingSource> Pipeline<T, B> {
    pub fn new(tokens: T, source: B, writer: ReportWriter, options: PipelineOptions) -> Self {
        Self {
            tokens,
            source,
            writer,
            options,
            state: RunState::Init,
        }
    }

    /// Where the last run got to; `Failed` names the stage that ended it.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute one audit run as of `now`.
    pub async fn run(&mut self, now: DateTime<Utc>) -> Result<RunSummary, AuditError> {
        let deadline = self.options.deadline.map(|budget| Instant::now() + budget);
        self.advance(RunState::Init);

        let mut token = self
            .authenticate(deadline)
            .await
            .map_err(|e| self.fail(e))?;
        self.advance(RunState::Authenticated);

        let kinds = self.options.kinds.clone();
        let mut collected = Collected::default();
        for (index, &kind) in kinds.iter().enumerate() {
            if token.is_expired() {
                info!("access token expired, acquiring a new one");
                token = self
                    .authenticate(deadline)
                    .await
                    .map_err(|e| self.fail(e))?;
            }

            self.advance(RunState::Evaluating(kind));
            self.evaluate_kind(kind, &token, deadline, &mut collected)
                .await;

            if collected.timed_out {
                collected.unreached_types.extend(&kinds[index + 1..]);
                warn!(
                    kind = %kind,
                    unreached_types = collected.unreached_types.len(),
                    "run deadline reached, writing collected findings"
                );
                break;
            }
        }
        self.advance(RunState::Aggregated);

        let report = Report::new(collected.findings, now);
        let written = self.writer.write(&report).await;
        let report_path = match written {
            Ok(path) => path,
            Err(source) => {
                let path = self.writer.path_for(now.date_naive());
                return Err(self.fail(AuditError::ReportWrite { path, source }));
            }
        };
        self.advance(RunState::Written);

        let summary = RunSummary {
            report_path,
            generated_at: now,
            findings: report.findings.len(),
            commitments_evaluated: collected.commitments_evaluated,
            skipped_commitments: collected.skipped_commitments,
            failed_types: collected.failed_types,
            defaulted_records: collected.defaulted_records,
            timed_out: collected.timed_out,
            unevaluated_commitments: collected.unevaluated_commitments,
            unreached_types: collected.unreached_types,
            diagnostics: collected.diagnostics,
        };

        if summary.partial_failures() > 0 || summary.timed_out {
            warn!(
                skipped_commitments = summary.skipped_commitments,
                unevaluated_commitments = summary.unevaluated_commitments,
                failed_types = summary.failed_types.len(),
                unreached_types = summary.unreached_types.len(),
                timed_out = summary.timed_out,
                "run completed with partial failures"
            );
        }
        self.advance(RunState::Done);
        info!(
            findings = summary.findings,
            evaluated = summary.commitments_evaluated,
            report = %summary.report_path.display(),
            "audit complete"
        );

        Ok(summary)
    }

    fn advance(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "run state");
        self.state = next;
    }

    /// Move to the failed state for a fatal `error` and hand it back.
    fn fail(&mut self, error: AuditError) -> AuditError {
        if let Some(stage) = error.failed_stage() {
            self.advance(RunState::Failed(stage));
        }
        error
    }

    async fn authenticate(&self, deadline: Option<Instant>) -> Result<AccessToken, AuditError> {
        match within(deadline, self.tokens.acquire_token()).await {
            Some(Ok(token)) => Ok(token),
            Some(Err(e)) => Err(AuditError::Authentication(e)),
            None => Err(AuditError::Authentication(BillingError::Timeout(
                "run deadline reached during authentication".to_string(),
            ))),
        }
    }

    /// List, fetch and evaluate one commitment type into `collected`.
    async fn evaluate_kind(
        &self,
        kind: CommitmentType,
        token: &AccessToken,
        deadline: Option<Instant>,
        collected: &mut Collected,
    ) {
        let commitments = match within(deadline, self.source.list_commitments(kind, token)).await {
            Some(Ok(commitments)) => commitments,
            Some(Err(source)) => {
                warn!(kind = %kind, error = %source, "inventory fetch failed, skipping type");
                collected.failed_types.push(kind);
                collected
                    .diagnostics
                    .push(AuditError::InventoryFetch { kind, source });
                return;
            }
            None => {
                collected.timed_out = true;
                collected.unreached_types.push(kind);
                return;
            }
        };
        let listed = commitments.len();
        info!(kind = %kind, commitments = listed, "listed commitments");

        let source = &self.source;
        let mut results = stream::iter(commitments.into_iter().map(|commitment| async move {
            let usage = source.fetch_usage(&commitment, token).await;
            (commitment, usage)
        }))
        .buffer_unordered(self.options.concurrency.max(1));

        let mut finished = 0;
        loop {
            let Some(next) = within(deadline, results.next()).await else {
                let unevaluated = listed - finished;
                warn!(kind = %kind, unevaluated, "run deadline reached before all usage arrived");
                collected.timed_out = true;
                collected.unevaluated_commitments += unevaluated;
                return;
            };
            let Some((commitment, usage)) = next else {
                break;
            };
            finished += 1;

            match usage {
                Ok(records) => {
                    let defaulted = records.iter().filter(|r| r.utilization.is_none()).count();
                    if defaulted > 0 {
                        debug!(
                            commitment = %commitment.name,
                            records = defaulted,
                            "usage without utilization, assuming fully used"
                        );
                    }
                    collected.defaulted_records += defaulted;
                    collected.commitments_evaluated += 1;
                    collected
                        .findings
                        .extend(self.options.policy.evaluate_all(&commitment, &records));
                }
                Err(source) => {
                    warn!(
                        commitment = %commitment.name,
                        id = %commitment.id,
                        error = %source,
                        "usage fetch failed, skipping commitment"
                    );
                    collected.skipped_commitments += 1;
                    collected.diagnostics.push(AuditError::UsageFetch {
                        commitment: commitment.name,
                        source,
                    });
                }
            }
        }
    }
}

/// Await `fut`, or `None` once `deadline` passes.
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(at) => tokio::time::timeout_at(at, fut).await.ok(),
        None => Some(fut.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::report::read_report;
    use crate::types::{Commitment, UsageRecord};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct StaticToken;

    impl TokenProvider for StaticToken {
        async fn acquire_token(&self) -> Result<AccessToken, BillingError> {
            Ok(AccessToken::new(
                "token".into(),
                Utc::now() + chrono::Duration::hours(1),
            ))
        }
    }

    struct RejectingToken;

    impl TokenProvider for RejectingToken {
        async fn acquire_token(&self) -> Result<AccessToken, BillingError> {
            Err(BillingError::Status {
                status: 401,
                url: "https://login.example/token".into(),
                body: "invalid_client".into(),
            })
        }
    }

    /// Hands out tokens that are already past their expiry.
    #[derive(Default)]
    struct ExpiredToken {
        calls: AtomicUsize,
        fail_after: Option<usize>,
    }

    impl TokenProvider for ExpiredToken {
        async fn acquire_token(&self) -> Result<AccessToken, BillingError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_after.is_some_and(|limit| call > limit) {
                return Err(BillingError::Status {
                    status: 400,
                    url: "https://login.example/token".into(),
                    body: "invalid_grant".into(),
                });
            }
            Ok(AccessToken::new(
                format!("token-{call}"),
                Utc::now() - chrono::Duration::minutes(5),
            ))
        }
    }

    struct StalledToken;

    impl TokenProvider for StalledToken {
        async fn acquire_token(&self) -> Result<AccessToken, BillingError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(AccessToken::new(
                "late".into(),
                Utc::now() + chrono::Duration::hours(1),
            ))
        }
    }

    #[derive(Default)]
    struct FakeSource {
        inventory: HashMap<CommitmentType, Vec<Commitment>>,
        failing_types: HashSet<CommitmentType>,
        usage: HashMap<String, Vec<UsageRecord>>,
        failing_usage: HashSet<String>,
        slow_usage: HashSet<String>,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeSource {
        fn with(mut self, commitment: Commitment, usage: Vec<Option<f64>>) -> Self {
            self.usage.insert(
                commitment.name.clone(),
                usage
                    .into_iter()
                    .map(|utilization| UsageRecord {
                        utilization,
                        scope: commitment.scope.clone(),
                    })
                    .collect(),
            );
            self.inventory
                .entry(commitment.kind)
                .or_default()
                .push(commitment);
            self
        }
    }

    impl BillingSource for FakeSource {
        async fn list_commitments(
            &self,
            kind: CommitmentType,
            _token: &AccessToken,
        ) -> Result<Vec<Commitment>, BillingError> {
            if self.failing_types.contains(&kind) {
                return Err(BillingError::Status {
                    status: 500,
                    url: "https://billing.example/orders".into(),
                    body: String::new(),
                });
            }
            Ok(self.inventory.get(&kind).cloned().unwrap_or_default())
        }

        async fn fetch_usage(
            &self,
            commitment: &Commitment,
            _token: &AccessToken,
        ) -> Result<Vec<UsageRecord>, BillingError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if self.slow_usage.contains(&commitment.name) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            } else if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing_usage.contains(&commitment.name) {
                return Err(BillingError::Timeout(commitment.id.clone()));
            }
            Ok(self.usage.get(&commitment.name).cloned().unwrap_or_default())
        }
    }

    fn commitment(kind: CommitmentType, name: &str, scope: &str) -> Commitment {
        Commitment {
            id: format!("/orders/{}", name),
            name: name.to_string(),
            kind,
            scope: scope.to_string(),
            order_id: format!("/orders/{}", name),
        }
    }

    fn run_at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-30T06:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn pipeline<T: TokenProvider>(
        tokens: T,
        source: FakeSource,
        output: PathBuf,
        options: PipelineOptions,
    ) -> Pipeline<T, FakeSource> {
        Pipeline::new(tokens, source, ReportWriter::new(output), options)
    }

    #[tokio::test]
    async fn test_run_reports_underutilized_commitments() {
        let dir = tempdir().unwrap();
        let source = FakeSource::default()
            .with(
                commitment(CommitmentType::ReservedInstance, "RI-001", "sub-A"),
                vec![Some(45.0)],
            )
            .with(
                commitment(CommitmentType::SavingsPlan, "SP-002", "Shared"),
                vec![Some(85.0)],
            )
            .with(
                commitment(CommitmentType::SavingsPlan, "SP-003", "Shared"),
                vec![None],
            );

        let mut pipeline = pipeline(StaticToken, source, dir.path().to_path_buf(), PipelineOptions::default());
        let summary = pipeline.run(run_at()).await.unwrap();

        assert_eq!(pipeline.state(), RunState::Done);
        assert_eq!(summary.generated_at, run_at());
        assert_eq!(summary.findings, 1);
        assert_eq!(summary.commitments_evaluated, 3);
        assert_eq!(summary.defaulted_records, 1);
        assert_eq!(summary.partial_failures(), 0);
        assert_eq!(summary.report_path, dir.path().join("ri_sp_report_20240630.csv"));

        let findings = read_report(&summary.report_path).unwrap();
        assert_eq!(
            findings,
            vec![Finding {
                kind: CommitmentType::ReservedInstance,
                name: "RI-001".into(),
                utilization: 45.0,
                scope: "sub-A".into(),
                recommendation: "Consider SKU change, reassignment, or exchange".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_empty_inventory_writes_header_only() {
        let dir = tempdir().unwrap();

        let summary = pipeline(
            StaticToken,
            FakeSource::default(),
            dir.path().to_path_buf(),
            PipelineOptions::default(),
        )
        .run(run_at())
        .await
        .unwrap();

        assert_eq!(summary.findings, 0);
        let content = std::fs::read_to_string(&summary.report_path).unwrap();
        assert_eq!(content, "type,name,utilization,scope,recommendation\n");
    }

    #[tokio::test]
    async fn test_usage_failure_skips_one_commitment() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::default()
            .with(
                commitment(CommitmentType::ReservedInstance, "RI-001", "sub-A"),
                vec![Some(10.0)],
            )
            .with(
                commitment(CommitmentType::ReservedInstance, "RI-002", "sub-A"),
                vec![Some(20.0)],
            )
            .with(
                commitment(CommitmentType::ReservedInstance, "RI-003", "sub-A"),
                vec![Some(30.0)],
            );
        source.failing_usage.insert("RI-002".into());

        let summary = pipeline(StaticToken, source, dir.path().to_path_buf(), PipelineOptions::default())
            .run(run_at())
            .await
            .unwrap();

        assert_eq!(summary.skipped_commitments, 1);
        assert_eq!(summary.partial_failures(), 1);
        assert_eq!(summary.findings, 2);
        assert!(matches!(
            summary.diagnostics.as_slice(),
            [AuditError::UsageFetch { commitment, .. }] if commitment == "RI-002"
        ));

        let names: Vec<String> = read_report(&summary.report_path)
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["RI-001", "RI-003"]);
    }

    #[tokio::test]
    async fn test_inventory_failure_keeps_other_types() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::default()
            .with(
                commitment(CommitmentType::ReservedInstance, "RI-001", "sub-A"),
                vec![Some(45.0)],
            )
            .with(
                commitment(CommitmentType::SavingsPlan, "SP-001", "Shared"),
                vec![Some(5.0)],
            );
        source.failing_types.insert(CommitmentType::SavingsPlan);

        let summary = pipeline(StaticToken, source, dir.path().to_path_buf(), PipelineOptions::default())
            .run(run_at())
            .await
            .unwrap();

        assert_eq!(summary.failed_types, vec![CommitmentType::SavingsPlan]);
        assert_eq!(summary.findings, 1);
        assert_eq!(summary.diagnostics[0].failed_stage(), None);
    }

    #[tokio::test]
    async fn test_authentication_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let source = FakeSource::default().with(
            commitment(CommitmentType::ReservedInstance, "RI-001", "sub-A"),
            vec![Some(45.0)],
        );

        let mut pipeline = pipeline(RejectingToken, source, dir.path().to_path_buf(), PipelineOptions::default());
        let err = pipeline.run(run_at()).await.unwrap_err();

        assert!(matches!(err, AuditError::Authentication(_)));
        assert_eq!(pipeline.state(), RunState::Failed(FailedStage::Authentication));
        assert!(!dir.path().join("ri_sp_report_20240630.csv").exists());
    }

    #[tokio::test]
    async fn test_expired_token_is_acquired_again_per_type() {
        let dir = tempdir().unwrap();
        let source = FakeSource::default()
            .with(
                commitment(CommitmentType::ReservedInstance, "RI-001", "sub-A"),
                vec![Some(45.0)],
            )
            .with(
                commitment(CommitmentType::SavingsPlan, "SP-001", "Shared"),
                vec![Some(5.0)],
            );

        let mut pipeline = pipeline(
            ExpiredToken::default(),
            source,
            dir.path().to_path_buf(),
            PipelineOptions::default(),
        );
        let summary = pipeline.run(run_at()).await.unwrap();

        // once up front, then once before each of the two types
        assert_eq!(pipeline.tokens.calls.load(Ordering::SeqCst), 3);
        assert_eq!(summary.findings, 2);
        assert_eq!(pipeline.state(), RunState::Done);
    }

    #[tokio::test]
    async fn test_failed_token_refresh_is_fatal() {
        let dir = tempdir().unwrap();
        let source = FakeSource::default().with(
            commitment(CommitmentType::ReservedInstance, "RI-001", "sub-A"),
            vec![Some(45.0)],
        );
        let tokens = ExpiredToken {
            fail_after: Some(1),
            ..Default::default()
        };

        let mut pipeline = pipeline(tokens, source, dir.path().to_path_buf(), PipelineOptions::default());
        let err = pipeline.run(run_at()).await.unwrap_err();

        assert!(matches!(err, AuditError::Authentication(_)));
        assert_eq!(pipeline.tokens.calls.load(Ordering::SeqCst), 2);
        assert_eq!(pipeline.state(), RunState::Failed(FailedStage::Authentication));
        assert!(!dir.path().join("ri_sp_report_20240630.csv").exists());
    }

    #[tokio::test]
    async fn test_deadline_during_authentication_is_fatal() {
        let dir = tempdir().unwrap();
        let source = FakeSource::default().with(
            commitment(CommitmentType::ReservedInstance, "RI-001", "sub-A"),
            vec![Some(45.0)],
        );
        let options = PipelineOptions {
            deadline: Some(Duration::from_millis(100)),
            ..Default::default()
        };

        let mut pipeline = pipeline(StalledToken, source, dir.path().to_path_buf(), options);
        let err = pipeline.run(run_at()).await.unwrap_err();

        assert!(matches!(
            err,
            AuditError::Authentication(BillingError::Timeout(_))
        ));
        assert_eq!(pipeline.state(), RunState::Failed(FailedStage::Authentication));
        assert!(!dir.path().join("ri_sp_report_20240630.csv").exists());
    }

    #[tokio::test]
    async fn test_unwritable_output_is_fatal() {
        let dir = tempdir().unwrap();
        let blocked = dir.path().join("not-a-dir");
        std::fs::write(&blocked, "file").unwrap();

        let mut pipeline = pipeline(StaticToken, FakeSource::default(), blocked, PipelineOptions::default());
        let err = pipeline.run(run_at()).await.unwrap_err();

        assert!(matches!(err, AuditError::ReportWrite { .. }));
        assert_eq!(err.failed_stage(), Some(FailedStage::ReportWrite));
        assert_eq!(pipeline.state(), RunState::Failed(FailedStage::ReportWrite));
    }

    #[tokio::test]
    async fn test_deadline_writes_collected_findings() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::default()
            .with(
                commitment(CommitmentType::ReservedInstance, "RI-fast", "sub-A"),
                vec![Some(15.0)],
            )
            .with(
                commitment(CommitmentType::ReservedInstance, "RI-slow", "sub-A"),
                vec![Some(15.0)],
            )
            .with(
                commitment(CommitmentType::SavingsPlan, "SP-never", "Shared"),
                vec![Some(15.0)],
            );
        source.slow_usage.insert("RI-slow".into());

        let options = PipelineOptions {
            deadline: Some(Duration::from_millis(200)),
            ..Default::default()
        };
        let summary = pipeline(StaticToken, source, dir.path().to_path_buf(), options)
            .run(run_at())
            .await
            .unwrap();

        assert!(summary.timed_out);
        assert_eq!(summary.commitments_evaluated, 1);
        assert_eq!(summary.unevaluated_commitments, 1);
        assert_eq!(summary.unreached_types, vec![CommitmentType::SavingsPlan]);
        assert_eq!(summary.partial_failures(), 2);
        let names: Vec<String> = read_report(&summary.report_path)
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["RI-fast"]);
    }

    #[tokio::test]
    async fn test_usage_fetches_respect_concurrency_limit() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource::default();
        for i in 0..8 {
            source = source.with(
                commitment(CommitmentType::SavingsPlan, &format!("SP-{i:03}"), "Shared"),
                vec![Some(50.0)],
            );
        }
        source.delay = Duration::from_millis(20);

        let options = PipelineOptions {
            kinds: vec![CommitmentType::SavingsPlan],
            concurrency: 2,
            ..Default::default()
        };
        let mut pipeline = pipeline(StaticToken, source, dir.path().to_path_buf(), options);
        let summary = pipeline.run(run_at()).await.unwrap();

        assert_eq!(summary.findings, 8);
        assert!(pipeline.source.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_repeated_runs_produce_identical_reports() {
        let dir = tempdir().unwrap();
        let build = || {
            FakeSource::default()
                .with(
                    commitment(CommitmentType::SavingsPlan, "SP-b", "Shared"),
                    vec![Some(1.0), Some(2.0)],
                )
                .with(
                    commitment(CommitmentType::ReservedInstance, "RI-a", "sub-A"),
                    vec![Some(3.0)],
                )
        };

        let first = pipeline(StaticToken, build(), dir.path().join("a"), PipelineOptions::default())
            .run(run_at())
            .await
            .unwrap();
        let second = pipeline(StaticToken, build(), dir.path().join("b"), PipelineOptions::default())
            .run(run_at())
            .await
            .unwrap();

        assert_eq!(
            std::fs::read(&first.report_path).unwrap(),
            std::fs::read(&second.report_path).unwrap()
        );
    }
}
