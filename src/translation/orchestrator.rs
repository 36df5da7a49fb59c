/*!
 * Concurrent translation orchestrator.
 *
 * Documents are processed one after another. The pending languages of a
 * document are translated concurrently, bounded by `max_concurrent_units`,
 * and fan in through the stream. The first failed language drops the
 * stream, which cancels the remaining in-flight calls of that document.
 *
 * Results are written only after every language of the document
 * succeeded. The ledger is persisted after each document and closed once
 * the last job is done.
 */

use futures::future::{AbortRegistration, Abortable};
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::{PipelineError, Stage};
use crate::frontmatter::{FrontmatterRewriter, FrontmatterUpdates};
use crate::history::HistoryLedger;
use crate::language_utils::LanguageCode;
use crate::translation::core::{TranslationResult, TranslationService};
use crate::translation::state::{TRANSLATED_MARKER, TargetSpec, TranslationJob};

/// Lifecycle of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Dispatching,
    Collecting,
    Writing,
    Done,
    Failed,
}

impl JobState {
    /// Whether `next` may follow this state
    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Created, Dispatching)
                | (Dispatching, Collecting)
                | (Collecting, Writing)
                | (Writing, Done)
                | (Created | Dispatching | Collecting | Writing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

/// Tracks the state of the job in flight
struct JobTracker<'a> {
    document: &'a str,
    state: JobState,
}

impl<'a> JobTracker<'a> {
    fn new(document: &'a str) -> Self {
        Self {
            document,
            state: JobState::Created,
        }
    }

    fn advance(&mut self, next: JobState) {
        if self.state.can_transition_to(next) {
            debug!("{}: {:?} -> {:?}", self.document, self.state, next);
            self.state = next;
        } else {
            warn!("{}: ignoring transition {:?} -> {:?}", self.document, self.state, next);
        }
    }
}

/// Completion of one (document, language) unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitEvent {
    pub document: String,
    pub language: LanguageCode,
    pub succeeded: bool,
    /// Units finished so far in this run
    pub completed: usize,
    /// Units planned for this run
    pub total: usize,
}

/// Per-unit completion hook
pub type ProgressHook = Arc<dyn Fn(&UnitEvent) + Send + Sync>;

/// Orchestrator settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Languages of one document translated at the same time
    pub max_concurrent_units: usize,
    /// Abort the whole run at the first failed document
    pub fail_fast: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_concurrent_units: 4,
            fail_fast: false,
        }
    }
}

/// Outcome of a run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Output paths written, in write order
    pub written: Vec<PathBuf>,
    /// Documents whose languages were all written
    pub completed_documents: usize,
    /// Documents that failed, one entry each
    pub failures: Vec<PipelineError>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} document(s) translated, {} file(s) written, {} failure(s)",
            self.completed_documents,
            self.written.len(),
            self.failures.len()
        )
    }
}

/// Drives translation jobs to completion
pub struct Orchestrator {
    service: TranslationService,
    options: OrchestratorOptions,
    hook: Option<ProgressHook>,
}

impl Orchestrator {
    pub fn new(service: TranslationService, options: OrchestratorOptions) -> Self {
        Self {
            service,
            options,
            hook: None,
        }
    }

    /// Install a per-unit completion hook
    pub fn with_progress_hook(mut self, hook: ProgressHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn options(&self) -> OrchestratorOptions {
        self.options
    }

    /// Run until done, or until the abort handle paired with
    /// `registration` fires.
    pub async fn run_abortable(
        &self,
        jobs: Vec<TranslationJob>,
        ledger: &mut HistoryLedger,
        registration: AbortRegistration,
    ) -> Result<RunReport, PipelineError> {
        Abortable::new(self.run(jobs, ledger), registration)
            .await
            .map_err(|_| PipelineError::Aborted)?
    }

    /// Process every job.
    ///
    /// Returns an error when the run cannot start (destination collision),
    /// when the ledger cannot be persisted, or on the first failed
    /// document in fail-fast mode. Otherwise document failures are
    /// collected in the report.
    pub async fn run(&self, jobs: Vec<TranslationJob>, ledger: &mut HistoryLedger) -> Result<RunReport, PipelineError> {
        check_collisions(&jobs)?;

        let total: usize = jobs.iter().map(|job| job.targets.len()).sum();
        let completed = AtomicUsize::new(0);
        let mut report = RunReport::default();

        info!("Translating {} document(s), {} unit(s)", jobs.len(), total);

        for job in &jobs {
            match self.process_job(job, ledger, &completed, total).await {
                Ok(written) => {
                    report.completed_documents += 1;
                    report.written.extend(written);
                }
                Err(err @ PipelineError::Ledger { .. }) => return Err(err),
                Err(err) => {
                    error!("{}", err);
                    if self.options.fail_fast {
                        return Err(err);
                    }
                    report.failures.push(err);
                }
            }
        }

        ledger.finish()?;
        info!("{}", report);
        Ok(report)
    }

    async fn process_job(
        &self,
        job: &TranslationJob,
        ledger: &mut HistoryLedger,
        completed: &AtomicUsize,
        total: usize,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let document = job.document.relative_path.as_str();
        let mut tracker = JobTracker::new(document);

        tracker.advance(JobState::Dispatching);
        let results = match self.dispatch(job, completed, total).await {
            Ok(results) => results,
            Err(err) => {
                tracker.advance(JobState::Failed);
                return Err(err);
            }
        };

        tracker.advance(JobState::Collecting);
        let ordered = collect_in_target_order(&job.targets, results);

        tracker.advance(JobState::Writing);
        let updates = FrontmatterUpdates::new().set(TRANSLATED_MARKER, true);
        let mut written = Vec::with_capacity(ordered.len());
        let mut write_error = None;

        for (target, result) in ordered {
            match FrontmatterRewriter::write(&target.output_path, &result.text, &updates) {
                Ok(()) => {
                    debug!("Wrote {:?}", target.output_path);
                    written.push(target);
                }
                Err(err) => {
                    write_error = Some(PipelineError::job(
                        document,
                        Some(target.language.as_str()),
                        Stage::Write,
                        err,
                    ));
                    break;
                }
            }
        }

        // Files already on disk are recorded even when a later write failed
        let keys: Vec<PathBuf> = written.iter().map(|t| t.ledger_key.clone()).collect();
        ledger.commit(&keys)?;

        if let Some(err) = write_error {
            tracker.advance(JobState::Failed);
            return Err(err);
        }

        tracker.advance(JobState::Done);
        info!("Translated {} into {} language(s)", document, written.len());
        Ok(written.into_iter().map(|t| t.output_path.clone()).collect())
    }

    async fn dispatch(
        &self,
        job: &TranslationJob,
        completed: &AtomicUsize,
        total: usize,
    ) -> Result<Vec<(usize, TranslationResult)>, PipelineError> {
        let document = job.document.relative_path.as_str();
        let content = job.document.content.as_str();

        stream::iter(job.targets.iter().enumerate())
            .map(|(index, target)| async move {
                let outcome = self.service.translate(content, &target.language).await;
                self.report_unit(document, &target.language, outcome.is_ok(), completed, total);
                outcome
                    .map(|result| (index, result))
                    .map_err(|err| PipelineError::job(document, Some(target.language.as_str()), Stage::Dispatch, err))
            })
            .buffer_unordered(self.options.max_concurrent_units.max(1))
            .try_collect()
            .await
    }

    fn report_unit(&self, document: &str, language: &LanguageCode, succeeded: bool, completed: &AtomicUsize, total: usize) {
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(hook) = &self.hook {
            hook(&UnitEvent {
                document: document.to_string(),
                language: language.clone(),
                succeeded,
                completed: done,
                total,
            });
        }
    }
}

/// Pair each result with its target, in configured language order
fn collect_in_target_order(
    targets: &[TargetSpec],
    mut results: Vec<(usize, TranslationResult)>,
) -> Vec<(&TargetSpec, TranslationResult)> {
    results.sort_by_key(|(index, _)| *index);
    results
        .into_iter()
        .filter_map(|(index, result)| targets.get(index).map(|target| (target, result)))
        .collect()
}

/// Reject runs where two units would write the same file
pub fn check_collisions(jobs: &[TranslationJob]) -> Result<(), PipelineError> {
    let mut seen: HashMap<&PathBuf, &str> = HashMap::new();
    for job in jobs {
        for target in &job.targets {
            if let Some(first) = seen.insert(&target.ledger_key, &job.document.relative_path) {
                return Err(PipelineError::DestinationCollision {
                    path: target.ledger_key.clone(),
                    first: first.to_string(),
                    second: job.document.relative_path.clone(),
                });
            }
        }
    }
    Ok(())
}
