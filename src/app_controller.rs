use anyhow::{Context, Result, anyhow};
use futures::future::{AbortHandle, AbortRegistration};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, error, info, warn};
use std::sync::Arc;

use crate::app_config::Config;
use crate::discovery::{Discovery, IgnoreRules};
use crate::history::{HistoryLedger, LedgerMode};
use crate::language_utils::LanguageCode;
use crate::translation::{
    Orchestrator, OrchestratorOptions, ProgressHook, RunReport, StateTracker, TrackerOptions, TranslationPlan,
    TranslationService, UnitEvent,
};

// @module: Application controller for markdown translation

/// Main application controller for content tree translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Draw a progress bar on stderr
    show_progress: bool,
    // @field: Walk subdirectories of the content root
    recursive: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self {
            config,
            show_progress: true,
            recursive: true,
        })
    }

    /// Enable or disable the progress bar
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Only translate the files directly inside the content root
    pub fn with_recursion(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Discovery over the configured content root and ignore rules
    pub fn discovery(&self) -> Result<Discovery> {
        let rules = IgnoreRules::new(&self.config.ignore_rules)?;
        Ok(Discovery::new(self.config.content_path(), rules).with_recursion(self.recursive))
    }

    /// State tracker for the configured languages and path rule
    pub fn tracker(&self) -> StateTracker {
        StateTracker::new(
            self.config.content_path(),
            LanguageCode::new(&self.config.source_language),
            self.config.target_languages.iter().map(LanguageCode::new).collect(),
            self.config.target_rule(),
            TrackerOptions {
                use_translated_marker: self.config.use_translated_marker,
                retranslate: self.config.retranslate,
            },
        )
    }

    /// Load the history ledger; without a configured path it lives in memory
    pub fn load_ledger(&self) -> Result<HistoryLedger> {
        let mode = if self.config.retranslate {
            LedgerMode::Overwrite
        } else {
            LedgerMode::Append
        };

        match self.config.history_file() {
            Some(path) => {
                debug!("Using history ledger {:?}", path);
                Ok(HistoryLedger::load(path, mode)?)
            }
            None => Ok(HistoryLedger::in_memory(mode)),
        }
    }

    /// Plan the run without calling any provider
    pub fn plan(&self, ledger: &HistoryLedger) -> Result<TranslationPlan> {
        let discovery = self.discovery()?;
        let plan = self.tracker().plan(&discovery, ledger)?;
        Ok(plan)
    }

    /// List the planned jobs and return the plan
    pub fn dry_run(&self) -> Result<TranslationPlan> {
        let ledger = self.load_ledger()?;
        let plan = self.plan(&ledger)?;

        for job in &plan.jobs {
            for target in &job.targets {
                info!("{} [{}] -> {}", job.document.relative_path, target.language, target.output_path.display());
            }
        }
        for skipped in &plan.skipped {
            warn!("{}", skipped);
        }
        info!(
            "Dry run: {} document(s), {} unit(s), {} up to date",
            plan.jobs.len(),
            plan.unit_count(),
            plan.up_to_date.len()
        );
        Ok(plan)
    }

    /// Run the configured provider over the content tree. Ctrl-C aborts
    /// the run.
    pub async fn run(&self) -> Result<RunReport> {
        let service = TranslationService::new(&self.config.translation, &self.config.source_language)?;

        let (handle, registration) = AbortHandle::new_pair();
        let signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, aborting translation run");
                handle.abort();
            }
        });

        let result = self.run_with_service(service, registration).await;
        signal.abort();
        result
    }

    /// Run with the given service until done or until `registration` is aborted
    pub async fn run_with_service(&self, service: TranslationService, registration: AbortRegistration) -> Result<RunReport> {
        let start_time = std::time::Instant::now();

        let mut ledger = self.load_ledger()?;
        let TranslationPlan {
            jobs,
            up_to_date,
            mut skipped,
            ..
        } = self.plan(&ledger)?;

        for document in &skipped {
            warn!("Skipping document: {}", document);
        }
        if self.config.fail_fast && !skipped.is_empty() {
            return Err(skipped.remove(0).into());
        }

        info!("{} document(s) already up to date", up_to_date.len());

        // The orchestrator still runs without jobs so a re-translate run
        // rewrites the ledger
        if jobs.is_empty() {
            info!("Nothing to translate");
        } else {
            service
                .test_connection()
                .await
                .map_err(|e| anyhow!("Provider connection test failed: {}", e))?;
        }

        let total: usize = jobs.iter().map(|job| job.targets.len()).sum();
        let progress_bar = self.create_progress_bar(total as u64);

        let options = OrchestratorOptions {
            max_concurrent_units: self.config.translation.optimal_concurrent_requests(),
            fail_fast: self.config.fail_fast,
        };
        let orchestrator = Orchestrator::new(service, options).with_progress_hook(progress_hook(progress_bar.clone()));

        let outcome = orchestrator.run_abortable(jobs, &mut ledger, registration).await;
        progress_bar.finish_and_clear();

        let mut report = outcome?;
        report.failures.extend(skipped);

        let duration = start_time.elapsed();
        if report.is_success() {
            info!("Translation completed in {:.1}s: {}", duration.as_secs_f64(), report);
        } else {
            for failure in &report.failures {
                error!("{}", failure);
            }
            warn!("Translation finished with failures in {:.1}s: {}", duration.as_secs_f64(), report);
        }
        Ok(report)
    }

    fn create_progress_bar(&self, total: u64) -> ProgressBar {
        let progress_bar = ProgressBar::new(total);
        if !self.show_progress {
            progress_bar.set_draw_target(ProgressDrawTarget::hidden());
            return progress_bar;
        }

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        progress_bar.set_style(style);
        progress_bar
    }
}

/// Advance the bar once per finished (document, language) unit
fn progress_hook(progress_bar: ProgressBar) -> ProgressHook {
    Arc::new(move |event: &UnitEvent| {
        let status = if event.succeeded { "ok" } else { "failed" };
        progress_bar.set_message(format!("{} [{}] {}", event.document, event.language, status));
        progress_bar.set_position(event.completed as u64);
    })
}
