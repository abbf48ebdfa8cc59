use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::context::RunContext;
use crate::identity::RunIdentity;
use crate::issue::{is_assigned_open, Issue, Targets};
use crate::logger::{sanitize_value, Logger};
use crate::reconcile::{reconcile, IssueNote};
use crate::task::{execute, CommandRunner, Task};
use crate::tracker::{Tracker, TrackerError};

const OPEN_RESOLUTION_PATTERN: &str = "(?i)open";

#[derive(Debug, Error)]
pub(crate) enum CycleError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error("interrupted")]
    Interrupted,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct CycleReport {
    pub(crate) candidates: usize,
    pub(crate) executed: usize,
    pub(crate) submitted: usize,
    pub(crate) failed: usize,
}

pub(crate) struct SyncRunner<'a> {
    tracker: &'a dyn Tracker,
    runner: &'a dyn CommandRunner,
    identity: &'a RunIdentity,
    ctx: &'a RunContext,
    logger: &'a Logger,
    interrupt_flag: Arc<AtomicBool>,
    open_pattern: Regex,
}

impl<'a> SyncRunner<'a> {
    pub(crate) fn new(
        tracker: &'a dyn Tracker,
        runner: &'a dyn CommandRunner,
        identity: &'a RunIdentity,
        ctx: &'a RunContext,
        logger: &'a Logger,
        interrupt_flag: Arc<AtomicBool>,
    ) -> Self {
        Self {
            tracker,
            runner,
            identity,
            ctx,
            logger,
            interrupt_flag,
            open_pattern: Regex::new(OPEN_RESOLUTION_PATTERN).expect("valid pattern"),
        }
    }

    pub(crate) fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        // Lookup failures are fatal: no substitute value is ever guessed.
        let resolved = self.tracker.resolved_status()?;
        let fixed = self.tracker.fixed_resolution()?;
        let targets = Targets { resolved, fixed };

        let project_id = self.tracker.find_project_id(&self.ctx.project)?;
        if self.ctx.debug {
            println!("Found \"{}\"! (ID = {})", self.ctx.project, project_id);
        }
        self.logger
            .transition(&format!("project name={} id={}", self.ctx.project, project_id));

        let issues = self.tracker.project_issues(project_id)?;
        let total = issues.len();
        let candidates: Vec<Issue> = issues
            .into_iter()
            .filter(|issue| is_assigned_open(issue, self.identity.user(), &self.open_pattern))
            .collect();
        self.logger.transition(&format!(
            "cycle issues={} candidates={}",
            total,
            candidates.len()
        ));

        let mut report = CycleReport {
            candidates: candidates.len(),
            ..CycleReport::default()
        };
        if candidates.is_empty() {
            println!("There are no new tasks to execute");
            return Ok(report);
        }

        for issue in candidates {
            self.check_interrupted()?;

            let issue_id = issue.id;
            self.logger.transition(&format!(
                "task start issue={} category={} summary={}",
                issue_id,
                sanitize_value(&issue.category),
                sanitize_value(&issue.summary)
            ));

            let mut task = Task::from_issue(issue);
            execute(&mut task, self.runner, self.ctx, self.logger);
            report.executed += 1;
            if task.failed {
                report.failed += 1;
            }

            let (mutated, note) = reconcile(&task, &targets, self.ctx, self.logger);
            match self.submit(&mutated, &note) {
                Ok(()) => {
                    report.submitted += 1;
                    self.logger.transition(&format!(
                        "task submitted issue={} exit={}",
                        issue_id,
                        task.exit_code
                            .map_or_else(|| "none".to_string(), |code| code.to_string())
                    ));
                }
                Err(err) => {
                    // A failed write-back is local to this issue; keep going.
                    eprintln!("Failed to submit issue {}: {}", issue_id, err);
                    self.logger.transition(&format!(
                        "task submit failed issue={} err={}",
                        issue_id,
                        sanitize_value(&err.to_string())
                    ));
                }
            }
        }

        Ok(report)
    }

    fn submit(&self, issue: &Issue, note: &IssueNote) -> Result<(), TrackerError> {
        self.tracker.add_note(issue.id, note)?;
        self.tracker.update_issue(issue)
    }

    fn check_interrupted(&self) -> Result<(), CycleError> {
        if self.interrupt_flag.load(Ordering::SeqCst) {
            return Err(CycleError::Interrupted);
        }
        Ok(())
    }
}
