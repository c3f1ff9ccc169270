//! DF-012: Lifecycle orchestrator: plan, apply, destroy.
//!
//! One action per invocation, run to completion or failure:
//! - plan:    extraction → plan → print → automation preview (non-fatal)
//! - apply:   extraction → token → create → wait for IP → record → snapshot → automation
//! - destroy: record → token → delete → remove both files (always)

use super::error::{DropformError, Result};
use super::extractor::ExtractionResult;
use super::planner;
use super::resolver;
use super::settings::Settings;
use super::state::StateStore;
use super::types::*;
use super::wait::{self, CancelToken, Clock};
use crate::cloud::{ComputeApi, DELETE_ACCEPTED, DELETE_NOT_FOUND};
use crate::transport::CommandRunner;
use crate::tripwire::eventlog;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Subcommands of the automation tool, run in order.
pub const AUTOMATION_STEPS: [&[&str]; 2] = [&["init"], &["plan"]];

/// Collaborators and settings for one lifecycle run.
pub struct Lifecycle<'a> {
    pub api: &'a dyn ComputeApi,
    pub runner: &'a dyn CommandRunner,
    pub clock: &'a dyn Clock,
    pub cancel: CancelToken,
    pub store: StateStore,
    pub settings: &'a Settings,
}

impl<'a> Lifecycle<'a> {
    pub fn new(
        api: &'a dyn ComputeApi,
        runner: &'a dyn CommandRunner,
        clock: &'a dyn Clock,
        settings: &'a Settings,
    ) -> Self {
        Self {
            api,
            runner,
            clock,
            cancel: CancelToken::new(),
            store: StateStore::new(&settings.record_file, &settings.snapshot_file),
            settings,
        }
    }

    /// Execute one action against an extraction.
    pub fn run(&self, action: Action, extraction: &ExtractionResult) -> Result<Outcome> {
        let run_id = eventlog::generate_run_id();
        let start = self.clock.elapsed();
        report_permissive(extraction);

        self.event(ProvenanceEvent::RunStarted {
            action: action.to_string(),
            run_id: run_id.clone(),
            dropform_version: env!("CARGO_PKG_VERSION").to_string(),
        });

        let outcome = match action {
            Action::Plan => self.plan(extraction),
            Action::Apply => self.apply(extraction),
            Action::Destroy => self.destroy(extraction),
        }?;

        self.event(ProvenanceEvent::RunCompleted {
            action: action.to_string(),
            run_id,
            total_seconds: self.clock.elapsed().saturating_sub(start).as_secs_f64(),
        });
        Ok(outcome)
    }

    fn plan(&self, extraction: &ExtractionResult) -> Result<Outcome> {
        let plan = planner::plan(extraction, self.store.load())?;
        println!("{}", planner::render(&plan));
        let automation_ok = self.automation();
        Ok(Outcome::Planned {
            plan,
            automation_ok,
        })
    }

    fn apply(&self, extraction: &ExtractionResult) -> Result<Outcome> {
        if extraction.resource.is_empty() {
            return Err(DropformError::MissingResource);
        }
        let spec =
            DropletSpec::from_config(&extraction.resource).map_err(DropformError::MissingAttribute)?;
        let token = resolver::resolve(extraction.provider_token.as_deref(), &extraction.symbols)?;

        info!(name = %spec.name, region = %spec.region, size = %spec.size, "creating droplet");
        let droplet = self.api.create_droplet(&token, &spec)?;
        let id = droplet.id;
        info!(id, "droplet created");
        self.event(ProvenanceEvent::DropletCreated {
            id,
            name: spec.name.clone(),
        });

        info!(id, "waiting for droplet to become active and get an IP");
        let ready = wait::wait_for_public_ip(
            self.api,
            &token,
            id,
            &self.settings.poll,
            self.clock,
            &self.cancel,
        )
        .inspect_err(|_| {
            warn!(id, "droplet {} exists remotely but was not recorded; delete it manually", id);
        })?;
        self.event(ProvenanceEvent::DropletReady {
            id,
            ip: ready.ip.clone(),
            polls: ready.polls,
        });

        let record = ResourceRecord {
            id,
            ip: ready.ip,
            name: spec.name,
            region: spec.region,
            size: spec.size,
            image: spec.image,
            created_at: eventlog::now_iso8601(),
            tags: spec.tags,
        };

        let record_saved = self.store.save(&record);
        if !record_saved {
            error!(
                id,
                "droplet {} is orphaned: record not written to {}",
                id,
                self.store.record_path().display()
            );
        }
        let snapshot_saved = self.store.save_snapshot(&record);
        if !snapshot_saved {
            warn!(
                id,
                "snapshot not written to {}",
                self.store.snapshot_path().display()
            );
        }
        self.event(ProvenanceEvent::StatePersisted {
            id,
            record: record_saved,
            snapshot: snapshot_saved,
        });

        let automation_ok = self.automation();
        Ok(Outcome::Applied {
            record,
            record_saved,
            snapshot_saved,
            automation_ok,
        })
    }

    fn destroy(&self, extraction: &ExtractionResult) -> Result<Outcome> {
        let Some(record) = self.store.load() else {
            info!(path = %self.store.record_path().display(), "no resource record");
            return Ok(Outcome::NothingToDestroy);
        };
        let token = resolver::resolve(extraction.provider_token.as_deref(), &extraction.symbols)?;

        let id = record.id;
        info!(id, "deleting droplet");
        let status = match self.api.delete_droplet(&token, id) {
            Ok(code) => Some(code),
            Err(e) => {
                warn!(id, "failed to delete droplet {}: {}", id, e);
                None
            }
        };
        let deleted = status == Some(DELETE_ACCEPTED);
        match status {
            Some(DELETE_ACCEPTED) => info!(id, "droplet deleted"),
            Some(DELETE_NOT_FOUND) => warn!(id, "droplet {} not found remotely (HTTP 404)", id),
            Some(code) => warn!(id, "failed to delete droplet {}: HTTP {}", id, code),
            None => {}
        }
        self.event(ProvenanceEvent::DropletDeleted {
            id,
            accepted: deleted,
        });

        let removed = self
            .store
            .remove()
            .into_iter()
            .map(|p| p.display().to_string())
            .collect();
        Ok(Outcome::Destroyed {
            id,
            deleted,
            status,
            removed,
        })
    }

    /// Run the automation tool unless disabled. `None` when skipped.
    fn automation(&self) -> Option<bool> {
        if self.settings.skip_automation {
            debug!("automation skipped");
            return None;
        }
        let ok = run_automation(
            self.runner,
            &self.settings.automation_bin,
            self.settings.automation_timeout,
        );
        if !ok {
            warn!("automation step failed; continuing");
        }
        self.event(ProvenanceEvent::AutomationFinished { success: ok });
        Some(ok)
    }

    fn event(&self, event: ProvenanceEvent) {
        if let Some(ref path) = self.settings.event_log {
            if let Err(e) = eventlog::append_event(path, event) {
                debug!("event log: {}", e);
            }
        }
    }
}

/// Run each automation step in order, stopping at the first failure.
/// stdout is surfaced on success, stderr on failure. Never fatal.
pub fn run_automation(runner: &dyn CommandRunner, program: &str, timeout: Duration) -> bool {
    for args in AUTOMATION_STEPS {
        let cmd = format!("{} {}", program, args.join(" "));
        info!("running: {}", cmd);
        match runner.run(program, args, timeout) {
            Ok(out) if out.success() => {
                info!("{} completed successfully", cmd);
                if !out.stdout.trim().is_empty() {
                    println!("{}", out.stdout.trim_end());
                }
            }
            Ok(out) => {
                warn!("{} failed (exit code {})", cmd, out.exit_code);
                if !out.stderr.trim().is_empty() {
                    eprintln!("{}", out.stderr.trim_end());
                }
                return false;
            }
            Err(e) => {
                warn!("{}", DropformError::Subprocess(format!("{}: {}", cmd, e)));
                return false;
            }
        }
    }
    true
}

/// Log the permissive cases extraction tolerates.
fn report_permissive(extraction: &ExtractionResult) {
    if extraction.provider_blocks > 1 {
        warn!(
            "{} provider blocks found; the last token assignment wins",
            extraction.provider_blocks
        );
    }
    if extraction.resource_blocks > 1 {
        warn!(
            "{} {} blocks merged into one droplet",
            extraction.resource_blocks, SUPPORTED_RESOURCE
        );
    }
    for skipped in &extraction.skipped_resources {
        info!("skipping unsupported resource {}", skipped);
    }
    for attr in &extraction.overridden_attributes {
        warn!("droplet attribute {} overrides an earlier value", attr);
    }
    debug!(
        variables = ?extraction.symbols.names().collect::<Vec<_>>(),
        "variables defined"
    );
}
