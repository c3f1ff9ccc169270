//! DF-016: CLI: arguments, settings, and outcome reporting.

use crate::cloud::digitalocean::DigitalOceanClient;
use crate::cloud::DELETE_NOT_FOUND;
use crate::core::error::Result;
use crate::core::executor::Lifecycle;
use crate::core::settings::{self, PollPolicy, Settings};
use crate::core::types::{Action, Outcome};
use crate::core::wait::{CancelToken, SystemClock};
use crate::core::{extractor, parser};
use crate::transport::LocalRunner;
use clap::Args;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Path to the configuration file (e.g. main.tf)
    pub file: PathBuf,

    /// Lifecycle action to perform
    #[arg(short, long, value_enum, default_value_t = Action::Apply)]
    pub action: Action,

    /// Base URL of the DigitalOcean API
    #[arg(long, env = "DROPFORM_API_URL", default_value = settings::DEFAULT_API_URL)]
    pub api_url: String,

    /// Where the droplet record is written
    #[arg(long, env = "DROPFORM_RECORD_FILE", default_value = settings::DEFAULT_RECORD_FILE)]
    pub record_file: PathBuf,

    /// Where the compatibility state snapshot is written
    #[arg(long, env = "DROPFORM_SNAPSHOT_FILE", default_value = settings::DEFAULT_SNAPSHOT_FILE)]
    pub snapshot_file: PathBuf,

    /// Seconds between droplet status polls
    #[arg(long, env = "DROPFORM_POLL_INTERVAL", default_value_t = 5)]
    pub poll_interval: u64,

    /// Maximum number of status polls
    #[arg(long, env = "DROPFORM_MAX_POLLS", default_value_t = 180)]
    pub max_polls: u32,

    /// Give up waiting for an IP after this many seconds
    #[arg(long, env = "DROPFORM_POLL_DEADLINE", default_value_t = 900)]
    pub poll_deadline: u64,

    /// Automation tool run after plan and apply
    #[arg(long, env = "DROPFORM_AUTOMATION_BIN", default_value = settings::DEFAULT_AUTOMATION_BIN)]
    pub automation_bin: String,

    /// Seconds before an automation step is killed
    #[arg(long, default_value_t = 120)]
    pub automation_timeout: u64,

    /// Do not run the automation tool
    #[arg(long)]
    pub skip_automation: bool,

    /// Append JSONL provenance events to this file
    #[arg(long)]
    pub event_log: Option<PathBuf>,
}

impl RunArgs {
    pub fn settings(&self) -> Settings {
        Settings {
            api_url: self.api_url.clone(),
            record_file: self.record_file.clone(),
            snapshot_file: self.snapshot_file.clone(),
            poll: PollPolicy {
                interval: Duration::from_secs(self.poll_interval),
                max_attempts: self.max_polls,
                deadline: Duration::from_secs(self.poll_deadline),
            },
            automation_bin: self.automation_bin.clone(),
            automation_timeout: Duration::from_secs(self.automation_timeout),
            skip_automation: self.skip_automation,
            event_log: self.event_log.clone(),
        }
    }
}

/// Parse the file, run the action against the real API, print the result.
pub fn dispatch(args: RunArgs) -> Result<()> {
    let settings = args.settings();
    let doc = parser::parse_file(&args.file)?;
    let extraction = extractor::extract(&doc)?;
    info!(file = %args.file.display(), action = %args.action, "starting");

    let api = DigitalOceanClient::new(&settings.api_url);
    let runner = LocalRunner;
    let clock = SystemClock::new();
    let lifecycle = Lifecycle::new(&api, &runner, &clock, &settings);
    if args.action == Action::Apply {
        if let Err(e) = install_interrupt_handler(lifecycle.cancel.clone()) {
            warn!("cannot install Ctrl-C handler: {}", e);
        }
    }

    let outcome = lifecycle.run(args.action, &extraction)?;
    println!("{}", summary(&outcome));
    Ok(())
}

/// Cancel `cancel` on the first Ctrl-C so the IP wait stops before its next
/// poll; a second Ctrl-C exits at once. Returns once the handler is live.
pub fn install_interrupt_handler(cancel: CancelToken) -> io::Result<()> {
    let (ready_tx, ready_rx) = mpsc::sync_channel::<io::Result<()>>(1);
    thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            rt.block_on(async move {
                let mut interrupts = match signal(SignalKind::interrupt()) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                if interrupts.recv().await.is_some() {
                    warn!("interrupted; stopping before the next poll (Ctrl-C again to abort)");
                    cancel.cancel();
                }
                if interrupts.recv().await.is_some() {
                    std::process::exit(130);
                }
            });
        })?;
    ready_rx.recv().map_err(io::Error::other)?
}

/// One-line user-facing summary of an outcome.
pub fn summary(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Planned { plan, .. } if plan.missing.is_empty() => {
            "Plan complete.".to_string()
        }
        Outcome::Planned { plan, .. } => format!(
            "Plan complete with warnings: missing {}.",
            plan.missing.join(", ")
        ),
        Outcome::Applied {
            record,
            record_saved,
            ..
        } => {
            let mut s = format!(
                "Droplet {} ({}) is active at {}.",
                record.name, record.id, record.ip
            );
            if !record_saved {
                s.push_str(&format!(
                    " WARNING: record not saved; droplet {} is untracked.",
                    record.id
                ));
            }
            s
        }
        Outcome::Destroyed { id, deleted: true, .. } => {
            format!("Droplet {} destroyed. Local state removed.", id)
        }
        Outcome::Destroyed {
            id,
            status: Some(DELETE_NOT_FOUND),
            ..
        } => format!(
            "Droplet {} was not found remotely; delete not confirmed. Local state removed.",
            id
        ),
        Outcome::Destroyed { id, .. } => format!(
            "Failed to delete droplet {}. Local state removed anyway.",
            id
        ),
        Outcome::NothingToDestroy => "No droplet info found. Cannot destroy.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DropletPlan, ResourceRecord};
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        run: RunArgs,
    }

    fn parse(args: &[&str]) -> RunArgs {
        let mut argv = vec!["dropform"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().run
    }

    #[test]
    fn test_df016_defaults() {
        let a = parse(&["main.tf"]);
        assert_eq!(a.action, Action::Apply);
        assert_eq!(a.file, PathBuf::from("main.tf"));
        let s = a.settings();
        assert_eq!(s.record_file, PathBuf::from("droplet_info.json"));
        assert_eq!(s.snapshot_file, PathBuf::from("terraform.tfstate"));
        assert_eq!(s.poll, PollPolicy::default());
        assert_eq!(s.automation_bin, "terraform");
        assert_eq!(s.automation_timeout, Duration::from_secs(120));
        assert!(!s.skip_automation);
        assert!(s.event_log.is_none());
    }

    #[test]
    fn test_df016_action_values() {
        assert_eq!(parse(&["f", "--action", "destroy"]).action, Action::Destroy);
        assert_eq!(parse(&["f", "-a", "plan"]).action, Action::Plan);
        assert!(TestCli::try_parse_from(["dropform", "f", "--action", "nuke"]).is_err());
    }

    #[test]
    fn test_df016_file_required() {
        assert!(TestCli::try_parse_from(["dropform"]).is_err());
    }

    #[test]
    fn test_df016_overrides() {
        let a = parse(&[
            "main.tf",
            "--api-url",
            "http://127.0.0.1:9/v2",
            "--poll-interval",
            "1",
            "--max-polls",
            "7",
            "--poll-deadline",
            "30",
            "--automation-bin",
            "tofu",
            "--skip-automation",
            "--event-log",
            "events.jsonl",
        ]);
        let s = a.settings();
        assert_eq!(s.api_url, "http://127.0.0.1:9/v2");
        assert_eq!(s.poll.interval, Duration::from_secs(1));
        assert_eq!(s.poll.max_attempts, 7);
        assert_eq!(s.poll.deadline, Duration::from_secs(30));
        assert_eq!(s.automation_bin, "tofu");
        assert!(s.skip_automation);
        assert_eq!(s.event_log, Some(PathBuf::from("events.jsonl")));
    }

    #[test]
    fn test_df016_dispatch_missing_file() {
        let a = parse(&["/nonexistent/dropform/main.tf", "--skip-automation"]);
        let err = dispatch(a).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dropform/main.tf"));
    }

    #[test]
    fn test_df016_dispatch_destroy_without_record() {
        let dir = tempfile::tempdir().unwrap();
        let tf = dir.path().join("main.tf");
        std::fs::write(&tf, "resource \"digitalocean_droplet\" \"w\" { name = \"a\" }\n").unwrap();
        let record = dir.path().join("droplet_info.json");
        let snapshot = dir.path().join("terraform.tfstate");
        let a = parse(&[
            tf.to_str().unwrap(),
            "--action",
            "destroy",
            "--record-file",
            record.to_str().unwrap(),
            "--snapshot-file",
            snapshot.to_str().unwrap(),
            "--api-url",
            "http://127.0.0.1:9/v2",
        ]);
        dispatch(a).unwrap();
    }

    #[test]
    fn test_df016_dispatch_plan_offline() {
        let dir = tempfile::tempdir().unwrap();
        let tf = dir.path().join("main.tf");
        std::fs::write(
            &tf,
            "resource \"digitalocean_droplet\" \"w\" { name = \"a\", region = \"r\", size = \"s\", image = \"i\" }\n",
        )
        .unwrap();
        let a = parse(&[
            tf.to_str().unwrap(),
            "--action",
            "plan",
            "--skip-automation",
            "--record-file",
            dir.path().join("r.json").to_str().unwrap(),
            "--api-url",
            "http://127.0.0.1:9/v2",
        ]);
        dispatch(a).unwrap();
    }

    #[test]
    fn test_df016_dispatch_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let tf = dir.path().join("main.tf");
        std::fs::write(&tf, "resource \"digitalocean_droplet\" \"w\" {\n  name \"a\"\n}\n").unwrap();
        let err = dispatch(parse(&[tf.to_str().unwrap(), "--action", "plan"])).unwrap_err();
        assert!(err.to_string().starts_with("syntax error at 2:8"), "{}", err);
    }

    #[test]
    fn test_df016_interrupt_cancels_token() {
        let cancel = CancelToken::new();
        install_interrupt_handler(cancel.clone()).unwrap();
        assert!(!cancel.is_cancelled());

        let status = std::process::Command::new("sh")
            .args(["-c", &format!("kill -INT {}", std::process::id())])
            .status()
            .unwrap();
        assert!(status.success());

        let start = std::time::Instant::now();
        while !cancel.is_cancelled() && start.elapsed() < Duration::from_secs(5) {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_df016_summary_messages() {
        assert_eq!(
            summary(&Outcome::NothingToDestroy),
            "No droplet info found. Cannot destroy."
        );
        assert!(summary(&Outcome::Destroyed {
            id: 9,
            deleted: true,
            status: Some(204),
            removed: vec![]
        })
        .contains("Droplet 9 destroyed"));
        assert!(summary(&Outcome::Destroyed {
            id: 9,
            deleted: false,
            status: Some(500),
            removed: vec![]
        })
        .contains("Failed to delete droplet 9"));
        assert!(summary(&Outcome::Destroyed {
            id: 9,
            deleted: false,
            status: None,
            removed: vec![]
        })
        .contains("Failed to delete droplet 9"));
        let gone = summary(&Outcome::Destroyed {
            id: 8,
            deleted: false,
            status: Some(404),
            removed: vec![]
        });
        assert!(gone.contains("not found remotely"));
        assert!(!gone.contains("destroyed"));

        let record = ResourceRecord {
            id: 3,
            ip: "203.0.113.10".to_string(),
            name: "web-1".to_string(),
            region: "nyc1".to_string(),
            size: "s".to_string(),
            image: "i".to_string(),
            created_at: "2026-10-17T00:00:00Z".to_string(),
            tags: vec![],
        };
        let applied = summary(&Outcome::Applied {
            record: record.clone(),
            record_saved: false,
            snapshot_saved: true,
            automation_ok: None,
        });
        assert!(applied.contains("web-1 (3) is active at 203.0.113.10"));
        assert!(applied.contains("untracked"));

        let plan = DropletPlan {
            label: "w".to_string(),
            attributes: Default::default(),
            fingerprint: "blake3:00".to_string(),
            missing: vec!["image".to_string()],
            existing: None,
        };
        assert_eq!(
            summary(&Outcome::Planned {
                plan,
                automation_ok: None
            }),
            "Plan complete with warnings: missing image."
        );
    }
}
