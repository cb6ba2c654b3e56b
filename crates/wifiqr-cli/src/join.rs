//! `wifiqr join`

use anyhow::{bail, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use wifiqr_adapter::{AlwaysAuthorized, NmcliWifi};
use wifiqr_core::{Credential, PayloadFeed, ProgressEvent};
use wifiqr_runtime::{AssociationEngine, EngineConfig, FixedChoice, SettingsChoice};

use crate::report::{event_json, event_line, OutputFormat};
use crate::JoinArgs;

type CliEngine = AssociationEngine<NmcliWifi, AlwaysAuthorized, FixedChoice>;

pub async fn run(args: JoinArgs) -> Result<()> {
    let config = EngineConfig::default()
        .with_max_association_retries(args.max_retries)
        .with_initial_backoff(args.initial_backoff);

    let mut wifi = NmcliWifi::new();
    if let Some(ifname) = &args.ifname {
        wifi = wifi.with_ifname(ifname.clone());
    }

    // NetworkManager applies its own polkit rules, so the engine never sees
    // a denial here and the settings prompt is unreachable
    let engine = AssociationEngine::with_config(
        wifi,
        AlwaysAuthorized::new(),
        FixedChoice(SettingsChoice::Decline),
        config,
    );
    let printer = spawn_printer(engine.subscribe(), args.format());

    let outcome = match &args.payload {
        Some(payload) => join_one(&engine, payload).await,
        None => join_stdin(&engine, args.once).await,
    };

    // Closing the event channel lets the printer drain and exit
    drop(engine);
    let _ = printer.await;

    outcome
}

async fn join_one(engine: &CliEngine, payload: &str) -> Result<()> {
    let credential: Credential = payload.parse()?;
    tracing::debug!(details = %credential.summary(false), "joining");

    match engine.connect(&credential).await {
        Ok(_) => Ok(()),
        Err(error) if error.is_deferral() => Ok(()),
        Err(error) => bail!(error),
    }
}

async fn join_stdin(engine: &CliEngine, once: bool) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut feed = PayloadFeed::new();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(credential) = feed.offer(Some(line)) else {
            tracing::debug!(rejected = feed.rejected(), "ignored delivery");
            continue;
        };

        match engine.connect(&credential).await {
            Ok(connected) if once => {
                tracing::debug!(attempt = connected.attempt.0, "stopping after first join");
                return Ok(());
            }
            Ok(_) => {}
            Err(error) if error.is_deferral() => {}
            Err(error) => {
                tracing::debug!(kind = error.kind(), "attempt failed");
                // Allow the same code to be tried again after a failure
                feed.reset();
            }
        }
    }

    tracing::debug!(deliveries = feed.deliveries(), "input closed");
    Ok(())
}

fn spawn_printer(
    mut events: broadcast::Receiver<ProgressEvent>,
    format: OutputFormat,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match format {
                    OutputFormat::Json => println!("{}", event_json(&event)),
                    OutputFormat::Human => {
                        if let Some(line) = event_line(&event) {
                            println!("{line}");
                        }
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "progress output fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
