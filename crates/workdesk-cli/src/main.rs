//! workdesk-attach: upload files and attach them to a workdesk record.
//!
//! Set WORKDESK_API_URL plus WORKDESK_API_TOKEN (Bearer) or WORKDESK_API_KEY
//! (X-API-Key), or put them in `.env`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use workdesk_api_client::ApiClient;
use workdesk_attachments::{AttachmentSession, RedirectSupervisor};
use workdesk_cli::{
    build_session, describe_failure, init_tracing, load_asset, wait_until_settled, LogNavigator,
    SessionReport,
};
use workdesk_core::{AssetKind, ListPrimitive, ParentId, PipelineConfig};

#[derive(Parser)]
#[command(name = "workdesk-attach", about = "Workdesk attachment CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files and attach them to an existing record
    Attach {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        files: Files,
    },
    /// Upload files while the record is still being saved, then wait for the redirect
    Draft {
        #[command(flatten)]
        target: Target,
        #[command(flatten)]
        files: Files,
        /// Delay before the record's identifier becomes known
        #[arg(long, default_value = "500")]
        parent_after_ms: u64,
    },
    /// List files attached to a record
    List {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Args)]
struct Target {
    /// Record type path, e.g. work-orders or purchase-requests
    #[arg(long)]
    record: String,
    /// Parent record identifier
    #[arg(long)]
    parent: ParentId,
}

#[derive(Args)]
struct Files {
    /// Photo to upload through the photo control (repeatable)
    #[arg(long = "photo")]
    photos: Vec<PathBuf>,
    /// Document to upload through the document control (repeatable)
    #[arg(long = "document")]
    documents: Vec<PathBuf>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Upload every file of one control in multi-select batches. Per-file
/// failures are collected instead of aborting the command.
async fn upload_control(
    session: &AttachmentSession,
    kind: AssetKind,
    paths: &[PathBuf],
    batch_limit: usize,
) -> anyhow::Result<Vec<String>> {
    let mut errors = Vec::new();
    for chunk in paths.chunks(batch_limit.max(1)) {
        let mut files = Vec::with_capacity(chunk.len());
        for path in chunk {
            files.push(load_asset(path).await?);
        }

        let results = session.upload_batch(files, kind).await?;
        for (path, result) in chunk.iter().zip(results) {
            if let Err(e) = result {
                errors.push(describe_failure(&path.display().to_string(), &e));
            }
        }
    }
    Ok(errors)
}

/// Photo and document controls are independent and run side by side.
async fn upload_all(
    session: &AttachmentSession,
    files: &Files,
    batch_limit: usize,
) -> anyhow::Result<Vec<String>> {
    let (mut errors, document_errors) = tokio::try_join!(
        upload_control(session, AssetKind::Photo, &files.photos, batch_limit),
        upload_control(session, AssetKind::Document, &files.documents, batch_limit),
    )?;
    errors.extend(document_errors);
    Ok(errors)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = PipelineConfig::from_env().context("Invalid WORKDESK_* configuration")?;
    let client = ApiClient::from_config(&config)
        .context("Failed to create API client. Set WORKDESK_API_URL and WORKDESK_API_KEY")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Attach { target, files } => {
            let session = build_session(&client, &target.record, &config);
            session.set_parent_id(target.parent);

            let mut errors = upload_all(&session, &files, config.batch_upload_limit).await?;
            let status = wait_until_settled(&session).await;
            if status.pending_count > 0 {
                errors.extend(session.last_error());
            }

            print_json(&SessionReport::from_session(&session, errors))?;
            session.close();
        }
        Commands::Draft {
            target,
            files,
            parent_after_ms,
        } => {
            let session = build_session(&client, &target.record, &config);
            let navigator = Arc::new(LogNavigator::new(&target.record, &target.parent));
            let supervisor =
                RedirectSupervisor::watch(&session, navigator.clone(), config.redirect_timeout);

            let save = async {
                tokio::time::sleep(Duration::from_millis(parent_after_ms)).await;
                tracing::info!(parent_id = %target.parent, "Parent record saved");
                session.set_parent_id(target.parent.clone());
                supervisor.save_requested();
            };
            let (errors, ()) = tokio::join!(
                upload_all(&session, &files, config.batch_upload_limit),
                save
            );
            let errors = errors?;

            let redirect = supervisor.finished().await;
            let report = SessionReport::from_session(&session, errors).with_redirect(redirect);
            print_json(&report)?;
            session.close();
        }
        Commands::List { target } => {
            let files = client
                .records(&target.record)
                .list(&target.parent)
                .await
                .context("Failed to list attachments")?;
            print_json(&files)?;
        }
    }

    Ok(())
}
