//! CLI command handlers.

use std::sync::Arc;

use crate::action::{builtin_action, ImageGeneration, ShippingOrder};
use crate::config::{GateConfig, StoreBackend};
use crate::context::GateContext;
use crate::error::{GateError, Result};
use crate::session::Session;
use crate::types::{Confirmation, RequestToken, ToolCall, ToolResult};

use super::{Cli, Commands, ImagesArgs, ResumeArgs, ShipArgs};

/// Build the context the CLI runs against. Always file-backed so paused
/// requests survive between invocations.
pub fn build_context(cli: &Cli) -> Result<GateContext> {
    let config = GateConfig::load(cli.config.as_deref())?;
    let dir = cli.store_dir.clone().or_else(|| config.store.dir.clone());
    Ok(GateContext::new(config.with_store(StoreBackend::File, dir)))
}

/// Run one command; returns the text to print.
pub async fn run(cli: Cli) -> Result<String> {
    let context = build_context(&cli)?;
    let session = context.open_session(&cli.session).await?;
    let output = match cli.command {
        Commands::Ship(args) => handle_ship(&session, args).await,
        Commands::Images(args) => handle_images(&session, args).await,
        Commands::Resume(args) => handle_resume(&session, args).await,
        Commands::Status(args) => handle_status(&session, &args.token).await,
        Commands::List => handle_list(&session).await,
        Commands::Reclaim => session
            .reclaim_expired()
            .await
            .map(|count| format!("Reclaimed {count} expired request(s)")),
    };
    context.shutdown().await;
    output
}

async fn handle_ship(session: &Session, args: ShipArgs) -> Result<String> {
    let dispatcher = session.dispatcher(Arc::new(ShippingOrder::new()))?;
    let mut call = ToolCall::new(args.containers, args.destination);
    call.token = args.token;
    render(&dispatcher.dispatch(call).await?)
}

async fn handle_images(session: &Session, args: ImagesArgs) -> Result<String> {
    let dispatcher = session.dispatcher(Arc::new(ImageGeneration::new()))?;
    let mut call = ToolCall::new(args.count, args.prompt);
    call.token = args.token;
    render(&dispatcher.dispatch(call).await?)
}

async fn handle_resume(session: &Session, args: ResumeArgs) -> Result<String> {
    let token = RequestToken::new(&args.token)?;
    let record = session
        .store()
        .get(&token)
        .await?
        .ok_or_else(|| GateError::not_found(token.as_str()))?;
    let action = builtin_action(&record.request.action).ok_or_else(|| {
        GateError::InvalidInput(format!("unknown action {}", record.request.action))
    })?;

    let mut confirmation = if args.approve {
        Confirmation::approve()
    } else {
        Confirmation::reject()
    };
    if let Some(note) = args.note {
        confirmation = confirmation.with_note(note);
    }

    let dispatcher = session.dispatcher(action)?;
    render(&dispatcher.resume(token.as_str(), confirmation).await?)
}

async fn handle_status(session: &Session, token: &str) -> Result<String> {
    let token = RequestToken::new(token)?;
    match session.store().get(&token).await? {
        Some(record) => Ok(format!(
            "{}\t{}\t{}\t{}",
            record.token(),
            record.phase(),
            record.request.action,
            record.message
        )),
        None => Ok(format!("{token}\tnew")),
    }
}

async fn handle_list(session: &Session) -> Result<String> {
    let records = session.store().list().await?;
    if records.is_empty() {
        return Ok("No requests".to_string());
    }
    let lines: Vec<String> = records
        .iter()
        .map(|record| {
            let result = record.to_result();
            format!(
                "{}\t{}\t{}\t{} x {}\t{}",
                record.token(),
                record.phase(),
                record.request.action,
                record.request.quantity,
                record.request.target,
                result.result_id.as_deref().unwrap_or("-"),
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

fn render(result: &ToolResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}
