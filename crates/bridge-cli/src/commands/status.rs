//! `escrow-bridge status`: query or watch an escrow's settlement status.

use alloy::primitives::B256;
use anyhow::Context as _;
use bridge_settlement::{BridgeApiClient, StatusPoller};
use clap::Args;

use super::{ctrl_c_token, CommandFailure, Context};

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Escrow id (the commitment's id hash, 0x + 64 hex digits).
    pub escrow_id: String,

    /// Poll the status service until the settlement completes, fails or times out.
    #[arg(short, long)]
    pub watch: bool,

    /// Register a webhook to be called when the escrow completes.
    #[arg(long, value_name = "URL")]
    pub webhook: Option<String>,
}

pub async fn run(ctx: &Context, args: &StatusArgs) -> anyhow::Result<()> {
    let escrow_id: B256 = args
        .escrow_id
        .trim()
        .parse()
        .with_context(|| format!("invalid escrow id {}", args.escrow_id))?;

    if let Some(url) = &args.webhook {
        let api = BridgeApiClient::new(&ctx.config.endpoints.api_url, ctx.config.http_timeout())?;
        let ack = api.register_webhook(url, escrow_id).await?;
        println!("Webhook registered for {} ({})", ack.escrow_id, ack.status);
    }

    if args.watch {
        let poller = StatusPoller::new(ctx.status_feed()?, ctx.orchestrator_config().polling);
        println!("Watching {escrow_id}...");
        match poller.poll(escrow_id, &ctrl_c_token()).await {
            Ok(status) => println!("Settlement {status}"),
            Err(err) => return Err(CommandFailure::new(1, err.user_message()).into()),
        }
        return Ok(());
    }

    let api = BridgeApiClient::new(&ctx.config.endpoints.api_url, ctx.config.http_timeout())?;
    let report = api.escrow_status(escrow_id).await?;
    match report.status {
        Some(status) => println!("Escrow {}: {status}", report.escrow_id),
        None => println!("Escrow {}: unknown", report.escrow_id),
    }
    if let Some(detail) = report.detail {
        println!("  {detail}");
    }
    Ok(())
}
