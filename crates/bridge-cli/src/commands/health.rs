//! `escrow-bridge health`: check the bridge API.

use bridge_settlement::BridgeApiClient;
use clap::Args;

use super::Context;

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Bridge API base URL (defaults to the configured endpoint).
    #[arg(long)]
    pub api_url: Option<String>,
}

pub async fn run(ctx: &Context, args: &HealthArgs) -> anyhow::Result<()> {
    let base = args
        .api_url
        .as_deref()
        .unwrap_or(&ctx.config.endpoints.api_url);
    let client = BridgeApiClient::new(base, ctx.config.http_timeout())?;

    println!("Bridge API: {base}");

    let health = client.health().await?;
    println!("  Health:     {}", health.status);

    match client.fee().await {
        Ok(fee) => println!("  Fee:        {}", fee.fee_pct),
        Err(e) => println!("  Fee:        unknown ({e})"),
    }
    match client.max_escrow_time().await {
        Ok(window) => println!("  Max escrow: {} h ({} s)", window.hours, window.seconds),
        Err(e) => println!("  Max escrow: unknown ({e})"),
    }

    if !health.is_ok() {
        anyhow::bail!("bridge API reports status {}", health.status);
    }
    Ok(())
}
