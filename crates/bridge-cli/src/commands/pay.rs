//! `escrow-bridge pay`: open an escrow and wait for settlement.

use bridge_core::SettlementStatus;
use bridge_settlement::{PaymentIntent, RetryAdvice, SettlementError};
use clap::Args;

use super::{ctrl_c_token, CommandFailure, Context, SignerArgs};

#[derive(Args, Debug)]
pub struct PayArgs {
    /// Payer email, hashed into the commitment.
    #[arg(short, long)]
    pub email: String,

    /// Amount in USDC, e.g. 12.34.
    #[arg(short, long)]
    pub amount: String,

    /// Optional recipient address override (0x...).
    #[arg(short, long)]
    pub recipient: Option<String>,

    #[command(flatten)]
    pub signer: SignerArgs,
}

/// Process exit code for a failed attempt.
fn exit_code(err: &SettlementError) -> u8 {
    match err.retry_advice() {
        RetryAdvice::FixInput => 2,
        RetryAdvice::CheckStatusLater => 3,
        _ => 1,
    }
}

pub async fn run(ctx: &Context, args: &PayArgs) -> anyhow::Result<()> {
    let orchestrator = ctx.orchestrator(&args.signer)?;
    let intent = PaymentIntent {
        email: args.email.clone(),
        amount: args.amount.clone(),
        recipient_override: args.recipient.clone(),
    };
    let cancel = ctrl_c_token();

    println!("Opening escrow for {} USDC...", args.amount);
    if ctx.simulate {
        println!("  (simulated: no transaction leaves this process)");
    }

    match orchestrator.execute(&intent, &cancel).await {
        Ok(outcome) => {
            println!("  Escrow ID: {}", outcome.id_hash);
            println!("  Tx hash:   {}", outcome.tx_hash);
            println!("  Call:      {}", outcome.receipt.form);
            println!("{}", outcome.message());
            println!();
            for line in outcome.balances.lines() {
                println!("  {line}");
            }
            if outcome.status == SettlementStatus::Failed {
                let message = format!("Error: escrow {} was not settled.", outcome.id_hash);
                return Err(CommandFailure::new(1, message).into());
            }
            Ok(())
        }
        Err(err) => Err(CommandFailure::new(exit_code(&err), err.user_message()).into()),
    }
}
