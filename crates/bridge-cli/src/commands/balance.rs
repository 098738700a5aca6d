//! `escrow-bridge balance`: show wallet, contract and free balances.

use bridge_settlement::BalanceOracle;
use clap::Args;

use super::{Context, SignerArgs};

#[derive(Args, Debug)]
pub struct BalanceArgs {
    #[command(flatten)]
    pub signer: SignerArgs,
}

pub async fn run(ctx: &Context, args: &BalanceArgs) -> anyhow::Result<()> {
    let chain = ctx.chain(&args.signer)?;
    let sender = chain.sender();
    let oracle = BalanceOracle::new(chain);

    let snapshot = oracle.snapshot().await;

    println!("Account: {}", sender);
    for line in snapshot.lines() {
        println!("  {line}");
    }
    Ok(())
}
