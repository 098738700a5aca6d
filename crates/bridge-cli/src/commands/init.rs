//! `escrow-bridge init`: write a default configuration file.

use bridge_core::BridgeConfig;
use clap::Args;
use std::path::Path;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,
}

pub fn run(config_path: &Path, args: &InitArgs) -> anyhow::Result<()> {
    if config_path.exists() && !args.force {
        anyhow::bail!(
            "configuration file already exists at {} (use --force to overwrite)",
            config_path.display()
        );
    }

    BridgeConfig::default().save(config_path)?;

    println!("Wrote default configuration to {}", config_path.display());
    println!("Set wallet.key_file or ESCROW_BRIDGE_PRIVATE_KEY before running 'escrow-bridge pay'.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("escrow-bridge.toml");

        run(&path, &InitArgs { force: false }).unwrap();

        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.polling.max_attempts, 60);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("escrow-bridge.toml");
        std::fs::write(&path, "[polling]\nmax_attempts = 3\n").unwrap();

        assert!(run(&path, &InitArgs { force: false }).is_err());
        run(&path, &InitArgs { force: true }).unwrap();
        assert_eq!(BridgeConfig::load(&path).unwrap().polling.max_attempts, 60);
    }
}
