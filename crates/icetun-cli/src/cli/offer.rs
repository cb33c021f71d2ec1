//! Offer Command Implementation

use std::path::PathBuf;

use anyhow::Result;
use icetun_core::PeerRole;

use super::SessionArgs;

/// Run the offer command
pub async fn run(args: SessionArgs, config_file: Option<PathBuf>) -> Result<()> {
    let config = args.into_config(config_file)?;
    super::start(config, PeerRole::Offer).await
}
