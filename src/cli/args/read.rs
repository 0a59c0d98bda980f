//! How a read command reaches the cache

use clap::Args;

/// Cache access flags for commands that read a snapshot.
///
/// Without flags only local layers (memory and the durable store) are read.
#[derive(Args, Debug, Default, Clone, Copy)]
pub struct ReadArgs {
    /// Walk every cache layer and fetch from K3 Cloud if all are stale
    #[arg(long)]
    pub refresh: bool,

    /// Always fetch from K3 Cloud
    #[arg(long, conflicts_with = "refresh")]
    pub force: bool,
}

impl ReadArgs {
    /// Whether the read may reach past the local layers
    pub fn goes_remote(&self) -> bool {
        self.refresh || self.force
    }
}
