mod cache;
mod init;
mod research;
mod setup;

pub use cache::{cmd_cache_clear, cmd_cache_prune};
pub use init::cmd_init;
pub use research::cmd_research;
pub use setup::cmd_setup;
