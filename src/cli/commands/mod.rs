//! CLI command implementations

pub mod clean_root;
pub mod cleanup;
pub mod completions;
pub mod config;
pub mod download;
pub mod env;
pub mod init;
pub mod state;
pub mod tool_url;

pub use clean_root::execute as clean_root;
pub use cleanup::execute as cleanup;
pub use completions::execute as completions;
pub use config::execute as config;
pub use download::execute as download;
pub use env::execute as env;
pub use init::execute as init;
pub use state::execute as state;
pub use tool_url::execute as tool_url;
