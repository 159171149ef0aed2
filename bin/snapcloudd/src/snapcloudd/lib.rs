pub mod config;
pub use crate::config::Config;

mod daemon;
pub use daemon::SnapcloudDaemon;

mod node;
pub use node::{make_node, FfmpegThumbnailer, Relay};

mod server;
pub use server::Server;
