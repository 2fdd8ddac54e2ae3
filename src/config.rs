use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;

use crate::application::ServerData;
use crate::AnyResult;

/// Serves a fixed set of routes plus files out of a single directory.
#[derive(Debug, Clone, Parser)]
#[command(version, long_about = None)]
pub struct Config {
    /// Interface ip/host to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// TCP port to listen for connections
    #[arg(long, default_value_t = 4221)]
    pub port: u16,

    /// Directory from which to serve files
    #[arg(long, default_value = ".")]
    pub directory: PathBuf,
}

impl Config {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Checks the serving directory and turns it into the shared server state.
    pub fn validate(&self) -> AnyResult<ServerData> {
        ServerData::new(&self.directory)
            .wrap_err_with(|| format!("invalid directory path {}", self.directory.display()))
    }
}
