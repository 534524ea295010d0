use crate::api::{self, session::SessionConfig, ServerConfig};
use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub public_dir: PathBuf,
    pub session_ttl_seconds: u64,
    pub session_max: usize,
    pub session_cookie_secure: bool,
    pub serialize_signups: bool,
}

impl Args {
    #[must_use]
    pub fn server_config(self) -> ServerConfig {
        ServerConfig {
            port: self.port,
            dsn: self.dsn,
            public_dir: self.public_dir,
            session: SessionConfig::new()
                .with_ttl_seconds(self.session_ttl_seconds)
                .with_max_sessions(self.session_max)
                .with_cookie_secure(self.session_cookie_secure),
            serialize_signups: self.serialize_signups,
        }
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        port = args.port,
        public_dir = %args.public_dir.display(),
        serialize_signups = args.serialize_signups,
        "starting server"
    );

    api::new(args.server_config()).await
}
