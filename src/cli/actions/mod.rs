pub mod server;

use crate::config::AuthConfig;

/// Actions resolved from the command line.
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        config: AuthConfig,
    },
}
