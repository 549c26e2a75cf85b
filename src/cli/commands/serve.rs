//! Serve command: run the HTTP API.

use crate::config::Settings;
use crate::server::run_server;

pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    run_server(host, port, settings).await
}
