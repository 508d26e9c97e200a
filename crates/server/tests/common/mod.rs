#![allow(dead_code)]

use anyhow::Context as _;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::time::Duration;

pub use helix_test_support::{
    KillOnDrop, MOCK_TOKEN, MOCK_USER_ID, MockHelix, pick_unused_port, spawn_mock_helix,
    wait_http_ok,
};

pub const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/helix.yaml");

fn command() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_helix-mcp"));
    cmd.env_remove("TWITCH_CLIENT_ID")
        .env_remove("TWITCH_ACCESS_TOKEN")
        .env_remove("HELIX_OPENAPI_SPEC")
        .env_remove("HELIX_BASE_URL")
        .env_remove("HELIX_MCP_CONFIG")
        .env_remove("TRANSPORT")
        .env_remove("RUST_LOG");
    cmd
}

/// Run the binary to completion with `args`.
pub fn run_cli(args: &[&str]) -> anyhow::Result<Output> {
    command()
        .args(args)
        .stdin(Stdio::null())
        .output()
        .context("run helix-mcp")
}

/// Write a config file pointing the server at `mock`.
pub fn write_mock_config(dir: &Path, mock: &MockHelix) -> anyhow::Result<std::path::PathBuf> {
    let path = dir.join("helix-mcp.yaml");
    std::fs::write(
        &path,
        format!(
            "spec: {FIXTURE}\nbaseUrl: {}\ntokenValidateUrl: {}\ntimeoutSecs: 10\n",
            mock.helix_url(),
            mock.validate_url()
        ),
    )
    .context("write config")?;
    Ok(path)
}

/// Start the streamable HTTP server and wait for `/health`.
pub async fn spawn_http_server(
    config: &Path,
    extra_args: &[&str],
) -> anyhow::Result<(String, KillOnDrop)> {
    let port = pick_unused_port()?;
    let child: Child = command()
        .arg("--config")
        .arg(config)
        .args(["--client-id", "test-client", "--access-token", MOCK_TOKEN])
        .args(["--transport", "http", "--host", "127.0.0.1", "--port"])
        .arg(port.to_string())
        .args(extra_args)
        .stdin(Stdio::null())
        .spawn()
        .context("spawn helix-mcp")?;
    let child = KillOnDrop(child);

    let base_url = format!("http://127.0.0.1:{port}");
    wait_http_ok(&format!("{base_url}/health"), Duration::from_secs(20)).await?;
    Ok((base_url, child))
}
