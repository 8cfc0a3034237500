//! Detect command for the dvm CLI.
//!
//! Asks the Docker daemon the shell is pointed at for its version, exports
//! it as `DOCKER_VERSION` and switches to the matching client.
//!
//! The daemon is reached over HTTP when `DOCKER_HOST` is a `tcp://` or
//! `http(s)://` address; otherwise the current `docker` client is asked with
//! `docker version --format "{{json .Server}}"`.
//!
//! Daemons older than 1.12 do not report a usable version. For those the API
//! version is mapped to a client series and the newest published release in
//! that series is chosen.

use anyhow::{Context, Result, bail};
use clap::Args;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

use super::{emit, use_cmd};
use crate::config::Options;
use crate::toolchain::{Version, list_available_versions};

/// Variable the detected version is exported as.
pub const DOCKER_VERSION_VAR: &str = "DOCKER_VERSION";

/// API version to client series for daemons that predate version reporting.
const LEGACY_API_CLIENTS: &[(&str, &str)] = &[
    ("1.23", "1.11.x"),
    ("1.22", "1.10.x"),
    ("1.21", "1.9.x"),
    ("1.20", "1.8.x"),
    ("1.19", "1.7.x"),
    ("1.18", "1.6.x"),
];

/// Arguments for the detect command.
#[derive(Args)]
pub struct DetectArgs {
    #[arg(long, env = "DOCKER_HOST", hide = true)]
    pub docker_host: Option<String>,

    #[arg(long, env = "DOCKER_TLS_VERIFY", hide = true)]
    pub docker_tls_verify: bool,
}

/// The `/version` fields dvm cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerVersion {
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "ApiVersion", default)]
    pub api_version: String,
}

/// Executes the detect command.
///
/// # Errors
///
/// Returns an error if the daemon cannot be queried, no matching client
/// version exists, or switching to it fails.
pub fn execute(args: &DetectArgs, options: &Options) -> Result<()> {
    tracing::debug!("dvm detect");
    let client = options.http_client()?;
    let mut path = options.activation();

    let server = match args
        .docker_host
        .as_deref()
        .and_then(|host| daemon_url(host, args.docker_tls_verify))
    {
        Some(url) => query_http(&client, &url)?,
        None => {
            let docker = options
                .store()
                .current_path(&path)
                .context("Unable to find a docker client to query the daemon with")?;
            query_cli(&docker)?
        }
    };
    tracing::debug!(
        "Queried /version and got Version: {}, ApiVersion: {}",
        server.version,
        server.api_version
    );

    let version = client_version(&server, || {
        let github = options.github(&client);
        let index = options.store_index(&client)?;
        list_available_versions(&github, &index, true)
    })?;
    tracing::debug!("Detected client version: {version}");

    emit(
        options,
        &options
            .shell
            .render_export(DOCKER_VERSION_VAR, &version.to_string()),
    )?;
    use_cmd::activate(options, &mut path, &version)
}

/// The `/version` URL for a `DOCKER_HOST` value, or `None` when the daemon
/// is not reachable over HTTP (unix sockets, named pipes).
#[must_use]
pub fn daemon_url(docker_host: &str, tls: bool) -> Option<String> {
    let docker_host = docker_host.trim().trim_end_matches('/');
    let address = if let Some(address) = docker_host.strip_prefix("tcp://") {
        let scheme = if tls { "https" } else { "http" };
        format!("{scheme}://{address}")
    } else if docker_host.starts_with("http://") || docker_host.starts_with("https://") {
        docker_host.to_string()
    } else {
        return None;
    };
    Some(format!("{address}/version"))
}

fn query_http(client: &Client, url: &str) -> Result<ServerVersion> {
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Unable to query docker version at {url}"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("Unable to query docker version at {url}: HTTP {status}");
    }
    let body = response
        .text()
        .with_context(|| format!("Unable to read the response from {url}"))?;
    parse_server_version(&body)
}

fn query_cli(docker: &Path) -> Result<ServerVersion> {
    let output = Command::new(docker)
        .args(["version", "--format", "{{json .Server}}"])
        .output()
        .with_context(|| format!("Unable to run {}", docker.display()))?;
    if !output.status.success() {
        bail!(
            "Unable to query docker version: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    parse_server_version(&String::from_utf8_lossy(&output.stdout))
}

/// Parses the JSON returned by `/version`.
///
/// # Errors
///
/// Returns an error if the text is not a JSON object.
pub fn parse_server_version(json: &str) -> Result<ServerVersion> {
    serde_json::from_str(json.trim()).context("Unable to parse the docker version response")
}

/// The client series for a legacy API version.
#[must_use]
pub fn client_range_for_api(api_version: &str) -> Option<&'static str> {
    LEGACY_API_CLIENTS
        .iter()
        .find(|(api, _)| *api == api_version)
        .map(|(_, range)| *range)
}

/// Picks the client version for `server`.
///
/// `available` is only consulted when the daemon does not report a semantic
/// version.
///
/// # Errors
///
/// Returns an error if the API version is unknown, no release matches, or
/// `available` fails.
pub fn client_version(
    server: &ServerVersion,
    available: impl FnOnce() -> Result<Vec<Version>>,
) -> Result<Version> {
    let version = Version::parse(server.version.trim());
    if version.has_semver() {
        return Ok(version);
    }

    tracing::debug!(
        "Attempting to lookup a client version for API version: {}",
        server.api_version
    );
    let Some(range) = client_range_for_api(&server.api_version) else {
        bail!(
            "Unable to detect the proper client version for Docker API version {}",
            server.api_version
        );
    };
    newest_in_range(&available()?, range)?
        .with_context(|| format!("Unable to detect the proper client version for {range}"))
}

fn newest_in_range(versions: &[Version], range: &str) -> Result<Option<Version>> {
    let requirement = semver::VersionReq::parse(range)
        .with_context(|| format!("Invalid version range: {range}"))?;
    Ok(versions
        .iter()
        .rev()
        .find(|version| {
            version
                .semver()
                .is_some_and(|semver| requirement.matches(semver.parsed()))
        })
        .cloned())
}
