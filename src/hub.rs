//! Selenium Grid node registration.
//!
//! A one-shot call made during startup when `--hub=` is configured. The
//! policy is fail-fast: a node that cannot register is misconfigured, so
//! any failure here is reported to the caller, which logs it and exits
//! the process.

use log::{error, info};
use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("invalid hub URL {url}: {reason}")]
    BadUrl { url: String, reason: String },

    #[error("registration POST to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("hub {url} answered {status}: {body}")]
    Rejected {
        url: String,
        status: u16,
        body: String,
    },
}

/// Node-descriptor document POSTed to the hub: one WebDriver capability,
/// one session at a time.
pub fn node_descriptor(
    ip: &str,
    port: u16,
    hub: &Url,
    proxy_class: &str,
    driver_version: &str,
) -> Value {
    json!({
        "capabilities": [
            {
                "browserName": "ghostwire",
                "version": driver_version,
                "platform": std::env::consts::OS.to_uppercase(),
                "maxInstances": 1,
                "seleniumProtocol": "WebDriver",
            }
        ],
        "configuration": {
            "hub": hub.as_str(),
            "hubHost": hub.host_str().unwrap_or_default(),
            "hubPort": hub.port_or_known_default(),
            "host": ip,
            "port": port,
            "url": format!("http://{ip}:{port}"),
            "remoteHost": format!("http://{ip}:{port}"),
            "proxy": proxy_class,
            "maxSession": 1,
            "register": true,
            "registerCycle": 5000,
            "role": "wd",
        },
    })
}

/// Normalize the configured hub URL: always a trailing slash, so the
/// registration path appends cleanly.
pub fn parse_hub_url(raw: &str) -> Result<Url, HubError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| HubError::BadUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Register this node with the grid hub. The hub acknowledges with the
/// literal body `ok`; anything else counts as a rejection.
pub async fn register(
    ip: &str,
    port: u16,
    hub_url: &str,
    proxy_class: &str,
    driver_version: &str,
) -> Result<(), HubError> {
    let hub = parse_hub_url(hub_url)?;
    let endpoint = hub
        .join("grid/register")
        .map_err(|e| HubError::BadUrl {
            url: hub_url.to_string(),
            reason: e.to_string(),
        })?;
    let descriptor = node_descriptor(ip, port, &hub, proxy_class, driver_version);

    info!("registering node {ip}:{port} with grid hub {hub}");
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| HubError::Transport {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
    let response = client
        .post(endpoint.clone())
        .header("Content-Type", "application/json")
        .json(&descriptor)
        .send()
        .await
        .map_err(|e| HubError::Transport {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() || body != "ok" {
        return Err(HubError::Rejected {
            url: endpoint.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    info!("grid hub accepted registration");
    Ok(())
}

/// Log the failure with the hub URL and report the exit code the process
/// should die with. Registration failure is fatal by design: a node that
/// silently stays unregistered helps nobody.
pub fn report_fatal(hub_url: &str, err: &HubError) -> i32 {
    error!("grid registration with {hub_url} failed: {err}");
    1
}
