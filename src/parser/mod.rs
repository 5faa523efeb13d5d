//! Scanner output parsing
//!
//! Deserializes nmap XML (`-oX -`) into normalized [`HostRecord`]s. Pure
//! and deterministic: host order follows the document, duplicates pass
//! through untouched, and zero discovered hosts is a valid result.

use serde::Deserialize;

use crate::error::{Result, ScanError};
use crate::models::HostRecord;

#[derive(Debug, Deserialize)]
struct NmapRun {
    #[serde(rename = "host", default)]
    hosts: Vec<NmapHost>,
}

#[derive(Debug, Deserialize)]
struct NmapHost {
    status: Option<NmapStatus>,
    #[serde(rename = "address", default)]
    addresses: Vec<NmapAddress>,
    hostnames: Option<NmapHostnames>,
    ports: Option<NmapPorts>,
}

#[derive(Debug, Deserialize)]
struct NmapStatus {
    #[serde(rename = "@state")]
    state: String,
}

#[derive(Debug, Deserialize)]
struct NmapAddress {
    #[serde(rename = "@addr")]
    addr: String,
    #[serde(rename = "@addrtype")]
    addr_type: String,
}

#[derive(Debug, Deserialize)]
struct NmapHostnames {
    #[serde(rename = "hostname", default)]
    hostnames: Vec<NmapHostname>,
}

#[derive(Debug, Deserialize)]
struct NmapHostname {
    #[serde(rename = "@name")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct NmapPorts {
    #[serde(rename = "port", default)]
    ports: Vec<NmapPort>,
}

#[derive(Debug, Deserialize)]
struct NmapPort {
    #[serde(rename = "@protocol")]
    protocol: String,
    #[serde(rename = "@portid")]
    port_id: u16,
    state: Option<NmapPortState>,
    service: Option<NmapService>,
}

#[derive(Debug, Deserialize)]
struct NmapPortState {
    #[serde(rename = "@state")]
    state: String,
}

#[derive(Debug, Deserialize)]
struct NmapService {
    #[serde(rename = "@name")]
    name: String,
}

/// Parses raw scanner XML into host records.
///
/// Empty output means zero hosts, not an error; anything non-empty that is
/// not well-formed nmap XML is a [`ScanError::Parse`].
pub fn parse_scan_output(raw: &str) -> Result<Vec<HostRecord>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let run: NmapRun =
        quick_xml::de::from_str(raw).map_err(|e| ScanError::Parse(e.to_string()))?;

    let mut records = Vec::new();
    for host in run.hosts {
        // Hosts nmap reports as down carry no inventory value.
        if let Some(status) = &host.status {
            if status.state != "up" {
                continue;
            }
        }
        let Some(address) = pick_address(&host.addresses) else {
            continue;
        };
        let hostname = host
            .hostnames
            .as_ref()
            .and_then(|h| h.hostnames.first())
            .map(|h| h.name.clone());
        records.push(HostRecord {
            address,
            hostname,
            description: service_summary(host.ports.as_ref()),
        });
    }
    Ok(records)
}

/// Prefers the IPv4 address; MAC-only entries are not addressable targets.
fn pick_address(addresses: &[NmapAddress]) -> Option<String> {
    addresses
        .iter()
        .find(|a| a.addr_type == "ipv4")
        .or_else(|| addresses.iter().find(|a| a.addr_type == "ipv6"))
        .map(|a| a.addr.clone())
}

fn service_summary(ports: Option<&NmapPorts>) -> Option<String> {
    let ports = ports?;
    let parts: Vec<String> = ports
        .ports
        .iter()
        .filter(|p| {
            p.state
                .as_ref()
                .map(|s| s.state == "open")
                .unwrap_or(false)
        })
        .map(|p| {
            let service = p
                .service
                .as_ref()
                .map(|s| s.name.as_str())
                .unwrap_or("unknown");
            format!("{}/{} {}", p.port_id, p.protocol, service)
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}
