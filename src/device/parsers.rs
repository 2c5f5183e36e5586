//! OS-specific output parsers.
//!
//! Pure functions from raw CLI output to key/value maps. Parsing never
//! fails: when nothing matches, the map carries a single bounded
//! `raw_output` entry so the caller always has something to show. Keys
//! are ordered for stable display.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::device::os::DeviceOs;

pub type ParsedOutput = BTreeMap<String, String>;

pub const RAW_OUTPUT_KEY: &str = "raw_output";

/// Bound on the `raw_output` fallback entry.
const RAW_OUTPUT_LIMIT: usize = 500;

static CISCO_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Cisco (.*?) Software").expect("valid regex"));
static CISCO_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Version\s+([\d.]+)").expect("valid regex"));
static CISCO_UPTIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)uptime is (.+)$").expect("valid regex"));
static CISCO_SERIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Serial Number\s*:\s*([A-Z0-9]+)").expect("valid regex"));
static JUNOS_RELEASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Release\s+([\d.]+)").expect("valid regex"));
static ROUTER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9.]+),").expect("valid regex"));
static LOCAL_AS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AS (\d+)").expect("valid regex"));
static NEIGHBOR_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\d+\.\d+\.\d+").expect("valid regex"));

/// Parse `show version` output for the given OS family.
#[must_use]
pub fn parse_show_version(output: &str, os: &DeviceOs) -> ParsedOutput {
    match os {
        DeviceOs::CiscoIos => cisco_version(output),
        DeviceOs::AristaEos => arista_version(output),
        DeviceOs::JuniperJunos => juniper_version(output),
        DeviceOs::SonicCli => sonic_version(output),
        DeviceOs::Other(_) => raw_fallback(output),
    }
}

/// Parse BGP summary output for the given OS family.
#[must_use]
pub fn parse_bgp_summary(output: &str, os: &DeviceOs) -> ParsedOutput {
    match os {
        DeviceOs::CiscoIos => cisco_bgp(output),
        DeviceOs::AristaEos | DeviceOs::SonicCli => frr_style_bgp(output),
        DeviceOs::JuniperJunos => juniper_bgp(output),
        DeviceOs::Other(_) => raw_fallback(output),
    }
}

/// Bounded raw passthrough, truncated on a char boundary.
#[must_use]
pub fn raw_fallback(output: &str) -> ParsedOutput {
    let mut cut = RAW_OUTPUT_LIMIT.min(output.len());
    while !output.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut map = ParsedOutput::new();
    map.insert(RAW_OUTPUT_KEY.to_string(), output[..cut].to_string());
    map
}

fn or_raw(map: ParsedOutput, output: &str) -> ParsedOutput {
    if map.is_empty() { raw_fallback(output) } else { map }
}

/// Value after the first colon on a labeled line.
fn after_colon(line: &str) -> Option<String> {
    line.splitn(2, ':').nth(1).map(|v| v.trim().to_string())
}

fn cisco_version(output: &str) -> ParsedOutput {
    let mut data = ParsedOutput::new();
    if let Some(captures) = CISCO_MODEL.captures(output) {
        data.insert("Model".to_string(), captures[1].trim().to_string());
    }
    if let Some(captures) = CISCO_VERSION.captures(output) {
        data.insert("IOS_Version".to_string(), captures[1].to_string());
    }
    if let Some(captures) = CISCO_UPTIME.captures(output) {
        data.insert("Uptime".to_string(), captures[1].trim().to_string());
    }
    if let Some(captures) = CISCO_SERIAL.captures(output) {
        data.insert("Serial".to_string(), captures[1].to_string());
    }
    or_raw(data, output)
}

fn cisco_bgp(output: &str) -> ParsedOutput {
    let mut data = ParsedOutput::new();
    for line in output.lines() {
        if line.contains("BGP router identifier") {
            if let Some(captures) = ROUTER_ID.captures(line) {
                data.insert("Router_ID".to_string(), captures[1].to_string());
            }
        }
    }

    let neighbor_count = output
        .lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            lower.contains("neighbor") && (lower.contains("up") || lower.contains("down"))
        })
        .count();
    if neighbor_count > 0 {
        data.insert("BGP_Neighbors".to_string(), neighbor_count.to_string());
    }

    or_raw(data, output)
}

fn arista_version(output: &str) -> ParsedOutput {
    let mut data = ParsedOutput::new();
    for line in output.lines() {
        if line.contains("Model:") {
            if let Some(v) = after_colon(line) {
                data.insert("Model".to_string(), v);
            }
        } else if line.contains("System uptime:") {
            if let Some(v) = after_colon(line) {
                data.insert("Uptime".to_string(), v);
            }
        } else if line.contains("Software image version:") {
            if let Some(v) = after_colon(line) {
                data.insert("EOS_Version".to_string(), v);
            }
        } else if line.contains("Serial number:") {
            if let Some(v) = after_colon(line) {
                data.insert("Serial".to_string(), v);
            }
        }
    }
    or_raw(data, output)
}

/// EOS and SONiC both front their BGP with an FRR-style summary: an AS
/// header line and one row per neighbor address.
fn frr_style_bgp(output: &str) -> ParsedOutput {
    let mut data = ParsedOutput::new();
    for line in output.lines() {
        if line.contains("BGP summary") {
            if let Some(captures) = LOCAL_AS.captures(line) {
                data.insert("AS_Number".to_string(), captures[1].to_string());
            }
        }
    }

    let neighbor_count = output
        .lines()
        .filter(|line| NEIGHBOR_ROW.is_match(line))
        .count();
    if neighbor_count > 0 {
        data.insert("BGP_Neighbors".to_string(), neighbor_count.to_string());
    }

    or_raw(data, output)
}

fn juniper_version(output: &str) -> ParsedOutput {
    let mut data = ParsedOutput::new();
    for line in output.lines() {
        if line.contains("Model:") {
            if let Some(v) = after_colon(line) {
                data.insert("Model".to_string(), v);
            }
        } else if line.contains("JUNOS Software Release") {
            if let Some(captures) = JUNOS_RELEASE.captures(line) {
                data.insert("JUNOS_Version".to_string(), captures[1].to_string());
            }
        } else if line.contains("Serial ID:") {
            if let Some(v) = after_colon(line) {
                data.insert("Serial".to_string(), v);
            }
        }
    }
    or_raw(data, output)
}

fn juniper_bgp(output: &str) -> ParsedOutput {
    let mut data = ParsedOutput::new();
    for line in output.lines() {
        if line.contains("Router ID:") {
            if let Some(v) = after_colon(line) {
                data.insert("Router_ID".to_string(), v);
            }
        } else if line.contains("Local AS:") {
            if let Some(v) = after_colon(line) {
                data.insert("AS_Number".to_string(), v);
            }
        }
    }
    or_raw(data, output)
}

fn sonic_version(output: &str) -> ParsedOutput {
    let mut data = ParsedOutput::new();
    for line in output.lines() {
        if line.contains("Platform:") {
            if let Some(v) = after_colon(line) {
                data.insert("Platform".to_string(), v);
            }
        } else if line.contains("SONiC Software Version:") {
            if let Some(v) = after_colon(line) {
                data.insert("Sonic_Version".to_string(), v);
            }
        } else if line.contains("System uptime:") {
            if let Some(v) = after_colon(line) {
                data.insert("Uptime".to_string(), v);
            }
        }
    }
    or_raw(data, output)
}

/// Render a parsed map for console display. The raw fallback is printed
/// as-is; structured entries get aligned key/value lines.
#[must_use]
pub fn format_output(parsed: &ParsedOutput) -> String {
    if parsed.is_empty() {
        return "No output".to_string();
    }

    let lines: Vec<String> = parsed
        .iter()
        .filter(|(key, _)| key.as_str() != RAW_OUTPUT_KEY)
        .map(|(key, value)| format!("  {key:20} : {value}"))
        .collect();

    if lines.is_empty() {
        parsed
            .get(RAW_OUTPUT_KEY)
            .cloned()
            .unwrap_or_else(|| "No data parsed".to_string())
    } else {
        lines.join("\n")
    }
}
