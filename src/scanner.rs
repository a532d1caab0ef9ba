use serde::Deserialize;
use tokio::process::Command;

use crate::rules::SecurityClass;
use crate::state::ScanRecord;

#[derive(Clone, Debug)]
pub enum ScanSource {
    Nmcli,
    File(String),
}

pub async fn scan_networks(source: &ScanSource) -> Result<Vec<ScanRecord>, String> {
    match source {
        ScanSource::Nmcli => scan_nmcli().await,
        ScanSource::File(path) => scan_file(path).await,
    }
}

async fn scan_nmcli() -> Result<Vec<ScanRecord>, String> {
    let output = Command::new("nmcli")
        .args([
            "-t",
            "-f",
            "BSSID,SSID,SIGNAL,SECURITY,CHAN",
            "device",
            "wifi",
            "list",
            "--rescan",
            "yes",
        ])
        .output()
        .await
        .map_err(|err| format!("Failed to run nmcli: {err}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("nmcli failed: {}", stderr.trim()));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_terse_output(&stdout))
}

async fn scan_file(path: &str) -> Result<Vec<ScanRecord>, String> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| format!("Failed to read scan file {path}: {err}"))?;
    parse_scan_doc(&contents)
}

pub fn parse_terse_output(output: &str) -> Vec<ScanRecord> {
    output.lines().filter_map(parse_terse_line).collect()
}

fn parse_terse_line(line: &str) -> Option<ScanRecord> {
    let fields = split_unescaped(line, ':');
    if fields.len() < 5 {
        return None;
    }
    let bssid = fields[0].trim();
    if bssid.is_empty() {
        return None;
    }
    let strength: i32 = fields[2].trim().parse().ok()?;
    Some(ScanRecord {
        bssid: bssid.to_string(),
        ssid: fields[1].trim().to_string(),
        // nmcli reports signal as 0-100; approximate dBm for the factory.
        signal: strength / 2 - 100,
        security: SecurityClass::from_label(&fields[3]),
        channel: fields[4].trim().parse().unwrap_or(0),
    })
}

/// nmcli terse output separates fields with ':' and escapes the literal
/// colons inside BSSIDs with a backslash.
fn split_unescaped(line: &str, sep: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                current.push(next);
            }
        } else if ch == sep {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    fields.push(current);
    fields
}

/// Recorded scan batch, in the firmware's scanned_data.json shape.
#[derive(Clone, Debug, Default, Deserialize)]
struct ScanDoc {
    #[serde(default)]
    networks: Vec<NetworkEntry>,
}

#[derive(Clone, Debug, Deserialize)]
struct NetworkEntry {
    bssid: Option<String>,
    #[serde(default)]
    ssid: String,
    #[serde(default = "default_rssi")]
    rssi: i32,
    #[serde(default)]
    encryption: String,
    #[serde(default)]
    channel: u16,
}

fn default_rssi() -> i32 {
    -70
}

pub fn parse_scan_doc(contents: &str) -> Result<Vec<ScanRecord>, String> {
    let doc: ScanDoc =
        serde_json::from_str(contents).map_err(|err| format!("Scan file parse error: {err}"))?;
    Ok(doc
        .networks
        .into_iter()
        .filter_map(|net| {
            let bssid = net.bssid?;
            Some(ScanRecord {
                bssid,
                ssid: net.ssid,
                signal: net.rssi,
                security: SecurityClass::from_label(&net.encryption),
                channel: net.channel,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terse_line_unescapes_bssid() {
        let line = r"AA\:BB\:CC\:DD\:EE\:FF:HomeNet:72:WPA2:11";
        let records = parse_terse_output(line);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.bssid, "AA:BB:CC:DD:EE:FF");
        assert_eq!(record.ssid, "HomeNet");
        assert_eq!(record.signal, 72 / 2 - 100);
        assert_eq!(record.security, SecurityClass::Wpa2Psk);
        assert_eq!(record.channel, 11);
    }

    #[test]
    fn terse_output_skips_malformed_lines() {
        let output = "garbage\n\nAA\\:BB\\:CC\\:DD\\:EE\\:01:Net:40::6\n";
        let records = parse_terse_output(output);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].security, SecurityClass::Open);
    }

    #[test]
    fn scan_doc_parses_firmware_shape() {
        let contents = r#"{
            "networks": [
                {"bssid": "AA:BB:CC:DD:EE:02", "ssid": "Lab", "rssi": -48, "encryption": "WPA2_PSK", "channel": 1},
                {"ssid": "no-bssid", "rssi": -80, "encryption": "OPEN"},
                {"bssid": "AA:BB:CC:DD:EE:03"}
            ]
        }"#;
        let records = parse_scan_doc(contents).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].security, SecurityClass::Wpa2Psk);
        assert_eq!(records[1].signal, -70);
        assert_eq!(records[1].security, SecurityClass::Open);
    }

    #[test]
    fn scan_doc_rejects_bad_json() {
        assert!(parse_scan_doc("{nope").is_err());
    }
}
