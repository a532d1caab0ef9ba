use std::collections::BTreeSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::state::{Creature, PlayerProfile, ScanRecord};

pub const PLAYER_FILE: &str = "player.json";
pub const PARTY_FILE: &str = "party.json";
pub const LEDGER_FILE: &str = "ledger.json";
pub const WILD_FILE: &str = "wildpool.json";
pub const OBSERVATIONS_FILE: &str = "observations.csv";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct PartyDoc {
    #[serde(default)]
    size: usize,
    #[serde(default)]
    entries: Vec<Creature>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct LedgerDoc {
    #[serde(default)]
    ids: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct WildDoc {
    #[serde(default)]
    entries: Vec<Creature>,
}

pub fn save_player(dir: &str, profile: &PlayerProfile) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(profile)?;
    write_atomic(&store_path(dir, PLAYER_FILE), &json)
}

pub fn load_player(dir: &str) -> (PlayerProfile, Option<String>) {
    load_or_default(&store_path(dir, PLAYER_FILE))
}

pub fn save_party(dir: &str, members: &[Creature]) -> Result<(), StoreError> {
    let doc = PartyDoc {
        size: members.len(),
        entries: members.to_vec(),
    };
    let json = serde_json::to_string_pretty(&doc)?;
    write_atomic(&store_path(dir, PARTY_FILE), &json)
}

pub fn load_party(dir: &str, capacity: usize) -> (Vec<Creature>, Option<String>) {
    let (doc, warning): (PartyDoc, _) = load_or_default(&store_path(dir, PARTY_FILE));
    let mut entries = doc.entries;
    // The size field is advisory; the entry list truncated to capacity wins,
    // matching how oversized records are tolerated on load.
    entries.truncate(capacity);
    (entries, warning)
}

pub fn save_ledger(dir: &str, ids: &BTreeSet<String>) -> Result<(), StoreError> {
    let doc = LedgerDoc {
        ids: ids.iter().cloned().collect(),
    };
    let json = serde_json::to_string_pretty(&doc)?;
    write_atomic(&store_path(dir, LEDGER_FILE), &json)
}

pub fn load_ledger(dir: &str) -> (BTreeSet<String>, Option<String>) {
    let (doc, warning): (LedgerDoc, _) = load_or_default(&store_path(dir, LEDGER_FILE));
    (doc.ids.into_iter().collect(), warning)
}

/// Advisory snapshot of the current wild pool; never read back as
/// authoritative state.
pub fn save_wild_snapshot(dir: &str, wild: &[Creature]) -> Result<(), StoreError> {
    let doc = WildDoc {
        entries: wild.to_vec(),
    };
    let json = serde_json::to_string_pretty(&doc)?;
    write_atomic(&store_path(dir, WILD_FILE), &json)
}

/// Wigle-style observation export, one row per newly encountered network.
pub fn append_observation(dir: &str, record: &ScanRecord) -> Result<(), StoreError> {
    let path = store_path(dir, OBSERVATIONS_FILE);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
    if file.metadata()?.len() == 0 {
        writeln!(file, "MAC,SSID,AuthMode,Channel,RSSI")?;
    }
    let safe_ssid = record.ssid.replace(',', "_");
    writeln!(
        file,
        "{},{},{},{},{}",
        record.bssid,
        safe_ssid,
        record.security.label(),
        record.channel,
        record.signal
    )?;
    Ok(())
}

fn store_path(dir: &str, file: &str) -> PathBuf {
    Path::new(dir).join(file)
}

/// Write to completion in a sibling temp file, then rename over the store,
/// so readers always see either the old or the new document.
fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Missing stores are a fresh start; corrupt stores fall back to defaults
/// with a warning instead of failing the boot sequence.
fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> (T, Option<String>) {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return (T::default(), None),
        Err(err) => {
            return (
                T::default(),
                Some(format!("Failed to read {}: {err}", path.display())),
            )
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => (value, None),
        Err(err) => (
            T::default(),
            Some(format!(
                "Corrupt {} ({err}); starting from defaults",
                path.display()
            )),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::SecurityClass;
    use crate::state::Creature;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_dir(tag: &str) -> String {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "packetpals-persist-{}-{}-{}",
            std::process::id(),
            tag,
            unique
        ));
        let _ = fs::remove_dir_all(&dir);
        dir.to_string_lossy().to_string()
    }

    #[test]
    fn player_round_trip() {
        let dir = temp_dir("player");
        let profile = PlayerProfile {
            name: "Ash".to_string(),
            level: 7,
            has_starter: true,
        };
        save_player(&dir, &profile).unwrap();
        let (loaded, warning) = load_player(&dir);
        assert_eq!(loaded, profile);
        assert!(warning.is_none());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_stores_default_silently() {
        let dir = temp_dir("missing");
        let (profile, warning) = load_player(&dir);
        assert_eq!(profile, PlayerProfile::default());
        assert!(warning.is_none());
        let (party, warning) = load_party(&dir, 3);
        assert!(party.is_empty());
        assert!(warning.is_none());
        let (ledger, warning) = load_ledger(&dir);
        assert!(ledger.is_empty());
        assert!(warning.is_none());
    }

    #[test]
    fn corrupt_store_warns_and_defaults() {
        let dir = temp_dir("corrupt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(Path::new(&dir).join(LEDGER_FILE), "{not json").unwrap();
        let (ledger, warning) = load_ledger(&dir);
        assert!(ledger.is_empty());
        assert!(warning.is_some());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn party_load_truncates_to_capacity() {
        let dir = temp_dir("truncate");
        let mut member = Creature::starter();
        member.name = "Overflow".to_string();
        let members = vec![member.clone(), member.clone(), member.clone(), member];
        save_party(&dir, &members).unwrap();
        let (loaded, _) = load_party(&dir, 3);
        assert_eq!(loaded.len(), 3);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn party_entries_default_absent_fields() {
        let dir = temp_dir("defaults");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            Path::new(&dir).join(PARTY_FILE),
            r#"{"size":1,"entries":[{"name":"Oldpal","level":4}]}"#,
        )
        .unwrap();
        let (loaded, warning) = load_party(&dir, 3);
        assert!(warning.is_none());
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Oldpal");
        assert_eq!(loaded[0].level, 4);
        assert_eq!(loaded[0].hp, 30);
        assert_eq!(loaded[0].defense, 5);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn observation_rows_append_with_header() {
        let dir = temp_dir("csv");
        let record = ScanRecord {
            bssid: "AA:BB:CC:DD:EE:FF".to_string(),
            ssid: "Cafe, Upstairs".to_string(),
            signal: -61,
            security: SecurityClass::Wpa2Psk,
            channel: 6,
        };
        append_observation(&dir, &record).unwrap();
        append_observation(&dir, &record).unwrap();
        let contents =
            fs::read_to_string(Path::new(&dir).join(OBSERVATIONS_FILE)).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "MAC,SSID,AuthMode,Channel,RSSI");
        assert!(lines[1].contains("Cafe_ Upstairs"));
        let _ = fs::remove_dir_all(&dir);
    }
}
