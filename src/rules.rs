use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const LEVEL_MIN: i32 = 1;
pub const LEVEL_MAX: i32 = 99;
pub const STAT_MIN: i32 = 1;
pub const STAT_MAX: i32 = 999;
pub const WILD_HP_FLOOR: i32 = 10;
pub const CAPTURE_CHANCE: u32 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Legendary,
}

impl Rarity {
    pub fn label(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::Legendary => "Legendary",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Ability {
    None,
    Shield,
    Pierce,
    Invisibility,
}

impl Ability {
    pub fn label(self) -> &'static str {
        match self {
            Ability::None => "None",
            Ability::Shield => "Shield",
            Ability::Pierce => "Pierce",
            Ability::Invisibility => "Invisibility",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum SecurityClass {
    Open,
    Wep,
    Wpa2Psk,
    WpaWpa2Psk,
    Wpa2Enterprise,
    Unknown,
}

impl SecurityClass {
    /// Accepts both nmcli SECURITY words ("WPA2", "WPA1 WPA2", "802.1X")
    /// and the firmware-style tokens ("OPEN", "WPA_WPA2_PSK", ...).
    pub fn from_label(label: &str) -> SecurityClass {
        let norm = label.trim().to_ascii_uppercase();
        if norm.is_empty() || norm == "--" || norm == "OPEN" {
            return SecurityClass::Open;
        }
        if norm.contains("802.1X") || norm.contains("EAP") || norm.contains("ENTERPRISE") {
            return SecurityClass::Wpa2Enterprise;
        }
        if norm.contains("WEP") {
            return SecurityClass::Wep;
        }
        let modern = norm.contains("WPA2") || norm.contains("WPA3");
        let legacy = norm.contains("WPA1") || norm.contains("WPA_WPA2") || norm == "WPA";
        match (legacy, modern) {
            (true, _) => SecurityClass::WpaWpa2Psk,
            (false, true) => SecurityClass::Wpa2Psk,
            (false, false) => SecurityClass::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SecurityClass::Open => "Open",
            SecurityClass::Wep => "WEP",
            SecurityClass::Wpa2Psk => "WPA2",
            SecurityClass::WpaWpa2Psk => "WPA/WPA2",
            SecurityClass::Wpa2Enterprise => "WPA2-Enterprise",
            SecurityClass::Unknown => "Unknown",
        }
    }
}

pub fn clamp(value: i32, min: i32, max: i32) -> i32 {
    value.max(min).min(max)
}

pub fn clamp_level(level: i32) -> u8 {
    clamp(level, LEVEL_MIN, LEVEL_MAX) as u8
}

/// Fixed linear stat curve. Recomputing from the same level always yields
/// the same pair, which is what makes post-battle "resting" idempotent.
pub fn level_to_stats(level: u8) -> (i32, i32) {
    let level = clamp(level as i32, LEVEL_MIN, LEVEL_MAX);
    let hp = 30 + 5 * (level - 1);
    let defense = 5 + (level - 1);
    (hp, defense)
}

/// Stronger signal (less negative dBm) means a beefier creature.
pub fn signal_to_hp(signal: i32) -> i32 {
    clamp(100 + (signal + 100), WILD_HP_FLOOR, STAT_MAX)
}

pub fn attack_base(class: SecurityClass) -> i32 {
    match class {
        SecurityClass::Open => 5,
        SecurityClass::Wep => 10,
        SecurityClass::Wpa2Psk => 20,
        SecurityClass::WpaWpa2Psk => 20,
        SecurityClass::Wpa2Enterprise => 15,
        SecurityClass::Unknown => 15,
    }
}

pub fn rarity_for(class: SecurityClass) -> Rarity {
    match class {
        SecurityClass::Open => Rarity::Common,
        SecurityClass::Wep => Rarity::Uncommon,
        SecurityClass::Wpa2Psk => Rarity::Rare,
        SecurityClass::WpaWpa2Psk => Rarity::Rare,
        SecurityClass::Wpa2Enterprise => Rarity::Legendary,
        SecurityClass::Unknown => Rarity::Legendary,
    }
}

pub fn ability_for(class: SecurityClass) -> Ability {
    match class {
        SecurityClass::Open => Ability::None,
        SecurityClass::Wep => Ability::Pierce,
        SecurityClass::Wpa2Psk => Ability::Shield,
        SecurityClass::WpaWpa2Psk => Ability::Invisibility,
        SecurityClass::Wpa2Enterprise => Ability::Invisibility,
        SecurityClass::Unknown => Ability::Invisibility,
    }
}

pub fn next_u32(seed: &mut u64) -> u32 {
    *seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (*seed >> 32) as u32
}

/// Inclusive on both ends.
pub fn roll_range(seed: &mut u64, min: i32, max: i32) -> i32 {
    if min >= max {
        return min;
    }
    let span = (max - min + 1) as u32;
    min + (next_u32(seed) % span) as i32
}

pub fn percent_roll(seed: &mut u64) -> u32 {
    next_u32(seed) % 100
}

pub fn attack_damage(seed: &mut u64) -> i32 {
    roll_range(seed, 1, 5)
}

pub fn counter_damage(seed: &mut u64) -> i32 {
    roll_range(seed, 1, 4)
}

pub fn defend_damage(seed: &mut u64) -> i32 {
    (roll_range(seed, 1, 4) / 2).max(1)
}

pub const NAME_PREFIXES: &[&str] = &[
    "Packa", "Byte", "Net", "Ping", "Data", "Glitch", "Cypher", "Wire", "Flow", "Spark", "Bug",
    "Volt", "Wave", "Beacon", "Link",
];

pub const NAME_SUFFIXES: &[&str] = &[
    "pal", "bot", "ling", "zard", "tron", "pup", "geist", "buddy", "drone",
];

pub fn creature_name(seed: &mut u64) -> String {
    let prefix = NAME_PREFIXES[(next_u32(seed) as usize) % NAME_PREFIXES.len()];
    let suffix = NAME_SUFFIXES[(next_u32(seed) as usize) % NAME_SUFFIXES.len()];
    format!("{prefix}{suffix}")
}
