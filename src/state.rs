use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};
use tui_dispatch_debug::debug::{DebugSection, DebugState};

use crate::rules::{self, Ability, Rarity, SecurityClass};

pub const DEFAULT_PARTY_CAPACITY: usize = 3;

/// One observed network, as delivered by the scanner in a batch.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScanRecord {
    pub bssid: String,
    #[serde(default)]
    pub ssid: String,
    /// Approximate dBm; stronger is less negative.
    pub signal: i32,
    pub security: SecurityClass,
    #[serde(default)]
    pub channel: u16,
}
pub const STARTER_NAME: &str = "Bytepup";
pub const STARTER_ATTACK: i32 = 10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Creature {
    /// BSSID the creature was generated from; absent for the starter.
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default = "default_creature_name")]
    pub name: String,
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(default = "default_hp")]
    pub hp: i32,
    #[serde(default = "default_attack")]
    pub attack: i32,
    #[serde(default = "default_defense")]
    pub defense: i32,
    #[serde(default = "default_rarity")]
    pub rarity: Rarity,
    #[serde(default = "default_ability")]
    pub ability: Ability,
}

impl Creature {
    pub fn starter() -> Self {
        let (hp, defense) = rules::level_to_stats(1);
        Self {
            source_id: None,
            name: STARTER_NAME.to_string(),
            level: 1,
            hp,
            attack: STARTER_ATTACK,
            defense,
            rarity: Rarity::Common,
            ability: Ability::None,
        }
    }

    /// Recompute hp and defense from level, discarding battle damage.
    pub fn rest(&mut self) {
        self.level = rules::clamp_level(self.level as i32);
        let (hp, defense) = rules::level_to_stats(self.level);
        self.hp = hp;
        self.defense = defense;
        self.attack = rules::clamp(self.attack, rules::STAT_MIN, rules::STAT_MAX);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlayerProfile {
    #[serde(default = "default_player_name")]
    pub name: String,
    #[serde(default = "default_level")]
    pub level: u8,
    #[serde(default)]
    pub has_starter: bool,
}

impl Default for PlayerProfile {
    fn default() -> Self {
        Self {
            name: default_player_name(),
            level: 1,
            has_starter: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Party {
    pub members: Vec<Creature>,
    pub capacity: usize,
}

impl Party {
    pub fn new(capacity: usize) -> Self {
        Self {
            members: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    pub fn get(&self, slot: usize) -> Option<&Creature> {
        self.members.get(slot)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TurnActor {
    Player,
    Wild,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BattleOutcome {
    Win,
    Loss,
    Draw,
    Fled,
    Captured,
}

impl BattleOutcome {
    pub fn label(self) -> &'static str {
        match self {
            BattleOutcome::Win => "Win",
            BattleOutcome::Loss => "Loss",
            BattleOutcome::Draw => "Draw",
            BattleOutcome::Fled => "Fled",
            BattleOutcome::Captured => "Captured",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BattleCommand {
    Attack,
    Defend,
    Capture,
    Run,
}

impl BattleCommand {
    pub const ALL: [BattleCommand; 4] = [
        BattleCommand::Attack,
        BattleCommand::Defend,
        BattleCommand::Capture,
        BattleCommand::Run,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BattleCommand::Attack => "Attack",
            BattleCommand::Defend => "Defend",
            BattleCommand::Capture => "Capture",
            BattleCommand::Run => "Run",
        }
    }
}

/// One battle, from start to a terminal outcome. Holds stat snapshots of
/// both combatants; the party and pool copies are only touched at session
/// end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BattleSession {
    pub party_slot: usize,
    pub wild_index: usize,
    pub player_name: String,
    pub wild_name: String,
    pub player_hp: i32,
    pub player_hp_max: i32,
    pub wild_hp: i32,
    pub wild_hp_max: i32,
    /// The party creature opens every exchange.
    pub attacker: TurnActor,
    pub outcome: Option<BattleOutcome>,
    pub message: String,
    #[serde(default)]
    pub menu_index: usize,
}

impl BattleSession {
    pub fn ended(&self) -> bool {
        self.outcome.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GameState {
    pub profile: PlayerProfile,
    pub party: Party,
    pub ledger: BTreeSet<String>,
    pub wild: Vec<Creature>,
    pub battle: Option<BattleSession>,
    pub rng_seed: u64,
    pub save_dir: String,
}

impl GameState {
    pub fn new(save_dir: String, capacity: usize, seed: u64) -> Self {
        Self {
            profile: PlayerProfile::default(),
            party: Party::new(capacity),
            ledger: BTreeSet::new(),
            wild: Vec::new(),
            battle: None,
            rng_seed: seed,
            save_dir,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Pane {
    Party,
    Wild,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum LogSpeaker {
    System,
    Scan,
    Battle,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LogEntry {
    pub speaker: LogSpeaker,
    pub text: String,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AppState {
    pub terminal_size: (u16, u16),
    pub pane: Pane,
    pub selected_party: usize,
    pub selected_wild: usize,
    pub scanning: bool,
    #[serde(default)]
    pub spinner_frame: u8,
    pub log: Vec<LogEntry>,
    #[serde(default)]
    pub startup_warnings: Vec<String>,
    pub game: GameState,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(GameState::new(
            ".".to_string(),
            DEFAULT_PARTY_CAPACITY,
            seed_from_time(),
        ))
    }
}

impl AppState {
    pub fn new(game: GameState) -> Self {
        Self {
            terminal_size: (80, 24),
            pane: Pane::Wild,
            selected_party: 0,
            selected_wild: 0,
            scanning: false,
            spinner_frame: 0,
            log: Vec::new(),
            startup_warnings: Vec::new(),
            game,
        }
    }

    pub fn push_log(&mut self, speaker: LogSpeaker, text: impl Into<String>) {
        self.log.push(LogEntry {
            speaker,
            text: text.into(),
            timestamp: current_timestamp(),
        });
    }

    /// Keep panel selections valid after the lists change size.
    pub fn clamp_selections(&mut self) {
        let party_len = self.game.party.len();
        if self.selected_party >= party_len {
            self.selected_party = party_len.saturating_sub(1);
        }
        let wild_len = self.game.wild.len();
        if self.selected_wild >= wild_len {
            self.selected_wild = wild_len.saturating_sub(1);
        }
    }
}

impl DebugState for AppState {
    fn debug_sections(&self) -> Vec<DebugSection> {
        let mut sections = vec![
            DebugSection::new("Player")
                .entry("name", self.game.profile.name.clone())
                .entry("level", self.game.profile.level.to_string())
                .entry("has_starter", self.game.profile.has_starter.to_string()),
            DebugSection::new("Collections")
                .entry(
                    "party",
                    format!("{}/{}", self.game.party.len(), self.game.party.capacity),
                )
                .entry("wild", self.game.wild.len().to_string())
                .entry("ledger", self.game.ledger.len().to_string()),
        ];

        if let Some(battle) = &self.game.battle {
            sections.push(
                DebugSection::new("Battle")
                    .entry("wild", battle.wild_name.clone())
                    .entry("player_hp", battle.player_hp.to_string())
                    .entry("wild_hp", battle.wild_hp.to_string())
                    .entry("outcome", format!("{:?}", battle.outcome)),
            );
        }

        sections
    }
}

pub fn seed_from_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn default_creature_name() -> String {
    "Unnamed".to_string()
}

fn default_player_name() -> String {
    "NoName".to_string()
}

fn default_level() -> u8 {
    1
}

fn default_hp() -> i32 {
    30
}

fn default_attack() -> i32 {
    10
}

fn default_defense() -> i32 {
    5
}

fn default_rarity() -> Rarity {
    Rarity::Common
}

fn default_ability() -> Ability {
    Ability::None
}
