//! Engine-level scenario tests driven against a throwaway save directory.

use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};

use packetpals::game::{self, GameError};
use packetpals::persist;
use packetpals::rules::{self, Ability, Rarity, SecurityClass};
use packetpals::state::{
    BattleCommand, BattleOutcome, Creature, GameState, ScanRecord, STARTER_NAME,
};
use pretty_assertions::assert_eq;

fn temp_dir(tag: &str) -> String {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "packetpals-game-{}-{}-{}",
        std::process::id(),
        tag,
        unique
    ));
    let _ = fs::remove_dir_all(&dir);
    dir.to_string_lossy().to_string()
}

fn fresh_game(tag: &str, capacity: usize, seed: u64) -> GameState {
    let (game, warnings) = game::load(&temp_dir(tag), capacity, seed);
    assert!(warnings.is_empty());
    game
}

fn record(bssid: &str, signal: i32, security: SecurityClass) -> ScanRecord {
    ScanRecord {
        bssid: bssid.to_string(),
        ssid: format!("net-{bssid}"),
        signal,
        security,
        channel: 6,
    }
}

fn crafted_wild(name: &str, level: u8, hp: i32) -> Creature {
    Creature {
        source_id: Some(format!("craft-{name}")),
        name: name.to_string(),
        level,
        hp,
        attack: 10,
        defense: 5,
        rarity: Rarity::Common,
        ability: Ability::None,
    }
}

/// First seed at or above `from` whose next percent roll lands as asked.
fn seed_with_capture_roll(from: u64, success: bool) -> u64 {
    let mut candidate = from;
    loop {
        let mut probe = candidate;
        let rolled = rules::percent_roll(&mut probe) < rules::CAPTURE_CHANCE;
        if rolled == success {
            return candidate;
        }
        candidate += 1;
    }
}

fn cleanup(game: &GameState) {
    let _ = fs::remove_dir_all(&game.save_dir);
}

#[test]
fn fresh_boot_defaults_then_starter() {
    let mut game = fresh_game("starter", 3, 1);
    assert_eq!(game.profile.level, 1);
    assert!(!game.profile.has_starter);
    assert!(game.party.is_empty());

    assert!(game::ensure_starter(&mut game).unwrap());
    assert_eq!(game.party.len(), 1);
    assert_eq!(game.party.members[0].name, STARTER_NAME);
    assert!(game.profile.has_starter);

    // Idempotent on the second call.
    assert!(!game::ensure_starter(&mut game).unwrap());
    assert_eq!(game.party.len(), 1);

    // Both stores survived the restart.
    let (reloaded, warnings) = game::load(&game.save_dir, 3, 2);
    assert!(warnings.is_empty());
    assert!(reloaded.profile.has_starter);
    assert_eq!(reloaded.party.len(), 1);
    cleanup(&game);
}

#[test]
fn scan_batches_are_deduplicated() {
    let mut game = fresh_game("dedup", 3, 99);
    let batch = vec![record("AA:BB", -50, SecurityClass::Open)];

    let summary = game::ingest_scan(&mut game, &batch).unwrap();
    assert_eq!(summary.added, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(game.wild.len(), 1);
    let creature = &game.wild[0];
    assert_eq!(creature.rarity, Rarity::Common);
    assert_eq!(creature.ability, Ability::None);
    assert_eq!(creature.source_id.as_deref(), Some("AA:BB"));

    let summary = game::ingest_scan(&mut game, &batch).unwrap();
    assert_eq!(summary.added, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(game.wild.len(), 1);
    cleanup(&game);
}

#[test]
fn ledger_survives_restart() {
    let mut game = fresh_game("ledger", 3, 5);
    let batch = vec![record("CC:DD", -60, SecurityClass::Wep)];
    game::ingest_scan(&mut game, &batch).unwrap();

    let (mut reloaded, warnings) = game::load(&game.save_dir, 3, 6);
    assert!(warnings.is_empty());
    assert!(game::is_known(&reloaded, "CC:DD"));
    let summary = game::ingest_scan(&mut reloaded, &batch).unwrap();
    assert_eq!(summary.added, 0);
    assert!(reloaded.wild.is_empty());
    cleanup(&game);
}

#[test]
fn record_seen_is_idempotent() {
    let mut game = fresh_game("seen", 3, 5);
    game::record_seen(&mut game, "EE:FF").unwrap();
    game::record_seen(&mut game, "EE:FF").unwrap();
    assert_eq!(game.ledger.len(), 1);
    assert!(game::is_known(&game, "EE:FF"));
    cleanup(&game);
}

#[test]
fn generated_creatures_stay_in_bounds() {
    let classes = [
        SecurityClass::Open,
        SecurityClass::Wep,
        SecurityClass::Wpa2Psk,
        SecurityClass::WpaWpa2Psk,
        SecurityClass::Wpa2Enterprise,
        SecurityClass::Unknown,
    ];
    let mut game = fresh_game("bounds", 3, 0xB0CA);
    for player_level in [1u8, 50, 99] {
        game.profile.level = player_level;
        for signal in [-250, -90, -50, 0, 100] {
            for class in classes {
                let obs = record("00:00", signal, class);
                let creature = game::generate_creature(&mut game, &obs);
                let level = creature.level as i32;
                assert!((1..=99).contains(&level));
                let min = rules::clamp(player_level as i32 - 3, 1, 99);
                let max = rules::clamp(player_level as i32 + 3, 1, 99);
                assert!(level >= min && level <= max);
                assert!(creature.hp >= rules::WILD_HP_FLOOR && creature.hp <= 999);
                assert!((1..=999).contains(&creature.attack));
                assert!((1..=999).contains(&creature.defense));
            }
        }
    }
    cleanup(&game);
}

#[test]
fn start_battle_validates_indices() {
    let mut game = fresh_game("indices", 3, 3);
    game::ensure_starter(&mut game).unwrap();

    let err = game::start_battle(&mut game, 5, 0).unwrap_err();
    assert!(matches!(err, GameError::InvalidWildIndex(5)));
    assert!(game.battle.is_none());

    game.wild.push(crafted_wild("Sparkbot", 3, 20));
    let err = game::start_battle(&mut game, 0, 7).unwrap_err();
    assert!(matches!(err, GameError::InvalidPartySlot(7)));
    assert!(game.battle.is_none());
    cleanup(&game);
}

#[test]
fn running_away_ends_without_damage() {
    let mut game = fresh_game("run", 3, 11);
    game::ensure_starter(&mut game).unwrap();
    game.wild.push(crafted_wild("Pingpup", 2, 25));
    let before = game.party.members.clone();

    game::start_battle(&mut game, 0, 0).unwrap();
    game::battle_action(&mut game, BattleCommand::Run).unwrap();

    let session = game.battle.as_ref().unwrap();
    assert_eq!(session.outcome, Some(BattleOutcome::Fled));
    assert_eq!(session.player_hp, session.player_hp_max);
    assert_eq!(session.wild_hp, session.wild_hp_max);

    // Party unchanged in memory and on disk (resting a fresh party is a
    // no-op).
    assert_eq!(game.party.members, before);
    let (on_disk, _) = persist::load_party(&game.save_dir, 3);
    assert_eq!(on_disk, before);
    cleanup(&game);
}

#[test]
fn last_member_cannot_be_removed() {
    let mut game = fresh_game("protect", 3, 13);
    game::ensure_starter(&mut game).unwrap();
    let err = game::remove_from_party(&mut game, 0).unwrap_err();
    assert!(matches!(err, GameError::LastMemberProtected));
    assert_eq!(game.party.len(), 1);

    let err = game::remove_from_party(&mut game, 4).unwrap_err();
    assert!(matches!(err, GameError::InvalidPartySlot(4)));
    cleanup(&game);
}

#[test]
fn battle_sessions_are_single_flight() {
    let mut game = fresh_game("flight", 3, 17);
    game::ensure_starter(&mut game).unwrap();
    game.wild.push(crafted_wild("Wavezard", 2, 25));
    game.wild.push(crafted_wild("Bugling", 2, 25));

    game::start_battle(&mut game, 0, 0).unwrap();
    let err = game::start_battle(&mut game, 1, 0).unwrap_err();
    assert!(matches!(err, GameError::BattleInProgress));
    assert_eq!(game.battle.as_ref().unwrap().wild_index, 0);

    // Once ended, a new start is accepted (implicit reset).
    game::battle_action(&mut game, BattleCommand::Run).unwrap();
    game::start_battle(&mut game, 1, 0).unwrap();
    assert_eq!(game.battle.as_ref().unwrap().wild_index, 1);
    cleanup(&game);
}

#[test]
fn winning_levels_up_and_persists() {
    let mut game = fresh_game("win", 3, 19);
    game::ensure_starter(&mut game).unwrap();
    game.wild.push(crafted_wild("Glitchling", 1, 1));

    game::start_battle(&mut game, 0, 0).unwrap();
    game::battle_action(&mut game, BattleCommand::Attack).unwrap();

    let session = game.battle.as_ref().unwrap();
    assert_eq!(session.outcome, Some(BattleOutcome::Win));
    // The wild fainted before it could counter.
    assert_eq!(session.player_hp, session.player_hp_max);

    assert_eq!(game.profile.level, 2);
    let member = &game.party.members[0];
    assert_eq!(member.level, 2);
    let (hp, defense) = rules::level_to_stats(2);
    assert_eq!(member.hp, hp);
    assert_eq!(member.defense, defense);

    // The wild creature is released back into the pool fully rested.
    let wild = &game.wild[0];
    assert_eq!(wild.hp, rules::level_to_stats(wild.level).0);

    let (profile, _) = persist::load_player(&game.save_dir);
    assert_eq!(profile.level, 2);
    let (party, _) = persist::load_party(&game.save_dir, 3);
    assert_eq!(party[0].level, 2);
    cleanup(&game);
}

#[test]
fn losing_grants_nothing() {
    let mut game = fresh_game("loss", 3, 23);
    game::ensure_starter(&mut game).unwrap();
    let mut weakling = crafted_wild("Fading", 1, 1);
    weakling.source_id = None;
    weakling.name = "Weakpal".to_string();
    game::append_to_party(&mut game, weakling).unwrap();
    game.wild.push(crafted_wild("Voltgeist", 50, 999));

    game::start_battle(&mut game, 0, 1).unwrap();
    game::battle_action(&mut game, BattleCommand::Attack).unwrap();

    let session = game.battle.as_ref().unwrap();
    assert_eq!(session.outcome, Some(BattleOutcome::Loss));
    assert_eq!(game.profile.level, 1);
    // Rested after the battle regardless of the loss.
    assert_eq!(game.party.members[1].hp, rules::level_to_stats(1).0);
    cleanup(&game);
}

#[test]
fn capture_success_joins_party_and_leaves_pool() {
    let mut game = fresh_game("capture", 3, 1);
    game::ensure_starter(&mut game).unwrap();
    game.wild.push(crafted_wild("Beacondrone", 2, 25));

    game::start_battle(&mut game, 0, 0).unwrap();
    game.rng_seed = seed_with_capture_roll(1000, true);
    game::battle_action(&mut game, BattleCommand::Capture).unwrap();

    let session = game.battle.as_ref().unwrap();
    assert_eq!(session.outcome, Some(BattleOutcome::Captured));
    assert_eq!(game.party.len(), 2);
    assert_eq!(game.party.members[1].name, "Beacondrone");
    assert!(game.wild.is_empty());

    // The new member is rested and the party change is durable.
    let (party, _) = persist::load_party(&game.save_dir, 3);
    assert_eq!(party.len(), 2);
    assert_eq!(party[1].hp, rules::level_to_stats(party[1].level).0);
    cleanup(&game);
}

#[test]
fn capture_failure_costs_hp_and_continues() {
    let mut game = fresh_game("capture-miss", 3, 1);
    game::ensure_starter(&mut game).unwrap();
    game.wild.push(crafted_wild("Netbuddy", 2, 25));

    game::start_battle(&mut game, 0, 0).unwrap();
    game.rng_seed = seed_with_capture_roll(2000, false);
    game::battle_action(&mut game, BattleCommand::Capture).unwrap();

    let session = game.battle.as_ref().unwrap();
    assert_eq!(session.outcome, None);
    let lost = session.player_hp_max - session.player_hp;
    assert!((1..=4).contains(&lost));
    assert_eq!(game.party.len(), 1);
    assert_eq!(game.wild.len(), 1);
    cleanup(&game);
}

#[test]
fn capture_blocked_when_party_is_full() {
    let mut game = fresh_game("capture-full", 3, 29);
    game::ensure_starter(&mut game).unwrap();
    game::append_to_party(&mut game, crafted_wild("Flowbot", 2, 25)).unwrap();
    game::append_to_party(&mut game, crafted_wild("Datafairy", 2, 25)).unwrap();
    game.wild.push(crafted_wild("Cypherpup", 2, 25));

    game::start_battle(&mut game, 0, 0).unwrap();
    game::battle_action(&mut game, BattleCommand::Capture).unwrap();

    // Failed action: message only, no damage exchange, session continues.
    let session = game.battle.as_ref().unwrap();
    assert_eq!(session.outcome, None);
    assert!(session.message.contains("full"));
    assert_eq!(session.player_hp, session.player_hp_max);
    assert_eq!(game.party.len(), 3);
    cleanup(&game);
}

#[test]
fn defend_halves_the_counter() {
    let mut game = fresh_game("defend", 3, 31);
    game::ensure_starter(&mut game).unwrap();
    game.wild.push(crafted_wild("Wirepal", 2, 25));

    game::start_battle(&mut game, 0, 0).unwrap();
    game::battle_action(&mut game, BattleCommand::Defend).unwrap();

    let session = game.battle.as_ref().unwrap();
    assert_eq!(session.wild_hp, session.wild_hp_max);
    let lost = session.player_hp_max - session.player_hp;
    assert!((1..=2).contains(&lost));
    assert_eq!(session.outcome, None);
    cleanup(&game);
}

#[test]
fn actions_require_an_active_session() {
    let mut game = fresh_game("no-session", 3, 37);
    game::ensure_starter(&mut game).unwrap();

    let err = game::battle_action(&mut game, BattleCommand::Attack).unwrap_err();
    assert!(matches!(err, GameError::NoBattleInProgress));

    game.wild.push(crafted_wild("Pingtron", 2, 25));
    game::start_battle(&mut game, 0, 0).unwrap();
    game::battle_action(&mut game, BattleCommand::Run).unwrap();
    let err = game::battle_action(&mut game, BattleCommand::Attack).unwrap_err();
    assert!(matches!(err, GameError::NoBattleInProgress));
    cleanup(&game);
}

#[test]
fn swap_reorders_and_persists() {
    let mut game = fresh_game("swap", 3, 41);
    game::ensure_starter(&mut game).unwrap();
    game::append_to_party(&mut game, crafted_wild("Packazard", 2, 25)).unwrap();

    game::swap_party_slots(&mut game, 0, 1).unwrap();
    assert_eq!(game.party.members[0].name, "Packazard");
    let (party, _) = persist::load_party(&game.save_dir, 3);
    assert_eq!(party[0].name, "Packazard");

    let err = game::swap_party_slots(&mut game, 0, 9).unwrap_err();
    assert!(matches!(err, GameError::InvalidPartySlot(9)));
    cleanup(&game);
}

#[test]
fn capture_rate_stays_near_thirty_percent() {
    let mut seed = 0xDECAFu64;
    let mut successes = 0u32;
    for _ in 0..10_000 {
        if rules::percent_roll(&mut seed) < rules::CAPTURE_CHANCE {
            successes += 1;
        }
    }
    assert!(
        (2700..=3300).contains(&successes),
        "capture rate off: {successes}/10000"
    );
}

#[test]
fn corrupt_stores_recover_with_warnings() {
    let dir = temp_dir("corrupt");
    fs::create_dir_all(&dir).unwrap();
    fs::write(std::path::Path::new(&dir).join("ledger.json"), "][").unwrap();
    fs::write(std::path::Path::new(&dir).join("party.json"), "not json").unwrap();

    let (game, warnings) = game::load(&dir, 3, 43);
    assert_eq!(warnings.len(), 2);
    assert!(game.ledger.is_empty());
    assert!(game.party.is_empty());
    assert_eq!(game.profile.level, 1);
    cleanup(&game);
}

#[test]
fn failed_saves_leave_memory_untouched() {
    let mut game = fresh_game("blocked", 3, 47);
    game::ensure_starter(&mut game).unwrap();

    // Point the store at a path that cannot be a directory.
    let blocker = std::env::temp_dir().join(format!(
        "packetpals-blocker-{}",
        std::process::id()
    ));
    fs::write(&blocker, "x").unwrap();
    let old_dir = game.save_dir.clone();
    game.save_dir = blocker.join("nested").to_string_lossy().to_string();

    let err = game::append_to_party(&mut game, crafted_wild("Lostpal", 2, 25)).unwrap_err();
    assert!(matches!(err, GameError::Storage(_)));
    assert_eq!(game.party.len(), 1);

    game.save_dir = old_dir;
    let _ = fs::remove_file(&blocker);
    cleanup(&game);
}
