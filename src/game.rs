use crate::persist::{self, StoreError};
use crate::rules;
use crate::state::{
    BattleCommand, BattleOutcome, BattleSession, Creature, GameState, ScanRecord, TurnActor,
};

#[derive(thiserror::Error, Debug)]
pub enum GameError {
    #[error("Invalid wild index {0}")]
    InvalidWildIndex(usize),
    #[error("Invalid party slot {0}")]
    InvalidPartySlot(usize),
    #[error("You cannot remove your final pal")]
    LastMemberProtected,
    #[error("Party is full")]
    PartyFull,
    #[error("A battle is already in progress")]
    BattleInProgress,
    #[error("No battle in progress")]
    NoBattleInProgress,
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Reconstruct the engine state from the stores. Missing stores mean a
/// fresh start; corrupt ones default and report a warning.
pub fn load(save_dir: &str, capacity: usize, seed: u64) -> (GameState, Vec<String>) {
    let mut warnings = Vec::new();
    let (profile, warning) = persist::load_player(save_dir);
    warnings.extend(warning);
    let (members, warning) = persist::load_party(save_dir, capacity);
    warnings.extend(warning);
    let (ledger, warning) = persist::load_ledger(save_dir);
    warnings.extend(warning);

    let mut game = GameState::new(save_dir.to_string(), capacity, seed);
    game.profile = profile;
    game.party.members = members;
    game.ledger = ledger;
    (game, warnings)
}

/// First-run bootstrap: hand out the starter once, then never again.
/// Returns whether the starter was assigned on this call.
pub fn ensure_starter(game: &mut GameState) -> Result<bool, GameError> {
    if game.profile.has_starter {
        return Ok(false);
    }
    if !game.party.is_full() {
        let mut members = game.party.members.clone();
        members.push(Creature::starter());
        persist::save_party(&game.save_dir, &members)?;
        game.party.members = members;
    }
    let mut profile = game.profile.clone();
    profile.has_starter = true;
    persist::save_player(&game.save_dir, &profile)?;
    game.profile = profile;
    Ok(true)
}

pub fn is_known(game: &GameState, id: &str) -> bool {
    game.ledger.contains(id)
}

/// Durable before the identifier counts as recorded: a crash after this
/// returns can never regenerate the same network. No-op for known ids.
pub fn record_seen(game: &mut GameState, id: &str) -> Result<(), GameError> {
    if game.ledger.contains(id) {
        return Ok(());
    }
    let mut ledger = game.ledger.clone();
    ledger.insert(id.to_string());
    persist::save_ledger(&game.save_dir, &ledger)?;
    game.ledger = ledger;
    Ok(())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub added: usize,
    pub skipped: usize,
}

/// Run a scan batch through the encounter ledger, generate and scale a
/// creature for each new identifier, and append it to the wild pool.
pub fn ingest_scan(
    game: &mut GameState,
    records: &[ScanRecord],
) -> Result<ScanSummary, GameError> {
    let mut summary = ScanSummary::default();
    for record in records {
        if is_known(game, &record.bssid) {
            summary.skipped += 1;
            continue;
        }
        record_seen(game, &record.bssid)?;
        // The observation log is advisory; a failed append never blocks
        // the encounter itself.
        let _ = persist::append_observation(&game.save_dir, record);
        let creature = generate_creature(game, record);
        game.wild.push(creature);
        summary.added += 1;
    }
    if summary.added > 0 {
        let _ = persist::save_wild_snapshot(&game.save_dir, &game.wild);
    }
    Ok(summary)
}

/// Map one observation to a creature record, then scale it to the player.
pub fn generate_creature(game: &mut GameState, record: &ScanRecord) -> Creature {
    let hp = rules::signal_to_hp(record.signal);
    let defense = rules::clamp(hp / 2, rules::STAT_MIN, rules::STAT_MAX);
    let level = rules::clamp_level(hp / 10);
    let mut creature = Creature {
        source_id: Some(record.bssid.clone()),
        name: rules::creature_name(&mut game.rng_seed),
        level,
        hp,
        attack: rules::attack_base(record.security),
        defense,
        rarity: rules::rarity_for(record.security),
        ability: rules::ability_for(record.security),
    };
    scale_to_player(&mut game.rng_seed, &mut creature, game.profile.level);
    creature
}

/// Randomized level-relative adjustment so a fresh encounter stays a fair
/// match for the current player.
pub fn scale_to_player(seed: &mut u64, creature: &mut Creature, player_level: u8) {
    let min_level = rules::clamp_level(player_level as i32 - 3);
    let max_level = rules::clamp_level(player_level as i32 + 3);
    let target = rules::roll_range(seed, min_level as i32, max_level as i32);
    let factor = target as f32 / creature.level.max(1) as f32;
    creature.level = target as u8;
    creature.hp = rules::clamp(
        (creature.hp as f32 * factor) as i32,
        rules::WILD_HP_FLOOR,
        rules::STAT_MAX,
    );
    creature.attack = rules::clamp(
        (creature.attack as f32 * factor) as i32,
        rules::STAT_MIN,
        rules::STAT_MAX,
    );
    creature.defense = rules::clamp(
        (creature.defense as f32 * factor) as i32,
        rules::STAT_MIN,
        rules::STAT_MAX,
    );
}

pub fn append_to_party(game: &mut GameState, creature: Creature) -> Result<(), GameError> {
    if game.party.is_full() {
        return Err(GameError::PartyFull);
    }
    let mut members = game.party.members.clone();
    members.push(creature);
    persist::save_party(&game.save_dir, &members)?;
    game.party.members = members;
    Ok(())
}

pub fn remove_from_party(game: &mut GameState, slot: usize) -> Result<Creature, GameError> {
    if slot >= game.party.len() {
        return Err(GameError::InvalidPartySlot(slot));
    }
    if game.party.len() <= 1 {
        return Err(GameError::LastMemberProtected);
    }
    let mut members = game.party.members.clone();
    let removed = members.remove(slot);
    persist::save_party(&game.save_dir, &members)?;
    game.party.members = members;
    Ok(removed)
}

pub fn swap_party_slots(game: &mut GameState, a: usize, b: usize) -> Result<(), GameError> {
    let len = game.party.len();
    if a >= len {
        return Err(GameError::InvalidPartySlot(a));
    }
    if b >= len {
        return Err(GameError::InvalidPartySlot(b));
    }
    if a == b {
        return Ok(());
    }
    let mut members = game.party.members.clone();
    members.swap(a, b);
    persist::save_party(&game.save_dir, &members)?;
    game.party.members = members;
    Ok(())
}

/// Open a battle session against a wild creature. Single-flight: fails
/// while another session is in progress; an ended session is reset here.
pub fn start_battle(
    game: &mut GameState,
    wild_index: usize,
    party_slot: usize,
) -> Result<(), GameError> {
    if let Some(battle) = &game.battle {
        if !battle.ended() {
            return Err(GameError::BattleInProgress);
        }
    }
    let wild = game
        .wild
        .get(wild_index)
        .ok_or(GameError::InvalidWildIndex(wild_index))?;
    let member = game
        .party
        .get(party_slot)
        .ok_or(GameError::InvalidPartySlot(party_slot))?;

    game.battle = Some(BattleSession {
        party_slot,
        wild_index,
        player_name: member.name.clone(),
        wild_name: wild.name.clone(),
        player_hp: member.hp,
        player_hp_max: member.hp,
        wild_hp: wild.hp,
        wild_hp_max: wild.hp,
        attacker: TurnActor::Player,
        outcome: None,
        message: format!("A wild {} appeared!", wild.name),
        menu_index: 0,
    });
    Ok(())
}

/// Advance the active battle by one command. Damage lands on the session's
/// stat snapshots; the party, profile and pool are only touched (and
/// persisted) when a terminal outcome is reached.
pub fn battle_action(game: &mut GameState, command: BattleCommand) -> Result<(), GameError> {
    let (party_slot, wild_index, player_name, wild_name, mut player_hp, mut wild_hp) =
        match &game.battle {
            Some(session) if !session.ended() => (
                session.party_slot,
                session.wild_index,
                session.player_name.clone(),
                session.wild_name.clone(),
                session.player_hp,
                session.wild_hp,
            ),
            _ => return Err(GameError::NoBattleInProgress),
        };

    let mut message = String::new();
    let mut outcome: Option<BattleOutcome> = None;
    let mut captured = false;

    match command {
        BattleCommand::Attack => {
            let dealt = rules::attack_damage(&mut game.rng_seed);
            wild_hp -= dealt;
            message.push_str(&format!("{player_name} attacked for {dealt} damage."));
            if wild_hp > 0 {
                let counter = rules::counter_damage(&mut game.rng_seed);
                player_hp -= counter;
                message.push_str(&format!(" {wild_name} countered for {counter} damage."));
            }
        }
        BattleCommand::Defend => {
            let counter = rules::defend_damage(&mut game.rng_seed);
            player_hp -= counter;
            message.push_str(&format!(
                "{player_name} defended. {wild_name} hits for {counter} damage."
            ));
        }
        BattleCommand::Capture => {
            if game.party.is_full() {
                // Failed action: no damage exchange, session continues.
                if let Some(session) = game.battle.as_mut() {
                    session.message = "Party is full! Can't capture.".to_string();
                }
                return Ok(());
            }
            if rules::percent_roll(&mut game.rng_seed) < rules::CAPTURE_CHANCE {
                captured = true;
                outcome = Some(BattleOutcome::Captured);
                message.push_str(&format!("Capture success! {wild_name} joined your party."));
            } else {
                let counter = rules::counter_damage(&mut game.rng_seed);
                player_hp -= counter;
                message.push_str(&format!(
                    "Capture failed! {wild_name} hits for {counter} damage."
                ));
            }
        }
        BattleCommand::Run => {
            outcome = Some(BattleOutcome::Fled);
            message.push_str("Ran away from battle!");
        }
    }

    if outcome.is_none() {
        if wild_hp <= 0 && player_hp <= 0 {
            outcome = Some(BattleOutcome::Draw);
            message.push_str(" Both fainted!");
        } else if wild_hp <= 0 {
            outcome = Some(BattleOutcome::Win);
            message.push_str(&format!(" {wild_name} fainted! {player_name} wins!"));
        } else if player_hp <= 0 {
            outcome = Some(BattleOutcome::Loss);
            message.push_str(&format!(
                " {player_name} fainted! The wild {wild_name} wins!"
            ));
        }
    }

    if let Some(result) = outcome {
        finish_battle(game, result, captured, party_slot, wild_index)?;
    }

    if let Some(session) = game.battle.as_mut() {
        session.player_hp = player_hp;
        session.wild_hp = wild_hp;
        session.attacker = TurnActor::Player;
        session.message = message;
        session.outcome = outcome;
    }
    Ok(())
}

/// Terminal bookkeeping: level/profile gains on a win, the capture commit,
/// the full-party rest, and releasing the wild creature back to the pool.
/// All persistence happens before the in-memory commit.
fn finish_battle(
    game: &mut GameState,
    outcome: BattleOutcome,
    captured: bool,
    party_slot: usize,
    wild_index: usize,
) -> Result<(), GameError> {
    if outcome == BattleOutcome::Win {
        let mut profile = game.profile.clone();
        profile.level = rules::clamp_level(profile.level as i32 + 1);
        persist::save_player(&game.save_dir, &profile)?;
        game.profile = profile;
    }

    let mut members = game.party.members.clone();
    if outcome == BattleOutcome::Win {
        if let Some(member) = members.get_mut(party_slot) {
            member.level = rules::clamp_level(member.level as i32 + 1);
        }
    }
    if captured {
        // Capacity re-checked at commit time.
        if members.len() >= game.party.capacity {
            return Err(GameError::PartyFull);
        }
        if let Some(prize) = game.wild.get(wild_index) {
            members.push(prize.clone());
        }
    }
    // The whole party rests after every battle, whatever the outcome.
    for member in &mut members {
        member.rest();
    }
    persist::save_party(&game.save_dir, &members)?;
    game.party.members = members;

    if captured {
        if wild_index < game.wild.len() {
            let _ = game.wild.remove(wild_index);
        }
    } else if let Some(wild) = game.wild.get_mut(wild_index) {
        // Released back into the pool fully rested.
        wild.rest();
    }
    Ok(())
}
