use tui_dispatch::DispatchResult;

use crate::action::Action;
use crate::effect::Effect;
use crate::game;
use crate::state::{AppState, BattleCommand, LogSpeaker, Pane};

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        Action::Init => init(state),
        Action::UiTerminalResize(width, height) => {
            if state.terminal_size != (width, height) {
                state.terminal_size = (width, height);
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }
        Action::Tick => {
            if state.scanning {
                state.spinner_frame = state.spinner_frame.wrapping_add(1);
                DispatchResult::changed()
            } else if state.spinner_frame != 0 {
                state.spinner_frame = 0;
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }

        Action::ScanStart => {
            if state.scanning {
                return DispatchResult::unchanged();
            }
            state.scanning = true;
            state.push_log(LogSpeaker::Scan, "Scanning for networks...");
            DispatchResult::changed_with(Effect::ScanNetworks)
        }
        Action::ScanDidComplete { records } => {
            state.scanning = false;
            match game::ingest_scan(&mut state.game, &records) {
                Ok(summary) => {
                    state.push_log(
                        LogSpeaker::Scan,
                        format!(
                            "Scan complete: {} new, {} already encountered.",
                            summary.added, summary.skipped
                        ),
                    );
                }
                Err(err) => {
                    state.push_log(LogSpeaker::System, err.to_string());
                }
            }
            state.clamp_selections();
            DispatchResult::changed()
        }
        Action::ScanDidError { error } => {
            state.scanning = false;
            state.push_log(LogSpeaker::Scan, format!("Scan failed: {error}"));
            DispatchResult::changed()
        }

        Action::PaneToggle => {
            state.pane = match state.pane {
                Pane::Party => Pane::Wild,
                Pane::Wild => Pane::Party,
            };
            DispatchResult::changed()
        }
        Action::SelectNext => move_selection(state, 1),
        Action::SelectPrev => move_selection(state, -1),

        Action::PartyRemove => {
            let slot = state.selected_party;
            match game::remove_from_party(&mut state.game, slot) {
                Ok(removed) => {
                    state.push_log(
                        LogSpeaker::System,
                        format!("Released {} from the party.", removed.name),
                    );
                    state.clamp_selections();
                }
                Err(err) => state.push_log(LogSpeaker::System, err.to_string()),
            }
            DispatchResult::changed()
        }
        Action::PartyMoveUp => move_party_member(state, -1),
        Action::PartyMoveDown => move_party_member(state, 1),

        Action::BattleStart => {
            let wild_index = state.selected_wild;
            let party_slot = state.selected_party;
            match game::start_battle(&mut state.game, wild_index, party_slot) {
                Ok(()) => {
                    let message = state
                        .game
                        .battle
                        .as_ref()
                        .map(|session| session.message.clone());
                    if let Some(message) = message {
                        state.push_log(LogSpeaker::Battle, message);
                    }
                }
                Err(err) => state.push_log(LogSpeaker::System, err.to_string()),
            }
            DispatchResult::changed()
        }
        Action::BattleMenuNext => battle_menu_change(state, 1),
        Action::BattleMenuPrev => battle_menu_change(state, -1),
        Action::BattleConfirm => {
            let (ended, menu_index) = match state.game.battle.as_ref() {
                Some(session) => (session.ended(), session.menu_index),
                None => return DispatchResult::unchanged(),
            };
            if ended {
                state.game.battle = None;
                return DispatchResult::changed();
            }
            let command = BattleCommand::ALL[menu_index % BattleCommand::ALL.len()];
            run_battle_command(state, command)
        }
        Action::BattleCommandHotkey(command) => run_battle_command(state, command),
        Action::BattleDismiss => {
            let ended = state
                .game
                .battle
                .as_ref()
                .map(|session| session.ended())
                .unwrap_or(false);
            if ended {
                state.game.battle = None;
                DispatchResult::changed()
            } else {
                DispatchResult::unchanged()
            }
        }

        Action::Quit => DispatchResult::unchanged(),
    }
}

fn init(state: &mut AppState) -> DispatchResult<Effect> {
    for warning in std::mem::take(&mut state.startup_warnings) {
        state.push_log(LogSpeaker::System, warning);
    }
    match game::ensure_starter(&mut state.game) {
        Ok(true) => {
            state.push_log(
                LogSpeaker::System,
                format!(
                    "{} joined your party. Welcome, {}!",
                    crate::state::STARTER_NAME,
                    state.game.profile.name
                ),
            );
        }
        Ok(false) => {
            state.push_log(
                LogSpeaker::System,
                format!(
                    "Welcome back, {} (level {}).",
                    state.game.profile.name, state.game.profile.level
                ),
            );
        }
        Err(err) => state.push_log(LogSpeaker::System, err.to_string()),
    }
    state.push_log(LogSpeaker::System, "Press s to scan for wild pals.");
    state.clamp_selections();
    DispatchResult::changed()
}

fn move_selection(state: &mut AppState, delta: i32) -> DispatchResult<Effect> {
    let len = match state.pane {
        Pane::Party => state.game.party.len(),
        Pane::Wild => state.game.wild.len(),
    };
    if len == 0 {
        return DispatchResult::unchanged();
    }
    let current = match state.pane {
        Pane::Party => state.selected_party,
        Pane::Wild => state.selected_wild,
    } as i32;
    let next = (current + delta).rem_euclid(len as i32) as usize;
    match state.pane {
        Pane::Party => state.selected_party = next,
        Pane::Wild => state.selected_wild = next,
    }
    DispatchResult::changed()
}

fn move_party_member(state: &mut AppState, delta: i32) -> DispatchResult<Effect> {
    let slot = state.selected_party as i32;
    let other = slot + delta;
    if other < 0 || other >= state.game.party.len() as i32 {
        return DispatchResult::unchanged();
    }
    match game::swap_party_slots(&mut state.game, slot as usize, other as usize) {
        Ok(()) => {
            state.selected_party = other as usize;
        }
        Err(err) => state.push_log(LogSpeaker::System, err.to_string()),
    }
    DispatchResult::changed()
}

fn battle_menu_change(state: &mut AppState, delta: i32) -> DispatchResult<Effect> {
    let Some(session) = state.game.battle.as_mut() else {
        return DispatchResult::unchanged();
    };
    if session.ended() {
        return DispatchResult::unchanged();
    }
    let len = BattleCommand::ALL.len() as i32;
    session.menu_index = (session.menu_index as i32 + delta).rem_euclid(len) as usize;
    DispatchResult::changed()
}

fn run_battle_command(state: &mut AppState, command: BattleCommand) -> DispatchResult<Effect> {
    match game::battle_action(&mut state.game, command) {
        Ok(()) => {
            let summary = state
                .game
                .battle
                .as_ref()
                .map(|session| (session.message.clone(), session.ended()));
            if let Some((message, ended)) = summary {
                if !message.is_empty() {
                    state.push_log(LogSpeaker::Battle, message);
                }
                if ended {
                    state.clamp_selections();
                }
            }
            DispatchResult::changed()
        }
        Err(err) => {
            state.push_log(LogSpeaker::System, err.to_string());
            DispatchResult::changed()
        }
    }
}
