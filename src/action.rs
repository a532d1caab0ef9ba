use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::{BattleCommand, ScanRecord};

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[action(infer_categories)]
pub enum Action {
    Init,
    UiTerminalResize(u16, u16),
    Tick,

    // Scanning
    ScanStart,
    ScanDidComplete { records: Vec<ScanRecord> },
    ScanDidError { error: String },

    // Panel navigation
    PaneToggle,
    SelectNext,
    SelectPrev,

    // Party management
    PartyRemove,
    PartyMoveUp,
    PartyMoveDown,

    // Battle
    BattleStart,
    BattleMenuNext,
    BattleMenuPrev,
    BattleConfirm,
    BattleCommandHotkey(BattleCommand),
    BattleDismiss,

    Quit,
}
