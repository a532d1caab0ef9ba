use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};
use tui_dispatch::{EventKind, EventOutcome, RenderContext};

use crate::action::Action;
use crate::rules::Rarity;
use crate::state::{AppState, BattleCommand, Creature, LogSpeaker, Pane, TurnActor};

const BG_BASE: Color = Color::Rgb(14, 20, 34);
const BG_PANEL: Color = Color::Rgb(22, 32, 50);
const BG_PANEL_ALT: Color = Color::Rgb(18, 26, 42);
const TEXT_MAIN: Color = Color::Rgb(214, 226, 240);
const TEXT_DIM: Color = Color::Rgb(138, 152, 176);
const ACCENT_CYAN: Color = Color::Rgb(92, 204, 222);
const ACCENT_GOLD: Color = Color::Rgb(228, 198, 112);
const ACCENT_RED: Color = Color::Rgb(226, 110, 110);
const BORDER_ACCENT: Color = Color::Rgb(58, 80, 110);
const HIGHLIGHT_BG: Color = ACCENT_CYAN;
const HIGHLIGHT_TEXT: Color = Color::Rgb(10, 16, 26);

const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];

fn rarity_color(rarity: Rarity) -> Color {
    match rarity {
        Rarity::Common => TEXT_DIM,
        Rarity::Uncommon => Color::Rgb(120, 200, 130),
        Rarity::Rare => Color::Rgb(120, 160, 236),
        Rarity::Legendary => ACCENT_GOLD,
    }
}

pub fn render(frame: &mut Frame, area: Rect, state: &AppState, _ctx: RenderContext) {
    frame.render_widget(Block::default().style(Style::default().bg(BG_BASE)), area);

    if area.height < 12 || area.width < 40 {
        let warning = Paragraph::new("Terminal too small - expand window.")
            .style(Style::default().fg(TEXT_MAIN))
            .alignment(Alignment::Center);
        frame.render_widget(warning, area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(8),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, rows[0], state);
    if state.game.battle.is_some() {
        render_battle(frame, rows[1], state);
    } else {
        render_collections(frame, rows[1], state);
    }
    render_log(frame, rows[2], state);
    render_footer(frame, rows[3], state);
}

fn render_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" PACKETPALS ", BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let profile = &state.game.profile;
    let mut spans = vec![
        Span::styled(
            format!("{} ", profile.name),
            Style::default().fg(ACCENT_CYAN).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("Lv {}", profile.level), Style::default().fg(TEXT_MAIN)),
        Span::styled(
            format!(
                "   Party {}/{}",
                state.game.party.len(),
                state.game.party.capacity
            ),
            Style::default().fg(TEXT_MAIN),
        ),
        Span::styled(
            format!("   Wild {}", state.game.wild.len()),
            Style::default().fg(TEXT_MAIN),
        ),
        Span::styled(
            format!("   Seen {}", state.game.ledger.len()),
            Style::default().fg(TEXT_DIM),
        ),
    ];
    if state.scanning {
        let spinner = SPINNER_FRAMES[state.spinner_frame as usize % SPINNER_FRAMES.len()];
        spans.push(Span::styled(
            format!("   scanning {spinner}"),
            Style::default().fg(ACCENT_GOLD),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn render_collections(frame: &mut Frame, area: Rect, state: &AppState) {
    let panels = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_roster(
        frame,
        panels[0],
        " PARTY ",
        &state.game.party.members,
        state.selected_party,
        state.pane == Pane::Party,
    );
    render_roster(
        frame,
        panels[1],
        " WILD PALS ",
        &state.game.wild,
        state.selected_wild,
        state.pane == Pane::Wild,
    );
}

fn render_roster(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    creatures: &[Creature],
    selected: usize,
    focused: bool,
) {
    let bg = if focused { BG_PANEL } else { BG_PANEL_ALT };
    let block = panel_block(title, bg);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if creatures.is_empty() {
        let empty = Paragraph::new("- empty -")
            .style(Style::default().fg(TEXT_DIM))
            .alignment(Alignment::Center);
        frame.render_widget(empty, inner);
        return;
    }

    let mut lines = Vec::new();
    for (idx, creature) in creatures.iter().enumerate() {
        let text = format!(
            "{:<12} Lv{:>3}  HP{:>4}  ATK{:>4}  DEF{:>4}  {}",
            creature.name,
            creature.level,
            creature.hp,
            creature.attack,
            creature.defense,
            creature.rarity.label(),
        );
        let line = if focused && idx == selected {
            Line::from(Span::styled(
                format!("> {text}"),
                Style::default().fg(HIGHLIGHT_TEXT).bg(HIGHLIGHT_BG),
            ))
        } else {
            Line::from(vec![
                Span::styled("  ", Style::default()),
                Span::styled(text, Style::default().fg(rarity_color(creature.rarity))),
            ])
        };
        lines.push(line);
    }
    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

fn render_battle(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(session) = state.game.battle.as_ref() else {
        return;
    };
    let block = panel_block(" BATTLE ", BG_PANEL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(2),
        ])
        .split(inner);

    let wild_line = combatant_line(
        &session.wild_name,
        session.wild_hp,
        session.wild_hp_max,
        ACCENT_RED,
        false,
    );
    frame.render_widget(Paragraph::new(wild_line), rows[0]);

    let player_acts = session.attacker == TurnActor::Player && !session.ended();
    let player_line = combatant_line(
        &session.player_name,
        session.player_hp,
        session.player_hp_max,
        ACCENT_CYAN,
        player_acts,
    );
    frame.render_widget(Paragraph::new(player_line), rows[1]);

    let message = Paragraph::new(Span::styled(
        session.message.clone(),
        Style::default().fg(TEXT_MAIN),
    ))
    .wrap(Wrap { trim: true });
    frame.render_widget(message, rows[2]);

    if let Some(outcome) = session.outcome {
        let done = Paragraph::new(Text::from(vec![
            Line::from(Span::styled(
                format!("Battle over: {}", outcome.label()),
                Style::default().fg(ACCENT_GOLD).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Enter: back to the field",
                Style::default().fg(TEXT_DIM),
            )),
        ]));
        frame.render_widget(done, rows[3]);
    } else {
        let mut spans = Vec::new();
        for (idx, command) in BattleCommand::ALL.iter().enumerate() {
            let label = format!(" {} ", command.label());
            if idx == session.menu_index {
                spans.push(Span::styled(
                    label,
                    Style::default().fg(HIGHLIGHT_TEXT).bg(HIGHLIGHT_BG),
                ));
            } else {
                spans.push(Span::styled(label, Style::default().fg(TEXT_MAIN)));
            }
            spans.push(Span::raw("  "));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), rows[3]);
    }
}

fn combatant_line(
    name: &str,
    hp: i32,
    hp_max: i32,
    color: Color,
    acting: bool,
) -> Line<'static> {
    let bar = hp_bar(hp, hp_max, 20);
    let marker = if acting { "> " } else { "  " };
    Line::from(vec![
        Span::styled(marker.to_string(), Style::default().fg(ACCENT_GOLD)),
        Span::styled(
            format!("{name:<14}"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(bar, Style::default().fg(color)),
        Span::styled(
            format!(" {}/{}", hp.max(0), hp_max),
            Style::default().fg(TEXT_MAIN),
        ),
    ])
}

fn hp_bar(current: i32, max: i32, width: usize) -> String {
    let max = max.max(1);
    let filled = ((current.max(0) as usize * width) + max as usize - 1) / max as usize;
    let filled = filled.min(width);
    let mut bar = String::new();
    for idx in 0..width {
        bar.push(if idx < filled { '█' } else { '░' });
    }
    bar
}

fn render_log(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = panel_block(" LOG ", BG_PANEL_ALT);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let visible = inner.height as usize;
    let start = state.log.len().saturating_sub(visible);
    let mut lines = Vec::new();
    for entry in &state.log[start..] {
        let (prefix, color) = match entry.speaker {
            LogSpeaker::System => ("sys", TEXT_DIM),
            LogSpeaker::Scan => ("scan", ACCENT_CYAN),
            LogSpeaker::Battle => ("btl", ACCENT_GOLD),
        };
        lines.push(Line::from(vec![
            Span::styled(format!("[{prefix:>4}] "), Style::default().fg(color)),
            Span::styled(entry.text.clone(), Style::default().fg(TEXT_MAIN)),
        ]));
    }
    frame.render_widget(Paragraph::new(Text::from(lines)), inner);
}

fn render_footer(frame: &mut Frame, area: Rect, state: &AppState) {
    let help = if state.game.battle.is_some() {
        "arrows: choose  Enter: confirm  a/d/c/r: hotkeys  q: quit"
    } else {
        "s: scan  Tab: switch panel  arrows: select  Enter/b: battle  x: release  [/]: reorder  q: quit"
    };
    let footer = Paragraph::new(Span::styled(help, Style::default().fg(TEXT_DIM)));
    frame.render_widget(footer, area);
}

fn panel_block(title: &str, bg: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(bg).fg(TEXT_MAIN))
        .border_style(Style::default().fg(BORDER_ACCENT))
}

pub fn handle_event(event: &EventKind, state: &AppState) -> EventOutcome<Action> {
    match event {
        EventKind::Resize(width, height) => {
            EventOutcome::action(Action::UiTerminalResize(*width, *height)).with_render()
        }
        EventKind::Key(key) => handle_key(*key, state),
        _ => EventOutcome::ignored(),
    }
}

fn handle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    if state.game.battle.is_some() {
        return handle_battle_key(key, state);
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => EventOutcome::action(Action::Quit),
        KeyCode::Char('s') | KeyCode::Char('S') => EventOutcome::action(Action::ScanStart),
        KeyCode::Tab => EventOutcome::action(Action::PaneToggle),
        KeyCode::Up | KeyCode::Char('k') => EventOutcome::action(Action::SelectPrev),
        KeyCode::Down | KeyCode::Char('j') => EventOutcome::action(Action::SelectNext),
        KeyCode::Enter | KeyCode::Char('b') => EventOutcome::action(Action::BattleStart),
        KeyCode::Char('x') if state.pane == Pane::Party => {
            EventOutcome::action(Action::PartyRemove)
        }
        KeyCode::Char('[') if state.pane == Pane::Party => {
            EventOutcome::action(Action::PartyMoveUp)
        }
        KeyCode::Char(']') if state.pane == Pane::Party => {
            EventOutcome::action(Action::PartyMoveDown)
        }
        _ => EventOutcome::ignored(),
    }
}

fn handle_battle_key(key: KeyEvent, state: &AppState) -> EventOutcome<Action> {
    let ended = state
        .game
        .battle
        .as_ref()
        .map(|session| session.ended())
        .unwrap_or(false);
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => EventOutcome::action(Action::Quit),
        KeyCode::Enter | KeyCode::Char('z') => EventOutcome::action(Action::BattleConfirm),
        KeyCode::Esc if ended => EventOutcome::action(Action::BattleDismiss),
        _ if ended => EventOutcome::ignored(),
        KeyCode::Up | KeyCode::Left | KeyCode::Char('k') => {
            EventOutcome::action(Action::BattleMenuPrev)
        }
        KeyCode::Down | KeyCode::Right | KeyCode::Char('j') => {
            EventOutcome::action(Action::BattleMenuNext)
        }
        KeyCode::Char('a') => EventOutcome::action(Action::BattleCommandHotkey(
            BattleCommand::Attack,
        )),
        KeyCode::Char('d') => EventOutcome::action(Action::BattleCommandHotkey(
            BattleCommand::Defend,
        )),
        KeyCode::Char('c') => EventOutcome::action(Action::BattleCommandHotkey(
            BattleCommand::Capture,
        )),
        KeyCode::Char('r') => {
            EventOutcome::action(Action::BattleCommandHotkey(BattleCommand::Run))
        }
        _ => EventOutcome::ignored(),
    }
}
