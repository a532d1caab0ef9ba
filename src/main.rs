use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::Terminal;
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventOutcome, RenderContext, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem};

use packetpals::action::Action;
use packetpals::effect::Effect;
use packetpals::game;
use packetpals::reducer::reducer;
use packetpals::scanner::{self, ScanSource};
use packetpals::state::{seed_from_time, AppState};
use packetpals::ui;

#[derive(Parser, Debug)]
#[command(name = "packetpals")]
#[command(about = "Wi-Fi scanning creature collector TUI")]
struct Args {
    #[command(flatten)]
    debug: DebugCliArgs,
    /// Directory for the player/party/ledger stores
    #[arg(long)]
    save_dir: Option<String>,
    /// Party capacity (3 or 6)
    #[arg(long, default_value_t = 3)]
    party_size: usize,
    /// RNG seed; defaults to system time
    #[arg(long)]
    seed: Option<u64>,
    /// Replay a recorded scan batch instead of running nmcli
    #[arg(long)]
    scan_file: Option<String>,
}

#[derive(Clone, Debug)]
struct RuntimeConfig {
    scan_source: ScanSource,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    let debug = DebugSession::new(args.debug);
    debug.save_state_schema::<AppState>().map_err(debug_error)?;
    debug.save_actions_schema::<Action>().map_err(debug_error)?;

    if args.party_size != 3 && args.party_size != 6 {
        eprintln!("Error: --party-size must be 3 or 6.");
        std::process::exit(1);
    }

    let save_dir = resolve_save_dir(args.save_dir.as_deref());
    let seed = args.seed.unwrap_or_else(seed_from_time);
    let scan_source = match args.scan_file.clone() {
        Some(path) => ScanSource::File(path),
        None => ScanSource::Nmcli,
    };
    let config = Arc::new(RuntimeConfig { scan_source });

    let party_size = args.party_size;
    let mut state = debug
        .load_state_or_else_async(|| {
            let save_dir = save_dir.clone();
            async move {
                let (game, warnings) = game::load(&save_dir, party_size, seed);
                let mut state = AppState::new(game);
                state.startup_warnings = warnings;
                Ok::<AppState, io::Error>(state)
            }
        })
        .await
        .map_err(debug_error)?;

    state.game.save_dir = save_dir;
    state.game.party.capacity = party_size;

    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions, config).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    Ok(())
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
    config: Arc<RuntimeConfig>,
) -> io::Result<DebugRunOutput<AppState>> {
    debug
        .run_effect_app(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime
                    .subscriptions()
                    .interval("tick", Duration::from_millis(150), || Action::Tick);
            },
            |frame, area, state, render_ctx: RenderContext| {
                ui::render(frame, area, state, render_ctx);
            },
            |event, state| -> EventOutcome<Action> { ui::handle_event(event, state) },
            |action| matches!(action, Action::Quit),
            move |effect, ctx| handle_effect(effect, ctx, config.clone()),
        )
        .await
}

fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>, config: Arc<RuntimeConfig>) {
    match effect {
        Effect::ScanNetworks => {
            let source = config.scan_source.clone();
            ctx.tasks().spawn(TaskKey::new("scan"), async move {
                match scanner::scan_networks(&source).await {
                    Ok(records) => Action::ScanDidComplete { records },
                    Err(error) => Action::ScanDidError { error },
                }
            });
        }
    }
}

fn resolve_save_dir(save_dir: Option<&str>) -> String {
    let base = save_dir
        .map(std::path::PathBuf::from)
        .or_else(|| dirs_next::data_local_dir().map(|dir| dir.join("packetpals")))
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    base.to_string_lossy().to_string()
}
