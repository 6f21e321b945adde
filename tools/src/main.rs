//! park-sim: headless runner for the SmartPark live map view.
//!
//! Usage:
//!   park-sim --seed 12345 --ticks 60 --area Larissa
//!   park-sim --seed 12345 --data-dir ./data --ipc-mode

use anyhow::Result;
use smartpark_core::{
    clock::ManualTimer,
    command::ViewCommand,
    config::{AreaCatalog, SimConfig},
    engine::MapEngine,
    render::RecordingSurface,
    snapshot::ViewSnapshot,
    types::Tick,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;

type Engine = MapEngine<RecordingSurface, ManualTimer>;

#[derive(Debug, PartialEq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick { count: u64 },
    SelectArea { area: String },
    Pause,
    Resume,
    Quit,
}

impl IpcCommand {
    /// The view command this line carries, if any.
    fn into_view_command(self) -> Option<ViewCommand> {
        match self {
            Self::SelectArea { area } => Some(ViewCommand::SelectArea { area }),
            Self::Pause => Some(ViewCommand::Pause),
            Self::Resume => Some(ViewCommand::Resume),
            Self::GetState | Self::Tick { .. } | Self::Quit => None,
        }
    }
}

#[derive(serde::Serialize)]
struct UiState {
    view:          ViewSnapshot,
    markers_drawn: usize,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 60u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");
    let area = args
        .windows(2)
        .find(|w| w[0] == "--area")
        .map(|w| w[1].clone());

    let mut config = if Path::new(data_dir).join("simulation.json").exists() {
        SimConfig::load(data_dir)?
    } else {
        SimConfig::default()
    };
    if let Some(area) = area {
        config.default_area = area;
    }
    let catalog = AreaCatalog::load_or_builtin(data_dir)?;

    if !ipc_mode {
        println!("SmartPark: park-sim");
        println!("  seed:      {seed}");
        println!("  ticks:     {ticks}");
        println!("  area:      {}", config.default_area);
        println!("  interval:  {} ms", config.tick_interval_ms);
        println!("  flip p:    {:.2}", config.flip_probability);
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let timer = ManualTimer::new(chrono::Utc::now());
    let mut engine = Engine::mount(config, catalog, RecordingSurface::new(), timer, seed)?;

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        engine.run_ticks(ticks)?;
        print_summary(&engine, ticks);
    }

    let (surface, _) = engine.teardown();
    log::debug!("surface left with {} markers", surface.marker_count());
    Ok(())
}

fn run_ipc_loop(engine: &mut Engine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        let outcome = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => Ok(()),
            IpcCommand::Tick { count } => engine.run_ticks(count).map(|_| ()),
            view => match view.into_view_command() {
                Some(command) => engine.execute(&command).map(|_| ()),
                None => Ok(()),
            },
        };

        match outcome {
            Ok(()) => {
                let state = build_ui_state(engine);
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
                stdout.flush()?;
            }
            // Unknown area and friends: report, keep serving the current view.
            Err(e) => write_error(&mut stdout, &e.to_string())?,
        }
    }
    Ok(())
}

fn write_error(stdout: &mut io::Stdout, message: &str) -> Result<()> {
    let err_json = serde_json::json!({ "error": message });
    writeln!(stdout, "{}", err_json)?;
    stdout.flush()?;
    Ok(())
}

fn build_ui_state(engine: &Engine) -> UiState {
    UiState {
        view:          engine.snapshot(),
        markers_drawn: engine.surface().marker_count(),
    }
}

fn print_summary(engine: &Engine, ticks: Tick) {
    let summary = engine.summary();
    let changes = engine
        .events()
        .iter()
        .filter(|e| e.event_type == "spot_status_changed")
        .count();
    let (adds, updates, removes) = engine.surface().call_counts();

    println!("=== RUN SUMMARY ===");
    println!("  area:            {}", engine.active_area().unwrap_or("-"));
    println!("  ticks run:       {ticks}");
    println!("  final tick:      {}", engine.current_tick());
    println!("  status changes:  {changes}");
    println!("  available:       {}", summary.available);
    println!("  occupied:        {}", summary.occupied);
    println!("  total:           {}", summary.total);
    println!("  marker adds:     {adds}");
    println!("  marker updates:  {updates}");
    println!("  marker removes:  {removes}");

    println!();
    println!("=== SPOTS ===");
    for spot in engine.spots() {
        println!(
            "  {:>3} | {:<26} | {:<9} | {}",
            spot.id,
            spot.name,
            spot.status.label(),
            spot.last_updated.with_timezone(&chrono::Local).format("%H:%M:%S")
        );
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> IpcCommand {
        serde_json::from_str(line).unwrap()
    }

    #[test]
    fn view_commands_parse_at_top_level() {
        assert_eq!(
            parse(r#"{"type":"select_area","area":"Larissa"}"#),
            IpcCommand::SelectArea { area: "Larissa".into() }
        );
        assert_eq!(parse(r#"{"type":"pause"}"#), IpcCommand::Pause);
        assert_eq!(parse(r#"{"type":"resume"}"#), IpcCommand::Resume);
    }

    #[test]
    fn runner_commands_parse() {
        assert_eq!(parse(r#"{"type":"get_state"}"#), IpcCommand::GetState);
        assert_eq!(parse(r#"{"type":"tick","count":3}"#), IpcCommand::Tick { count: 3 });
        assert_eq!(parse(r#"{"type":"quit"}"#), IpcCommand::Quit);
    }

    #[test]
    fn view_commands_map_onto_the_engine() {
        assert_eq!(
            parse(r#"{"type":"select_area","area":"Athens"}"#).into_view_command(),
            Some(ViewCommand::SelectArea { area: "Athens".into() })
        );
        assert_eq!(parse(r#"{"type":"pause"}"#).into_view_command(), Some(ViewCommand::Pause));
        assert_eq!(parse(r#"{"type":"tick","count":1}"#).into_view_command(), None);
    }

    #[test]
    fn nested_command_shape_is_rejected() {
        let line = r#"{"type":"command","command":{"cmd":"pause"}}"#;
        assert!(serde_json::from_str::<IpcCommand>(line).is_err());
    }

    #[test]
    fn oversized_tick_count_is_an_error_not_a_crash() {
        let timer = ManualTimer::new(chrono::Utc::now());
        let mut engine = Engine::mount(
            SimConfig::default_test(),
            AreaCatalog::builtin(),
            RecordingSurface::new(),
            timer,
            1,
        )
        .unwrap();
        engine.pause().unwrap();

        let IpcCommand::Tick { count } = parse(r#"{"type":"tick","count":1000000000000000}"#) else {
            panic!("expected a tick command");
        };
        assert!(engine.run_ticks(count).is_err());
        let state = build_ui_state(&engine);
        assert_eq!(state.markers_drawn, 5);
    }
}
