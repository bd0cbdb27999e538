//! sim-runner: headless runner for the bundled simcx demo scenes.
//!
//! Usage:
//!   sim-runner --demo life --ticks 200 --snapshot life.png
//!   sim-runner --demo cobweb --ticks 100 --record cobweb.mp4
//!   sim-runner --demo ifs --ipc-mode

use anyhow::{bail, Result};
use chrono::Utc;
use simcx_core::{
    command::{DisplayCommand, Key, Modifiers},
    config::DisplayConfig,
    display::Display,
    event_loop::{EventLoop, LoopExit, NullPresenter},
    final_state_iterator::FinalStateIterator,
    function_iterator::{FunctionIterator, FunctionIterator2D},
    game_of_life::GameOfLife,
    grid_visual::Grid2D,
    ifs_simulator::IfsSimulator,
    plot_visuals::{BifurcationVisual, CobwebVisual, FinalStateDiagram, LineVisual, LinesVisual},
    point_cloud_visual::PointCloudVisual,
    rng::SimRng,
    simulator::{shared, SimHandle},
    types::Tick,
    visual::VisualHandle,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::mpsc;

const GLIDER: &[&[u8]] = &[&[0, 1, 0], &[0, 0, 1], &[1, 1, 1]];
const FERN_GREEN: [u8; 4] = [40, 170, 60, 255];

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick {
        count: u64,
    },
    Key {
        key: String,
        #[serde(default)]
        modifiers: Modifiers,
    },
    Command(DisplayCommand),
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    tick:            Tick,
    paused:          bool,
    caption:         String,
    width:           u32,
    height:          u32,
    simulators:      usize,
    visuals:         usize,
    show_fps:        bool,
    recording:       bool,
    session:         Option<String>,
    frames_recorded: u64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let demo = arg_value(&args, "--demo").unwrap_or("life");
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 200u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let record = arg_value(&args, "--record");
    let snapshot = arg_value(&args, "--snapshot");

    let mut config = match arg_value(&args, "--config") {
        Some(path) => DisplayConfig::load(path)?,
        None => DisplayConfig::default(),
    };
    config.interval = parse_arg(&args, "--interval", config.interval);
    config.caption = format!("{} - {demo}", config.caption);

    if !ipc_mode {
        println!("simcx sim-runner");
        println!("  demo:      {demo}");
        println!("  seed:      {seed}");
        println!("  ticks:     {ticks}");
        println!("  interval:  {}s", config.interval);
        println!("  record:    {}", record.unwrap_or("-"));
        println!("  snapshot:  {}", snapshot.unwrap_or("-"));
        println!();
    }

    let mut display = Display::new(config)?;
    build_scene(&mut display, demo, seed)?;

    if ipc_mode {
        run_ipc_loop(&mut display)?;
        return Ok(());
    }

    // Headless runs are reproducible: every step gets the fixed interval.
    display.set_real_time(false);
    if let Some(path) = record {
        display.start_recording(path, None, None)?;
    }

    let started = Utc::now();
    let (tx, rx) = mpsc::channel();
    tx.send(DisplayCommand::TogglePause)?;
    let mut event_loop = EventLoop::new(Box::new(NullPresenter::default())).with_tick_limit(ticks);
    let exit = event_loop.run(&mut display, &rx)?;
    drop(tx);

    if let Some(path) = snapshot {
        display.snapshot_png(path)?;
    }
    let summary = RunSummary {
        demo,
        exit,
        frames_recorded: frames_recorded(&display),
        session: display.recorder().map(|r| r.session_id().to_string()),
        seconds: (Utc::now() - started).num_milliseconds() as f64 / 1000.0,
    };
    display.close()?;
    print_summary(&display, &summary);
    Ok(())
}

/// Register the simulators and visuals of one demo scene.
fn build_scene(display: &mut Display, demo: &str, seed: u64) -> Result<()> {
    match demo {
        "life" => {
            let mut life = GameOfLife::new(100, 100);
            let mut rng = SimRng::new(seed).with_name("life");
            life.random(0.3, &mut rng);
            life.add_block(GLIDER, 10, 80)?;
            let life = shared(life);
            let handle: SimHandle = life.clone();
            display.add_simulator(handle);
            display.add_visual(VisualHandle::native(&shared(Grid2D::new(life, 5))), 0, 0)?;
        }
        "cobweb" => {
            let orbit = shared(FunctionIterator::new(|x| 3.7 * x * (1.0 - x), &[0.1, 0.2]));
            let handle: SimHandle = orbit.clone();
            display.add_simulator(handle);
            let cobweb = shared(CobwebVisual::new(orbit.clone(), 0.0, 1.0, 400, 400)?);
            let lines = shared(LinesVisual::new(orbit.clone(), 400, 400)?);
            let final_state = shared(FinalStateDiagram::new(orbit, 50, 400, 400)?);
            display.add_visual(VisualHandle::raster(&cobweb), 0, 0)?;
            display.add_visual(VisualHandle::raster(&lines), 400, 0)?;
            display.add_visual(VisualHandle::raster(&final_state), 800, 0)?;
        }
        "bifurcation" => {
            let sweep = FinalStateIterator::new(|r, x| r * x * (1.0 - x), 0.5, 2.5, 4.0);
            let sweep = shared(sweep);
            let handle: SimHandle = sweep.clone();
            display.add_simulator(handle);
            let diagram = shared(BifurcationVisual::new(sweep, (0.0, 1.0), 600, 400)?);
            display.add_visual(VisualHandle::raster(&diagram), 0, 0)?;
        }
        "ifs" => {
            let fern = shared(IfsSimulator::barnsley_fern(500, seed)?);
            let handle: SimHandle = fern.clone();
            display.add_simulator(handle);
            let cloud = PointCloudVisual::new(fern, 300, 600, (-2.2, 2.7, 0.0, 10.0), FERN_GREEN);
            display.add_visual(VisualHandle::native(&shared(cloud)), 0, 0)?;
        }
        "lines" => {
            let henon = shared(FunctionIterator2D::new(
                |x, y| (1.0 - 1.4 * x * x + y, 0.3 * x),
                (0.1, 0.1),
            ));
            let handle: SimHandle = henon.clone();
            display.add_simulator(handle);
            let lines = shared(LinesVisual::new(henon.clone(), 600, 300)?);
            let x_only = shared(
                LineVisual::new(henon, 600, 200)?.with_limits((0.0, 200.0), (-1.5, 1.5)),
            );
            display.add_visual(VisualHandle::raster(&x_only), 0, 0)?;
            display.add_visual(VisualHandle::raster(&lines), 0, 200)?;
        }
        other => bail!("Unknown demo '{other}' (expected life, cobweb, bifurcation, ifs or lines)"),
    }
    log::info!("scene '{demo}' ready: {}x{}", display.width(), display.height());
    Ok(())
}

fn run_ipc_loop(display: &mut Display) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    display.compose()?;

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => {}
            IpcCommand::Tick { count } => {
                // Fire the timer as if `count` intervals had passed.
                let interval = display.clock().interval();
                for _ in 0..count {
                    if display.tick(interval)? {
                        display.compose()?;
                    }
                }
            }
            IpcCommand::Key { key, modifiers } => {
                let key = Key::from_str(&key).unwrap_or(Key::Other);
                match DisplayCommand::from_key(key, modifiers) {
                    Some(command) => apply(display, command)?,
                    None => log::warn!("Unbound key: {key:?}"),
                }
            }
            IpcCommand::Command(command) => apply(display, command)?,
        }
        if display.is_closed() {
            break;
        }
        writeln!(stdout, "{}", serde_json::to_string(&build_ui_state(display))?)?;
        stdout.flush()?;
    }
    display.close()?;
    Ok(())
}

fn apply(display: &mut Display, command: DisplayCommand) -> Result<()> {
    if display.handle_command(command)? && !display.is_closed() {
        display.compose()?;
    }
    Ok(())
}

fn build_ui_state(display: &Display) -> UiState {
    UiState {
        tick:            display.current_tick(),
        paused:          display.is_paused(),
        caption:         display.caption(),
        width:           display.width(),
        height:          display.height(),
        simulators:      display.simulator_count(),
        visuals:         display.placements().len(),
        show_fps:        display.show_fps(),
        recording:       display.is_recording(),
        session:         display.recorder().map(|r| r.session_id().to_string()),
        frames_recorded: frames_recorded(display),
    }
}

struct RunSummary<'a> {
    demo:            &'a str,
    exit:            LoopExit,
    frames_recorded: u64,
    session:         Option<String>,
    seconds:         f64,
}

fn print_summary(display: &Display, summary: &RunSummary<'_>) {
    println!("=== RUN SUMMARY ===");
    println!("  demo:            {}", summary.demo);
    println!("  exit:            {:?}", summary.exit);
    println!("  final tick:      {}", display.current_tick());
    println!("  frame size:      {}x{}", display.width(), display.height());
    println!("  simulators:      {}", display.simulator_count());
    println!("  visuals:         {}", display.placements().len());
    println!("  wall time:       {:.2}s", summary.seconds);
    match &summary.session {
        Some(id) => println!("  recording:       {} ({} frames)", id, summary.frames_recorded),
        None => println!("  recording:       -"),
    }
}

fn frames_recorded(display: &Display) -> u64 {
    display.recorder().map_or(0, |r| r.frames_written())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
