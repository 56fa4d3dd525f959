use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use scrcpy_panel_lib::app::adb::devices::NavKey;
use scrcpy_panel_lib::app::commands::{
    adb_connect, adb_disconnect, check_scrcpy, download_scrcpy, get_config, list_devices,
    list_scrcpy_info, preview_scrcpy_args, reset_config, send_key_event, start_scrcpy,
};
use scrcpy_panel_lib::app::config::{config_path, load_config, AppConfig};
use scrcpy_panel_lib::app::error::{AppError, ERR_EXITED_EARLY};
use scrcpy_panel_lib::app::logging::init_logging;
use scrcpy_panel_lib::app::models::DownloadProgress;
use scrcpy_panel_lib::app::scrcpy::info::ListKind;
use scrcpy_panel_lib::app::scrcpy::presets::{
    default_record_file_name, LaunchMode, LaunchPlan, PerformancePreset,
};
use scrcpy_panel_lib::app::scrcpy::supervisor::{MirrorEvent, OutputStream};
use scrcpy_panel_lib::app::state::AppState;
use serde::Serialize;
use uuid::Uuid;

// Covers the reader drain and exit polling after an early exit.
const EARLY_EXIT_DRAIN: Duration = Duration::from_secs(3);

/// Control panel for scrcpy: devices, launch options and the mirroring process.
#[derive(Parser, Debug)]
#[command(name = "scrcpy_panel")]
#[command(about = "Control panel for scrcpy", long_about = None)]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List attached devices
    Devices,
    /// Connect to a device over TCP/IP
    Connect {
        host: String,
        /// Defaults to the configured TCP/IP port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Disconnect a TCP/IP device
    Disconnect { address: String },
    /// Send a navigation key (back, home, app-switch)
    Key {
        key: NavKey,
        #[arg(short, long)]
        serial: Option<String>,
    },
    /// Print the scrcpy arguments a launch would use
    Args(LaunchArgs),
    /// Launch scrcpy and follow its output until it exits
    Run(LaunchArgs),
    /// Run one of scrcpy's --list-* queries
    List {
        kind: ListKind,
        #[arg(short, long)]
        serial: Option<String>,
    },
    /// Show the scrcpy binary in use and its version
    Check,
    /// Download and unpack scrcpy into the tools directory
    Setup,
    /// Inspect or reset the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Path,
    Show,
    Reset,
}

#[derive(Args, Debug)]
struct LaunchArgs {
    /// JSON launch plan; flags below override it
    #[arg(long, value_name = "FILE")]
    plan: Option<PathBuf>,
    #[arg(short, long)]
    serial: Option<String>,
    /// mirroring or virtual-display
    #[arg(long)]
    mode: Option<LaunchMode>,
    /// quality, balance, speed or custom
    #[arg(long)]
    preset: Option<PerformancePreset>,
    #[arg(short = 'm', long)]
    max_size: Option<u32>,
    #[arg(short = 'b', long)]
    bit_rate: Option<String>,
    #[arg(long)]
    max_fps: Option<u32>,
    #[arg(long)]
    no_audio: bool,
    #[arg(long)]
    otg: bool,
    /// Record to FILE; an empty value picks a timestamped name
    #[arg(long, value_name = "FILE", num_args = 0..=1, default_missing_value = "")]
    record: Option<String>,
    #[arg(long)]
    time_limit: Option<u32>,
}

impl LaunchArgs {
    fn into_plan(self, trace_id: &str) -> Result<LaunchPlan, AppError> {
        let mut plan = match &self.plan {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|err| {
                    AppError::validation(format!("Failed to read {}: {err}", path.display()), trace_id)
                })?;
                serde_json::from_str::<LaunchPlan>(&raw).map_err(|err| {
                    AppError::validation(format!("Invalid launch plan: {err}"), trace_id)
                })?
            }
            None => LaunchPlan::default(),
        };
        if let Some(mode) = self.mode {
            plan.mode = mode;
        }
        if let Some(preset) = self.preset {
            plan.preset = preset;
        }
        if self.serial.is_some() {
            plan.options.device.serial = self.serial;
        }
        if self.max_size.is_some() {
            plan.options.video.max_size = self.max_size;
        }
        if self.bit_rate.is_some() {
            plan.options.video.bit_rate = self.bit_rate;
        }
        if self.max_fps.is_some() {
            plan.options.video.max_fps = self.max_fps;
        }
        plan.options.audio.disabled |= self.no_audio;
        plan.options.otg |= self.otg;
        if let Some(path) = self.record {
            plan.recording.enabled = true;
            plan.recording.path = Some(if path.trim().is_empty() {
                default_record_file_name(chrono::Utc::now())
            } else {
                path
            });
        }
        if self.time_limit.is_some() {
            plan.recording.time_limit_secs = self.time_limit;
        }
        Ok(plan)
    }
}

fn main() {
    let cli = Cli::parse();
    let trace_id = Uuid::new_v4().to_string();

    let config = load_config(&trace_id).unwrap_or_default();
    init_logging(&config.logging.log_level);

    let json = cli.json;
    let code = match run(cli.command, &config, &trace_id, json) {
        Ok(code) => code,
        Err(err) => {
            if json {
                print_json(&err);
            } else {
                eprintln!("{err}");
            }
            1
        }
    };
    std::process::exit(code);
}

fn run(command: Command, config: &AppConfig, trace_id: &str, json: bool) -> Result<i32, AppError> {
    let trace = || Some(trace_id.to_string());
    let state = AppState::from_config(config);

    match command {
        Command::Devices => {
            let response = list_devices(&state, trace())?;
            if json {
                print_json(&response);
            } else if response.data.devices.is_empty() {
                println!("No devices");
            } else {
                for device in &response.data.devices {
                    let selected = response.data.selected.as_deref() == Some(device.serial.as_str());
                    let marker = if selected { "*" } else { " " };
                    println!(
                        "{marker} {:<24} {:<13} {:<9} {}",
                        device.serial,
                        device.status.as_str(),
                        device.connection_kind.as_str(),
                        device.model
                    );
                }
            }
        }
        Command::Connect { host, port } => {
            let response = adb_connect(host, port, trace())?;
            report_bridge(json, &response.data.message, &response);
        }
        Command::Disconnect { address } => {
            let response = adb_disconnect(address, trace())?;
            report_bridge(json, &response.data.message, &response);
            if !response.data.success {
                return Ok(1);
            }
        }
        Command::Key { key, serial } => {
            let response = send_key_event(&state, key, serial, trace())?;
            if json {
                print_json(&response);
            }
        }
        Command::Args(launch) => {
            let plan = launch.into_plan(trace_id)?;
            select_first_device(&state, &plan, trace_id);
            let response = preview_scrcpy_args(&state, plan, trace())?;
            if json {
                print_json(&response);
            } else {
                println!("{}", response.data.join(" "));
            }
        }
        Command::Run(launch) => {
            let plan = launch.into_plan(trace_id)?;
            select_first_device(&state, &plan, trace_id);
            return follow_mirror(&state, plan, trace_id, json);
        }
        Command::List { kind, serial } => {
            let response = list_scrcpy_info(kind, serial, trace())?;
            if json {
                print_json(&response);
            } else {
                print!("{}", response.data.output);
            }
        }
        Command::Check => {
            let response = check_scrcpy(trace())?;
            if json {
                print_json(&response);
            } else if response.data.available {
                println!("{}", response.data.command_path);
                println!("{}", response.data.version_output.trim());
            } else {
                println!("scrcpy not available (looked for {})", response.data.command_path);
                return Ok(1);
            }
        }
        Command::Setup => {
            let on_progress = |progress: DownloadProgress| {
                if json {
                    return;
                }
                match progress.percent {
                    Some(percent) => eprint!("\rdownloading... {percent:>3}%"),
                    None => eprint!("\rdownloading... {} bytes", progress.downloaded),
                }
                let _ = std::io::stderr().flush();
            };
            let response = download_scrcpy(&on_progress, trace())?;
            if json {
                print_json(&response);
            } else {
                eprintln!();
                println!(
                    "extracted {} files into {}",
                    response.data.extracted_files.len(),
                    response.data.target_dir
                );
            }
        }
        Command::Config { action } => match action {
            ConfigAction::Path => println!("{}", config_path().display()),
            ConfigAction::Show => print_json(&get_config(trace())?.data),
            ConfigAction::Reset => {
                let response = reset_config(trace())?;
                if json {
                    print_json(&response);
                } else {
                    println!("reset {}", config_path().display());
                }
            }
        },
    }
    Ok(0)
}

/// A fresh process has no selection yet; refresh once so auto-select applies.
fn select_first_device(state: &AppState, plan: &LaunchPlan, trace_id: &str) {
    let has_serial = plan
        .options
        .device
        .serial
        .as_deref()
        .is_some_and(|serial| !serial.trim().is_empty());
    if has_serial || plan.options.otg {
        return;
    }
    if let Err(err) = list_devices(state, Some(trace_id.to_string())) {
        tracing::warn!(trace_id = %trace_id, error = %err, "device refresh failed");
    }
}

fn follow_mirror(
    state: &AppState,
    plan: LaunchPlan,
    trace_id: &str,
    json: bool,
) -> Result<i32, AppError> {
    let (subscription, events) = state.supervisor.subscribe_channel();
    let outcome = match start_scrcpy(state, plan, Some(trace_id.to_string())) {
        Ok(response) => {
            let started = response.data;
            if json {
                print_json(&started);
            } else {
                eprintln!("scrcpy started (pid {})", started.pid);
            }
            Ok(relay_events(&events, Some(started.generation), None, json).unwrap_or(0))
        }
        // The process did start: show what it printed and how it ended.
        Err(err) if err.is(ERR_EXITED_EARLY) => {
            let code = relay_events(&events, None, Some(EARLY_EXIT_DRAIN), json);
            if json {
                print_json(&err);
            } else {
                eprintln!("{err}");
            }
            Ok(code.unwrap_or(1))
        }
        Err(err) => Err(err),
    };
    state.supervisor.unsubscribe(subscription);
    outcome
}

/// Prints events until the matching exit arrives and returns its code.
/// `generation: None` accepts any process; `wait: None` blocks until exit.
fn relay_events(
    events: &Receiver<MirrorEvent>,
    generation: Option<u64>,
    wait: Option<Duration>,
    json: bool,
) -> Option<i32> {
    let deadline = wait.map(|wait| Instant::now() + wait);
    loop {
        let event = match deadline {
            Some(deadline) => events
                .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                .ok()?,
            None => events.recv().ok()?,
        };
        let ours = |value: u64| generation.map_or(true, |expected| expected == value);
        if json {
            print_json(&event);
        }
        match event {
            MirrorEvent::Output {
                generation: value,
                stream,
                chunk,
            } if ours(value) && !json => match stream {
                OutputStream::Stdout => print!("{chunk}"),
                OutputStream::Stderr => eprint!("{chunk}"),
            },
            MirrorEvent::Exited {
                generation: value,
                exit_code,
                ..
            } if ours(value) => {
                if !json {
                    match exit_code {
                        Some(code) => eprintln!("scrcpy exited with code {code}"),
                        None => eprintln!("scrcpy exited"),
                    }
                }
                return Some(exit_code.unwrap_or(1));
            }
            _ => {}
        }
    }
}

fn report_bridge<T: Serialize>(json: bool, message: &str, response: &T) {
    if json {
        print_json(response);
    } else {
        println!("{message}");
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(output) => println!("{output}"),
        Err(err) => eprintln!("{err}"),
    }
}
