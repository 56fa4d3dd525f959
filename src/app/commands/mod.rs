use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::app::adb::devices::{reconcile_selection, DeviceDirectory, NavKey};
use crate::app::adb::locator::{resolve_adb_program, validate_program};
use crate::app::bootstrap::bootstrap_scrcpy;
use crate::app::config::{load_config, save_config, AppConfig};
use crate::app::error::AppError;
use crate::app::models::{
    BootstrapResult, BridgeActionResult, CommandResponse, DeviceList, DownloadProgress,
    HostCommandResult, MirrorStatus, ScrcpyInfo, ToolListing,
};
use crate::app::scrcpy::args::build_scrcpy_args;
use crate::app::scrcpy::info::{
    check_scrcpy as check_scrcpy_availability, resolve_scrcpy_program, run_listing, ListKind,
};
use crate::app::scrcpy::presets::{prepare_launch, LaunchPlan};
use crate::app::scrcpy::supervisor::{MirrorState, Started, Stopped};
use crate::app::state::AppState;


pub(crate) fn resolve_trace_id(input: Option<String>) -> String {
    input
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn ensure_non_empty(value: &str, field: &str, trace_id: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(
            format!("{field} is required"),
            trace_id,
        ));
    }
    Ok(())
}

fn respond<T>(trace_id: String, data: T) -> Result<CommandResponse<T>, AppError> {
    Ok(CommandResponse { trace_id, data })
}

fn get_adb_program(config: &AppConfig, trace_id: &str) -> Result<String, AppError> {
    let program = resolve_adb_program(&config.tools, &config.scrcpy_dir());
    if let Err(message) = validate_program(&program, "ADB") {
        return Err(AppError::validation(message, trace_id));
    }
    Ok(program)
}

fn get_scrcpy_program(config: &AppConfig, trace_id: &str) -> Result<String, AppError> {
    let program = resolve_scrcpy_program(&config.tools, &config.scrcpy_dir()).ok_or_else(|| {
        AppError::dependency("scrcpy not found; run setup first", trace_id)
    })?;
    if let Err(message) = validate_program(&program, "scrcpy") {
        return Err(AppError::validation(message, trace_id));
    }
    Ok(program)
}

fn device_directory(config: &AppConfig, trace_id: &str) -> Result<DeviceDirectory, AppError> {
    Ok(DeviceDirectory::new(
        get_adb_program(config, trace_id)?,
        Duration::from_secs(config.command.command_timeout_secs),
        config.device.default_tcpip_port,
    ))
}

pub fn get_config(trace_id: Option<String>) -> Result<CommandResponse<AppConfig>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    respond(trace_id, config)
}

pub fn save_app_config(
    config: AppConfig,
    trace_id: Option<String>,
) -> Result<CommandResponse<AppConfig>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    save_config(&config, &trace_id)?;
    respond(trace_id, config)
}

pub fn reset_config(trace_id: Option<String>) -> Result<CommandResponse<AppConfig>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = AppConfig::default();
    save_config(&config, &trace_id)?;
    respond(trace_id, config)
}

pub fn check_scrcpy(trace_id: Option<String>) -> Result<CommandResponse<ScrcpyInfo>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let info = check_scrcpy_availability(&config.tools, &config.scrcpy_dir());
    info!(
        trace_id = %trace_id,
        available = info.available,
        major_version = info.major_version,
        command_path = %info.command_path,
        "check_scrcpy"
    );
    respond(trace_id, info)
}

pub fn list_devices(
    state: &AppState,
    trace_id: Option<String>,
) -> Result<CommandResponse<DeviceList>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let list = list_devices_inner(state, &config, &trace_id)?;
    respond(trace_id, list)
}

fn list_devices_inner(
    state: &AppState,
    config: &AppConfig,
    trace_id: &str,
) -> Result<DeviceList, AppError> {
    let devices = device_directory(config, trace_id)?.list_devices(trace_id)?;
    let previous = state.selected();
    let selected = reconcile_selection(
        previous.as_deref(),
        &devices,
        config.device.auto_select_first,
    );
    if previous != selected {
        info!(trace_id = %trace_id, previous = ?previous, selected = ?selected, "device selection changed");
    }
    state.set_selected(selected.clone());
    Ok(DeviceList { devices, selected })
}

pub fn select_device(
    state: &AppState,
    serial: Option<String>,
    trace_id: Option<String>,
) -> Result<CommandResponse<Option<String>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let serial = serial.filter(|value| !value.trim().is_empty());
    state.set_selected(serial.clone());
    respond(trace_id, serial)
}

pub fn adb_connect(
    host: String,
    port: Option<u16>,
    trace_id: Option<String>,
) -> Result<CommandResponse<BridgeActionResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&host, "host", &trace_id)?;
    let config = load_config(&trace_id)?;
    let result = device_directory(&config, &trace_id)?.connect_tcpip(&host, port, &trace_id)?;
    respond(trace_id, result)
}

pub fn adb_disconnect(
    address: String,
    trace_id: Option<String>,
) -> Result<CommandResponse<BridgeActionResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    ensure_non_empty(&address, "address", &trace_id)?;
    let config = load_config(&trace_id)?;
    let result = device_directory(&config, &trace_id)?.disconnect_tcpip(&address, &trace_id)?;
    respond(trace_id, result)
}

/// Falls back to the selected device when no serial is given.
pub fn send_key_event(
    state: &AppState,
    key: NavKey,
    serial: Option<String>,
    trace_id: Option<String>,
) -> Result<CommandResponse<HostCommandResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let serial = serial
        .filter(|value| !value.trim().is_empty())
        .or_else(|| state.selected());
    let result = device_directory(&config, &trace_id)?.send_key_event(
        serial.as_deref(),
        key.keycode(),
        &trace_id,
    )?;
    respond(trace_id, result)
}

pub fn preview_scrcpy_args(
    state: &AppState,
    plan: LaunchPlan,
    trace_id: Option<String>,
) -> Result<CommandResponse<Vec<String>>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let options = prepare_options(state, &config, plan, &trace_id)?;
    respond(trace_id, build_scrcpy_args(&options))
}

fn prepare_options(
    state: &AppState,
    config: &AppConfig,
    mut plan: LaunchPlan,
    trace_id: &str,
) -> Result<crate::app::scrcpy::options::MirrorOptions, AppError> {
    let has_serial = plan
        .options
        .device
        .serial
        .as_deref()
        .is_some_and(|serial| !serial.trim().is_empty());
    if !has_serial {
        plan.options.device.serial = state.selected();
    }
    prepare_launch(plan, &config.mirror.virtual_display_spec, trace_id)
}

pub fn start_scrcpy(
    state: &AppState,
    plan: LaunchPlan,
    trace_id: Option<String>,
) -> Result<CommandResponse<Started>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let started = start_scrcpy_inner(state, &config, plan, &trace_id)?;
    respond(trace_id, started)
}

fn start_scrcpy_inner(
    state: &AppState,
    config: &AppConfig,
    plan: LaunchPlan,
    trace_id: &str,
) -> Result<Started, AppError> {
    if state.supervisor.status() {
        return Err(AppError::already_running(trace_id));
    }
    let mode = plan.mode;
    let options = prepare_options(state, config, plan, trace_id)?;
    let args = build_scrcpy_args(&options);
    let program = get_scrcpy_program(config, trace_id)?;
    let scrcpy_dir = config.scrcpy_dir();
    let working_dir = scrcpy_dir.is_dir().then_some(scrcpy_dir.as_path());
    info!(trace_id = %trace_id, mode = ?mode, serial = ?options.device.serial, "start_scrcpy");
    state
        .supervisor
        .start(&program, &args, working_dir, trace_id)
}

pub fn stop_scrcpy(
    state: &AppState,
    trace_id: Option<String>,
) -> Result<CommandResponse<Stopped>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let stopped = state.supervisor.stop(&trace_id)?;
    respond(trace_id, stopped)
}

pub fn scrcpy_status(
    state: &AppState,
    trace_id: Option<String>,
) -> Result<CommandResponse<MirrorStatus>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let mirror_state = state.supervisor.state();
    let label = match mirror_state {
        MirrorState::Idle => "idle",
        MirrorState::Starting => "starting",
        MirrorState::Running => "running",
    };
    respond(
        trace_id,
        MirrorStatus {
            running: mirror_state != MirrorState::Idle,
            state: label.to_string(),
        },
    )
}

pub fn list_scrcpy_info(
    kind: ListKind,
    serial: Option<String>,
    trace_id: Option<String>,
) -> Result<CommandResponse<ToolListing>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let listing = list_scrcpy_info_inner(&config, kind, serial.as_deref(), &trace_id)?;
    respond(trace_id, listing)
}

fn list_scrcpy_info_inner(
    config: &AppConfig,
    kind: ListKind,
    serial: Option<&str>,
    trace_id: &str,
) -> Result<ToolListing, AppError> {
    let program = get_scrcpy_program(config, trace_id)?;
    let scrcpy_dir = config.scrcpy_dir();
    let working_dir = scrcpy_dir.is_dir().then_some(scrcpy_dir.as_path());
    run_listing(
        &program,
        kind,
        serial.filter(|value| !value.trim().is_empty()),
        working_dir,
        Duration::from_secs(config.command.listing_timeout_secs),
        trace_id,
    )
}

pub fn download_scrcpy(
    on_progress: &dyn Fn(DownloadProgress),
    trace_id: Option<String>,
) -> Result<CommandResponse<BootstrapResult>, AppError> {
    let trace_id = resolve_trace_id(trace_id);
    let config = load_config(&trace_id)?;
    let target_dir = config.scrcpy_dir();
    let result = bootstrap_scrcpy(&config.bootstrap, &target_dir, on_progress, &trace_id)
        .inspect_err(|err| {
            warn!(trace_id = %trace_id, code = %err.code, error = %err.error, "scrcpy setup failed");
        })?;
    respond(trace_id, result)
}
