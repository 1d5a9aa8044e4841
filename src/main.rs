//! MocapLink - operator CLI for a remote motion-capture recording engine
//!
//! Connects to the engine, reports session events, and can trigger a timed
//! test recording:
//!
//! ```text
//! mocap-link [config.toml] [--record <seconds>]
//! ```

use mocap_link::{DeviceEvent, MocapConfig, MocapRemote, Result};
use std::env;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Parse the config path and optional record duration from the command line.
///
/// Supports:
/// - `mocap-link <path>` (positional)
/// - `mocap-link --config <path>` / `mocap-link -c <path>`
/// - `mocap-link --record <seconds>`
fn parse_args() -> (String, Option<Duration>) {
    let args: Vec<String> = env::args().collect();

    let mut config_path = "mocaplink.toml".to_string();
    let mut record = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" if i + 1 < args.len() => {
                config_path = args[i + 1].clone();
                i += 2;
            }
            "--record" if i + 1 < args.len() => {
                if let Ok(secs) = args[i + 1].parse::<u64>() {
                    record = Some(Duration::from_secs(secs));
                } else {
                    log::warn!("ignoring invalid --record value {:?}", args[i + 1]);
                }
                i += 2;
            }
            arg if !arg.starts_with('-') => {
                config_path = arg.to_string();
                i += 1;
            }
            arg => {
                log::warn!("ignoring unknown argument {:?}", arg);
                i += 1;
            }
        }
    }

    (config_path, record)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (config_path, record) = parse_args();

    let config = if Path::new(&config_path).exists() {
        log::info!("Using config: {}", config_path);
        MocapConfig::from_file(&config_path)?
    } else {
        log::warn!("Config {} not found, using defaults", config_path);
        MocapConfig::default()
    };
    log::info!(
        "Engine endpoint: {}:{}",
        config.device.remote_ip,
        config.device.command_port
    );

    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let mut device = MocapRemote::new(config, Arc::new(event_tx));
    device.connect()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| mocap_link::Error::Config(format!("Error setting Ctrl-C handler: {}", e)))?;

    log::info!("Connecting... Press Ctrl-C to stop.");

    let mut recording_started = false;
    let mut stop_deadline: Option<Instant> = None;

    while running.load(Ordering::Relaxed) {
        match event_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(DeviceEvent::Connected) => {
                log::info!("Engine ready");
                if record.is_some() && !recording_started {
                    recording_started = true;
                    device.set_take("mocap-link-test", 1)?;
                    device.record_start("mocap-link-test", 1, "timed test recording")?;
                }
            }
            Ok(DeviceEvent::RecordStartConfirmed { timecode }) => {
                log::info!("Recording confirmed at {}", timecode);
                if let Some(duration) = record {
                    stop_deadline = Some(Instant::now() + duration);
                }
            }
            Ok(DeviceEvent::RecordStopConfirmed { timecode, .. }) => {
                log::info!("Recording stopped at {}", timecode);
                if record.is_some() {
                    break;
                }
            }
            Ok(DeviceEvent::Disconnected) => {
                log::warn!("Engine disconnected");
                break;
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }

        if let Some(deadline) = stop_deadline {
            if Instant::now() >= deadline {
                stop_deadline = None;
                device.record_stop()?;
            }
        }
    }

    device.disconnect();
    log::info!("MocapLink stopped");
    Ok(())
}
