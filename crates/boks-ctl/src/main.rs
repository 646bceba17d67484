//! Boks controller command line: entry point.
//!
//! An offline companion for working with Boks traffic: it dissects captured
//! frames, builds command frames to paste into a BLE tool, classifies
//! battery readings, and replays whole packet-log captures through the same
//! session state machine a live controller uses.
//!
//! # Usage
//!
//! ```text
//! boks-ctl [OPTIONS] <COMMAND>
//!
//! Commands:
//!   decode    Decode notification frames given as hex
//!   encode    Build the frame for a command
//!   battery   Decode and classify a battery characteristic value
//!   replay    Replay a packet-log capture through a session
//!   opcodes   List the opcode registry
//!   gatt      List the GATT services and characteristics of a box
//!   config    Show or initialise the configuration file
//!
//! Options:
//!   --config <PATH>        Config file [env: BOKS_CONFIG]
//!   --chemistry <CHEM>     aaa8x or lsh14 [env: BOKS_CHEMISTRY]
//!   --json                 Print JSON instead of text
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable          | Description                                     |
//! |-------------------|-------------------------------------------------|
//! | `BOKS_CONFIG`     | Path of the TOML config file                    |
//! | `BOKS_CHEMISTRY`  | Battery chemistry, overrides `[session]`        |
//!
//! Without a chemistry from either source, `battery --firmware <REV>` picks
//! it from the hardware generation, as a live session does.
//! | `RUST_LOG`        | Tracing filter, overrides `[general] log_level` |

use std::path::PathBuf;

use anyhow::Context;
use boks_core::protocol::{format_hex, opcodes};
use boks_core::{
    decode_battery, decode_notification, BatteryChemistry, CodeType, Command, HardwareProfile,
};
use boks_ctl::capture::{parse_capture, parse_frame_hex, replay};
use boks_ctl::config::{self, AppConfig};
use boks_ctl::render::{describe_battery, describe_event, gatt_layout};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Boks BLE protocol tool.
#[derive(Debug, Parser)]
#[command(
    name = "boks-ctl",
    about = "Dissect, build and replay Boks BLE protocol frames",
    version
)]
struct Cli {
    /// Path of the TOML config file.
    ///
    /// Defaults to `config.toml` in the platform config directory.
    #[arg(long, global = true, env = "BOKS_CONFIG")]
    config: Option<PathBuf>,

    /// Battery chemistry used for health classification.
    #[arg(long, global = true, env = "BOKS_CHEMISTRY")]
    chemistry: Option<BatteryChemistry>,

    /// Print machine-readable JSON, one document per line.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Decode notification frames given as hex, one frame per argument.
    Decode {
        #[arg(required = true)]
        frames: Vec<String>,
    },
    /// Build the frame for a command.
    Encode {
        #[command(subcommand)]
        command: EncodeArgs,
    },
    /// Decode and classify a battery characteristic value given as hex.
    Battery {
        value: String,
        /// Firmware revision of the box (e.g. `10/125`), used to pick the chemistry.
        #[arg(long)]
        firmware: Option<String>,
    },
    /// Replay a packet-log capture through a session.
    Replay { capture: PathBuf },
    /// List the opcode registry.
    Opcodes,
    /// List the GATT services and characteristics of a box.
    Gatt,
    /// Show or initialise the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum EncodeArgs {
    /// Open the door with a 6-character code.
    OpenDoor { code: String },
    /// Ask whether the door is open.
    AskDoorStatus,
    /// Store a new code.
    CreateCode {
        /// 8-character configuration key.
        #[arg(long)]
        key: String,
        #[arg(long)]
        code: String,
        #[arg(long = "type", default_value_t = CodeType::Single)]
        code_type: CodeType,
        /// Master slot (0-99), required for master codes.
        #[arg(long)]
        index: Option<u8>,
    },
    /// Delete the master code in a slot.
    DeleteMasterCode {
        #[arg(long)]
        key: String,
        #[arg(long)]
        index: u8,
    },
    /// Set one configuration option.
    SetConfiguration {
        #[arg(long)]
        key: String,
        #[arg(long)]
        option: u8,
        #[arg(long)]
        value: u8,
    },
    /// Enable Vigik badge support, or disable it with `--disable`.
    SetVigik {
        #[arg(long)]
        key: String,
        #[arg(long)]
        disable: bool,
    },
    /// Ask how many history entries are pending.
    GetLogsCount,
    /// Start the history download.
    RequestLogs,
    /// Ask how many codes are stored.
    CountCodes,
}

impl EncodeArgs {
    fn to_command(&self) -> Command {
        match self.clone() {
            EncodeArgs::OpenDoor { code } => Command::OpenDoor { code },
            EncodeArgs::AskDoorStatus => Command::AskDoorStatus,
            EncodeArgs::CreateCode {
                key,
                code,
                code_type,
                index,
            } => Command::CreateCode {
                config_key: key,
                code,
                code_type,
                index,
            },
            EncodeArgs::DeleteMasterCode { key, index } => Command::DeleteMasterCode {
                config_key: key,
                index,
            },
            EncodeArgs::SetConfiguration { key, option, value } => Command::SetConfiguration {
                config_key: key,
                option_id: option,
                value,
            },
            EncodeArgs::SetVigik { key, disable } => Command::set_vigik(key, !disable),
            EncodeArgs::GetLogsCount => Command::GetLogsCount,
            EncodeArgs::RequestLogs => Command::RequestLogs,
            EncodeArgs::CountCodes => Command::CountCodes,
        }
    }
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Write the default configuration if no file exists yet.
    Init,
}

impl Cli {
    /// Loads the config file and applies command-line overrides.
    fn load_app_config(&self) -> anyhow::Result<AppConfig> {
        let path = self.config_path()?;
        let mut app = config::load(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        if let Some(chemistry) = self.chemistry {
            app.session.chemistry = Some(chemistry);
        }
        Ok(app)
    }

    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(config::default_config_path()?),
        }
    }
}

/// The configured chemistry, else the one the firmware revision implies.
fn battery_chemistry(configured: Option<BatteryChemistry>, firmware: Option<&str>) -> BatteryChemistry {
    configured
        .or_else(|| firmware.and_then(|rev| HardwareProfile::from_firmware(rev).chemistry()))
        .unwrap_or_default()
}

// ── Output ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EncodedFrame<'a> {
    #[serde(flatten)]
    command: &'a Command,
    frame: String,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(value).context("failed to serialise output")?);
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let app = cli.load_app_config()?;

    // `RUST_LOG` wins over the configured level.  Logs go to stderr; stdout
    // carries only results.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&app.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    debug!("effective config: {app:?}");

    match &cli.command {
        CliCommand::Decode { frames } => {
            for text in frames {
                let raw = parse_frame_hex(text).with_context(|| format!("invalid hex '{text}'"))?;
                let event = decode_notification(&raw);
                if cli.json {
                    print_json(&event)?;
                } else {
                    println!("{}  {}", format_hex(&raw), describe_event(&event));
                }
            }
        }
        CliCommand::Encode { command } => {
            let command = command.to_command();
            let bytes = command.encode().context("cannot build frame")?;
            if cli.json {
                print_json(&EncodedFrame {
                    command: &command,
                    frame: format_hex(&bytes),
                })?;
            } else {
                println!("{}", format_hex(&bytes));
            }
        }
        CliCommand::Battery { value, firmware } => {
            let raw = parse_frame_hex(value).with_context(|| format!("invalid hex '{value}'"))?;
            let reading = decode_battery(&raw);
            let chemistry = battery_chemistry(app.session.chemistry, firmware.as_deref());
            debug!("classifying battery as {chemistry}");
            let health = reading.health(chemistry);
            if cli.json {
                print_json(&serde_json::json!({ "reading": reading, "health": health }))?;
            } else {
                println!("{}", describe_battery(&reading, &health));
            }
        }
        CliCommand::Replay { capture } => {
            let text = std::fs::read_to_string(capture)
                .with_context(|| format!("failed to read capture {}", capture.display()))?;
            let frames = parse_capture(&text)
                .with_context(|| format!("failed to parse capture {}", capture.display()))?;
            info!("replaying {} frames from {}", frames.len(), capture.display());

            let report = replay(&frames, app.session.clone())
                .await
                .context("replay failed")?;
            for event in &report.events {
                if cli.json {
                    print_json(event)?;
                } else {
                    println!("{}", describe_event(event));
                }
            }
            if !cli.json {
                for frame in &report.written {
                    println!("TX {}", format_hex(frame));
                }
                println!(
                    "{} notifications, {} history entries, {} controller frames skipped",
                    report.events.len(),
                    report.history_entries().count(),
                    report.skipped_tx
                );
            }
        }
        CliCommand::Opcodes => {
            for info in opcodes::all() {
                if cli.json {
                    print_json(info)?;
                } else {
                    println!("0x{:02X}  {:<34} {:?}", info.opcode, info.name, info.direction);
                }
            }
        }
        CliCommand::Gatt => {
            for entry in gatt_layout() {
                if cli.json {
                    print_json(&entry)?;
                } else {
                    println!("{}  {}", entry.uuid, entry.role);
                }
            }
        }
        CliCommand::Config { action } => match action {
            ConfigAction::Show => {
                let text = toml::to_string_pretty(&app).context("failed to serialise config")?;
                print!("{text}");
            }
            ConfigAction::Init => {
                let path = cli.config_path()?;
                if path.exists() {
                    println!("{} already exists", path.display());
                } else {
                    config::save(&path, &AppConfig::default())
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("wrote {}", path.display());
                }
            }
        },
    }

    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
