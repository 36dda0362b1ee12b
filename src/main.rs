// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link CLI

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Duration;
use tokio_serial::{DataBits, Parity, SerialStream, StopBits};
use tracing::{debug, info, warn};

use ledlink::transport::discovery;
use ledlink::{
    Color, ConnectionState, EventReceiver, LedController, LinkConfig, LinkEvent, RandomBeats,
    UpdateAction,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "ledlink")]
#[command(about = "Control an ESP32 LED strip over USB serial")]
struct Cli {
    /// Path to an optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial device (overrides the config file; default: auto-discover)
    #[arg(long)]
    port: Option<String>,

    /// Print status lines as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// List serial devices
    List {
        /// Include non-USB ports
        #[arg(long)]
        all: bool,
    },
    /// Send raw wire commands in order (e.g. `send solid red brightness:64`)
    Send {
        #[arg(required = true)]
        commands: Vec<String>,
    },
    /// Switch the strip mode
    Mode { mode: ModeArg },
    /// Switch to solid mode and set a color
    Color { color: ColorArg },
    /// Set strip brightness (0-255)
    Brightness {
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },
    /// Control the built-in status LED
    Led { action: LedArg },
    /// Request the device status line
    Status,
    /// Request device information
    Info,
    /// Send a keepalive ping
    Ping,
    /// Firmware auto-update control
    Update { action: UpdateArg },
    /// Stream random beat samples until Ctrl+C
    Music {
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Read commands from stdin, one per line
    Interactive,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Off,
    Rainbow,
    Solid,
    Music,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorArg {
    Red,
    Green,
    Blue,
    Yellow,
    White,
}

impl From<ColorArg> for Color {
    fn from(c: ColorArg) -> Self {
        match c {
            ColorArg::Red => Color::Red,
            ColorArg::Green => Color::Green,
            ColorArg::Blue => Color::Blue,
            ColorArg::Yellow => Color::Yellow,
            ColorArg::White => Color::White,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LedArg {
    On,
    Off,
    Toggle,
}

#[derive(Clone, Copy, ValueEnum)]
enum UpdateArg {
    Check,
    Enable,
    Disable,
    Now,
}

impl From<UpdateArg> for UpdateAction {
    fn from(a: UpdateArg) -> Self {
        match a {
            UpdateArg::Check => UpdateAction::Check,
            UpdateArg::Enable => UpdateAction::Enable,
            UpdateArg::Disable => UpdateAction::Disable,
            UpdateArg::Now => UpdateAction::Now,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct Config {
    #[serde(default)]
    serial: SerialToml,
}

#[derive(Debug, Deserialize)]
struct SerialToml {
    #[serde(default)]
    port: Option<String>,
    #[serde(default = "default_baud_rate")]
    baud_rate: u32,
    #[serde(default = "default_data_bits")]
    data_bits: u8,
    #[serde(default = "default_stop_bits")]
    stop_bits: u8,
    #[serde(default = "default_parity")]
    parity: String,
    #[serde(default = "default_timeout")]
    write_timeout_ms: u64,
    #[serde(default = "default_timeout")]
    read_timeout_ms: u64,
    #[serde(default = "default_music_interval")]
    music_interval_ms: u64,
    #[serde(default)]
    keepalive_interval_ms: u64,
    #[serde(default = "default_true")]
    usb_only: bool,
    #[serde(default = "default_true")]
    query_status_on_connect: bool,
}

impl Default for SerialToml {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: default_parity(),
            write_timeout_ms: default_timeout(),
            read_timeout_ms: default_timeout(),
            music_interval_ms: default_music_interval(),
            keepalive_interval_ms: 0,
            usb_only: true,
            query_status_on_connect: true,
        }
    }
}

fn default_baud_rate() -> u32 {
    ledlink::constants::DEFAULT_BAUD_RATE
}
fn default_data_bits() -> u8 {
    8
}
fn default_stop_bits() -> u8 {
    1
}
fn default_parity() -> String {
    "none".to_string()
}
fn default_timeout() -> u64 {
    1000
}
fn default_music_interval() -> u64 {
    ledlink::constants::MUSIC_INTERVAL_MS
}
fn default_true() -> bool {
    true
}

fn parse_data_bits(bits: u8) -> Result<DataBits> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => anyhow::bail!("Unsupported data bits: {other}"),
    }
}

fn parse_stop_bits(bits: u8) -> Result<StopBits> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => anyhow::bail!("Unsupported stop bits: {other}"),
    }
}

fn parse_parity(s: &str) -> Result<Parity> {
    match s.to_lowercase().as_str() {
        "none" | "n" => Ok(Parity::None),
        "odd" | "o" => Ok(Parity::Odd),
        "even" | "e" => Ok(Parity::Even),
        other => anyhow::bail!("Unknown parity: {other}"),
    }
}

fn build_link_config(toml: &SerialToml, port_override: Option<&str>) -> Result<LinkConfig> {
    let mut builder = LinkConfig::builder()
        .baud_rate(toml.baud_rate)
        .data_bits(parse_data_bits(toml.data_bits)?)
        .stop_bits(parse_stop_bits(toml.stop_bits)?)
        .parity(parse_parity(&toml.parity)?)
        .write_timeout_ms(toml.write_timeout_ms)
        .read_timeout_ms(toml.read_timeout_ms)
        .music_interval_ms(toml.music_interval_ms)
        .keepalive_interval_ms(toml.keepalive_interval_ms)
        .usb_only(toml.usb_only)
        .query_status_on_connect(toml.query_status_on_connect);
    if let Some(port) = port_override.or(toml.port.as_deref()) {
        builder = builder.port(port);
    }
    Ok(builder.build())
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&text).context("Failed to parse config file")
        }
        None => Ok(Config::default()),
    }
}

// ---------------------------------------------------------------------------
// Status output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct StatusLine<'a> {
    now: i64,
    op: &'a str,
    text: &'a str,
}

fn print_status(json: bool, op: &str, text: &str) {
    if json {
        let line = StatusLine {
            now: Utc::now().timestamp_millis(),
            op,
            text,
        };
        match serde_json::to_string(&line) {
            Ok(s) => println!("{s}"),
            Err(e) => warn!("Failed to serialize status line: {e}"),
        }
    } else {
        println!("{text}");
    }
}

/// Print events until the channel closes.
async fn print_events(mut rx: EventReceiver, json: bool) {
    loop {
        match rx.recv().await {
            Ok(LinkEvent::Status(text)) => print_status(json, "STATUS", &text),
            Ok(LinkEvent::StateChanged { old, new }) => {
                debug!("State {old} -> {new}");
                if json {
                    print_status(json, "STATE", new.as_str());
                }
            }
            Ok(LinkEvent::Reply(reply)) => debug!("Reply: {}", reply.raw()),
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                warn!("Event receiver lagged, missed {n} events");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn run_command(controller: &LedController<SerialStream>, command: CliCommand) -> Result<()> {
    // Errors are already on the status channel; they only set the exit code.
    let outcome = match command {
        // Listed in main before connecting
        CliCommand::List { .. } => Ok(None),
        CliCommand::Send { commands } => {
            let mut last = Ok(None);
            for text in &commands {
                last = controller.send_text(text).await;
                if last.is_err() {
                    break;
                }
            }
            last
        }
        CliCommand::Mode { mode } => match mode {
            ModeArg::Off => controller.off().await,
            ModeArg::Rainbow => controller.rainbow().await,
            ModeArg::Solid => controller.solid().await,
            ModeArg::Music => controller.music_mode().await,
        },
        CliCommand::Color { color } => controller.set_color(color.into()).await,
        CliCommand::Brightness { value } => controller.set_brightness(value).await,
        CliCommand::Led { action } => match action {
            LedArg::On => controller.led_on().await,
            LedArg::Off => controller.led_off().await,
            LedArg::Toggle => controller.toggle_led().await,
        },
        CliCommand::Status => controller.request_status().await,
        CliCommand::Info => controller.info().await,
        CliCommand::Ping => controller.ping().await,
        CliCommand::Update { action } => controller.update(action.into()).await,
        CliCommand::Music { seconds } => {
            controller.music_mode().await?;
            controller.start_music(RandomBeats::new()).await?;
            wait_for_stop(seconds).await?;
            if let Some(sent) = controller.stop_music().await {
                info!("Sent {sent} beat samples");
            }
            Ok(None)
        }
        CliCommand::Interactive => {
            run_interactive(controller).await?;
            Ok(None)
        }
    };
    outcome.map(|_| ()).map_err(anyhow::Error::from)
}

async fn wait_for_stop(seconds: Option<u64>) -> Result<()> {
    match seconds {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                res = tokio::signal::ctrl_c() => res.context("Failed to listen for Ctrl+C")?,
            }
        }
        None => {
            info!("Streaming beats, press Ctrl+C to stop");
            tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
        }
    }
    Ok(())
}

/// One command per line; `quit` or EOF ends the session. Failures are
/// reported and the session continues.
async fn run_interactive(controller: &LedController<SerialStream>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            "connect" => {
                controller.connect().await?;
            }
            _ => {
                if let Err(e) = controller.send_text(line).await {
                    debug!("Command {line:?} failed: {e}");
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=ledlink=trace).
    // Default: info. Logs go to stderr so stdout only carries status lines.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt()
            .without_time()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
    }

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let link_config = build_link_config(&config.serial, cli.port.as_deref())?;

    if let CliCommand::List { all } = cli.command {
        let devices = discovery::list_devices(!all)?;
        if devices.is_empty() {
            println!("No serial devices found");
        }
        for device in devices {
            println!("{}", device.describe());
        }
        return Ok(());
    }

    let controller = LedController::new(link_config);
    let printer = tokio::spawn(print_events(controller.subscribe(), cli.json));

    let state = controller.connect().await?;
    let result = if state == ConnectionState::Connected {
        run_command(&controller, cli.command).await
    } else {
        Err(anyhow::anyhow!("Device not connected ({state})"))
    };

    controller.shutdown().await;
    drop(controller);
    if let Err(e) = printer.await {
        warn!("Status printer ended abnormally: {e}");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_serial_config() {
        let config: Config = toml::from_str("").unwrap();
        let link = build_link_config(&config.serial, None).unwrap();
        assert_eq!(link.baud_rate, 115_200);
        assert_eq!(link.port, None);
        assert_eq!(link.read_timeout_ms, 1000);
    }

    #[test]
    fn test_serial_config_from_toml() {
        let config: Config = toml::from_str(
            r#"
            [serial]
            port = "/dev/ttyACM0"
            parity = "even"
            stop_bits = 2
            keepalive_interval_ms = 10000
            "#,
        )
        .unwrap();
        let link = build_link_config(&config.serial, None).unwrap();
        assert_eq!(link.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(link.parity, Parity::Even);
        assert_eq!(link.stop_bits, StopBits::Two);
        assert_eq!(link.keepalive_interval_ms, 10_000);
    }

    #[test]
    fn test_port_override() {
        let config: Config = toml::from_str("[serial]\nport = \"/dev/ttyUSB0\"").unwrap();
        let link = build_link_config(&config.serial, Some("/dev/ttyUSB1")).unwrap();
        assert_eq!(link.port.as_deref(), Some("/dev/ttyUSB1"));
    }

    #[test]
    fn test_bad_framing_rejected() {
        assert!(parse_data_bits(9).is_err());
        assert!(parse_stop_bits(3).is_err());
        assert!(parse_parity("mark").is_err());
    }
}
