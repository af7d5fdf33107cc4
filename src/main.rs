use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use xkeys_surface::{
    config::{Config, SurfaceConfig},
    device::{
        event_channel, ButtonMetadata, DeviceIndex, JoystickPosition, LogicalPosition,
        PanelEvent, PanelHardware, PanelInfo, VirtualPanel, JOG_RESET_DELAY,
    },
    error::DetachReason,
    host::SurfaceHost,
    schema, XkeysSurface,
};

#[derive(Parser, Debug)]
#[command(name = "xkeys-surface")]
#[command(about = "Surface adapter for X-keys backlit button panels")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.config/xkeys-surface/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the layout, variables and config fields registered for the panel
    Schema,
    /// Drive a virtual panel from commands on stdin
    Simulate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Schema => print_schema(&config.panel.info()),
        Command::Simulate => simulate(config).await,
    }
}

fn print_schema(info: &PanelInfo) -> Result<()> {
    let props = schema::register_props(info);
    println!("{}", serde_json::to_string_pretty(&props)?);
    Ok(())
}

/// Host that prints every notification
struct ConsoleHost;

impl SurfaceHost for ConsoleHost {
    fn key_down(&self, control_id: &str) {
        println!("key down  {}", control_id);
    }

    fn key_up(&self, control_id: &str) {
        println!("key up    {}", control_id);
    }

    fn push_channel_value(&self, channel: &str, value: i32) {
        println!("variable  {} = {}", channel, value);
    }

    fn detach(&self, reason: DetachReason) {
        println!("detached  {}", reason);
    }
}

async fn simulate(config: Config) -> Result<()> {
    let info = config.panel.info();
    let panel = VirtualPanel::new(info.clone());
    let (events, subscription) = event_channel();

    let mut surface =
        XkeysSurface::new("xkeys:virtual", panel, subscription, Arc::new(ConsoleHost));
    surface.initialize().await;
    surface.reconfigure(config.surface.surface_config()).await;
    surface.set_brightness(config.surface.brightness).await;

    info!("Simulating {} ({}x{})", surface.product_name(), info.row_count, info.col_count);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while surface.is_attached() {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                None
            }
        };
        let Some(line) = line else { break };

        match parse_command(&line, &info) {
            Ok(Some(SimCommand::Panel(event))) => {
                events.send(event);
                surface.pump();
            }
            Ok(Some(SimCommand::Draw { control_id, color })) => {
                surface.draw_str(&control_id, &color);
            }
            Ok(Some(SimCommand::Brightness(percent))) => surface.set_brightness(percent).await,
            Ok(Some(SimCommand::Illuminate(illuminate_pressed))) => {
                surface.reconfigure(SurfaceConfig { illuminate_pressed }).await;
            }
            Ok(Some(SimCommand::Quit)) => break,
            Ok(None) => {}
            Err(e) => eprintln!("error: {:#}", e),
        }
    }

    finish(surface).await;
    Ok(())
}

/// Let pending jog resets reach the host, then shut the surface down
async fn finish<H: PanelHardware>(mut surface: XkeysSurface<H>) {
    tokio::time::sleep(JOG_RESET_DELAY * 2).await;
    surface.shutdown().await;
}

#[derive(Debug, PartialEq)]
enum SimCommand {
    Panel(PanelEvent),
    Draw { control_id: String, color: String },
    Brightness(u8),
    Illuminate(bool),
    Quit,
}

/// Parse one simulator line; blank lines and `#` comments yield `None`
fn parse_command(line: &str, info: &PanelInfo) -> Result<Option<SimCommand>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&name, args)) = words.split_first() else {
        return Ok(None);
    };
    if name.starts_with('#') {
        return Ok(None);
    }

    let command = match name {
        "down" | "up" => {
            let metadata = ButtonMetadata {
                row: arg(name, args, 0)?.parse().context("bad row")?,
                col: arg(name, args, 1)?.parse().context("bad column")?,
            };
            if metadata.row == 0 || metadata.col == 0 {
                bail!("{}: rows and columns start at 1", name);
            }
            let index = info
                .device_index(LogicalPosition::from_metadata(metadata))
                .ok_or_else(|| anyhow!("{}: no such button", name))?;
            SimCommand::Panel(button_event(name == "down", index, metadata))
        }
        "jog" => SimCommand::Panel(PanelEvent::Jog {
            control: 0,
            delta: int(name, args, 0)?,
        }),
        "shuttle" => SimCommand::Panel(PanelEvent::Shuttle {
            control: 0,
            position: int(name, args, 0)?,
        }),
        "tbar" => SimCommand::Panel(PanelEvent::Tbar {
            control: 0,
            position: int(name, args, 0)?,
        }),
        "joystick" => SimCommand::Panel(PanelEvent::Joystick {
            control: 0,
            position: JoystickPosition {
                x: int(name, args, 0)?,
                y: int(name, args, 1)?,
                z: int(name, args, 2)?,
            },
        }),
        "error" => SimCommand::Panel(PanelEvent::Error(args.join(" "))),
        "disconnect" => SimCommand::Panel(PanelEvent::Disconnected),
        "draw" => SimCommand::Draw {
            control_id: arg(name, args, 0)?.to_string(),
            color: arg(name, args, 1)?.to_string(),
        },
        "brightness" => {
            SimCommand::Brightness(arg(name, args, 0)?.parse().context("bad brightness")?)
        }
        "illuminate" => SimCommand::Illuminate(match arg(name, args, 0)? {
            "on" => true,
            "off" => false,
            other => bail!("illuminate: expected on or off, got {:?}", other),
        }),
        "quit" | "exit" => SimCommand::Quit,
        other => bail!("unknown command {:?}", other),
    };

    Ok(Some(command))
}

fn arg<'a>(name: &str, args: &[&'a str], i: usize) -> Result<&'a str> {
    args.get(i)
        .copied()
        .ok_or_else(|| anyhow!("{}: missing argument {}", name, i + 1))
}

fn int(name: &str, args: &[&str], i: usize) -> Result<i32> {
    let s = arg(name, args, i)?;
    s.parse()
        .with_context(|| format!("{}: bad number {:?}", name, s))
}

fn button_event(down: bool, index: DeviceIndex, metadata: ButtonMetadata) -> PanelEvent {
    if down {
        PanelEvent::ButtonDown { index, metadata }
    } else {
        PanelEvent::ButtonUp { index, metadata }
    }
}
