//! deckhand - DAW control surface engine
//!
//! Connects a grid controller over MIDI and runs the mode/view engine
//! against it, or replays a script against a simulated surface.

#[cfg(feature = "native")]
mod run;
mod script;
mod simulate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use deckhand_core::mode::ModeId;
use deckhand_core::view::ViewId;
use deckhand_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "deckhand")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mode/view engine for DAW control surfaces", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path (default: ~/.config/deckhand/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Surface input port (name substring)
    #[arg(long)]
    input: Option<String>,

    /// Surface output port (name substring, default: same as input)
    #[arg(long)]
    output: Option<String>,

    /// MIDI channel of the surface (0-15)
    #[arg(long)]
    channel: Option<u8>,

    /// Mode active after start-up (volume, pan, send1, track, device, ...)
    #[arg(long)]
    mode: Option<String>,

    /// View active after start-up (play, drum, sequencer, session)
    #[arg(long)]
    view: Option<String>,

    /// Number of tracks in the standalone session
    #[arg(long, default_value = "8")]
    tracks: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a default configuration file
    Init,
    /// Show the configuration file path
    ConfigPath,
    /// List available MIDI ports
    ListPorts,
    /// Connect to the surface and run (default)
    Run {
        /// Port that receives the played notes (name substring)
        #[arg(long, value_name = "PORT")]
        host_port: Option<String>,
    },
    /// Replay a script against a simulated surface
    Simulate {
        /// Script file (default: built-in demo)
        #[arg(value_name = "FILE")]
        script: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init) => {
            let path = Config::create_default_config_file()?;
            println!("Created default config at: {}", path.display());
            return Ok(());
        }
        Some(Commands::ConfigPath) => {
            let path = Config::config_path()?;
            println!("{}", path.display());
            return Ok(());
        }
        Some(Commands::ListPorts) => return list_ports(),
        _ => {}
    }

    let config = load_config(&cli)?;

    match cli.command {
        Some(Commands::Simulate { script }) => {
            let source = match script {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => script::DEMO_SCRIPT.to_string(),
            };
            let steps = script::parse(&source)?;
            simulate::simulate(config, steps, cli.tracks)?;
            Ok(())
        }
        Some(Commands::Run { host_port }) => run(config, host_port, cli.tracks),
        _ => run(config, None, cli.tracks),
    }
}

/// Config file (explicit path, default location or built-in defaults) with
/// command line overrides applied.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::load_or_default(),
    };

    if let Some(input) = &cli.input {
        config.midi.input_port = Some(input.clone());
    }
    if let Some(output) = &cli.output {
        config.midi.output_port = Some(output.clone());
    }
    if let Some(channel) = cli.channel {
        config.midi.channel = channel.min(15);
    }
    if let Some(mode) = &cli.mode {
        if ModeId::from_name(mode).is_none() {
            anyhow::bail!("Unknown mode '{}'", mode);
        }
        config.behavior.default_mode = mode.clone();
    }
    if let Some(view) = &cli.view {
        if ViewId::from_name(view).is_none() {
            anyhow::bail!("Unknown view '{}'", view);
        }
        config.behavior.default_view = view.clone();
    }
    Ok(config)
}

#[cfg(feature = "native")]
fn run(config: Config, host_port: Option<String>, tracks: usize) -> Result<()> {
    run::run(config, host_port, tracks)
}

#[cfg(not(feature = "native"))]
fn run(_config: Config, _host_port: Option<String>, _tracks: usize) -> Result<()> {
    anyhow::bail!("deckhand was built without MIDI port support (enable the `native` feature)")
}

#[cfg(feature = "native")]
fn list_ports() -> Result<()> {
    let inputs = deckhand_midi::list_input_ports("deckhand-probe")?;
    let outputs = deckhand_midi::list_output_ports("deckhand-probe")?;
    for (title, ports) in [("input", inputs), ("output", outputs)] {
        if ports.is_empty() {
            println!("No MIDI {} ports found", title);
        } else {
            println!("Available MIDI {} ports:", title);
            for port in ports {
                println!("  {}", port);
            }
        }
    }
    Ok(())
}

#[cfg(not(feature = "native"))]
fn list_ports() -> Result<()> {
    anyhow::bail!("deckhand was built without MIDI port support (enable the `native` feature)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let cli = Cli::parse_from([
            "deckhand",
            "--input",
            "Grid",
            "--channel",
            "20",
            "--mode",
            "send2",
            "--view",
            "session",
            "simulate",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.midi.input_port.as_deref(), Some("Grid"));
        assert_eq!(config.midi.channel, 15);
        assert_eq!(config.behavior.default_mode, "send2");
        assert_eq!(config.behavior.default_view, "session");
    }

    #[test]
    fn test_unknown_view_rejected() {
        let cli = Cli::parse_from(["deckhand", "--view", "mixer"]);
        assert!(load_config(&cli).is_err());
    }
}
