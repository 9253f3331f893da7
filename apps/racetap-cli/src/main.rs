use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;
mod config;

/// Racetap operator tool.
#[derive(Parser, Debug)]
#[command(name = "racetap")]
#[command(about = "SMB race timing from a NESceptor console tap", long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch a serial device and print every decoded message.
    Watch {
        /// Serial device, e.g. /dev/ttyUSB0
        tty: String,
        /// Baud rate
        #[arg(long, default_value_t = racetap_proto::constants::DEFAULT_BAUD)]
        baud: u32,
    },
    /// Ingest a serial device and publish its outputs to subscribers.
    Transmit {
        /// Serial device, e.g. /dev/ttyUSB0
        tty: String,
        /// Listen address for subscribers, e.g. 0.0.0.0:5555
        bind: String,
        /// Seat name carried in every envelope
        name: String,
        /// Skip the recording tee
        #[arg(long)]
        no_record: bool,
        /// Directory for recordings
        #[arg(long, default_value = "rec")]
        recording_dir: PathBuf,
        /// Baseline nametable cache (JSON)
        #[arg(long)]
        nametables: Option<PathBuf>,
    },
    /// Subscribe to a publisher and print arriving outputs.
    Receive {
        /// Publisher address, e.g. 192.168.0.3:5555
        connect: String,
        /// Seat names to watch
        #[arg(required = true)]
        seats: Vec<String>,
    },
    /// Decode a recording offline and print its outputs and splits.
    Play {
        /// Recording file
        recording: PathBuf,
        /// Baseline nametable cache (JSON)
        #[arg(long)]
        nametables: Option<PathBuf>,
        /// Print every output instead of a summary
        #[arg(long)]
        verbose: bool,
    },
    /// Run a headless race from a JSON seat configuration.
    Race {
        /// Race configuration file
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Watch { tty, baud } => commands::watch(&tty, baud),
        Command::Transmit {
            tty,
            bind,
            name,
            no_record,
            recording_dir,
            nametables,
        } => commands::transmit(
            &tty,
            &bind,
            &name,
            !no_record,
            &recording_dir,
            nametables.as_deref(),
        ),
        Command::Receive { connect, seats } => commands::receive(&connect, &seats),
        Command::Play {
            recording,
            nametables,
            verbose,
        } => commands::play(&recording, nametables.as_deref(), verbose),
        Command::Race { config } => commands::race(&config),
    }
}
