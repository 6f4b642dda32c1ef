// SPDX-License-Identifier: Apache-2.0

use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::process::ExitCode;
use std::thread;
use tracing::metadata::LevelFilter;
use tracing::{debug, error, info, warn};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};

use gztail::bounded_channel::{self, BoundedReceiver};
use gztail::init::args::ReadRun;
use gztail::receivers::file::{
    ChannelLineSink, CompressedFileReader, Error, FileFinder, JsonFileDatabase, LineEvent,
    ReadOutcome, SinkMessage, TrackedFile,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Read every matching archive once
    Read(Box<ReadRun>),

    /// Return version
    Version,
}

#[derive(Debug, Parser)]
#[command(name = "gztail")]
#[command(bin_name = "gztail")]
#[command(version, about, long_about = None)]
#[command(subcommand_required = true)]
struct Arguments {
    #[arg(
        value_enum,
        long,
        global = true,
        env = "GZTAIL_LOG_FORMAT",
        default_value = "text"
    )]
    /// Log format
    log_format: LogFormatArg,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

fn main() -> ExitCode {
    let opt = Arguments::parse();

    match opt.command {
        Some(Commands::Version) => {
            println!("{}", get_version());
            ExitCode::SUCCESS
        }
        Some(Commands::Read(run)) => {
            let _guard = match setup_logging(&opt.log_format) {
                Ok(guard) => guard,
                Err(e) => {
                    eprintln!("ERROR: failed to setup logging: {}", e);
                    return ExitCode::from(1);
                }
            };

            match run_read(*run) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!(error = %e, "Read failed");
                    ExitCode::from(1)
                }
            }
        }
        None => ExitCode::SUCCESS,
    }
}

fn run_read(run: ReadRun) -> Result<(), BoxError> {
    let config = run.file_receiver.build_config();
    config.validate().map_err(Error::Config)?;

    let db = JsonFileDatabase::open(&config.offsets_path)?;
    let finder = FileFinder::new(config.include.clone(), config.exclude.clone())?;
    let mut reader = CompressedFileReader::new(&config, db.clone());

    let (tx, rx) = bounded_channel::bounded(run.line_buffer_size.max(1));
    let printer = thread::spawn(move || print_lines(rx));

    let paths = finder.find_files()?;
    info!(
        files = paths.len(),
        check_archive_validity = config.check_archive_validity,
        "Starting gzip read pass"
    );

    let mut completed = 0usize;
    let mut consumer_gone = false;
    for path in paths {
        // Nothing read from here on can reach stdout
        if tx.is_disconnected() {
            consumer_gone = true;
            break;
        }

        let sink = ChannelLineSink::new(&path, tx.clone());
        let mut file = match TrackedFile::discover(&path, Box::new(sink)) {
            Ok(file) => file,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Skipping file that vanished before reading"
                );
                continue;
            }
        };

        if let ReadOutcome::Completed { .. } = reader.read(&mut file) {
            completed += 1;
        }

        // Persist after every archive so a crash loses at most the one in flight
        if let Err(e) = db.flush_if_requested() {
            error!(error = %e, "Failed to persist completion markers");
        }
    }

    drop(tx);
    match printer.join() {
        Ok(Ok(())) => debug!("Line printer finished"),
        Ok(Err(e)) => warn!(error = %e, "Line printer stopped early"),
        Err(_) => error!("Line printer thread panicked"),
    }

    db.flush()?;
    if consumer_gone {
        return Err("line printer stopped before every archive was read".into());
    }

    info!(completed, "Finished gzip read pass");
    Ok(())
}

fn print_lines(rx: BoundedReceiver<SinkMessage>) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    while let Some(msg) = rx.recv_blocking() {
        let terminal = msg.event.is_terminal();
        match msg.event {
            LineEvent::Line(line) => writeln!(out, "{}", line)?,
            LineEvent::Error => {
                warn!(path = %msg.path.display(), "Archive could not be fully decoded");
            }
            LineEvent::Opened | LineEvent::Eof | LineEvent::Deleted => {}
        }
        if terminal {
            out.flush()?;
        }
    }

    out.flush()
}

type LoggerGuard = tracing_appender::non_blocking::WorkerGuard;

fn setup_logging(log_format: &LogFormatArg) -> Result<LoggerGuard, BoxError> {
    LogTracer::init()?;

    // Lines go to stdout, so logs go to stderr
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(io::stderr());

    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    if *log_format == LogFormatArg::Json {
        let app_name = format!("{}-{}", env!("CARGO_PKG_NAME"), get_version());
        let bunyan_formatting_layer = BunyanFormattingLayer::new(app_name, non_blocking_writer);

        let subscriber = Registry::default()
            .with(filter)
            .with(JsonStorageLayer)
            .with(bunyan_formatting_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        use std::io::IsTerminal;

        // Skip color codes when not in a terminal
        let use_ansi = io::stderr().is_terminal();

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_target(false)
            .with_level(true)
            .with_ansi(use_ansi)
            .compact();

        let subscriber = Registry::default().with(filter).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(guard)
}

fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
