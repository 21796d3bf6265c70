use braille_reader::decoder::symbols::{Symbol, SymbolTable};
use braille_reader::sink::DEFAULT_LOG_FILE;
use braille_reader::synth::SynthLayout;
use braille_reader::tools::{
    dataset_iter, dataset_root_from_env, limit_from_env, load_frame, raster_stats, replay,
    smoke_from_env, write_frame,
};
use braille_reader::{BrailleReader, Decoder, DecoderConfig, FileSink, Frame, NullSink, decode_frame};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "braille_tool", version, about = "Braille reader CLI tools")]
struct Cli {
    /// JSON config file; missing fields keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a single frame file
    Decode {
        #[arg(long)]
        frame: PathBuf,
        /// Print the full frame report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Decode a directory of frames and stabilize them in order
    Replay {
        #[arg(long)]
        root: Option<PathBuf>,
        /// Append emitted lines to this file
        #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_LOG_FILE)]
        log: Option<PathBuf>,
        /// Known phrase (repeatable)
        #[arg(long = "target")]
        targets: Vec<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        smoke: bool,
    },
    /// Write a synthetic frame (JSON + PNG) for the given text
    Synth {
        /// Text line (repeatable)
        #[arg(long, required = true)]
        text: Vec<String>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Print the symbol table
    Table,
    /// Print the effective configuration as JSON
    Config,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Decode { frame, json } => decode_cmd(&frame, json, config),
        Command::Replay {
            root,
            log,
            targets,
            limit,
            smoke,
        } => replay_cmd(root, log, targets, limit, smoke, config),
        Command::Synth { text, out } => synth_cmd(&text, &out),
        Command::Table => {
            table_cmd();
            Ok(())
        }
        Command::Config => config_cmd(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> braille_reader::Result<DecoderConfig> {
    let config = match path {
        Some(path) => DecoderConfig::from_json_file(path)?,
        None => DecoderConfig::default(),
    }
    .with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn decode_cmd(path: &Path, json: bool, config: DecoderConfig) -> braille_reader::Result<()> {
    let frame = load_frame(path)?;
    let collect_traces = config.collect_traces || json;
    let decoder = Decoder::new(DecoderConfig {
        collect_traces,
        ..config
    });
    let start = Instant::now();
    let report = decode_frame(&frame.points, frame.raster.as_ref(), &decoder);
    let elapsed = start.elapsed();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Frame: {} ({} points)", path.display(), frame.points.len());
    if let Some(raster) = &frame.raster {
        let stats = raster_stats(raster);
        println!(
            "Raster: {}x{}, lit={:.2}%",
            raster.width(),
            raster.height(),
            stats.lit_ratio * 100.0
        );
    }
    println!("Rows: {}, cells: {}", report.rows, report.cell_count);
    println!("Line: {:?}", report.line);
    println!("Decode time: {:.2?}", elapsed);
    Ok(())
}

fn replay_cmd(
    root: Option<PathBuf>,
    log: Option<PathBuf>,
    targets: Vec<String>,
    limit: Option<usize>,
    smoke: bool,
    config: DecoderConfig,
) -> braille_reader::Result<()> {
    let root = root.unwrap_or_else(dataset_root_from_env);
    let limit = limit.or_else(limit_from_env);
    let smoke = smoke || smoke_from_env();
    let paths: Vec<PathBuf> = dataset_iter(&root, limit, smoke).collect();
    if paths.is_empty() {
        println!("No frames found under {}", root.display());
        return Ok(());
    }

    let start = Instant::now();
    let steps = match log {
        Some(log) => {
            let sink = FileSink::open(&log)?;
            println!("Appending to {}", sink.path().display());
            let mut reader = BrailleReader::new(config, sink);
            reader.set_targets(&targets);
            replay(&paths, &mut reader)?
        }
        None => {
            let mut reader = BrailleReader::new(config, NullSink);
            reader.set_targets(&targets);
            replay(&paths, &mut reader)?
        }
    };
    let elapsed = start.elapsed();

    let mut failed = 0usize;
    let mut emitted = 0usize;
    for step in &steps {
        match (&step.line, &step.emitted) {
            (Err(e), _) => {
                failed += 1;
                println!("{}: error: {e}", step.path.display());
            }
            (Ok(_), Some(text)) => {
                emitted += 1;
                println!("{}: {text}", step.path.display());
            }
            (Ok(_), None) => {}
        }
    }

    println!("Frames: {}", steps.len());
    println!("Emitted: {emitted}");
    println!("Failed: {failed}");
    if !steps.is_empty() {
        println!(
            "Avg time: {:.2} ms/frame",
            elapsed.as_secs_f64() * 1000.0 / steps.len() as f64
        );
    }
    Ok(())
}

fn synth_cmd(lines: &[String], out: &Path) -> braille_reader::Result<()> {
    let table = SymbolTable::standard();
    let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
    let synth = SynthLayout::default().frame(&table, &lines);
    let frame = Frame {
        points: synth.points,
        raster: Some(synth.raster),
        targets: Vec::new(),
    };
    write_frame(out, &frame)?;
    println!("Wrote {} ({} points)", out.display(), frame.points.len());
    Ok(())
}

fn table_cmd() {
    let table = SymbolTable::standard();
    for (mask, symbol) in table.entries() {
        let label = match symbol {
            Symbol::Letter(c) => match table.digit(mask) {
                Some(d) => format!("{c} / {d}"),
                None => c.to_string(),
            },
            Symbol::Punctuation(c) => c.to_string(),
            Symbol::Capital => "<capital>".to_string(),
            Symbol::Number => "<number>".to_string(),
            Symbol::Unknown => "?".to_string(),
        };
        println!("{:>6}  {:06b}  {label}", mask.to_string(), mask.bits());
    }
}

fn config_cmd(config: &DecoderConfig) -> braille_reader::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
