//! Watermark and encrypt PDFs
//!
//! Usage:
//!   pdf-seal --password secret --text "Licensed to Kim" book.pdf notes.pdf
//!   pdf-seal --password secret --buyer-name Kim --buyer-phone 010-1234-5678 --start-page 5 book.pdf
//!   pdf-seal --config seal.json -j 4 -v inbox/*.pdf
//!
//! Exit status is 0 when every file was sealed, 1 when any file failed and 2
//! on invalid arguments or configuration.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use pdf_seal::batch::{BatchJob, LogObserver, Orchestrator, OutputNaming};
use pdf_seal::config::SealConfig;
use pdf_seal::encryption::EncryptionAlgorithm;
use pdf_seal::fonts::StandardFont;
use pdf_seal::metadata::MetadataStamp;
use pdf_seal::writer::Placement;
use pdf_seal::ParseOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// Stamp a watermark on PDFs and save them password protected
#[derive(Parser, Debug)]
#[command(name = "pdf-seal", author, version, about, long_about = None)]
struct Args {
    /// Input PDF files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Password needed to open the outputs
    #[arg(short, long)]
    password: Option<String>,

    /// Full-access password (defaults to --password)
    #[arg(long)]
    owner_password: Option<String>,

    /// Cipher: rc4-40, rc4-128, aes-128 or aes-256
    #[arg(long)]
    algorithm: Option<EncryptionAlgorithm>,

    /// Disallow printing
    #[arg(long)]
    no_print: bool,

    /// Disallow copying text and graphics
    #[arg(long)]
    no_copy: bool,

    /// Disallow changing the document
    #[arg(long)]
    no_modify: bool,

    /// Watermark text
    #[arg(short, long)]
    text: Option<String>,

    /// Recipient name; sets the text, the output suffix and the subject
    #[arg(long)]
    buyer_name: Option<String>,

    /// Recipient phone number shown next to the name
    #[arg(long, requires = "buyer_name")]
    buyer_phone: Option<String>,

    /// Standard font (helvetica, times-roman, courier, ... or -bold variants)
    #[arg(long)]
    font: Option<StandardFont>,

    /// TrueType font to embed, for text outside Latin-1 such as Hangul names
    #[arg(long, conflicts_with = "font")]
    font_file: Option<PathBuf>,

    /// Font size in points
    #[arg(long)]
    size: Option<f64>,

    /// Fill opacity between 0 and 1
    #[arg(long)]
    opacity: Option<f64>,

    /// Counter-clockwise rotation in degrees
    #[arg(long)]
    rotation: Option<f64>,

    /// Layout of the stamp
    #[arg(long, value_enum)]
    placement: Option<PlacementArg>,

    /// Distance between tile centres in points (tiled placement)
    #[arg(long, default_value = "220")]
    tile_pitch: f64,

    /// First page to stamp, counting from 1
    #[arg(long)]
    start_page: Option<usize>,

    /// Output name suffix: report.pdf becomes report_SUFFIX.pdf
    #[arg(short, long)]
    suffix: Option<String>,

    /// Directory for the outputs (defaults to each input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Replace existing output files
    #[arg(long)]
    overwrite: bool,

    /// Number of files processed in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Password of encrypted inputs
    #[arg(long)]
    input_password: Option<String>,

    /// Tolerate broken cross-reference tables and unreadable objects
    #[arg(long)]
    lenient: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum PlacementArg {
    Centered,
    Tiled,
    Footer,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let (orchestrator, jobs) = match prepare(&args) {
        Ok(prepared) => prepared,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::from(2);
        },
    };

    let report = orchestrator.run(jobs);
    for outcome in report.outcomes() {
        println!("{}", outcome);
    }
    println!("{} sealed, {} failed", report.succeeded(), report.failed());

    if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Merge the config file with the flags and build one job per input.
fn prepare(args: &Args) -> anyhow::Result<(Orchestrator, Vec<BatchJob>)> {
    let mut config = match &args.config {
        Some(path) => SealConfig::load(path)
            .with_context(|| format!("reading configuration {}", path.display()))?,
        None => SealConfig::default(),
    };
    apply_overrides(&mut config, args)?;

    let watermark = config.watermark_spec().context("watermark settings")?;
    let encryption = config.encryption_params().context("encryption settings")?;

    let mut parse_options = if args.lenient {
        ParseOptions::lenient()
    } else {
        ParseOptions::strict()
    };
    if let Some(password) = &args.input_password {
        parse_options = parse_options.with_password(password.clone());
    }

    let mut jobs = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        let output = output_path(input, &config.naming, args.output_dir.as_deref())?;
        let mut job = BatchJob::new(input.clone(), output, watermark.clone(), encryption.clone())
            .with_parse_options(parse_options.clone());
        if let Some(metadata) = &config.metadata {
            job = job.with_metadata(metadata.clone());
        }
        jobs.push(job);
    }

    let orchestrator = Orchestrator::new(config.batch).with_observer(Arc::new(LogObserver));
    Ok((orchestrator, jobs))
}

fn apply_overrides(config: &mut SealConfig, args: &Args) -> anyhow::Result<()> {
    let wm = &mut config.watermark;
    if let Some(name) = &args.buyer_name {
        let label = match &args.buyer_phone {
            Some(phone) => format!("{} ({})", name, phone),
            None => name.clone(),
        };
        if wm.text.is_none() {
            wm.text = Some(label.clone());
        }
        config.naming = OutputNaming::Suffix(name.clone());
        let metadata = config.metadata.get_or_insert_with(MetadataStamp::default);
        metadata.subject = Some(format!("Buyer: {}", label));
        metadata.producer = Some(String::new());
    }
    if let Some(text) = &args.text {
        wm.text = Some(text.clone());
    }
    if let Some(font) = args.font {
        wm.font = font;
    }
    if let Some(path) = &args.font_file {
        wm.font_file = Some(path.clone());
    }
    if let Some(size) = args.size {
        wm.size = size;
    }
    if let Some(opacity) = args.opacity {
        wm.opacity = opacity;
    }
    if let Some(rotation) = args.rotation {
        wm.rotation = rotation;
    }
    if let Some(placement) = args.placement {
        wm.placement = match placement {
            PlacementArg::Centered => Placement::Centered,
            PlacementArg::Tiled => Placement::Tiled {
                pitch_x: args.tile_pitch,
                pitch_y: args.tile_pitch,
            },
            PlacementArg::Footer => Placement::footer(),
        };
        if placement == PlacementArg::Footer && args.rotation.is_none() {
            wm.rotation = 0.0;
        }
    }
    match args.start_page {
        Some(0) => bail!("--start-page counts from 1"),
        Some(page) => wm.first_page = page - 1,
        None => {},
    }

    let enc = &mut config.encryption;
    if let Some(password) = &args.password {
        enc.user_password = Some(password.clone());
    }
    if let Some(owner) = &args.owner_password {
        enc.owner_password = Some(owner.clone());
    }
    if let Some(algorithm) = args.algorithm {
        enc.algorithm = algorithm.to_string();
    }
    if args.no_print {
        enc.permissions.print = false;
    }
    if args.no_copy {
        enc.permissions.copy = false;
    }
    if args.no_modify {
        enc.permissions.modify = false;
    }

    if let Some(suffix) = &args.suffix {
        config.naming = OutputNaming::Suffix(suffix.clone());
    }
    if let Some(jobs) = args.jobs {
        config.batch.parallelism = Some(jobs);
    }
    config.batch.overwrite |= args.overwrite;
    Ok(())
}

/// Output for `input`; `--output-dir` relocates the derived file name.
fn output_path(input: &Path, naming: &OutputNaming, output_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let derived = naming
        .derive(input)
        .with_context(|| format!("deriving output name for {}", input.display()))?;
    match (output_dir, derived.file_name()) {
        (Some(dir), Some(name)) => Ok(dir.join(name)),
        (Some(_), None) => bail!("no output file name for {}", input.display()),
        (None, _) => Ok(derived),
    }
}
