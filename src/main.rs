use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use coincount::frames::{FileFrameSource, load_image};
use coincount::session::Session;
use coincount::{
    Classifier, CoinCounter, ContourCircleDetector, CounterConfig, DenominationTable, DetectedCircle,
    MatchPolicy, ReferenceRadius,
};

#[derive(Parser)]
#[command(name = "coincount")]
#[command(about = "Count coins in an image and add up their value")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect and count the coins in an image
    Count(CountArgs),

    /// Classify radii given on the command line
    Classify {
        #[command(flatten)]
        overrides: Overrides,

        /// Circle radii in pixels
        #[arg(value_name = "RADIUS", required = true)]
        radii: Vec<f64>,
    },

    /// Print the denomination table with expected ratios
    Table,

    /// Interactive session over an image file (s, c, d, q)
    Session {
        /// Image re-read on every scan
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        #[command(flatten)]
        overrides: Overrides,

        /// Save annotated frames to this directory
        #[arg(long, value_name = "DIR")]
        snapshots: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CountArgs {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    #[command(flatten)]
    overrides: Overrides,

    /// Save the annotated image
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct Overrides {
    /// Pixel radius of the smallest coin at the working scale
    #[arg(short, long, value_name = "PIXELS")]
    reference_radius: Option<ReferenceRadius>,

    /// Allowed deviation between observed and expected ratio
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Resize percentage applied before detection
    #[arg(short, long, value_name = "PERCENT")]
    scale: Option<u32>,

    /// Count only the closest denomination when several are within tolerance
    #[arg(long)]
    closest: bool,
}

impl Overrides {
    fn apply(&self, config: &mut CounterConfig) -> coincount::Result<()> {
        if let Some(radius) = self.reference_radius {
            config.reference_radius = radius.pixels();
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(scale) = self.scale {
            config.scale_percent = scale;
        }
        if self.closest {
            config.match_policy = MatchPolicy::Closest;
        }
        config.validate()
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let mut config = CounterConfig::load(args.config.as_deref()).context("loading configuration")?;

    match args.command {
        Commands::Count(count) => {
            count.overrides.apply(&mut config)?;
            run_count(&config, count, args.verbose)
        }
        Commands::Classify { overrides, radii } => {
            overrides.apply(&mut config)?;
            let classifier = Classifier::from_config(&config)?;
            let circles: Vec<DetectedCircle> = radii.into_iter().map(DetectedCircle::from_radius).collect();
            let result = classifier.classify(&circles);
            for value in &result.values {
                println!("{:.2}", value);
            }
            println!("Total: {}", config.format_amount(result.total));
            Ok(())
        }
        Commands::Table => {
            let table = DenominationTable::new(&config.denominations, config.reference_physical_size_mm)?;
            println!("Reference size: {} mm (tolerance {})", table.reference_size_mm(), config.tolerance);
            for entry in table.entries() {
                println!(
                    "  {:<10} {:>8} {:>6.2} mm  ratio {:.3}",
                    entry.denomination.name,
                    config.format_amount(entry.denomination.value),
                    entry.denomination.physical_size_mm,
                    entry.expected_ratio
                );
            }
            Ok(())
        }
        Commands::Session {
            image_path,
            overrides,
            snapshots,
        } => {
            overrides.apply(&mut config)?;
            let counter = CoinCounter::from_config(&config)?;
            let mut session = Session::new(FileFrameSource::new(image_path), counter, config.currency_symbol.clone());
            if let Some(dir) = snapshots {
                session = session.with_snapshots(dir);
            }
            let stdin = io::stdin();
            let mut input = stdin.lock();
            let mut out = io::stdout();
            session.run(&mut input, &mut out)?;
            Ok(())
        }
    }
}

fn run_count(config: &CounterConfig, args: CountArgs, verbose: bool) -> anyhow::Result<()> {
    log::info!("Loading image: {}", args.image_path.display());
    let img = load_image(&args.image_path)?;
    log::info!("Image loaded: {}x{}", img.width(), img.height());

    let mut detector = ContourCircleDetector::new(&config.detection, config.scale_percent);
    if let Some(debug_dir) = args.debug_out {
        detector = detector.with_debug(debug_dir)?;
    }
    log::debug!("pipeline: {}", detector.pipeline().step_names().join(" -> "));
    let counter = CoinCounter::new(detector, Classifier::from_config(config)?);

    let (frame, report) = counter.count(&img)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let Some(report) = report else {
        if args.json {
            writeln!(out, "null")?;
        } else {
            writeln!(out, "No circles detected")?;
        }
        return Ok(());
    };

    if args.json {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        report.write_text(&mut out, &config.currency_symbol, verbose)?;
    }
    out.flush()?;

    if let Some(output) = args.output {
        counter
            .annotate(&frame, &report)
            .save(&output)
            .with_context(|| format!("saving annotated image to {}", output.display()))?;
        log::info!("Annotated image written to {}", output.display());
    }

    Ok(())
}
