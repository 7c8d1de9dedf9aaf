use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use genrescope::{
    AnalysisConfig, GenreAnalyzer, HeuristicStub, ModelAdapter, TrainedModel,
};

#[derive(Parser, Debug)]
#[command(
    name = "genrescope",
    about = "Genre analysis for short audio clips (WAV in, JSON out)"
)]
struct Cli {
    /// Optional JSON config file overriding the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Full analysis: descriptors plus ranked genre predictions
    Analyze {
        /// Input WAV file (stereo is mixed down to mono)
        #[arg(long)]
        input: PathBuf,
        /// Trained-model weight file; enables model fusion
        #[arg(long)]
        weights: Option<PathBuf>,
        /// Use the heuristic stub adapter (its results are ignored by
        /// fusion; useful for exercising the adapter path)
        #[arg(long)]
        stub: bool,
        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
    },
    /// Rhythm, scale and spectral descriptors only
    Descriptors {
        #[arg(long)]
        input: PathBuf,
    },
    /// Print the deterministic source fingerprint of a clip
    Hash {
        #[arg(long)]
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .as_ref()
        .map(AnalysisConfig::load_from_file)
        .unwrap_or_default();

    match cli.command {
        Commands::Analyze {
            input,
            weights,
            stub,
            output,
            pretty,
        } => run_analyze(config, &input, weights, stub, output, pretty),
        Commands::Descriptors { input } => run_descriptors(config, &input),
        Commands::Hash { input } => run_hash(&input),
    }
}

fn run_analyze(
    config: AnalysisConfig,
    input: &PathBuf,
    weights: Option<PathBuf>,
    stub: bool,
    output: Option<PathBuf>,
    pretty: bool,
) -> Result<ExitCode> {
    let (samples, sample_rate) = load_wav(input)?;
    let mut analyzer = GenreAnalyzer::new(sample_rate, config)?;

    let adapter = match (&weights, stub) {
        (Some(path), _) => {
            let model = TrainedModel::load_from_file(path)
                .with_context(|| format!("loading model weights from {}", path.display()))?;
            ModelAdapter::Trained(Arc::new(model))
        }
        (None, true) => ModelAdapter::Heuristic(Arc::new(HeuristicStub)),
        (None, false) => ModelAdapter::Absent,
    };

    let runtime = tokio::runtime::Runtime::new().context("building tokio runtime")?;
    let report = runtime
        .block_on(analyzer.analyze_with_adapter(&samples, &adapter))
        .with_context(|| format!("analyzing {}", input.display()))?;

    let json = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    match output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?
        }
        None => println!("{json}"),
    }
    Ok(ExitCode::from(0))
}

fn run_descriptors(config: AnalysisConfig, input: &PathBuf) -> Result<ExitCode> {
    let (samples, sample_rate) = load_wav(input)?;
    let mut analyzer = GenreAnalyzer::new(sample_rate, config)?;
    let report = analyzer
        .analyze(&samples)
        .with_context(|| format!("analyzing {}", input.display()))?;

    let descriptors = serde_json::json!({
        "sample_rate": report.sample_rate,
        "duration_seconds": report.duration_seconds,
        "rhythm": report.rhythm,
        "scale": report.scale,
        "spectral": report.spectral,
    });
    println!("{}", serde_json::to_string_pretty(&descriptors)?);
    Ok(ExitCode::from(0))
}

fn run_hash(input: &PathBuf) -> Result<ExitCode> {
    let (samples, _) = load_wav(input)?;
    println!("{}", genrescope::features::source_hash(&samples));
    Ok(ExitCode::from(0))
}

/// Decode a WAV file to mono f32 samples
fn load_wav(path: &PathBuf) -> Result<(Vec<f32>, u32)> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .context("decoding float samples")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 / scale))
                .collect::<Result<_, _>>()
                .context("decoding integer samples")?
        }
    };

    // Average channels into a mono buffer
    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok((mono, spec.sample_rate))
}
