use anyhow::{bail, Context, Result};
use clap::Parser;
use errata::io::{read_with_config, ReaderKind};
use errata::predictors::ReplayLoader;
use errata::{
    evaluate_instances, predict_instances, ArchiveConfig, DivByZeroStrat, ErrataConfigBuilder,
    PredictorKind, NO_RELATION,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

/// Evaluates a relation extraction model over a corpus. The outputs of the model are replayed
/// from a folder holding `predictions.jsonl` and `labels.json`.
#[derive(Debug, Parser)]
#[command(name = "errata")]
struct Args {
    /// Name of the dataset reader (tacred, darkT)
    #[arg(short, long, default_value_t = String::from("tacred"))]
    dataset: String,
    /// Path to the corpus
    #[arg(short, long)]
    path: PathBuf,
    /// Folder holding the recorded outputs of the model
    #[arg(short, long)]
    model_dir: PathBuf,
    /// Kind of predictor wrapping the model
    #[arg(long, default_value_t = String::from("re"))]
    predictor: String,
    /// Name given to the model
    #[arg(long, default_value_t = String::from("model"))]
    model_name: String,
    /// Vocabulary namespace of the labels
    #[arg(long, default_value_t = String::from("labels"))]
    label_namespace: String,
    /// Maximum number of examples read from the corpus
    #[arg(short, long)]
    sample_size: Option<usize>,
    /// Relation meaning "no relation". Use an empty string to keep every relation
    #[arg(long, default_value_t = String::from(NO_RELATION))]
    negative_label: String,
    /// Strategy on division by zero: replaceby0, replaceby1 or error
    #[arg(long, default_value_t = String::from("replaceby0"))]
    zero_division: String,
    /// Folder used to cache the instances read from the corpus
    #[arg(long)]
    cache_folder: Option<PathBuf>,
    /// Print the report as json instead of a table
    #[arg(long)]
    json: bool,
    /// Number of times the report is computed, for timing purposes
    #[arg(short, long, default_value_t = 1)]
    n_samples: u32,
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let zero_division: DivByZeroStrat = args
        .zero_division
        .parse()
        .with_context(|| format!("invalid division by zero strategy {}", args.zero_division))?;
    let negative_label = Some(args.negative_label.clone()).filter(|l| !l.is_empty());
    let mut builder = ErrataConfigBuilder::default()
        .division_by_zero(zero_division)
        .negative_label(negative_label)
        .sample_size(args.sample_size);
    if let Some(folder) = &args.cache_folder {
        builder = builder.cache_folder(folder);
    }
    let config = builder.build();
    info!("{}", config);

    let reader = ReaderKind::by_name(&args.dataset)?.build();
    let mut instances = read_with_config(reader.as_ref(), &args.path, &config)
        .with_context(|| format!("could not read {}", args.path.display()))?;
    if instances.is_empty() {
        bail!("no instance found in {}", args.path.display());
    }

    let predictor = PredictorKind::by_name(&args.predictor)?.build(
        &args.model_name,
        "",
        &ArchiveConfig::new(&args.model_dir),
        &ReplayLoader,
        &args.label_namespace,
    )?;
    let predicted = predict_instances(predictor.as_ref(), &mut instances, reader.evaluator())?;
    info!("{} of {} instances predicted", predicted, instances.len());

    let mut total_duration = Duration::ZERO;
    let mut report = None;
    for _ in 0..args.n_samples.max(1) {
        let now = Instant::now();
        report = Some(evaluate_instances(&instances, &args.model_name, &config)?);
        total_duration += now.elapsed();
    }
    let Some(report) = report else {
        bail!("no report was computed");
    };
    info!(
        "Total duration: {} with {} samples",
        total_duration.as_secs_f64(),
        args.n_samples
    );

    if args.json {
        let classes: HashSet<errata::ClassMetrics> = report.into();
        println!("{}", serde_json::to_string_pretty(&classes)?);
    } else {
        print!("{}", report);
    }
    Ok(())
}
