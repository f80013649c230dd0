use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use canopy_forest::{MaxFeatures, RandomForest, RankedFeature};
use canopy_io::{ColumnLayout, ExperimentName, ReportWriter, Table, TableReader};
use canopy_model::{FittedModel, HyperparameterSearch, ModelReport, RandomForestModel};
use canopy_select::{ForestParams, ScoreMode, SearchOutcome};

#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Random-forest regression: calibration, cross-validation, validation and search")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for the split, fold shuffles, search sampling and forests
    #[arg(long, default_value_t = 1, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Input tables, validation source and output location.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Path to the dataset CSV (calibration rows, or all rows with --split)
    #[arg(long)]
    data: PathBuf,

    /// Path to a separate validation CSV with the same columns
    #[arg(long, conflicts_with = "split")]
    validation: Option<PathBuf>,

    /// Fraction of dataset rows held out for validation, in (0, 1)
    #[arg(long)]
    split: Option<f64>,

    /// Identifier column name (defaults to the first column)
    #[arg(long, requires = "target_column")]
    id_column: Option<String>,

    /// Target column name (defaults to the second column)
    #[arg(long, requires = "id_column")]
    target_column: Option<String>,

    /// Cross-validation type: "loo" or a fold count >= 2
    #[arg(long, default_value = "loo")]
    cv: String,

    /// R² definition: "determination" or "correlation"
    #[arg(long, default_value = "determination")]
    score_mode: String,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long)]
    experiment: String,

    /// Output directory for result files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
}

/// Forest hyperparameters for a single fit.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Features per split: "auto", "sqrt", "log2", a count, or a fraction in (0, 1]
    #[arg(long, default_value = "auto")]
    max_features: MaxFeatures,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum samples needed to split a node
    #[arg(long, default_value_t = 2)]
    min_samples_split: usize,

    /// Minimum samples in each leaf
    #[arg(long, default_value_t = 1)]
    min_samples_leaf: usize,

    /// Grow every tree on all calibration rows instead of a bootstrap sample
    #[arg(long, default_value_t = false)]
    no_bootstrap: bool,
}

impl ForestArgs {
    fn params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.n_trees,
            max_features: self.max_features,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            bootstrap: !self.no_bootstrap,
        }
    }
}

/// Grid for randomized search.
#[derive(Args, Debug, Clone)]
struct SearchArgs {
    /// Tree-count spacing: START STOP NUM
    #[arg(long, num_args = 3, value_names = ["START", "STOP", "NUM"], default_values_t = [200, 1000, 100])]
    estimators: Vec<usize>,

    /// Candidate max_features values, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [MaxFeatures::All, MaxFeatures::Sqrt])]
    max_features_grid: Vec<MaxFeatures>,

    /// Depth spacing: START STOP NUM (unbounded depth is always added)
    #[arg(long, num_args = 3, value_names = ["START", "STOP", "NUM"], default_values_t = [10, 110, 11])]
    depth: Vec<usize>,

    /// Candidate min_samples_split values, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [2, 5, 10, 20])]
    min_samples_split_grid: Vec<usize>,

    /// Candidate min_samples_leaf values, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [1, 2, 4, 6])]
    min_samples_leaf_grid: Vec<usize>,

    /// Candidate bootstrap flags, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [true, false])]
    bootstrap_grid: Vec<bool>,

    /// Number of grid points to evaluate
    #[arg(long, default_value_t = 100)]
    n_iter: usize,
}

impl SearchArgs {
    fn settings(&self) -> Result<HyperparameterSearch> {
        let (e_start, e_stop, e_num) = spacing("estimators", &self.estimators)?;
        let (d_start, d_stop, d_num) = spacing("depth", &self.depth)?;
        Ok(HyperparameterSearch::new()
            .with_estimators(e_start, e_stop, e_num)
            .with_max_features(self.max_features_grid.clone())
            .with_max_depth(d_start, d_stop, d_num)
            .with_min_samples_split(self.min_samples_split_grid.clone())
            .with_min_samples_leaf(self.min_samples_leaf_grid.clone())
            .with_bootstrap(self.bootstrap_grid.clone())
            .with_n_iter(self.n_iter))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Calibrate, cross-validate and validate a forest, then save it
    Fit {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Randomized hyperparameter search on the calibration set
    Search {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        search: SearchArgs,

        /// Fit, report and save a model with the best parameters
        #[arg(long, default_value_t = false)]
        fit_best: bool,
    },

    /// Predict targets for new samples with a saved model
    Predict {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to the feature CSV
        #[arg(long)]
        data: PathBuf,

        /// Identifier column name (defaults to the first column)
        #[arg(long)]
        id_column: Option<String>,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON artifact and stdout output structs ---

#[derive(Serialize)]
struct FitArtifact<'a> {
    seed: u64,
    params: &'a ForestParams,
    #[serde(flatten)]
    report: &'a ModelReport,
    feature_importances: &'a [RankedFeature],
}

#[derive(Serialize)]
struct FitOutput {
    experiment: String,
    n_calibration: usize,
    n_validation: usize,
    cv_method: String,
    calibration_r2: f64,
    cv_r2: f64,
    cv_rmse: f64,
    validation_r2: f64,
    validation_rmse: f64,
    n_trees: usize,
    n_features: usize,
}

#[derive(Serialize)]
struct SearchOutput {
    experiment: String,
    n_trials: usize,
    best_score: f64,
    best_params: ForestParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    fit: Option<FitOutput>,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_samples: usize,
    model_n_trees: usize,
    model_n_features: usize,
}

fn spacing(name: &str, values: &[usize]) -> Result<(usize, usize, usize)> {
    match values {
        [start, stop, num] => Ok((*start, *stop, *num)),
        _ => anyhow::bail!("--{name} takes exactly three values: START STOP NUM"),
    }
}

fn parse_score_mode(s: &str) -> Result<ScoreMode> {
    match s {
        "determination" => Ok(ScoreMode::Determination),
        "correlation" => Ok(ScoreMode::SquaredCorrelation),
        other => anyhow::bail!("unknown score mode: {other} (expected determination or correlation)"),
    }
}

fn layout(id_column: Option<&str>, target_column: Option<&str>) -> ColumnLayout {
    match (id_column, target_column) {
        (Some(id), Some(target)) => ColumnLayout::named(id, target),
        _ => ColumnLayout::positional(),
    }
}

fn read_table(path: &Path, layout: &ColumnLayout, what: &str) -> Result<Table> {
    let table = TableReader::new(path)
        .with_layout(layout.clone())
        .read()
        .with_context(|| format!("failed to read {what} CSV"))?;
    info!(what, n_samples = table.n_samples(), n_features = table.n_features(), "table loaded");
    Ok(table)
}

/// Read the input tables and configure the workflow.
fn build_model(data: &DataArgs, params: ForestParams, seed: u64) -> Result<RandomForestModel> {
    let layout = layout(data.id_column.as_deref(), data.target_column.as_deref());
    let dataset = read_table(&data.data, &layout, "dataset")?;

    let mut builder = RandomForestModel::builder(dataset)
        .cross_validation(data.cv.as_str())
        .with_params(params)
        .with_seed(seed)
        .with_score_mode(parse_score_mode(&data.score_mode)?);
    if let Some(fraction) = data.split {
        builder = builder.split_for_validation(fraction);
    }
    if let Some(path) = &data.validation {
        builder = builder.dataset_validation(read_table(path, &layout, "validation")?);
    }

    builder.build().context("invalid model configuration")
}

/// Run the full pipeline, write the report and the model, and summarize.
fn fit_and_save(
    model: &RandomForestModel,
    writer: &ReportWriter,
    seed: u64,
) -> Result<FitOutput> {
    let fitted: FittedModel = model.create_model().context("model fitting failed")?;
    let report = fitted.report();

    writer.write_report(&FitArtifact {
        seed,
        params: model.params(),
        report,
        feature_importances: fitted.importances(),
    })?;
    fitted
        .forest()
        .save(writer.model_path())
        .context("failed to save model")?;
    info!(path = %writer.model_path().display(), "model saved");

    Ok(FitOutput {
        experiment: writer.experiment().to_string(),
        n_calibration: report.calibration.n_samples,
        n_validation: report.validation.n_samples,
        cv_method: report.cross_validation.method.clone(),
        calibration_r2: report.calibration.r2,
        cv_r2: report.cross_validation.r2,
        cv_rmse: report.cross_validation.rmse,
        validation_r2: report.validation.r2,
        validation_rmse: report.validation.rmse,
        n_trees: fitted.forest().n_trees(),
        n_features: fitted.forest().n_features(),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Fit { data, forest } => {
            let experiment_name = ExperimentName::new(data.experiment.clone())?;
            let model = build_model(&data, forest.params(), cli.seed)?;
            let writer = ReportWriter::new(&data.output_dir, experiment_name)?;

            let output = fit_and_save(&model, &writer, cli.seed)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Search {
            data,
            search,
            fit_best,
        } => {
            let experiment_name = ExperimentName::new(data.experiment.clone())?;
            let settings = search.settings()?;
            let model = build_model(&data, ForestParams::default(), cli.seed)?;
            let writer = ReportWriter::new(&data.output_dir, experiment_name)?;

            let outcome: SearchOutcome = model
                .search_hyperparameters(&settings)
                .context("hyperparameter search failed")?;
            writer.write_search(&outcome)?;

            let fit = if fit_best {
                let tuned = model.apply_search(&outcome);
                Some(fit_and_save(&tuned, &writer, cli.seed)?)
            } else {
                None
            };

            let output = SearchOutput {
                experiment: data.experiment,
                n_trials: outcome.trials.len(),
                best_score: outcome.best_score,
                best_params: outcome.best_params,
                fit,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            data,
            id_column,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            let forest = RandomForest::load(&model).context("failed to load model")?;
            info!(
                n_trees = forest.n_trees(),
                n_features = forest.n_features(),
                "model loaded"
            );

            let layout = match id_column {
                Some(id) => ColumnLayout::named(id, String::new()),
                None => ColumnLayout::positional(),
            };
            let inputs = TableReader::new(&data)
                .with_layout(layout)
                .read_features(forest.feature_names())
                .context("failed to read feature CSV")?;

            let predictions = forest
                .predict_batch(inputs.features())
                .context("prediction failed")?;

            let writer = ReportWriter::new(&output_dir, experiment_name)?;
            writer.write_predictions(inputs.ids(), &predictions)?;

            let output = PredictOutput {
                experiment,
                n_samples: inputs.n_samples(),
                model_n_trees: forest.n_trees(),
                model_n_features: forest.n_features(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
