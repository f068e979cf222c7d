//! svmqp command line interface
//!
//! Trains, applies and cross-validates models on LibSVM format data. Models
//! are stored in the LibSVM text model format.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use svmqp::api::{EvaluationMetrics, SVM};
use svmqp::core::{
    Dataset, KernelType, Parameters, Result, SVMError, SvmType, WorkingSetStrategy,
};
use svmqp::persistence::{load_model, save_model};
use svmqp::LibSVMDataset;

#[derive(Parser)]
#[command(name = "svmqp")]
#[command(about = "Support vector classification, regression and domain description")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model and save it
    Train(TrainArgs),
    /// Predict with a saved model
    Predict(PredictArgs),
    /// N-fold cross-validation on a dataset
    Cv(CvArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliWorkingSet {
    /// Maximal violating pair
    #[value(name = "first-order")]
    FirstOrder,
    /// Second-order gain on the second index (default)
    #[value(name = "second-order")]
    SecondOrder,
}

impl From<CliWorkingSet> for WorkingSetStrategy {
    fn from(cli_strategy: CliWorkingSet) -> Self {
        match cli_strategy {
            CliWorkingSet::FirstOrder => WorkingSetStrategy::FirstOrder,
            CliWorkingSet::SecondOrder => WorkingSetStrategy::SecondOrder,
        }
    }
}

/// Training parameters; flags override values from `--config`
#[derive(Args)]
struct ParamArgs {
    /// JSON parameter file
    #[arg(long)]
    config: Option<PathBuf>,

    /// c_svc, c_svc_l2, nu_svc, one_class, epsilon_svr, nu_svr, svdd, svdd_l2
    #[arg(short = 's', long)]
    svm_type: Option<SvmType>,

    /// linear, polynomial, gaussian, sigmoid, stump, perceptron, laplace,
    /// exponential, precomputed
    #[arg(short = 't', long)]
    kernel: Option<KernelType>,

    /// Polynomial degree
    #[arg(long)]
    degree: Option<i32>,

    /// Kernel width (0 = 1/max feature index)
    #[arg(short, long)]
    gamma: Option<f64>,

    /// Kernel offset
    #[arg(short = 'r', long)]
    coef0: Option<f64>,

    /// Cost parameter C
    #[arg(short = 'C', long)]
    c: Option<f64>,

    /// Parameter nu of nu-SVC, one-class and nu-SVR
    #[arg(short, long)]
    nu: Option<f64>,

    /// Tube width of epsilon-SVR
    #[arg(short, long)]
    p: Option<f64>,

    /// Kernel cache size in MB
    #[arg(short = 'm', long)]
    cache_size: Option<usize>,

    /// Stopping tolerance
    #[arg(short, long)]
    epsilon: Option<f64>,

    /// Disable shrinking
    #[arg(long)]
    no_shrinking: bool,

    /// Train probability estimates
    #[arg(short = 'b', long)]
    probability: bool,

    /// Class weight as label:weight, repeatable
    #[arg(short, long = "weight", value_parser = parse_weight, allow_hyphen_values = true)]
    weights: Vec<(i32, f64)>,

    /// Iteration cap per solve
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Working set selection
    #[arg(long)]
    working_set: Option<CliWorkingSet>,

    /// Seed of the calibration fold shuffle
    #[arg(long)]
    seed: Option<u64>,
}

fn parse_weight(s: &str) -> std::result::Result<(i32, f64), String> {
    let (label, weight) = s
        .split_once(':')
        .ok_or_else(|| format!("expected label:weight, got {s}"))?;
    let label = label
        .parse()
        .map_err(|_| format!("invalid class label: {label}"))?;
    let weight = weight
        .parse()
        .map_err(|_| format!("invalid weight: {weight}"))?;
    Ok((label, weight))
}

impl ParamArgs {
    fn to_parameters(&self) -> Result<Parameters> {
        let mut params = match &self.config {
            Some(path) => {
                info!("Loading parameters from {path:?}");
                Parameters::from_json_file(path)?
            }
            None => Parameters::default(),
        };

        if let Some(svm_type) = self.svm_type {
            params.svm_type = svm_type;
        }
        if let Some(kernel) = self.kernel {
            params.kernel_type = kernel;
        }
        if let Some(degree) = self.degree {
            params.degree = degree;
        }
        if let Some(gamma) = self.gamma {
            params.gamma = gamma;
        }
        if let Some(coef0) = self.coef0 {
            params.coef0 = coef0;
        }
        if let Some(c) = self.c {
            params.c = c;
        }
        if let Some(nu) = self.nu {
            params.nu = nu;
        }
        if let Some(p) = self.p {
            params.p = p;
        }
        if let Some(cache_size) = self.cache_size {
            params.cache_size = cache_size * 1024 * 1024;
        }
        if let Some(eps) = self.epsilon {
            params.eps = eps;
        }
        if self.no_shrinking {
            params.shrinking = false;
        }
        if self.probability {
            params.probability = true;
        }
        params.weights.extend(self.weights.iter().copied());
        if let Some(max_iterations) = self.max_iterations {
            params.max_iterations = Some(max_iterations);
        }
        if let Some(working_set) = self.working_set {
            params.working_set = working_set.into();
        }
        if let Some(seed) = self.seed {
            params.seed = seed;
        }
        Ok(params)
    }
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file (LibSVM format)
    #[arg(long)]
    data: PathBuf,

    /// Output model file (defaults to the data file name plus ".model")
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    params: ParamArgs,
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file (LibSVM format)
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output class probabilities
    #[arg(short = 'b', long)]
    probability: bool,
}

#[derive(Args)]
struct CvArgs {
    /// Data file (LibSVM format)
    #[arg(long)]
    data: PathBuf,

    /// Number of folds
    #[arg(short = 'k', long, default_value = "5")]
    folds: usize,

    #[command(flatten)]
    params: ParamArgs,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Cv(args) => cv_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        eprintln!("{e}");
        process::exit(1);
    }
}

fn default_model_path(data: &Path) -> PathBuf {
    let mut name = data.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".model");
    data.with_file_name(name)
}

fn train_command(args: TrainArgs) -> Result<()> {
    let params = args.params.to_parameters()?;
    info!(
        "Training {} with {} kernel on {:?}",
        params.svm_type, params.kernel_type, args.data
    );

    let dataset = LibSVMDataset::from_file(&args.data)?;
    info!(
        "Loaded {} samples with {} dimensions",
        dataset.len(),
        dataset.dim()
    );

    let model = SVM::with_parameters(params).train(dataset.problem())?;
    for summary in model.summaries() {
        info!(
            "iterations = {}, obj = {}, rho = {}, nSV = {}, nBSV = {}{}",
            summary.iterations,
            summary.objective,
            summary.rho,
            summary.n_sv,
            summary.n_bsv,
            if summary.converged { "" } else { " (not converged)" }
        );
    }
    info!("Total nSV = {}", model.total_sv());

    let output = args.output.unwrap_or_else(|| default_model_path(&args.data));
    save_model(&output, &model)?;
    info!("Model saved to: {output:?}");
    Ok(())
}

fn predict_command(args: PredictArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let model = load_model(&args.model)?;
    let dataset = LibSVMDataset::from_file(&args.data)?;

    if args.probability && !model.has_probability() {
        return Err(SVMError::ProbabilityUnavailable(
            "model does not support probability estimates".to_string(),
        ));
    }

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    let regression = model.svm_type().is_regression();
    if args.probability && regression {
        if let Some(sigma) = model.svr_probability() {
            info!(
                "Prob. model for test data: target value = predicted value + z, \
                 z: Laplace distribution e^(-|z|/sigma)/(2sigma), sigma={sigma}"
            );
        }
    }
    let class_probabilities = args.probability && !regression;
    if class_probabilities {
        write!(writer, "labels")?;
        for label in model.labels() {
            write!(writer, " {label}")?;
        }
        writeln!(writer)?;
    }

    let mut predictions = Vec::with_capacity(dataset.len());
    for i in 0..dataset.len() {
        let x = dataset.vector(i);
        if class_probabilities {
            let (label, estimates) = model.predict_probability(x)?;
            write!(writer, "{label}")?;
            for p in estimates {
                write!(writer, " {p}")?;
            }
            writeln!(writer)?;
            predictions.push(label);
        } else {
            let label = model.predict(x);
            writeln!(writer, "{label}")?;
            predictions.push(label);
        }
    }
    writer.flush()?;

    report(&predictions, &dataset.get_labels(), regression, "");
    Ok(())
}

fn cv_command(args: CvArgs) -> Result<()> {
    let params = args.params.to_parameters()?;
    let dataset = LibSVMDataset::from_file(&args.data)?;
    let regression = params.svm_type.is_regression();

    info!("{}-fold cross-validation on {:?}", args.folds, args.data);
    let predictions = SVM::with_parameters(params).cross_validate(dataset.problem(), args.folds)?;

    report(&predictions, &dataset.get_labels(), regression, "Cross Validation ");
    Ok(())
}

fn report(predictions: &[f64], targets: &[f64], regression: bool, prefix: &str) {
    let metrics = EvaluationMetrics::from_predictions(predictions, targets);
    if regression {
        println!("{prefix}Mean squared error = {}", metrics.mean_squared_error);
        println!(
            "{prefix}Squared correlation coefficient = {}",
            metrics.squared_correlation
        );
    } else {
        println!(
            "{prefix}Accuracy = {}% ({}/{})",
            metrics.accuracy() * 100.0,
            metrics.correct,
            metrics.total
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_weight() {
        assert_eq!(parse_weight("1:2.5"), Ok((1, 2.5)));
        assert_eq!(parse_weight("-1:0"), Ok((-1, 0.0)));
        assert!(parse_weight("1").is_err());
        assert!(parse_weight("a:1").is_err());
    }

    #[test]
    fn test_default_model_path() {
        assert_eq!(
            default_model_path(Path::new("/tmp/heart.libsvm")),
            PathBuf::from("/tmp/heart.libsvm.model")
        );
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "svmqp", "train", "--data", "a.libsvm", "-s", "nu_svc", "-t", "rbf", "-g", "0.5",
            "-w", "1:2", "-w", "-1:0.5", "--no-shrinking", "--working-set", "first-order",
        ]);
        let Commands::Train(args) = cli.command else {
            panic!("expected train command");
        };
        let params = args.params.to_parameters().unwrap();

        assert_eq!(params.svm_type, SvmType::NuSvc);
        assert_eq!(params.kernel_type, KernelType::Gaussian);
        assert_eq!(params.gamma, 0.5);
        assert_eq!(params.weights, vec![(1, 2.0), (-1, 0.5)]);
        assert!(!params.shrinking);
        assert_eq!(params.working_set, WorkingSetStrategy::FirstOrder);
        assert_eq!(params.c, 1.0);
    }
}
