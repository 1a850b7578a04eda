use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;

use milpkit::batch::{label_of, load_instance, solve_files};
use milpkit::generate::{GenerationConfig, generate_instance};
use milpkit::report::format_reports;
use milpkit::utils::json::{load_json, save_json};
use milpkit::{Instance, OutputFormat, ProblemKind, Report, SolverConfig, logging};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Formulate and solve routing, product-mix and scheduling MILPs",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    solver: SolverArgs,

    /// Log filter such as `info` or `milpkit=debug`. Defaults to $MILPKIT_LOG, then `warn`
    #[arg(long, global = true)]
    log_level: Option<String>,
}

/// Solver options; command-line values override the config file.
#[derive(Args, Debug)]
struct SolverArgs {
    /// JSON file with a solver configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Time limit in seconds for each solve
    #[arg(long, global = true)]
    time_limit: Option<f64>,

    /// Relative MIP gap at which CBC may stop
    #[arg(long, global = true)]
    mip_gap: Option<f64>,

    /// Number of CBC threads
    #[arg(long, global = true)]
    threads: Option<u32>,

    /// Print CBC's own log
    #[arg(long, global = true)]
    solver_log: bool,

    /// Big-M for the scheduling model
    #[arg(long, global = true)]
    big_m: Option<f64>,

    /// Drop the subtour elimination rows from the routing models
    #[arg(long, global = true)]
    no_subtour_elimination: bool,

    /// Only allow whole product quantities
    #[arg(long, global = true)]
    integer_quantities: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve one instance file
    Solve {
        instance: PathBuf,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Solve the built-in example instances
    Demo {
        /// Only this kind; all four when omitted
        #[arg(value_enum)]
        kind: Option<ProblemKind>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write a random instance file
    Generate {
        #[arg(value_enum)]
        kind: ProblemKind,
        /// Points, products or tasks
        #[arg(short = 'n', long, default_value_t = 5)]
        size: usize,
        /// Vehicles, goods types or processors
        #[arg(short = 's', long, default_value_t = 2)]
        secondary: usize,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Solve several instance files and summarise them. Unreadable files
    /// are listed as failed rows
    Batch {
        #[arg(required = true)]
        instances: Vec<PathBuf>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the precedence graph of a scheduling instance in DOT format
    Graph { instance: PathBuf },
}

impl SolverArgs {
    fn resolve(&self) -> anyhow::Result<SolverConfig> {
        let mut config = match &self.config {
            Some(path) => load_json::<SolverConfig, _>(path)?,
            None => SolverConfig::default(),
        };
        if let Some(seconds) = self.time_limit {
            config = config.with_time_limit(seconds);
        }
        if let Some(gap) = self.mip_gap {
            config = config.with_mip_gap(gap);
        }
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        if let Some(big_m) = self.big_m {
            config = config.with_big_m(big_m);
        }
        if self.solver_log {
            config = config.with_solver_log(true);
        }
        if self.no_subtour_elimination {
            config = config.with_subtour_elimination(false);
        }
        if self.integer_quantities {
            config = config.with_integer_quantities(true);
        }
        Ok(config)
    }
}

fn emit(
    reports: &[Report],
    format: OutputFormat,
    output: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let text = format_reports(reports, format)?;
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?
        }
        None => print!("{text}"),
    }
    let all_solved = reports.iter().all(|r| r.status.is_success());
    Ok(if all_solved { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref()).map_err(anyhow::Error::msg)?;
    let config = cli.solver.resolve()?;
    tracing::debug!(?config, "Resolved solver configuration");

    match cli.command {
        Command::Solve {
            instance,
            format,
            output,
        } => {
            let report = load_instance(&instance)?.solve(label_of(&instance), &config);
            emit(&[report], format, output.as_deref())
        }
        Command::Demo {
            kind,
            format,
            output,
        } => {
            let kinds = match kind {
                Some(kind) => vec![kind],
                None => ProblemKind::ALL.to_vec(),
            };
            let reports: Vec<Report> = kinds
                .into_iter()
                .map(|kind| kind.demo().solve(format!("demo-{kind}"), &config))
                .collect();
            emit(&reports, format, output.as_deref())
        }
        Command::Generate {
            kind,
            size,
            secondary,
            seed,
            output,
        } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let instance = generate_instance(kind, &GenerationConfig { size, secondary }, &mut rng);
            save_json(&instance, &output)?;
            println!("Wrote {} instance to {}", kind, output.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Batch {
            instances,
            format,
            output,
        } => {
            let reports = solve_files(&instances, &config);
            emit(&reports, format, output.as_deref())
        }
        Command::Graph { instance } => {
            let Instance::Schedule(problem) = load_json::<Instance, _>(&instance)? else {
                bail!("{} is not a scheduling instance", instance.display());
            };
            println!("{}", problem.graph()?.dot());
            Ok(ExitCode::SUCCESS)
        }
    }
}
