use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

use prodplan_model::{AlgorithmRun, Interval, PlanInput, PlanningModel, RunConfig, Runner, SensitivityReport};
use prodplan_solver::Method;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "prodplan")]
#[command(about = "Production planning with LP sensitivity analysis", long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a plan file with every algorithm and print the sensitivity reports
    Solve {
        /// The JSON plan file
        file: PathBuf,
        #[command(flatten)]
        options: SolveOptions,
    },
    /// Check a plan file for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
    /// Solve the built-in brewery scenario
    Demo {
        #[command(flatten)]
        options: SolveOptions,
    },
}

#[derive(clap::Args)]
struct SolveOptions {
    /// Algorithm id to run (0 primal, 1 dual, 2 barrier, 3 concurrent,
    /// 4 deterministic concurrent, 5 deterministic concurrent simplex).
    /// Repeat for several; all of them by default.
    #[arg(short, long = "algorithm", value_parser = clap::value_parser!(u8).range(0..=5))]
    algorithms: Vec<u8>,
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,
    /// Skip objective and right-hand side ranging
    #[arg(long)]
    no_ranging: bool,
    /// Time limit per algorithm, in seconds
    #[arg(long)]
    time_limit: Option<f64>,
    /// Let the engine log its progress
    #[arg(long)]
    engine_output: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl SolveOptions {
    fn config(&self) -> RunConfig {
        let mut config = RunConfig {
            output: self.engine_output,
            ranging: !self.no_ranging,
            time_limit: self
                .time_limit
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map(Duration::from_secs_f64),
            ..RunConfig::default()
        };
        if !self.algorithms.is_empty() {
            config.algorithms = self.algorithms.iter().filter_map(|&id| Method::from_id(id)).collect();
        }
        config
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load(file: &Path) -> PlanInput {
    match PlanInput::load(file) {
        Ok(input) => {
            tracing::debug!(
                file = %file.display(),
                resources = input.resources.len(),
                products = input.products.len(),
                "plan loaded"
            );
            input
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn build_model(input: &PlanInput) -> PlanningModel {
    let built = input
        .into_catalogs()
        .and_then(|(resources, products)| prodplan_model::build(&resources, &products));
    match built {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn solve(input: &PlanInput, options: &SolveOptions) {
    let model = build_model(input);
    let runs = Runner::new(options.config()).run(&model);

    match options.format {
        Format::Json => print_json(&model, &runs),
        Format::Text => {
            if let Some(name) = &input.name {
                println!("Plan: {}", name);
            }
            println!("Products: {}  Resources: {}", model.num_products(), model.num_resources());
            for run in &runs {
                println!();
                print_run(&model, run);
            }
        }
    }
}

fn print_json(model: &PlanningModel, runs: &[AlgorithmRun]) {
    let entries: Vec<serde_json::Value> = runs
        .iter()
        .map(|run| match prodplan_model::report(model, run) {
            Ok(report) => serde_json::json!({ "algorithm": run.algorithm.name(), "report": report }),
            Err(e) => serde_json::json!({ "algorithm": run.algorithm.name(), "error": e.to_string() }),
        })
        .collect();

    match serde_json::to_string_pretty(&entries) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn fmt_bound(bound: Option<f64>, infinite: &str) -> String {
    bound.map_or_else(|| infinite.to_string(), |v| format!("{:.4}", v))
}

fn fmt_interval(interval: Option<Interval>) -> String {
    match interval {
        Some(i) => format!("[{}, {}]", fmt_bound(i.low, "-inf"), fmt_bound(i.high, "+inf")),
        None => "-".to_string(),
    }
}

fn print_run(model: &PlanningModel, run: &AlgorithmRun) {
    println!("== {} ({}) ==", run.algorithm.name(), run.algorithm.id());
    match prodplan_model::report(model, run) {
        Ok(report) => print_report(&report),
        Err(e) => println!("Status: {}", e),
    }
}

fn print_report(report: &SensitivityReport) {
    println!("Status: OPTIMAL");
    if let Some(winner) = &report.winner {
        println!("Winner: {}", winner);
    }
    println!("Iterations: {}", report.iterations);
    println!("Total profit: {:.4}", report.objective_value);
    println!();

    println!(
        "  {:20} {:>12} {:>12} {:>10}  {}",
        "product", "quantity", "reduced", "profit", "profit range"
    );
    for p in &report.products {
        println!(
            "  {:20} {:>12.4} {:>12.4} {:>10.4}  {}",
            p.name,
            p.quantity,
            p.reduced_cost,
            p.profit,
            fmt_interval(p.profit_range)
        );
    }
    println!();

    println!(
        "  {:20} {:>12} {:>12} {:>10}  {}",
        "resource", "slack", "price", "capacity", "capacity range"
    );
    for r in &report.resources {
        println!(
            "  {:20} {:>12.4} {:>12.4} {:>10.4}  {}",
            r.name,
            r.slack,
            r.shadow_price,
            r.capacity,
            fmt_interval(r.capacity_range)
        );
    }

    if !report.binding_resources.is_empty() {
        println!();
        println!("Binding resources: {}", report.binding_resources.join(", "));
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Solve { file, options } => {
            let input = load(&file);
            solve(&input, &options);
        }
        Commands::Check { file } => {
            let input = load(&file);
            let checked = input
                .into_catalogs()
                .and_then(|(resources, products)| prodplan_model::build(&resources, &products));

            match checked {
                Ok(model) => {
                    println!("✓ {} is valid", file.display());
                    println!("  {} resources", model.num_resources());
                    println!("  {} products", model.num_products());
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Demo { options } => {
            solve(&prodplan_model::scenario::brewery(), &options);
        }
    }
}
