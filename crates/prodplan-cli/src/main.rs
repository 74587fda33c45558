use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use prodplan_planner::{ProductionPlan, ResourceLimits};
use prodplan_solver::SolverConfig;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "prodplan")]
#[command(about = "Plan lemonade and fruit juice production under resource limits", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Solve for the best plan under the given limits
    Plan {
        #[arg(long)]
        water: u64,
        #[arg(long)]
        sugar: u64,
        #[arg(long)]
        lemon_juice: u64,
        #[arg(long)]
        fruit_puree: u64,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
        /// Stop the search after this many milliseconds
        #[arg(long)]
        time_limit_ms: Option<u64>,
        /// Simplex feasibility tolerance
        #[arg(long, value_parser = parse_tolerance)]
        tolerance: Option<f64>,
        /// Stop the search after this many branch-and-bound nodes
        #[arg(long)]
        max_nodes: Option<usize>,
    },
    /// Run the two built-in example scenarios
    Examples {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
        format: Format,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Pretty,
    Json,
}

fn parse_tolerance(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("tolerance must be finite and positive, got {value}"));
    }
    Ok(value)
}

fn init_logging(verbose: u8) {
    if verbose == 0 {
        return;
    }
    let level = match verbose {
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        std::process::exit(1);
    }
}

fn print_plan(label: &str, limits: &ResourceLimits, plan: &ProductionPlan, format: Format) {
    match format {
        Format::Json => match serde_json::to_string_pretty(plan) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing plan: {}", e);
                std::process::exit(1);
            }
        },
        Format::Pretty => {
            println!("{}", label);
            println!(
                "  Limits: water={} sugar={} lemon_juice={} fruit_puree={}",
                limits.water, limits.sugar, limits.lemon_juice, limits.fruit_puree
            );
            println!("  {:16} {:>8}", "lemonade", plan.lemonade);
            println!("  {:16} {:>8}", "fruit_juice", plan.fruit_juice);
            println!("  {:16} {:>8}", "total_products", plan.total_products);
        }
    }
}

fn solve_or_exit(limits: &ResourceLimits, config: &SolverConfig) -> ProductionPlan {
    match prodplan_planner::optimize_production_with(limits, config) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Planning error: {}", e);
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Plan {
            water,
            sugar,
            lemon_juice,
            fruit_puree,
            format,
            time_limit_ms,
            tolerance,
            max_nodes,
        } => {
            let mut config = SolverConfig::new();
            if let Some(ms) = time_limit_ms {
                config = config.with_time_limit(Duration::from_millis(ms));
            }
            if let Some(tol) = tolerance {
                config = config.with_tolerance(tol);
            }
            if let Some(max) = max_nodes {
                config = config.with_max_nodes(max);
            }

            let limits = ResourceLimits::new(water, sugar, lemon_juice, fruit_puree);
            let plan = solve_or_exit(&limits, &config);
            print_plan("Optimal plan", &limits, &plan, format);
        }
        Commands::Examples { format } => {
            let config = SolverConfig::new();
            let scenarios = [
                ("Example 1", ResourceLimits::new(100, 50, 30, 40)),
                ("Example 2", ResourceLimits::new(80, 20, 10, 50)),
            ];
            for (label, limits) in &scenarios {
                let plan = solve_or_exit(limits, &config);
                print_plan(label, limits, &plan, format);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan() {
        let cli = Cli::try_parse_from([
            "prodplan",
            "plan",
            "--water",
            "100",
            "--sugar",
            "50",
            "--lemon-juice",
            "30",
            "--fruit-puree",
            "40",
            "--format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Plan {
                water,
                lemon_juice,
                format,
                time_limit_ms,
                ..
            } => {
                assert_eq!(water, 100);
                assert_eq!(lemon_juice, 30);
                assert_eq!(format, Format::Json);
                assert_eq!(time_limit_ms, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_verbosity() {
        let cli = Cli::try_parse_from(["prodplan", "examples", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Examples { format: Format::Pretty }));
    }

    #[test]
    fn test_rejects_negative_limits() {
        let result = Cli::try_parse_from([
            "prodplan",
            "plan",
            "--water",
            "-1",
            "--sugar",
            "0",
            "--lemon-juice",
            "0",
            "--fruit-puree",
            "0",
        ]);
        assert!(result.is_err());
    }

    fn plan_args(extra: &[&'static str]) -> Vec<&'static str> {
        let mut args = vec![
            "prodplan",
            "plan",
            "--water",
            "1",
            "--sugar",
            "1",
            "--lemon-juice",
            "1",
            "--fruit-puree",
            "1",
        ];
        args.extend_from_slice(extra);
        args
    }

    #[test]
    fn test_rejects_bad_tolerance() {
        for bad in ["--tolerance=-1e-9", "--tolerance=0", "--tolerance=NaN", "--tolerance=inf", "--tolerance=abc"] {
            assert!(Cli::try_parse_from(plan_args(&[bad])).is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn test_accepts_solver_limits() {
        let cli = Cli::try_parse_from(plan_args(&["--tolerance", "1e-7", "--max-nodes", "500"])).unwrap();
        match cli.command {
            Commands::Plan {
                tolerance, max_nodes, ..
            } => {
                assert_eq!(tolerance, Some(1e-7));
                assert_eq!(max_nodes, Some(500));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
