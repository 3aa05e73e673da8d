use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Builder;
use log::LevelFilter;
use std::path::PathBuf;
use tableau_solver::{Method, Outcome, PivotRule, SolvedModel, Solver, SolverIteration};

#[derive(Parser)]
#[command(name = "tableau")]
#[command(about = "Exact step-by-step simplex solver for small linear programs", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ParseFormat {
    Json,
    Pretty,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SolveFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a model file and output the linear model
    Parse {
        /// The file to parse
        file: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ParseFormat::Pretty)]
        format: ParseFormat,
    },
    /// Solve a model and output the optimal solution
    Solve {
        /// The file containing the model
        file: PathBuf,
        /// Print every tableau, pivot cell in brackets
        #[arg(short, long)]
        steps: bool,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = SolveFormat::Text)]
        format: SolveFormat,
        /// Use Bland's rule for the entering column
        #[arg(long)]
        bland: bool,
        /// Maximum pivots per phase
        #[arg(long, default_value_t = 10_000)]
        max_iterations: usize,
    },
    /// Check a model file for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
}

fn read_source(file: &PathBuf) -> String {
    match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    }
}

fn parse_or_exit(source: &str) -> tableau_solver::LinearModel {
    match tableau_lang::Parser::parse(source) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Parse error: {}", e);
            if let Some(line) = e.offending_line() {
                eprintln!("  {}", line);
            }
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    Builder::new().filter_level(level).init();

    match cli.command {
        Commands::Parse { file, format } => {
            let source = read_source(&file);
            let model = parse_or_exit(&source);
            match format {
                ParseFormat::Json => match serde_json::to_string_pretty(&model) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error serializing model: {}", e);
                        std::process::exit(1);
                    }
                },
                ParseFormat::Pretty => println!("{:#?}", model),
            }
        }
        Commands::Solve {
            file,
            steps,
            format,
            bland,
            max_iterations,
        } => {
            let source = read_source(&file);
            let model = parse_or_exit(&source);

            let rule = if bland { PivotRule::Bland } else { PivotRule::Dantzig };
            let solver = Solver::new()
                .with_pivot_rule(rule)
                .with_max_iterations(max_iterations);
            log::debug!(
                "solving with {:?} rule, at most {} pivots per phase",
                solver.pivot_rule(),
                solver.max_iterations()
            );
            let solved = match solver.solve(&model) {
                Ok(solved) => solved,
                Err(e) => {
                    eprintln!("Solve error: {}", e);
                    std::process::exit(1);
                }
            };

            if format == SolveFormat::Json {
                match serde_json::to_string_pretty(&solved) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error serializing solution: {}", e);
                        std::process::exit(1);
                    }
                }
                return;
            }

            if steps {
                for (k, (method, iteration)) in solved.pages().enumerate() {
                    print_tableau(k, method, iteration);
                }
            }
            print_summary(&solved);

            if !solved.is_optimized() {
                std::process::exit(1);
            }
        }
        Commands::Check { file } => {
            let source = read_source(&file);
            match tableau_lang::Parser::parse(&source) {
                Ok(model) => {
                    println!("✓ {} is valid", file.display());
                    println!("  {} objective", model.objective);
                    println!("  {} variables", model.num_variables());
                    println!("  {} constraints", model.num_constraints());
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    if let Some(line) = e.offending_line() {
                        eprintln!("  {}", line);
                    }
                    std::process::exit(1);
                }
            }
        }
    }
}

fn print_summary(solved: &SolvedModel) {
    println!("{}", solved.objective_text());
    match solved.outcome {
        Outcome::Optimized => {
            println!("Status: OPTIMAL");
            println!("Z = {}", solved.z);
            println!();
            println!("Variables:");
            for (variable, value) in solved.input_values() {
                println!("  {:10} {:>12}", variable.name(), value);
            }
        }
        Outcome::Infeasible => {
            println!("Status: INFEASIBLE");
            println!("No solution exists that satisfies all constraints.");
        }
        Outcome::Unbounded => {
            println!("Status: UNBOUNDED");
            println!("The problem has no finite optimal solution.");
        }
    }
    println!("({} tableaus)", solved.num_iterations());
}

fn print_tableau(index: usize, method: Method, iteration: &SolverIteration) {
    let cell = |i: usize, j: usize| {
        let text = iteration.grid[(i, j)].to_string();
        match iteration.pivot {
            Some(p) if p.row == i && p.column == j => format!("[{}]", text),
            _ => text,
        }
    };

    let mut header = vec!["Basis".to_string(), "Cb".to_string()];
    header.extend(iteration.variables().map(|v| v.name().to_string()));
    header.push("Value".to_string());

    let mut rows = vec![header];
    for (i, row) in iteration.rows.iter().enumerate() {
        let mut line = vec![
            row.basis.name().to_string(),
            iteration.cost_of(&row.basis).to_string(),
        ];
        line.extend((0..iteration.num_columns()).map(|j| cell(i, j)));
        line.push(row.value.to_string());
        rows.push(line);
    }
    let mut costs = vec!["Cj".to_string(), String::new()];
    costs.extend(iteration.objective_variables().map(ToString::to_string));
    costs.push(String::new());
    rows.push(costs);
    // Phase 1 minimizes
    let label = match method {
        Method::TwoPhases => "Cj-Zj",
        Method::Simplex => "Zj-Cj",
    };
    let mut reduced = vec![label.to_string(), String::new()];
    reduced.extend(iteration.decision_variables().map(ToString::to_string));
    reduced.push(format!("Z = {}", iteration.z));
    rows.push(reduced);

    let widths: Vec<usize> = (0..rows[0].len())
        .map(|c| rows.iter().map(|r| r[c].len()).max().unwrap_or(0))
        .collect();

    println!("Iteration {} ({})", index + 1, method);
    for row in &rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(text, width)| format!("{:>width$}", text, width = width))
            .collect();
        println!("  {}", line.join("  "));
    }
    println!();
}
