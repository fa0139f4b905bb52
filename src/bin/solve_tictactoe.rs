//! Tic-Tac-Toe policy iteration binary.
//!
//! Usage:
//!   cargo run --release --bin solve_tictactoe -- train [OPTIONS]
//!   cargo run --release --bin solve_tictactoe -- play [OPTIONS]
//!
//! Set `RUST_LOG=rust_pi_solver=debug` (or `trace`) for solver logging.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_pi_solver::error::SolverError;
use rust_pi_solver::games::tictactoe::{
    Board, MatchRecord, Move, Opponent, RandomOpponent, TicTacToe,
};
use rust_pi_solver::mdp::{FrozenPolicy, GameModel, PIConfig, PolicyIterationSolver};

#[derive(Parser)]
#[command(name = "solve_tictactoe")]
#[command(version, about = "Solve Tic-Tac-Toe against a random opponent with policy iteration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a policy and save it as JSON
    Train(TrainArgs),

    /// Play a policy against a random opponent or a human
    Play(PlayArgs),
}

#[derive(Args)]
struct SolverArgs {
    /// Configuration JSON file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Discount factor in [0, 1)
    #[arg(long)]
    discount: Option<f64>,

    /// Evaluation stops when the largest change in a sweep is below this
    #[arg(long)]
    tolerance: Option<f64>,

    /// Seed for the random initial policy
    #[arg(short, long)]
    seed: Option<u64>,

    /// Use parallel evaluation and improvement sweeps
    #[arg(long)]
    parallel: bool,

    /// Worker threads for parallel sweeps (implies --parallel)
    #[arg(short, long)]
    threads: Option<usize>,
}

#[derive(Args)]
struct TrainArgs {
    #[command(flatten)]
    solver: SolverArgs,

    /// Where to write the trained policy
    #[arg(short, long, default_value = "policy.json")]
    output: PathBuf,
}

#[derive(Args)]
struct PlayArgs {
    #[command(flatten)]
    solver: SolverArgs,

    /// Trained policy to load; trains a fresh one when omitted
    #[arg(short, long)]
    policy: Option<PathBuf>,

    /// Number of games against the random opponent
    #[arg(short, long, default_value_t = 1000)]
    games: usize,

    /// Play one game as O from the terminal instead
    #[arg(long)]
    human: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rust_pi_solver=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Play(args) => play_command(args),
    }
}

fn build_config(args: &SolverArgs) -> Result<PIConfig> {
    let mut config = match &args.config {
        Some(path) => PIConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PIConfig::default(),
    };
    if let Some(discount) = args.discount {
        config = config.with_discount(discount);
    }
    if let Some(tolerance) = args.tolerance {
        config = config.with_tolerance(tolerance);
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if args.parallel {
        config = config.with_parallel(true);
    }
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }
    config.validate()?;
    Ok(config)
}

fn train(args: &SolverArgs) -> Result<FrozenPolicy> {
    let config = build_config(args)?;

    println!("=================================================");
    println!("  Tic-Tac-Toe Policy Iteration (X vs random O)");
    println!("=================================================");
    println!();
    println!("Discount: {}", config.discount);
    println!("Tolerance: {:e}", config.tolerance);
    println!("Parallel: {}", config.parallel);
    match config.seed {
        Some(seed) => println!("Seed: {}", seed),
        None => println!("Seed: entropy"),
    }
    println!();

    let mut solver = PolicyIterationSolver::new(TicTacToe::new(), config)?;
    println!(
        "States: {} ({} terminal)",
        solver.space().len(),
        solver.space().num_terminal()
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.set_message("evaluating initial policy");

    let policy = solver.train_with_callback(|cycle| {
        spinner.set_message(format!(
            "cycle {:>3} | sweeps {:>4} | max delta {:.2e} | changed {:>5}",
            cycle.iteration, cycle.sweeps, cycle.max_delta, cycle.states_changed
        ));
        spinner.tick();
    });
    spinner.finish_and_clear();

    let stats = solver.stats();
    println!();
    println!("Policy iteration cycles: {}", stats.policy_iterations);
    println!("Evaluation sweeps: {}", stats.total_sweeps);
    println!("Converged: {}", stats.converged);
    println!("Training time: {:.2}s", stats.elapsed_seconds);
    if let Some(value) = solver.value_of(&Board::new()) {
        println!("Value of the empty board: {:.4}", value);
    }
    println!();

    Ok(policy)
}

fn train_command(args: TrainArgs) -> Result<()> {
    let policy = train(&args.solver)?;
    policy
        .save_json(&args.output)
        .with_context(|| format!("saving policy to {}", args.output.display()))?;
    info!(path = %args.output.display(), states = policy.len(), "policy saved");
    println!("Policy saved to: {}", args.output.display());
    Ok(())
}

fn play_command(args: PlayArgs) -> Result<()> {
    let game = TicTacToe::new();
    let policy = match &args.policy {
        Some(path) => {
            let policy = FrozenPolicy::load_json(path)
                .with_context(|| format!("loading policy from {}", path.display()))?;
            policy.validate_against(&game)?;
            println!("Loaded policy for {} states from {}", policy.len(), path.display());
            policy
        }
        None => train(&args.solver)?,
    };

    if args.human {
        return play_human(&game, &policy);
    }

    let rng = match args.solver.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut opponent = RandomOpponent::new(rng);
    let mut record = MatchRecord::default();

    let bar = ProgressBar::new(args.games as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} games")?
            .progress_chars("=>-"),
    );
    for _ in 0..args.games {
        record.record(game.play_game(&policy, &mut opponent)?);
        bar.inc(1);
    }
    bar.finish_and_clear();

    let pct = |n: usize| 100.0 * n as f64 / record.games().max(1) as f64;
    println!("Games: {}", record.games());
    println!("  X wins: {:>6} ({:.1}%)", record.wins, pct(record.wins));
    println!("  Draws:  {:>6} ({:.1}%)", record.draws, pct(record.draws));
    println!("  Losses: {:>6} ({:.1}%)", record.losses, pct(record.losses));
    Ok(())
}

/// O moves typed on stdin.
struct HumanOpponent<'a, R> {
    game: &'a TicTacToe,
    input: R,
    /// Board as it stood after the human's previous move.
    previous: Board,
}

impl<R: BufRead> Opponent for HumanOpponent<'_, R> {
    fn choose_move(&mut self, board: &Board) -> rust_pi_solver::Result<usize> {
        let io_error = |source: io::Error| SolverError::Io {
            operation: "read move from stdin".to_string(),
            source,
        };

        if let Some(cell) = (0..9).find(|&i| self.previous.cells[i] != board.cells[i]) {
            println!();
            println!("X plays {}", self.game.action_name(&Move(cell)));
        }

        loop {
            println!();
            print!("{}", self.game.state_description(board));
            print!("Your move (free cell number): ");
            io::stdout().flush().map_err(io_error)?;

            let mut line = String::new();
            if self.input.read_line(&mut line).map_err(io_error)? == 0 {
                return Err(io_error(io::ErrorKind::UnexpectedEof.into()));
            }
            match line.trim().parse::<usize>() {
                Ok(cell) if board.empty_cells().contains(&cell) => {
                    self.previous = board.play(cell)?;
                    return Ok(cell);
                }
                _ => println!("'{}' is not a free cell.", line.trim()),
            }
        }
    }
}

fn play_human(game: &TicTacToe, policy: &FrozenPolicy) -> Result<()> {
    println!("You are O. X moves first.");
    let stdin = io::stdin();
    let mut human = HumanOpponent {
        game,
        input: stdin.lock(),
        previous: Board::new(),
    };
    let result = game.play_game(policy, &mut human)?;
    println!();
    println!("Result for X: {:?}", result);
    Ok(())
}
