//! Golib: a Go game record editor.
//!
//! ## Usage
//!
//! - `golib-rust shell [FILE]` - Edit a game through the command shell
//! - `golib-rust show FILE [--at N]` - Print the board at some move
//! - `golib-rust check FILE` - Replay a game and report the first illegal move
//! - `golib-rust demo` - Record a random game and print it as SGF

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::error;

use golib_rust::config::GoConfig;
use golib_rust::constants::DEFAULT_SIZE;
use golib_rust::controller::Controller;
use golib_rust::kifu::Kifu;
use golib_rust::moves::Frame;
use golib_rust::playout::random_game;
use golib_rust::rules::Rules;
use golib_rust::shell::Shell;

const DEMO_MOVES: usize = 120;

/// Golib: record, replay and edit Go games stored as SGF
#[derive(Parser)]
#[command(name = "golib-rust")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Board size of new games
    #[arg(long, default_value_t = DEFAULT_SIZE)]
    size: usize,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit a game with line commands read from stdin
    Shell {
        /// SGF file to open, a new game is started otherwise
        file: Option<PathBuf>,
    },
    /// Print the board of a recorded game
    Show {
        file: PathBuf,
        /// Move number to stop at, the end of the game by default
        #[arg(long)]
        at: Option<usize>,
    },
    /// Replay a game and check that every move is legal
    Check { file: PathBuf },
    /// Record a random game and print it as SGF
    Demo {
        #[arg(long, default_value_t = DEMO_MOVES)]
        moves: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = GoConfig::new(cli.size)
        .with_context(|| format!("unsupported board size {}", cli.size))?;

    match cli.command {
        Some(Commands::Shell { file }) => {
            let controller = Controller::open(config, file.as_deref(), |e| error!("{e}"));
            let mut shell = Shell::new(controller);
            shell.run(io::stdin().lock(), io::stdout())?;
        }
        Some(Commands::Show { file, at }) => {
            let mut controller = Controller::new(config);
            controller
                .load(&file)
                .with_context(|| format!("failed to open {}", file.display()))?;
            controller.goto(at.unwrap_or(usize::MAX))?;
            print!("{}", controller.grid());
            println!("{}", controller.status());
        }
        Some(Commands::Check { file }) => check(&file, &config)?,
        Some(Commands::Demo { moves, seed }) => run_demo(&config, moves, seed),
        None => run_demo(&config, DEMO_MOVES, None),
    }
    Ok(())
}

/// Replay every move of `file` through the rules engine.
fn check(file: &Path, config: &GoConfig) -> Result<()> {
    let kifu = Kifu::load(file, config)
        .with_context(|| format!("failed to open {}", file.display()))?;
    let rules = Rules::new(&config.with_size(kifu.size()).unwrap_or_default());
    let mut count = 0;
    for mv in kifu.moves() {
        if let Err(e) = rules.put(&mv, true).and_then(|_| rules.confirm()) {
            bail!(
                "move {} ({}) is illegal: {e}",
                mv.number,
                mv.repr(Frame::Kgs, kifu.size())
            );
        }
        count += 1;
    }
    println!("{}: {count} legal move(s)", file.display());
    Ok(())
}

fn run_demo(config: &GoConfig, moves: usize, seed: Option<u64>) {
    let mut rng = match seed {
        Some(seed) => fastrand::Rng::with_seed(seed),
        None => fastrand::Rng::new(),
    };
    let kifu = random_game(config, moves, &mut rng);
    let mut controller = Controller::new(config.clone());
    for mv in kifu.moves() {
        let played = match mv.point {
            Some(pt) => controller.play(pt),
            None => controller.pass(),
        };
        if let Err(e) = played {
            error!("{mv}: {e}");
            break;
        }
    }
    println!("{}", controller.grid());
    print!("{kifu}");
}
