use std::path::PathBuf;

use clap::Parser;

/// Browse Reddit from the terminal.
#[derive(Parser, Debug)]
#[command(name = "redterm")]
#[command(version)]
#[command(about = "Browse Reddit from the terminal.")]
struct Args {
    /// Subreddit to open at startup (front page if omitted)
    #[arg(short, long)]
    subreddit: Option<String>,

    /// Path to configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    let opts = redterm::RunOptions {
        subreddit: args.subreddit,
        config_file: args.config,
    };
    if let Err(err) = redterm::run(opts) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}
