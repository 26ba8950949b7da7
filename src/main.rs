use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

use slide_2048::config::Settings;
use slide_2048::engine::WIN_TILE;
use slide_2048::game::{Game, Summary};
use slide_2048::policy::PolicyKind;

#[derive(Debug, Parser)]
#[command(name = "slide2048", version, about = "Play 2048 with random, rule-based or lookahead agents")]
struct Args {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Play a single game, printing the board after every move
    Play {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Play many independent games in parallel and report aggregate stats
    Batch {
        #[command(flatten)]
        run: RunArgs,
        /// Number of games to play
        #[arg(long)]
        games: Option<u32>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, clap::Args)]
struct RunArgs {
    /// Agent that picks the moves
    #[arg(long, value_enum)]
    policy: Option<PolicyKind>,
    /// RNG seed; random when absent
    #[arg(long)]
    seed: Option<u64>,
    /// Rollouts per direction for the lookahead agent
    #[arg(long)]
    rollouts: Option<u32>,
    /// Spawn-and-greedy steps per rollout
    #[arg(long)]
    depth: Option<u32>,
    /// TOML settings file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Stop each game after this many moves
    #[arg(long)]
    max_moves: Option<u32>,
    /// Spread lookahead rollouts across threads
    #[arg(long)]
    parallel: bool,
    /// Suppress board printing and progress output
    #[arg(long)]
    quiet: bool,
}

impl RunArgs {
    fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_toml(path).with_context(|| format!("loading settings from {}", path.display()))?,
            None => Settings::default(),
        };
        if let Some(policy) = self.policy { settings.policy = policy; }
        if let Some(seed) = self.seed { settings.run.seed = Some(seed); }
        if let Some(rollouts) = self.rollouts { settings.lookahead.rollouts = rollouts; }
        if let Some(depth) = self.depth { settings.lookahead.depth = depth; }
        if let Some(cap) = self.max_moves { settings.run.max_moves = Some(cap); }
        settings.run.parallel |= self.parallel;
        Ok(settings)
    }
}

#[derive(Debug, Serialize)]
struct BatchReport {
    policy: PolicyKind,
    seed: u64,
    games: u32,
    mean_score: f64,
    max_score: u64,
    mean_moves: f64,
    win_rate: f64,
    /// Games per highest tile reached.
    highest_tiles: BTreeMap<u32, u32>,
    elapsed_secs: f64,
}

impl BatchReport {
    fn new(settings: &Settings, seed: u64, summaries: &[Summary], elapsed_secs: f64) -> Self {
        let games = summaries.len().max(1) as f64;
        let mut highest_tiles = BTreeMap::new();
        for s in summaries {
            *highest_tiles.entry(s.highest_tile).or_insert(0) += 1;
        }
        BatchReport {
            policy: settings.policy,
            seed,
            games: summaries.len() as u32,
            mean_score: summaries.iter().map(|s| s.score as f64).sum::<f64>() / games,
            max_score: summaries.iter().map(|s| s.score).max().unwrap_or(0),
            mean_moves: summaries.iter().map(|s| f64::from(s.moves)).sum::<f64>() / games,
            win_rate: summaries.iter().filter(|s| s.won).count() as f64 / games,
            highest_tiles,
            elapsed_secs,
        }
    }

    fn print(&self) {
        println!("policy: {:?}, seed: {}, games: {}", self.policy, self.seed, self.games);
        println!("score: mean {:.1}, max {}", self.mean_score, self.max_score);
        println!("moves: mean {:.1}", self.mean_moves);
        println!("reached {WIN_TILE}: {:.1}%", self.win_rate * 100.0);
        for (tile, count) in &self.highest_tiles {
            println!("{tile:>6}: {count}");
        }
        println!("elapsed: {:.2}s", self.elapsed_secs);
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match args.cmd {
        Cmd::Play { run } => play(&run),
        Cmd::Batch { run, games, json } => batch(&run, games, json),
    }
}

fn play(run: &RunArgs) -> Result<()> {
    let settings = run.settings()?;
    let seed = settings.run.seed.unwrap_or_else(rand::random);
    info!("playing one game with {:?} (seed {seed})", settings.policy);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut policy = settings.policy.build(settings.lookahead, settings.run.parallel);
    let mut game = Game::new(&mut rng);
    if !run.quiet {
        println!("{}", game.grid());
    }
    let start = Instant::now();
    let summary = game.play_out(policy.as_mut(), &mut rng, settings.run.max_moves, |g, dir| {
        if !run.quiet {
            println!("{dir} (score {})\n{}", g.score(), g.grid());
        }
    });
    println!(
        "Moves made: {}, score: {}, highest tile: {}, finished: {}, elapsed: {:.2}s",
        summary.moves,
        summary.score,
        summary.highest_tile,
        summary.finished,
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

fn batch(run: &RunArgs, games: Option<u32>, json: bool) -> Result<()> {
    let mut settings = run.settings()?;
    if let Some(n) = games { settings.run.games = n; }
    let seed = settings.run.seed.unwrap_or_else(rand::random);
    info!("playing {} games with {:?} (seed {seed})", settings.run.games, settings.policy);

    let pb = if run.quiet || json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(u64::from(settings.run.games));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} games ({eta}) {msg}")?
                .progress_chars("=>-"),
        );
        pb
    };

    let start = Instant::now();
    let summaries: Vec<Summary> = (0..settings.run.games)
        .into_par_iter()
        .map(|i| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(u64::from(i)));
            let mut policy = settings.policy.build(settings.lookahead, settings.run.parallel);
            let mut game = Game::new(&mut rng);
            let summary = game.play_out(policy.as_mut(), &mut rng, settings.run.max_moves, |_, _| {});
            debug!("game {i}: score {}, highest tile {}", summary.score, summary.highest_tile);
            pb.set_message(format!("last score {}", summary.score));
            pb.inc(1);
            summary
        })
        .collect();
    pb.finish_and_clear();

    let report = BatchReport::new(&settings, seed, &summaries, start.elapsed().as_secs_f64());
    if json {
        println!("{}", serde_json::to_string_pretty(&report).context("serializing batch report")?);
    } else {
        report.print();
    }
    Ok(())
}
