use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rankset::{FastHashMap, Interval, Member, SortedSet};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Log filter, e.g. `info` or `rankset=debug`. Falls back to RUST_LOG.
    #[arg(long, global = true)]
    log: Option<String>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Drive a random workload against a SortedSet and cross-check every step.
    Soak {
        /// Number of operations to run
        #[arg(long, default_value_t = 200_000)]
        ops: u64,
        /// Size of the key universe; smaller values mean more rescoring
        #[arg(long, default_value_t = 2_000)]
        keys: u32,
        /// Seed for both the workload and the skiplist levels
        #[arg(long, default_value_t = 0x7d11_5eed)]
        seed: u64,
        /// Run the full structural check every N operations (0 disables)
        #[arg(long, default_value_t = 1_000)]
        check_every: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = match cli.log.as_deref() {
        Some(directives) => EnvFilter::try_new(directives).context("invalid --log filter")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.cmd {
        Cmd::Soak {
            ops,
            keys,
            seed,
            check_every,
        } => soak(ops, keys, seed, check_every),
    }
}

fn soak(ops: u64, keys: u32, seed: u64, check_every: u64) -> Result<()> {
    anyhow::ensure!(keys > 0, "--keys must be positive");
    let mut rng = StdRng::seed_from_u64(seed);
    let mut set = SortedSet::with_seed(seed.rotate_left(17));
    let mut model: FastHashMap<String, f64> = FastHashMap::default();
    let started = Instant::now();

    info!(ops, keys, seed, "starting soak");
    for step in 0..ops {
        let key = format!("k{}", rng.gen_range(0..keys));
        // Coarse scores produce plenty of ties.
        let score = f64::from(rng.gen_range(-50i32..50)) / 2.0;
        match rng.gen_range(0..100u8) {
            0..=54 => {
                let added = set.add(&key, score);
                let expected = model.insert(key.clone(), score).is_none();
                anyhow::ensure!(added == expected, "step {step}: add({key}, {score}) returned {added}");
            }
            55..=69 => {
                let removed = set.remove(&key);
                anyhow::ensure!(
                    removed == model.remove(&key).is_some(),
                    "step {step}: remove({key}) returned {removed}"
                );
            }
            70..=79 => {
                let rank = set.rank(&key, false);
                let want = model.get(&key).map(|&score| {
                    model
                        .iter()
                        .filter(|(k, &s)| (s, k.as_str()) < (score, key.as_str()))
                        .count()
                });
                anyhow::ensure!(rank == want, "step {step}: rank({key}) = {rank:?}, want {want:?}");
            }
            80..=89 => {
                let (lower, upper) = random_bounds(&mut rng);
                let got = set.count(&lower, &upper);
                let want = model
                    .values()
                    .filter(|&&s| lower.admits_above(s) && upper.admits_below(s))
                    .count();
                anyhow::ensure!(got == want, "step {step}: count({lower}, {upper}) = {got}, want {want}");
            }
            90..=94 => {
                let (lower, upper) = random_bounds(&mut rng);
                let removed = set.remove_by_score(&lower, &upper);
                let before = model.len();
                model.retain(|_, s| !(lower.admits_above(*s) && upper.admits_below(*s)));
                anyhow::ensure!(
                    removed == before - model.len(),
                    "step {step}: remove_by_score({lower}, {upper}) removed {removed}"
                );
                debug!(step, removed, %lower, %upper, "remove_by_score");
            }
            _ => {
                let n = rng.gen_range(1..4usize);
                let popped = set.pop_min(n);
                let expected: Vec<Member> = sorted(&model).into_iter().take(n).collect();
                anyhow::ensure!(popped == expected, "step {step}: pop_min({n}) mismatch");
                for m in &popped {
                    model.remove(&m.key);
                }
            }
        }
        anyhow::ensure!(set.len() == model.len(), "step {step}: length drift");
        if check_every > 0 && step % check_every == 0 {
            set.assert_invariants();
        }
    }

    set.assert_invariants();
    let got: Vec<Member> = set.iter().cloned().collect();
    anyhow::ensure!(got == sorted(&model), "final order mismatch");
    info!(
        ops,
        members = set.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "soak finished"
    );
    Ok(())
}

fn sorted(model: &FastHashMap<String, f64>) -> Vec<Member> {
    let mut out: Vec<Member> = model
        .iter()
        .map(|(key, &score)| Member {
            key: key.clone(),
            score,
        })
        .collect();
    out.sort_by(|a, b| a.cmp_to(b.score, &b.key));
    out
}

fn random_bounds(rng: &mut StdRng) -> (Interval, Interval) {
    let bound = |rng: &mut StdRng, sentinel: Interval| {
        if rng.gen_ratio(1, 8) {
            sentinel
        } else {
            Interval::new(f64::from(rng.gen_range(-50i32..50)) / 2.0, rng.gen_bool(0.5))
        }
    };
    let lower = bound(rng, Interval::NEG_INFINITY);
    let upper = bound(rng, Interval::POS_INFINITY);
    (lower, upper)
}
