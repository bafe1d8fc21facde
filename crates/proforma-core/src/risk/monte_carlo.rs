//! Monte Carlo IRR distribution.
//!
//! Each draw perturbs rent, cost and exit cap rate uniformly within their
//! bands, then estimates IRR from the development spread:
//! `yoc' + (yoc' - cap') * 0.5` with `yoc' = yoc * rent / cost`. The
//! projection is not re-run per draw.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use statrs::distribution::Uniform;
use std::time::Instant;

use crate::error::ProformaError;
use crate::risk::RiskBase;
use crate::types::{ComputationMetadata, ComputationOutput};
use crate::ProformaResult;

const MAX_ITERATIONS: u32 = 1_000_000;
const SPREAD_WEIGHT: f64 = 0.5;

// ---------------------------------------------------------------------------
// Helper: build ComputationOutput without requiring Decimal
// ---------------------------------------------------------------------------

fn with_metadata_f64<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Fixed seed for reproducible runs; entropy-seeded when absent
    #[serde(default)]
    pub seed: Option<u64>,
    /// Rent factor drawn from 1 +/- this band
    #[serde(default = "default_rent_volatility")]
    pub rent_volatility: f64,
    /// Cost factor drawn from 1 +/- this band; must be below 1
    #[serde(default = "default_cost_volatility")]
    pub cost_volatility: f64,
    /// Absolute exit cap-rate band (0.005 = +/-50 bps)
    #[serde(default = "default_cap_rate_volatility")]
    pub cap_rate_volatility: f64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        MonteCarloConfig {
            iterations: default_iterations(),
            seed: None,
            rent_volatility: default_rent_volatility(),
            cost_volatility: default_cost_volatility(),
            cap_rate_volatility: default_cap_rate_volatility(),
        }
    }
}

fn default_iterations() -> u32 {
    10_000
}
fn default_rent_volatility() -> f64 {
    0.10
}
fn default_cost_volatility() -> f64 {
    0.10
}
fn default_cap_rate_volatility() -> f64 {
    0.005
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub iterations: u32,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
    /// Share of draws with IRR below zero
    pub probability_negative: f64,
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

fn validate(config: &MonteCarloConfig) -> ProformaResult<()> {
    if config.iterations == 0 || config.iterations > MAX_ITERATIONS {
        return Err(ProformaError::InvalidInput {
            field: "monte_carlo.iterations".into(),
            reason: format!("Must be between 1 and {MAX_ITERATIONS}"),
        });
    }
    for (field, band) in [
        ("monte_carlo.rent_volatility", config.rent_volatility),
        ("monte_carlo.cost_volatility", config.cost_volatility),
        ("monte_carlo.cap_rate_volatility", config.cap_rate_volatility),
    ] {
        if !band.is_finite() || band < 0.0 {
            return Err(ProformaError::InvalidInput {
                field: field.into(),
                reason: "Volatility band must be a non-negative number".into(),
            });
        }
    }
    if config.cost_volatility >= 1.0 {
        return Err(ProformaError::InvalidInput {
            field: "monte_carlo.cost_volatility".into(),
            reason: "Cost band must be below 100% so the cost factor stays positive".into(),
        });
    }
    Ok(())
}

/// Uniform on `[center - band, center + band]`; `None` for a zero band.
fn band(center: f64, band: f64) -> ProformaResult<Option<Uniform>> {
    if band == 0.0 {
        return Ok(None);
    }
    Uniform::new(center - band, center + band)
        .map(Some)
        .map_err(|e| ProformaError::InvalidInput {
            field: "monte_carlo".into(),
            reason: format!("Invalid Uniform parameters: {e}"),
        })
}

fn draw<R: Rng>(rng: &mut R, dist: Option<&Uniform>, center: f64) -> f64 {
    match dist {
        Some(u) => rng.sample(u),
        None => center,
    }
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Compute the percentile value from a **sorted** slice using linear interpolation.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

fn summarize(mut values: Vec<f64>, iterations: u32) -> MonteCarloSummary {
    values.sort_by(f64::total_cmp);
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = if values.len() > 1 {
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        0.0
    };
    let negatives = values.iter().filter(|v| **v < 0.0).count() as f64;

    MonteCarloSummary {
        iterations,
        mean,
        std_dev: variance.sqrt(),
        min: values.first().copied().unwrap_or(0.0),
        max: values.last().copied().unwrap_or(0.0),
        p10: percentile_sorted(&values, 10.0),
        p50: percentile_sorted(&values, 50.0),
        p90: percentile_sorted(&values, 90.0),
        probability_negative: negatives / n,
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the simulation with a caller-supplied generator.
pub fn simulate_with_rng<R: Rng>(
    base: &RiskBase,
    config: &MonteCarloConfig,
    rng: &mut R,
) -> ProformaResult<MonteCarloSummary> {
    validate(config)?;

    let yoc = base.yield_on_cost.to_f64().unwrap_or(0.0);
    let cap = base.exit_cap_rate.to_f64().unwrap_or(0.0);

    let rent_dist = band(1.0, config.rent_volatility)?;
    let cost_dist = band(1.0, config.cost_volatility)?;
    let cap_dist = band(cap, config.cap_rate_volatility)?;

    let mut irrs = Vec::with_capacity(config.iterations as usize);
    for _ in 0..config.iterations {
        let rent_factor = draw(rng, rent_dist.as_ref(), 1.0);
        let cost_factor = draw(rng, cost_dist.as_ref(), 1.0);
        let cap_rate = draw(rng, cap_dist.as_ref(), cap);

        let simulated_yoc = yoc * rent_factor / cost_factor;
        irrs.push(simulated_yoc + (simulated_yoc - cap_rate) * SPREAD_WEIGHT);
    }

    let summary = summarize(irrs, config.iterations);
    tracing::debug!(mean = summary.mean, p50 = summary.p50, "monte carlo complete");
    Ok(summary)
}

/// Run the simulation, seeded from `config.seed` when given.
pub fn simulate(
    base: &RiskBase,
    config: &MonteCarloConfig,
) -> ProformaResult<ComputationOutput<MonteCarloSummary>> {
    let start = Instant::now();
    let mut rng = match config.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let summary = simulate_with_rng(base, config, &mut rng)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo IRR (uniform bands, development-spread approximation)",
        config,
        Vec::new(),
        elapsed,
        summary,
    ))
}
