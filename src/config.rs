use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::classifier::ClassifierConfig;
use crate::topics::SelectorConfig;

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy; everything here has a
/// default, and CLI flags override individual values.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub components: usize,
    pub seed: u64,
    pub max_iter: usize,
    pub tol: f64,
    pub n_init: usize,
    /// Relabel low-confidence results as uncertain (unset = never).
    pub uncertain_below: Option<f64>,
    /// Extraction workers (defaults to available cores).
    pub concurrency: usize,
    /// Flag topic-count optima that gain less than this (unset = never).
    pub min_improvement: Option<f64>,
}

/// Parse an optional env var, naming the variable when the value is malformed.
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            let value = raw
                .trim()
                .parse::<T>()
                .with_context(|| format!("{name} has an invalid value: {raw:?}"))?;
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let defaults = ClassifierConfig::default();
        Ok(Self {
            db_path: env::var("SIEVE_DB_PATH").unwrap_or_else(|_| "./sieve.db".to_string()),
            components: parse_var("SIEVE_COMPONENTS")?.unwrap_or(defaults.components),
            seed: parse_var("SIEVE_SEED")?.unwrap_or(defaults.seed),
            max_iter: parse_var("SIEVE_MAX_ITER")?.unwrap_or(defaults.max_iter),
            tol: parse_var("SIEVE_TOL")?.unwrap_or(defaults.tol),
            n_init: parse_var("SIEVE_N_INIT")?.unwrap_or(defaults.n_init),
            uncertain_below: parse_var("SIEVE_UNCERTAIN_BELOW")?,
            concurrency: parse_var("SIEVE_CONCURRENCY")?.unwrap_or_else(default_concurrency),
            min_improvement: parse_var("SIEVE_MIN_IMPROVEMENT")?,
        })
    }

    /// Classifier settings from this config, validated.
    pub fn classifier(&self) -> Result<ClassifierConfig> {
        let config = ClassifierConfig {
            components: self.components,
            seed: self.seed,
            max_iter: self.max_iter,
            tol: self.tol,
            n_init: self.n_init,
            uncertain_below: self.uncertain_below,
            ..ClassifierConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn selector(&self) -> SelectorConfig {
        SelectorConfig {
            min_improvement: self.min_improvement,
            ..SelectorConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_value_names_the_variable() {
        env::set_var("SIEVE_TEST_BAD_NUMBER", "three");
        let err = parse_var::<usize>("SIEVE_TEST_BAD_NUMBER").unwrap_err();
        assert!(err.to_string().contains("SIEVE_TEST_BAD_NUMBER"));
        env::remove_var("SIEVE_TEST_BAD_NUMBER");
    }

    #[test]
    fn test_unset_and_blank_values_are_none() {
        assert_eq!(parse_var::<f64>("SIEVE_TEST_NEVER_SET").unwrap(), None);
        env::set_var("SIEVE_TEST_BLANK", "  ");
        assert_eq!(parse_var::<f64>("SIEVE_TEST_BLANK").unwrap(), None);
        env::remove_var("SIEVE_TEST_BLANK");
    }

    #[test]
    fn test_parses_values() {
        env::set_var("SIEVE_TEST_FLOAT", "0.6");
        assert_eq!(parse_var::<f64>("SIEVE_TEST_FLOAT").unwrap(), Some(0.6));
        env::remove_var("SIEVE_TEST_FLOAT");
    }
}
