// Holder Raffle Engine - Configuration
use std::{str::FromStr, time::Duration};

use solana_program::pubkey::Pubkey;

use crate::error::GameError;

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Tokens required per ticket
    pub ticket_threshold: f64,
    /// Prize pool increment per entered ticket, in lamports
    pub unit_price: u64,
    /// Upper bound on tickets in a single entry
    pub max_tickets_per_entry: u64,
    /// Reveal delay between `starting` and `active`
    pub starting_delay: Duration,
    /// Suspense delay between `selecting_winner` and the draw
    pub suspense_delay: Duration,
    /// Retention of stored snapshots
    pub snapshot_ttl: Duration,
    /// Entries accepted per source within one rate limit window
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    /// Compare-and-set attempts before a round write gives up
    pub max_write_attempts: u32,
    /// Mint of the raffle token, when decoding raw token accounts
    pub mint: Option<Pubkey>,
    /// Decimals of the raffle token
    pub token_decimals: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        // Ticket Threshold: 50,000 tokens
        // Ticket Price: 0.1 SOL = 100,000,000 lamports
        Self {
            ticket_threshold: 50_000.0,
            unit_price: 100_000_000,
            max_tickets_per_entry: 10_000,
            starting_delay: Duration::from_secs(2),
            suspense_delay: Duration::from_secs(28),
            snapshot_ttl: Duration::from_secs(60 * 60 * 24 * 30),
            rate_limit_max: 5,
            rate_limit_window: Duration::from_secs(60),
            max_write_attempts: 8,
            mint: None,
            token_decimals: 9,
        }
    }
}

impl GameConfig {
    /// Defaults overridden by `RAFFLE_*` environment variables
    pub fn from_env() -> Result<Self, GameError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, GameError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("RAFFLE_ENTRY_THRESHOLD") {
            config.ticket_threshold = parse("RAFFLE_ENTRY_THRESHOLD", &v)?;
            if !(config.ticket_threshold > 0.0) {
                return Err(GameError::InvalidConfig {
                    key: "RAFFLE_ENTRY_THRESHOLD",
                    value: v,
                });
            }
        }
        if let Some(v) = lookup("RAFFLE_UNIT_PRICE_LAMPORTS") {
            config.unit_price = parse("RAFFLE_UNIT_PRICE_LAMPORTS", &v)?;
        }
        if let Some(v) = lookup("RAFFLE_MAX_TICKETS_PER_ENTRY") {
            config.max_tickets_per_entry = parse("RAFFLE_MAX_TICKETS_PER_ENTRY", &v)?;
        }
        if let Some(v) = lookup("RAFFLE_STARTING_DELAY_MS") {
            config.starting_delay = Duration::from_millis(parse("RAFFLE_STARTING_DELAY_MS", &v)?);
        }
        if let Some(v) = lookup("RAFFLE_SUSPENSE_DELAY_MS") {
            config.suspense_delay = Duration::from_millis(parse("RAFFLE_SUSPENSE_DELAY_MS", &v)?);
        }
        if let Some(v) = lookup("RAFFLE_SNAPSHOT_TTL_SECS") {
            config.snapshot_ttl = Duration::from_secs(parse("RAFFLE_SNAPSHOT_TTL_SECS", &v)?);
        }
        if let Some(v) = lookup("RAFFLE_RATE_LIMIT_MAX") {
            config.rate_limit_max = parse("RAFFLE_RATE_LIMIT_MAX", &v)?;
        }
        if let Some(v) = lookup("RAFFLE_RATE_LIMIT_WINDOW_SECS") {
            config.rate_limit_window =
                Duration::from_secs(parse("RAFFLE_RATE_LIMIT_WINDOW_SECS", &v)?);
        }
        if let Some(v) = lookup("RAFFLE_MAX_WRITE_ATTEMPTS") {
            config.max_write_attempts = parse("RAFFLE_MAX_WRITE_ATTEMPTS", &v)?;
            if config.max_write_attempts == 0 {
                return Err(GameError::InvalidConfig {
                    key: "RAFFLE_MAX_WRITE_ATTEMPTS",
                    value: v,
                });
            }
        }
        if let Some(v) = lookup("RAFFLE_MINT_ADDRESS") {
            config.mint = Some(parse("RAFFLE_MINT_ADDRESS", &v)?);
        }
        if let Some(v) = lookup("RAFFLE_TOKEN_DECIMALS") {
            config.token_decimals = parse("RAFFLE_TOKEN_DECIMALS", &v)?;
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, GameError> {
    value.trim().parse().map_err(|_| GameError::InvalidConfig {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_overrides() {
        let config = GameConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.unit_price, 100_000_000);
        assert_eq!(config.suspense_delay, Duration::from_secs(28));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RAFFLE_ENTRY_THRESHOLD", "1000"),
            ("RAFFLE_SUSPENSE_DELAY_MS", "0"),
            ("RAFFLE_MINT_ADDRESS", "So11111111111111111111111111111111111111112"),
        ]
        .into_iter()
        .collect();
        let config =
            GameConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.ticket_threshold, 1000.0);
        assert_eq!(config.suspense_delay, Duration::ZERO);
        assert!(config.mint.is_some());
    }

    #[test]
    fn test_rejects_garbage() {
        let err = GameConfig::from_lookup(|key| {
            (key == "RAFFLE_RATE_LIMIT_MAX").then(|| "five".to_string())
        })
        .unwrap_err();
        assert_eq!(
            err,
            GameError::InvalidConfig {
                key: "RAFFLE_RATE_LIMIT_MAX",
                value: "five".to_string()
            }
        );

        let err = GameConfig::from_lookup(|key| {
            (key == "RAFFLE_ENTRY_THRESHOLD").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig { .. }));
    }
}
