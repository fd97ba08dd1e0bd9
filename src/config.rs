use anyhow::{Result, bail};
use serde::Deserialize;
use std::env;

use crate::engine::DrawPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub allow_repeat_winners: bool,
}

impl Config {
    /// Engine policy as configured for this deployment.
    pub fn draw_policy(&self) -> DrawPolicy {
        DrawPolicy {
            allow_repeat_winners: self.allow_repeat_winners,
        }
    }
}

pub fn load() -> Result<Config> {
    let database_url =
        env::var("LUCKYDRAW_DB_PATH").unwrap_or_else(|_| "data/luckydraw.db".to_string());

    let allow_repeat_winners = match env::var("LUCKYDRAW_ALLOW_REPEAT_WINNERS") {
        Ok(value) => parse_flag(&value)
            .map_err(|e| anyhow::anyhow!("LUCKYDRAW_ALLOW_REPEAT_WINNERS: {}", e))?,
        // repeats stay allowed unless the deployment opts out
        Err(_) => true,
    };

    Ok(Config {
        database_url,
        allow_repeat_winners,
    })
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => bail!("expected a boolean flag, got `{}`", other),
    }
}
