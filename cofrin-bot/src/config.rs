//! TOML configuration, loaded from `~/.cofrin/config.toml`. Secrets come
//! from the environment, never from the file.

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub oracle: OracleSection,
    pub rates: RatesSection,
    pub store: StoreSection,
    pub session: SessionSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSection {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesSection {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    /// PostgREST base URL. Empty means save in memory (local runs).
    pub url: String,
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSection {
    pub timezone: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            oracle: OracleSection {
                base_url: "https://api.openai.com".to_string(),
                model: "gpt-4o".to_string(),
            },
            rates: RatesSection {
                base_url: "https://economia.awesomeapi.com.br".to_string(),
            },
            store: StoreSection {
                url: String::new(),
                table: "transacoes".to_string(),
            },
            session: SessionSection {
                timezone: "America/Sao_Paulo".to_string(),
            },
        }
    }
}

impl Config {
    pub fn timezone(&self) -> Tz {
        self.session
            .timezone
            .parse()
            .unwrap_or(chrono_tz::America::Sao_Paulo)
    }
}

pub fn cofrin_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".cofrin"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(cofrin_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    Ok(toml::from_str(&s).context("parse config.toml")?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let dir = cofrin_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_roundtrips_through_toml() {
        let cfg = Config::default();
        let s = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back.oracle.model, "gpt-4o");
        assert_eq!(back.store.table, "transacoes");
    }

    #[test]
    fn test_bad_timezone_falls_back() {
        let mut cfg = Config::default();
        cfg.session.timezone = "Marte/Cratera".to_string();
        assert_eq!(cfg.timezone(), chrono_tz::America::Sao_Paulo);
    }
}
