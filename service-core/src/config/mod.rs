use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

/// Deployment environment. Controls whether missing configuration is an
/// error (prod) or falls back to a development default.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    pub fn is_prod(self) -> bool {
        self == Environment::Prod
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_environment")]
    pub environment: Environment,
}

fn default_port() -> u16 {
    8080
}

fn default_environment() -> Environment {
    Environment::Dev
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
