use std::fs;
use std::path::Path;

use super::validator::validate;
use crate::config::Config;
use crate::error::{Result, SluiceError};

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<Config> {
    let txt = fs::read_to_string(p)
        .map_err(|e| SluiceError::Config(format!("Failed to read config file: {e}")))?;
    load_from_str(&txt)
}

pub fn load_from_str(txt: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(txt)
        .map_err(|e| SluiceError::Config(format!("Failed to parse config: {e}")))?;

    validate(&cfg)?;

    Ok(cfg)
}
