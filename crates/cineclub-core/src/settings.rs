//! Client configuration. The original deployment hardcoded its base
//! URLs; here they live in an explicit settings file with defaults.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::paths;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// REST backend base, e.g. `http://localhost:8000/api`.
    pub api_base_url: String,
    /// AI answer service base (separate host, unauthenticated).
    pub responder_base_url: String,
    /// Chat polling period in seconds.
    pub poll_interval_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".into(),
            responder_base_url: "https://movie-system-ai-service.vercel.app".into(),
            poll_interval_secs: 5,
        }
    }
}

pub fn load_settings() -> Result<ClientSettings, CoreError> {
    load_settings_from(&paths::settings_path()?)
}

pub fn load_settings_from(path: &Path) -> Result<ClientSettings, CoreError> {
    match fs::read(path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(ClientSettings::default()),
        Err(e) => Err(e.into()),
    }
}

pub fn save_settings(settings: &ClientSettings) -> Result<(), CoreError> {
    save_settings_to(&paths::settings_path()?, settings)
}

pub fn save_settings_to(path: &Path, settings: &ClientSettings) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(settings)?)?;
    Ok(())
}
