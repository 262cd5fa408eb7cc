use directories::ProjectDirs;
use std::path::PathBuf;

use crate::error::CoreError;

pub const APP_QUALIFIER: &str = "com";
pub const APP_ORG: &str = "cineclub";
pub const APP_NAME: &str = "cineclub";

pub fn data_dir() -> Result<PathBuf, CoreError> {
    if let Ok(override_dir) = std::env::var("CINECLUB_DATA_DIR") {
        return Ok(PathBuf::from(override_dir));
    }
    let dirs =
        ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME).ok_or(CoreError::NoDataDir)?;
    Ok(dirs.data_dir().to_path_buf())
}

pub fn session_path() -> Result<PathBuf, CoreError> {
    Ok(data_dir()?.join("session.json"))
}

pub fn settings_path() -> Result<PathBuf, CoreError> {
    Ok(data_dir()?.join("settings.json"))
}
