use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use chrono::Utc;

use crate::library::Project;
use crate::state::Settings;

const SETTINGS_FILE: &str = "settings.json";
const PROJECTS_FILE: &str = "projects.json";
/// Single-project file written by early versions
const LEGACY_PROJECT_FILE: &str = "project.json";
const EXPORTS_DIR: &str = "exports";

pub const DATA_DIR_ENV: &str = "LIVROGUIA_DATA_DIR";

/// Get the application data directory
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let base = dirs::data_dir()
        .ok_or_else(|| anyhow::anyhow!("Cannot find application data directory"))?;
    Ok(base.join("LivroGuia"))
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(value)?;
    std::fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn load_settings(dir: &Path) -> Settings {
    let path = dir.join(SETTINGS_FILE);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No stored settings found. Using defaults.");
            return Settings::default();
        }
        Err(e) => {
            tracing::warn!("Failed to read settings store: {}. Using defaults.", e);
            return Settings::default();
        }
    };

    match serde_json::from_str::<Settings>(&data) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to deserialize stored settings: {}. Using defaults.", e);
            Settings::default()
        }
    }
}

pub fn save_settings(dir: &Path, settings: &Settings) {
    if let Err(e) = write_json(&dir.join(SETTINGS_FILE), settings) {
        tracing::error!("Failed to save settings: {:#}", e);
    }
}

/// Load the project list, migrating a legacy single project or seeding the
/// starter project when there is nothing usable on disk
pub fn load_projects(dir: &Path) -> Vec<Project> {
    let path = dir.join(PROJECTS_FILE);
    if path.exists() {
        match read_projects(&path) {
            Ok(projects) => return projects,
            Err(e) => {
                tracing::warn!("Failed to load projects: {:#}. Starting with the default project.", e);
                return vec![Project::starter()];
            }
        }
    }

    let legacy = dir.join(LEGACY_PROJECT_FILE);
    if legacy.exists() {
        match migrate_legacy_project(&legacy) {
            Ok(project) => {
                tracing::info!("Migrated legacy project '{}'", project.title);
                return vec![project];
            }
            Err(e) => tracing::warn!("Failed to migrate legacy project: {:#}", e),
        }
    }

    tracing::info!("No stored projects found. Starting with the default project.");
    vec![Project::starter()]
}

fn read_projects(path: &Path) -> Result<Vec<Project>> {
    let data = std::fs::read_to_string(path)?;
    let projects: Vec<Project> = serde_json::from_str(&data)?;
    Ok(projects)
}

fn migrate_legacy_project(path: &Path) -> Result<Project> {
    let data = std::fs::read_to_string(path)?;
    let mut value: serde_json::Value = serde_json::from_str(&data)?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| anyhow::anyhow!("Legacy project is not a JSON object"))?;

    let now = Utc::now().timestamp_millis();
    let has_id = object.get("id").and_then(|v| v.as_str()).is_some_and(|id| !id.is_empty());
    if !has_id {
        object.insert("id".into(), format!("legacy-{}", now).into());
    }
    if object.get("lastModified").map_or(true, |v| v.is_null()) {
        object.insert("lastModified".into(), now.into());
    }

    let project = serde_json::from_value(value).context("Legacy project has an unexpected shape")?;
    Ok(project)
}

pub fn save_projects(dir: &Path, projects: &[Project]) {
    if let Err(e) = write_json(&dir.join(PROJECTS_FILE), projects) {
        tracing::error!("Failed to save projects: {:#}", e);
    }
}

/// Write an export file under the data directory and return its path
pub fn write_export(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    let exports = dir.join(EXPORTS_DIR);
    std::fs::create_dir_all(&exports)
        .with_context(|| format!("Failed to create {}", exports.display()))?;
    let path = exports.join(file_name);
    std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
