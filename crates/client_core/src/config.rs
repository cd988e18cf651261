use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;

use crate::progress::ProgressSavePolicy;

pub const SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base: String,
    pub token_path: PathBuf,
    pub csrf_token: Option<String>,
    pub answer_delay: Duration,
    pub writing_delay: Duration,
    pub audio_preload_timeout: Duration,
    pub progress_policy: ProgressSavePolicy,
    /// Fixed seed for exercise selection; a fresh one is drawn per lesson when unset.
    pub exercise_seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8000/api".into(),
            token_path: PathBuf::from("./data/auth_token"),
            csrf_token: None,
            answer_delay: Duration::from_millis(1000),
            writing_delay: Duration::from_millis(1500),
            audio_preload_timeout: Duration::from_millis(3000),
            progress_policy: ProgressSavePolicy::BestEffort,
            exercise_seed: None,
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Layers `path` (a flat string map) and then `env` over the defaults.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            apply(&mut settings, |key| file_cfg.get(key).cloned());
        }
    }

    if let Some(v) = env("API_BASE") {
        settings.api_base = v;
    }
    apply(&mut settings, |key| env(&format!("APP__{}", key.to_ascii_uppercase())));

    settings
}

fn apply(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("api_base") {
        settings.api_base = v;
    }
    if let Some(v) = lookup("token_path") {
        settings.token_path = PathBuf::from(v);
    }
    if let Some(v) = lookup("csrf_token") {
        settings.csrf_token = Some(v).filter(|token| !token.is_empty());
    }
    if let Some(v) = lookup("answer_delay_ms") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.answer_delay = Duration::from_millis(parsed);
        }
    }
    if let Some(v) = lookup("writing_delay_ms") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.writing_delay = Duration::from_millis(parsed);
        }
    }
    if let Some(v) = lookup("audio_preload_timeout_ms") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.audio_preload_timeout = Duration::from_millis(parsed);
        }
    }
    if let Some(v) = lookup("progress_policy") {
        if let Ok(parsed) = v.parse::<ProgressSavePolicy>() {
            settings.progress_policy = parsed;
        }
    }
    if let Some(v) = lookup("exercise_seed") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.exercise_seed = Some(parsed);
        }
    }
}

pub(crate) fn ensure_parent_dir_exists(path: &Path) -> anyhow::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for '{}'",
            parent.display(),
            path.display()
        )
    })?;

    Ok(())
}
