use std::{fs, io, path::Path, time::Duration};

use anyhow::{bail, Context};
use generator::{BackendKind, GeneratorSettings};
use serde::Deserialize;
use shared::domain::ImageRef;
use studio_core::{StudioOptions, DEFAULT_PLACEHOLDER_IMAGE, HISTORY_CAPACITY};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub backend: BackendKind,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub width: u32,
    pub height: u32,
    pub timeout_secs: u64,
    pub placeholder_image: String,
    pub stage_interval_ms: u64,
    pub history_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Pollinations,
            base_url: None,
            model: None,
            api_key: None,
            width: 768,
            height: 1024,
            timeout_secs: 120,
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.into(),
            stage_interval_ms: 1500,
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    backend: Option<BackendKind>,
    base_url: Option<String>,
    model: Option<String>,
    api_key: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    timeout_secs: Option<u64>,
    placeholder_image: Option<String>,
    stage_interval_ms: Option<u64>,
    history_capacity: Option<usize>,
}

/// Defaults, then the TOML file at `path` (a missing file is fine), then
/// environment overrides.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match fs::read_to_string(path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
            apply_file(&mut settings, file_cfg);
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()));
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.backend {
        settings.backend = v;
    }
    if file_cfg.base_url.is_some() {
        settings.base_url = file_cfg.base_url;
    }
    if file_cfg.model.is_some() {
        settings.model = file_cfg.model;
    }
    if file_cfg.api_key.is_some() {
        settings.api_key = file_cfg.api_key;
    }
    if let Some(v) = file_cfg.width {
        settings.width = v;
    }
    if let Some(v) = file_cfg.height {
        settings.height = v;
    }
    if let Some(v) = file_cfg.timeout_secs {
        settings.timeout_secs = v;
    }
    if let Some(v) = file_cfg.placeholder_image {
        settings.placeholder_image = v;
    }
    if let Some(v) = file_cfg.stage_interval_ms {
        settings.stage_interval_ms = v;
    }
    if let Some(v) = file_cfg.history_capacity {
        settings.history_capacity = v;
    }
}

/// Value of the last set variable among `names`, so `APP__*` aliases
/// override the plain names.
fn lookup_last(lookup: &impl Fn(&str) -> Option<String>, names: &[&str]) -> Option<String> {
    names.iter().rev().find_map(|name| lookup(name))
}

pub(crate) fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup_last(&lookup, &["NEONDOLL_BACKEND", "APP__BACKEND"]) {
        settings.backend = v.parse().map_err(anyhow::Error::msg)?;
    }
    if let Some(v) = lookup_last(&lookup, &["NEONDOLL_BASE_URL", "APP__BASE_URL"]) {
        settings.base_url = Some(v);
    }
    if let Some(v) = lookup_last(&lookup, &["NEONDOLL_MODEL", "APP__MODEL"]) {
        settings.model = Some(v);
    }
    if let Some(v) = lookup_last(&lookup, &["GEMINI_API_KEY", "APP__API_KEY"]) {
        settings.api_key = Some(v);
    }
    if let Some(v) = lookup_last(&lookup, &["NEONDOLL_TIMEOUT_SECS", "APP__TIMEOUT_SECS"]) {
        settings.timeout_secs = v
            .parse()
            .with_context(|| format!("invalid timeout seconds '{v}'"))?;
    }
    Ok(())
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backend == BackendKind::Gemini
            && self.api_key.as_deref().map_or(true, |key| key.trim().is_empty())
        {
            bail!("the gemini backend needs an API key (set GEMINI_API_KEY or api_key)");
        }
        if self.width == 0 || self.height == 0 {
            bail!("image dimensions must be positive, got {}x{}", self.width, self.height);
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be positive");
        }
        if self.history_capacity == 0 {
            bail!("history_capacity must be positive");
        }
        Ok(())
    }

    pub fn generator_settings(&self) -> GeneratorSettings {
        let mut generator = GeneratorSettings::for_backend(self.backend);
        if let Some(base_url) = &self.base_url {
            generator.base_url = base_url.clone();
        }
        if let Some(model) = &self.model {
            generator.model = model.clone();
        }
        generator.api_key = self.api_key.clone();
        generator.width = self.width;
        generator.height = self.height;
        generator.request_timeout = Duration::from_secs(self.timeout_secs);
        generator
    }

    pub fn studio_options(&self) -> StudioOptions {
        StudioOptions {
            placeholder: ImageRef::from_url(self.placeholder_image.clone()),
            stage_interval: Duration::from_millis(self.stage_interval_ms),
            history_capacity: self.history_capacity,
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
