use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{debug, info, trace, warn};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Config {
    #[tracing::instrument(skip(slaterc_override))]
    pub fn load(slaterc_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config {
            map: HashMap::new(),
            loaded_files: vec![],
        };

        cfg.map
            .insert("api.url".to_string(), DEFAULT_API_URL.to_string());
        cfg.map
            .insert("data.location".to_string(), "~/.slate".to_string());
        cfg.map.insert("color".to_string(), "on".to_string());

        let slaterc = resolve_slaterc_path(slaterc_override)?;
        if let Some(path) = slaterc {
            info!(slaterc = %path.display(), "loading slaterc");
            cfg.load_file(&path)?;
        } else {
            debug!("no slaterc found; using defaults");
        }

        if let Ok(url) = std::env::var("SLATE_API_URL")
            && !url.trim().is_empty()
        {
            debug!(url = %url, "applying SLATE_API_URL override");
            cfg.map.insert("api.url".to_string(), url);
        }

        Ok(cfg)
    }

    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            let key = k.strip_prefix("rc.").unwrap_or(&k).to_string();
            debug!(key = %key, value = %v, "applying override");
            self.map.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.map.get(key).map(|v| parse_bool(v))
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        self.loaded_files.push(path.clone());

        for (line_num, raw_line) in text.lines().enumerate() {
            let mut line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((before, _)) = line.split_once('#') {
                line = before.trim();
            }

            if line.is_empty() {
                continue;
            }

            let (k, v) = line.split_once('=').ok_or_else(|| {
                anyhow!(
                    "invalid config line {}:{}: {}",
                    path.display(),
                    line_num + 1,
                    raw_line
                )
            })?;

            let key = k.trim().to_string();
            let value = v.trim().to_string();
            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }

        Ok(())
    }
}

#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(cfg_value) = cfg.get("data.location") {
        expand_tilde(Path::new(&cfg_value))
    } else {
        default_data_dir()?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

/// Base URL precedence: CLI flag, then `SLATE_API_URL` / slaterc (already
/// folded into the config), then the built-in local development default.
pub fn resolve_api_url(cfg: &Config, override_url: Option<&str>) -> String {
    let url = override_url
        .map(|u| u.to_string())
        .or_else(|| cfg.get("api.url"))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    url.trim_end_matches('/').to_string()
}

#[tracing::instrument(skip(override_path))]
fn resolve_slaterc_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(slaterc_env) = std::env::var("SLATERC") {
        if slaterc_env == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(slaterc_env)));
    }

    let Some(home) = dirs::home_dir() else {
        warn!("cannot determine home directory; skipping slaterc");
        return Ok(None);
    };
    let candidate = home.join(".slaterc");
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".slate"))
}

fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_present_without_a_file() {
        let cfg = Config::load(Some(Path::new("/dev/null"))).expect("load");
        assert_eq!(cfg.get("api.url").expect("api.url"), DEFAULT_API_URL);
        assert_eq!(cfg.get_bool("color"), Some(true));
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "# slate config").expect("write");
        writeln!(file, "api.url = https://tasks.example.com/api").expect("write");
        writeln!(file, "color = off  # no ansi").expect("write");

        let cfg = Config::load(Some(file.path())).expect("load");
        assert_eq!(
            cfg.get("api.url").expect("api.url"),
            "https://tasks.example.com/api"
        );
        assert_eq!(cfg.get_bool("color"), Some(false));
    }

    #[test]
    fn cli_overrides_win_and_strip_rc_prefix() {
        let mut cfg = Config::load(Some(Path::new("/dev/null"))).expect("load");
        cfg.apply_overrides(vec![("rc.color".to_string(), "off".to_string())]);
        assert_eq!(cfg.get_bool("color"), Some(false));
    }

    #[test]
    fn api_url_flag_wins_and_trailing_slash_is_trimmed() {
        let cfg = Config::load(Some(Path::new("/dev/null"))).expect("load");
        assert_eq!(
            resolve_api_url(&cfg, Some("https://api.example.com/")),
            "https://api.example.com"
        );
        assert_eq!(resolve_api_url(&cfg, None), DEFAULT_API_URL);
    }
}
