use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::model::ScreenSet;
use crate::sys::backend::{FocusedApplication, Window};

pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".config").join("tessel").join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub host: HostSettings,
    /// Named screen-sets a caller can pick from.
    #[serde(default)]
    pub layouts: BTreeMap<String, ScreenSet>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_focus_poll_interval_ms")]
    pub focus_poll_interval_ms: u64,
    #[serde(default = "default_bounds_debounce_ms")]
    pub bounds_debounce_ms: u64,
    /// Name of an entry in `layouts` to apply at startup.
    #[serde(default)]
    pub default_layout: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            focus_poll_interval_ms: default_focus_poll_interval_ms(),
            bounds_debounce_ms: default_bounds_debounce_ms(),
            default_layout: None,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }

    pub fn focus_poll_interval(&self) -> Duration { Duration::from_millis(self.focus_poll_interval_ms) }

    pub fn bounds_debounce(&self) -> Duration { Duration::from_millis(self.bounds_debounce_ms) }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.poll_interval_ms == 0 {
            issues.push("poll_interval_ms must be positive".to_string());
        }
        if self.focus_poll_interval_ms == 0 {
            issues.push("focus_poll_interval_ms must be positive".to_string());
        }
        if self.bounds_debounce_ms >= self.poll_interval_ms && self.poll_interval_ms > 0 {
            issues.push(format!(
                "bounds_debounce_ms ({}) should be shorter than poll_interval_ms ({})",
                self.bounds_debounce_ms, self.poll_interval_ms
            ));
        }

        issues
    }
}

/// Identifies the launcher the engine runs inside, so its own windows are
/// never placed and focusing it never counts as an application switch.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct HostSettings {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bundle_id: Option<String>,
    /// Titles of host-owned windows (e.g. the palette overlay).
    #[serde(default)]
    pub window_titles: Vec<String>,
}

impl HostSettings {
    pub fn owns_window(&self, window: &Window) -> bool {
        self.window_titles.iter().any(|title| *title == window.title)
            || self.name.as_deref() == Some(window.application.as_str())
    }

    pub fn is_host(&self, app: &FocusedApplication) -> bool {
        if self.name.as_deref() == Some(app.name.as_str()) {
            return true;
        }
        match (&self.bundle_id, &app.bundle_id) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => false,
        }
    }
}

fn default_poll_interval_ms() -> u64 { 1000 }

fn default_focus_poll_interval_ms() -> u64 { 250 }

fn default_bounds_debounce_ms() -> u64 { 50 }

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&buf)
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(buf)?;
        Ok(config)
    }

    /// Looks up the layout named by `settings.default_layout`.
    pub fn default_layout(&self) -> Option<&ScreenSet> {
        self.settings.default_layout.as_ref().and_then(|name| self.layouts.get(name))
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.settings.validate());

        if let Some(name) = &self.settings.default_layout
            && !self.layouts.contains_key(name)
        {
            issues.push(format!("default_layout `{name}` is not defined in [layouts]"));
        }

        for (name, set) in &self.layouts {
            if set.is_empty() {
                issues.push(format!("layout `{name}` has no screens"));
            }
            for (key, layout) in set.iter() {
                for issue in layout.percentage_issues() {
                    issues.push(format!("layouts.{name}[{key}]: {issue}"));
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::model::{Layout, ScreenKey};

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.settings.poll_interval(), Duration::from_secs(1));
        assert!(config.validate().is_empty());
    }

    #[test]
    fn shipped_default_config_parses_and_validates() {
        let config = Config::parse(include_str!("../../tessel.default.toml")).unwrap();
        assert!(config.validate().is_empty(), "{:?}", config.validate());
        let work = config.default_layout().expect("default layout");
        assert!(work.get(&ScreenKey::Primary).is_some());
    }

    #[test]
    fn parses_layout_tables() {
        let config = Config::parse(
            r#"
            [settings]
            default_layout = "focus"

            [layouts.focus.'$PRIMARY']
            type = "columns"
            columns = [
                { type = "stack", percentage = 50 },
                { type = "pinned", application = "TestApp", percentage = 50 },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.default_layout().and_then(|set| set.get(&ScreenKey::Primary)),
            Some(&Layout::columns(vec![Layout::stack(50.0), Layout::pinned("TestApp", 50.0)]))
        );
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(Config::parse("[settings]\nanimate = true\n").is_err());
    }

    #[test]
    fn validate_reports_problems() {
        let mut config = Config::default();
        config.settings.poll_interval_ms = 0;
        config.settings.default_layout = Some("missing".to_string());
        config.layouts.insert(
            "bad".to_string(),
            ScreenSet::single(ScreenKey::Primary, Layout::columns(vec![Layout::stack(150.0)])),
        );
        config.layouts.insert("blank".to_string(), ScreenSet::new());

        let issues = config.validate();
        assert_eq!(issues.len(), 4, "{issues:?}");
    }

    #[test]
    fn host_matching() {
        let host = HostSettings {
            name: Some("Modal Commander".to_string()),
            bundle_id: Some("com.example.launcher".to_string()),
            window_titles: vec![],
        };
        let focused = |name: &str, bundle: Option<&str>| FocusedApplication {
            name: name.to_string(),
            pid: 1,
            bundle_id: bundle.map(str::to_string),
            window: None,
        };
        assert!(host.is_host(&focused("Modal Commander", None)));
        assert!(host.is_host(&focused("Electron", Some("com.example.launcher"))));
        assert!(!host.is_host(&focused("Mail", Some("com.apple.mail"))));
        assert!(!HostSettings::default().is_host(&focused("Mail", None)));
    }

    #[test]
    fn read_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[settings]\npoll_interval_ms = 500").unwrap();
        let config = Config::read(file.path()).unwrap();
        assert_eq!(config.settings.poll_interval_ms, 500);

        assert!(Config::read(Path::new("/nonexistent/tessel.toml")).is_err());
    }
}
