use std::env;
use std::fs as stdfs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reelbrowser_cli::Config;
use tokio::fs;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, Layer, Registry};

type FileLayer = Option<Box<dyn Layer<Registry> + Send + Sync>>;

pub fn load_local_env_overrides() {
    let path = Path::new("config/local.env");
    if !path.exists() {
        return;
    }

    match stdfs::read_to_string(path) {
        Ok(contents) => {
            for (key, value) in parse_env_lines(&contents) {
                if env::var(&key).is_ok() {
                    continue;
                }
                env::set_var(key, value);
            }
            info!(path = %path.display(), "Loaded environment overrides from local.env");
        }
        Err(err) => {
            warn!(path = %path.display(), ?err, "failed to read local.env overrides");
        }
    }
}

/// `KEY=VALUE` pairs; blank lines, comments and malformed lines are skipped
pub fn parse_env_lines(contents: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!(line = idx + 1, "invalid local.env entry; skipping");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        pairs.push((key.to_string(), unescape_value(value.trim())));
    }
    pairs
}

/// Lets a command tee the global log into a file once it knows where
pub struct LogHandle {
    file_layer: reload::Handle<FileLayer, Registry>,
}

impl LogHandle {
    /// Mirror every log event into `path` as JSON lines; keep the guard alive until exit
    pub fn tee_to(&self, path: &Path) -> Result<WorkerGuard> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let file_name = path
            .file_name()
            .context("log path has no file name")?;
        stdfs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer: Box<dyn Layer<Registry> + Send + Sync> = Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer),
        );
        self.file_layer
            .reload(Some(layer))
            .context("Failed to attach log file")?;
        info!(path = %path.display(), "Logging to file");
        Ok(guard)
    }
}

pub fn init_logging(level: &str, debug: bool) -> Result<LogHandle> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    let no_file: FileLayer = None;
    let (file_layer, handle) = reload::Layer::new(no_file);
    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(LogHandle {
        file_layer: handle,
    })
}

pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
}

pub async fn load_config(config_path: Option<&PathBuf>) -> Result<LoadedConfig> {
    let explicit = config_path.is_some();
    let config_path = match config_path {
        Some(path) => path.clone(),
        None => {
            // Priority: ./config/config.yaml > ~/.config/reelbrowser/config.yaml
            let local_config = PathBuf::from("config/config.yaml");
            if local_config.exists() {
                local_config
            } else {
                let mut path = dirs::config_dir().context("Failed to get config directory")?;
                path.push("reelbrowser");
                path.push("config.yaml");
                path
            }
        }
    };

    if config_path.exists() {
        let content = fs::read_to_string(&config_path)
            .await
            .context("Failed to read config file")?;

        let config: Config = if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&content).context("Failed to parse config file")?
        };

        info!("Loaded configuration from: {}", config_path.display());
        Ok(LoadedConfig {
            config,
            path: config_path,
        })
    } else if explicit {
        anyhow::bail!("Config file not found: {}", config_path.display())
    } else {
        warn!(
            "Config file not found, using defaults: {}",
            config_path.display()
        );
        Ok(LoadedConfig {
            config: Config::default(),
            path: config_path,
        })
    }
}

fn unescape_value(value: &str) -> String {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        let inner = &value[1..value.len() - 1];
        inner
            .replace("\\\"", "\"")
            .replace("\\n", "\n")
            .replace("\\r", "\r")
            .replace("\\t", "\t")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_lines_skip_comments_and_unquote() {
        let pairs = parse_env_lines(concat!(
            "# chromium\n",
            "REELBROWSER_CHROME=/usr/bin/chromium\n",
            "\n",
            "broken line\n",
            "REELBROWSER_API_TOKEN = \"a\\\"b\"\n",
            "=orphan\n",
        ));
        assert_eq!(
            pairs,
            vec![
                ("REELBROWSER_CHROME".to_string(), "/usr/bin/chromium".to_string()),
                ("REELBROWSER_API_TOKEN".to_string(), "a\"b".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn explicit_missing_config_is_an_error() {
        let missing = PathBuf::from("/no/such/reelbrowser.yaml");
        assert!(load_config(Some(&missing)).await.is_err());
    }

    #[tokio::test]
    async fn explicit_config_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "output_dir: /tmp/reel-out\nsequencer:\n  mute_microphones: false\n")
            .unwrap();

        let loaded = load_config(Some(&path)).await.unwrap();
        assert_eq!(loaded.path, path);
        assert_eq!(loaded.config.output_dir, PathBuf::from("/tmp/reel-out"));
        assert!(!loaded.config.sequencer.mute_microphones);
    }
}
