use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Tile-Ripple
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub retry: RetryConfig,
    pub output: OutputConfig,
}

/// How the scheduler walks the tileset hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Traversal {
    /// Level-synchronized waves over all pending documents
    #[default]
    #[value(alias = "bfs")]
    BreadthFirst,

    /// Each root is expanded recursively to completion
    #[value(alias = "dfs")]
    DepthFirst,
}

impl Traversal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BreadthFirst => "breadth-first",
            Self::DepthFirst => "depth-first",
        }
    }
}

impl fmt::Display for Traversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum number of concurrent document fetches
    pub workers: usize,

    /// Traversal policy
    pub traversal: Traversal,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Connection timeout (seconds)
    pub connect_timeout_secs: u64,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            traversal: Traversal::default(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("tile-ripple/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// In-process retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Attempts per URI per run, including the first; 1 disables retry
    pub max_attempts: u32,

    /// Delay before the first retry (milliseconds)
    pub base_delay_ms: u64,

    /// Upper bound on any single delay (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root directory of the local mirror
    pub directory: PathBuf,

    /// File name of the crawl database inside `directory`
    pub database_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./output"),
            database_name: "tiles.db".to_string(),
        }
    }
}

impl OutputConfig {
    /// Full path of the crawl database
    pub fn database_path(&self) -> PathBuf {
        self.directory.join(&self.database_name)
    }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_dir: Option<PathBuf>,
    pub workers: Option<usize>,
    pub traversal: Option<Traversal>,
    pub max_attempts: Option<u32>,
}

impl Config {
    /// Applies command-line overrides in place
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(dir) = overrides.output_dir {
            self.output.directory = dir;
        }
        if let Some(workers) = overrides.workers {
            self.crawler.workers = workers;
        }
        if let Some(traversal) = overrides.traversal {
            self.crawler.traversal = traversal;
        }
        if let Some(attempts) = overrides.max_attempts {
            self.retry.max_attempts = attempts;
        }
    }
}
