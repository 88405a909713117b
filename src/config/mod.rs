pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::reducer::ScoreMethod;
#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_CATEGORIES: [&str; 4] = ["performance", "accessibility", "best-practices", "seo"];
pub const DEFAULT_HEADER: &str = "Name,Type";
pub const DEFAULT_RUNS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum AuditorKind {
    /// Local `lighthouse` CLI with headless Chrome
    #[default]
    Lighthouse,
    /// PageSpeed Insights v5 API
    Pagespeed,
}

/// PageSpeed Insights 模擬的裝置類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum PageSpeedStrategy {
    #[default]
    Mobile,
    Desktop,
}

impl fmt::Display for PageSpeedStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSpeedStrategy::Mobile => write!(f, "mobile"),
            PageSpeedStrategy::Desktop => write!(f, "desktop"),
        }
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "lighthouse-batch")]
#[command(about = "Run Lighthouse several times per URL and summarize the scores as CSV")]
pub struct CliConfig {
    /// Page list: `name,type,url` per line
    #[arg(short, long, default_value = "pages.csv")]
    pub input: String,

    #[arg(short, long, default_value = "lighthouse-results.csv")]
    pub output: String,

    #[arg(long, default_value = "lighthouse-errors.txt")]
    pub error_log: String,

    #[arg(
        short,
        long,
        value_delimiter = ',',
        default_value = "performance,accessibility,best-practices,seo"
    )]
    pub categories: Vec<String>,

    #[arg(short, long, default_value_t = DEFAULT_RUNS)]
    pub runs: usize,

    #[arg(short, long, value_enum, default_value_t = ScoreMethod::Median)]
    pub method: ScoreMethod,

    /// Append to the output instead of overwriting it
    #[arg(short, long)]
    pub append: bool,

    /// Add raw timing metrics (FCP, LCP, TBT, CLS, ...) as columns
    #[arg(long)]
    pub vitals: bool,

    /// Add the latest score of every individual audit as columns
    #[arg(long)]
    pub audits: bool,

    /// Headings for the metadata fields that precede the URL
    #[arg(long, default_value = DEFAULT_HEADER)]
    pub header: String,

    /// Passed to Chrome unchanged
    #[arg(long, allow_hyphen_values = true)]
    pub chrome_flags: Option<String>,

    #[arg(long, value_enum, default_value_t = AuditorKind::Lighthouse)]
    pub auditor: AuditorKind,

    #[arg(long, default_value = "lighthouse")]
    pub lighthouse_bin: String,

    /// Device profile for the PageSpeed auditor
    #[arg(long, value_enum, default_value_t = PageSpeedStrategy::Mobile)]
    pub strategy: PageSpeedStrategy,

    /// PageSpeed Insights key; falls back to $PAGESPEED_API_KEY
    #[arg(long)]
    pub api_key: Option<String>,

    /// Give up on a single audit after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, help = "Log CPU and memory usage after each run")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn output_path(&self) -> &str {
        &self.output
    }

    fn error_log_path(&self) -> &str {
        &self.error_log
    }

    fn categories(&self) -> &[String] {
        &self.categories
    }

    fn runs(&self) -> usize {
        self.runs
    }

    fn score_method(&self) -> ScoreMethod {
        self.method
    }

    fn append_output(&self) -> bool {
        self.append
    }

    fn include_vitals(&self) -> bool {
        self.vitals
    }

    fn include_audits(&self) -> bool {
        self.audits
    }

    fn metadata_header(&self) -> &str {
        &self.header
    }

    fn chrome_flags(&self) -> Option<&str> {
        self.chrome_flags.as_deref()
    }

    fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("input", &self.input)?;
        validation::validate_path("output", &self.output)?;
        validation::validate_path("error_log", &self.error_log)?;
        validation::validate_choices(
            "categories",
            &self.categories,
            &crate::domain::model::KNOWN_CATEGORIES,
        )?;
        validation::validate_positive_number("runs", self.runs, 1)?;
        validation::validate_header("header", &self.header)?;
        validation::validate_non_empty_string("lighthouse_bin", &self.lighthouse_bin)?;
        if let Some(timeout) = self.timeout_secs {
            validation::validate_positive_number("timeout_secs", timeout as usize, 1)?;
        }
        Ok(())
    }
}
