//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Pullwatch - Docker Hub pull-count tracker
///
/// Polls the Docker Hub API for the pull counts of a list of images,
/// appends one daily sample per image to a CSV history file, renders a
/// line chart per image, and writes a static index page.
///
/// Examples:
///   pullwatch --list images.yaml
///   pullwatch --list images.yaml --data-dir /var/lib/pullwatch/data
///   pullwatch --list images.yaml --dry-run
///   pullwatch --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// YAML file with the list of images to track
    ///
    /// May also declare named sums of images and per-image release
    /// markers. Not required when using --init-config.
    #[arg(short, long, value_name = "FILE", required_unless_present = "init_config")]
    pub list: Option<PathBuf>,

    /// Destination directory for CSV series files
    ///
    /// Created if absent. Defaults to ./data (or the config file value).
    #[arg(short, long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Destination directory for rendered chart pages
    ///
    /// Created if absent. Defaults to ./render (or the config file value).
    #[arg(short, long, value_name = "DIR")]
    pub render_dir: Option<PathBuf>,

    /// Output path of the index page
    #[arg(long, value_name = "FILE")]
    pub index: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .pullwatch.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the registry repositories API
    ///
    /// Useful for mirrors and tests. Can also be set via the
    /// PULLWATCH_REGISTRY_URL env var or .pullwatch.toml config.
    #[arg(long, value_name = "URL", env = "PULLWATCH_REGISTRY_URL")]
    pub registry_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of concurrent pull-count fetches
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Update history files without rendering charts or the index
    #[arg(long)]
    pub no_render: bool,

    /// Dry run: fetch and print the current counts without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .pullwatch.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        match self.list {
            Some(ref list) if !list.exists() => {
                return Err(format!("List file does not exist: {}", list.display()));
            }
            None => return Err("A list file is required (--list)".to_string()),
            _ => {}
        }

        if let Some(ref url) = self.registry_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Registry URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            list: None,
            data_dir: None,
            render_dir: None,
            index: None,
            config: None,
            registry_url: None,
            timeout: None,
            concurrency: None,
            no_render: false,
            dry_run: false,
            init_config: false,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_validation_requires_list() {
        let args = make_args();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_missing_list_file() {
        let mut args = make_args();
        args.list = Some(PathBuf::from("/does/not/exist.yaml"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_registry_url() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut args = make_args();
        args.list = Some(file.path().to_path_buf());
        args.registry_url = Some("ftp://mirror".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut args = make_args();
        args.list = Some(file.path().to_path_buf());
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_concurrency() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut args = make_args();
        args.list = Some(file.path().to_path_buf());
        args.concurrency = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
