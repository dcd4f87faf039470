//! Run configuration.

use std::path::PathBuf;

use kclip_media::ToolPrograms;

use crate::error::{WorkerError, WorkerResult};
use crate::pipeline::PipelineOptions;

/// Configuration for one download run.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Catalog JSON file
    pub catalog_path: Option<PathBuf>,
    /// Root directory all artifacts are written under
    pub output_dir: PathBuf,
    /// Restrict flat runs to these labels, one subdirectory each
    pub classes: Option<Vec<String>>,
    /// Number of concurrent workers
    pub num_workers: usize,
    /// Work queue bound
    pub queue_capacity: usize,
    /// Failure queue bound
    pub failure_queue_capacity: usize,
    /// Append failed video ids here
    pub failed_log: Option<PathBuf>,
    /// Append downloader diagnostics here
    pub fetch_log: Option<PathBuf>,
    /// Preferred container
    pub format: String,
    pub compress: bool,
    pub overwrite: bool,
    pub cut: bool,
    pub hierarchical: bool,
    /// Skip classes whose directory already exists
    pub skip_existing_classes: bool,
    /// External tool executables
    pub programs: ToolPrograms,
    /// Write a Prometheus text snapshot here after the run
    pub metrics_file: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            output_dir: PathBuf::from("."),
            classes: None,
            num_workers: 8,
            queue_capacity: 100,
            failure_queue_capacity: 100,
            failed_log: None,
            fetch_log: None,
            format: "mp4".to_string(),
            compress: false,
            overwrite: false,
            cut: true,
            hierarchical: false,
            skip_existing_classes: false,
            programs: ToolPrograms::default(),
            metrics_file: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let path = |key: &str| lookup(key).filter(|s| !s.is_empty()).map(PathBuf::from);
        let number = |key: &str, default: usize| {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        };
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|s| parse_flag(&s))
                .unwrap_or(default)
        };
        let program = |key: &str, default: String| {
            lookup(key).filter(|s| !s.is_empty()).unwrap_or(default)
        };

        Self {
            catalog_path: path("KCLIP_CATALOG"),
            output_dir: path("KCLIP_OUTPUT_DIR").unwrap_or(defaults.output_dir),
            classes: lookup("KCLIP_CLASSES").and_then(|s| parse_classes(&s)),
            num_workers: number("KCLIP_NUM_WORKERS", defaults.num_workers),
            queue_capacity: number("KCLIP_QUEUE_CAPACITY", defaults.queue_capacity),
            failure_queue_capacity: number(
                "KCLIP_FAILURE_QUEUE_CAPACITY",
                defaults.failure_queue_capacity,
            ),
            failed_log: path("KCLIP_FAILED_LOG"),
            fetch_log: path("KCLIP_FETCH_LOG"),
            format: lookup("KCLIP_FORMAT")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.format),
            compress: flag("KCLIP_COMPRESS", defaults.compress),
            overwrite: flag("KCLIP_OVERWRITE", defaults.overwrite),
            cut: flag("KCLIP_CUT", defaults.cut),
            hierarchical: flag("KCLIP_HIERARCHICAL", defaults.hierarchical),
            skip_existing_classes: flag(
                "KCLIP_SKIP_EXISTING_CLASSES",
                defaults.skip_existing_classes,
            ),
            programs: ToolPrograms {
                downloader: program("KCLIP_DOWNLOADER", defaults.programs.downloader),
                ffmpeg: program("KCLIP_FFMPEG", defaults.programs.ffmpeg),
                compressor: program("KCLIP_COMPRESSOR", defaults.programs.compressor),
            },
            metrics_file: path("KCLIP_METRICS_FILE"),
        }
    }

    /// Reject settings the pool cannot run with.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.num_workers == 0 {
            return Err(WorkerError::config_error("num_workers must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(WorkerError::config_error("queue_capacity must be at least 1"));
        }
        if self.failure_queue_capacity == 0 {
            return Err(WorkerError::config_error(
                "failure_queue_capacity must be at least 1",
            ));
        }
        if self.format.is_empty() || self.format.contains(&['/', '.'][..]) {
            return Err(WorkerError::config_error(format!(
                "invalid container format {:?}",
                self.format
            )));
        }
        Ok(())
    }

    /// The per-pass flags handed to every worker.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            format: self.format.clone(),
            compress: self.compress,
            overwrite: self.overwrite,
            cut: self.cut,
            fetch_log: self.fetch_log.clone(),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_classes(value: &str) -> Option<Vec<String>> {
    let classes: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!classes.is_empty()).then_some(classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = WorkerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.num_workers, 8);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.format, "mp4");
        assert!(config.cut);
        assert!(!config.compress);
        assert!(config.classes.is_none());
        assert_eq!(config.programs, ToolPrograms::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = WorkerConfig::from_lookup(lookup(&[
            ("KCLIP_NUM_WORKERS", "3"),
            ("KCLIP_CLASSES", "jump rope, run ,,"),
            ("KCLIP_CUT", "false"),
            ("KCLIP_COMPRESS", "1"),
            ("KCLIP_FAILED_LOG", "/tmp/failed.txt"),
            ("KCLIP_FFMPEG", "/opt/ffmpeg"),
        ]));
        assert_eq!(config.num_workers, 3);
        assert_eq!(
            config.classes,
            Some(vec!["jump rope".to_string(), "run".to_string()])
        );
        assert!(!config.cut);
        assert!(config.compress);
        assert_eq!(config.failed_log, Some(PathBuf::from("/tmp/failed.txt")));
        assert_eq!(config.programs.ffmpeg, "/opt/ffmpeg");
        assert_eq!(config.programs.downloader, "yt-dlp");
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = WorkerConfig::from_lookup(lookup(&[
            ("KCLIP_NUM_WORKERS", "many"),
            ("KCLIP_OVERWRITE", "maybe"),
        ]));
        assert_eq!(config.num_workers, 8);
        assert!(!config.overwrite);
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let config = WorkerConfig {
            num_workers: 0,
            ..WorkerConfig::default()
        };
        assert!(matches!(config.validate(), Err(WorkerError::ConfigError(_))));

        let config = WorkerConfig {
            failure_queue_capacity: 0,
            ..WorkerConfig::default()
        };
        assert!(config.validate().is_err());

        let config = WorkerConfig {
            format: ".mp4".to_string(),
            ..WorkerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
