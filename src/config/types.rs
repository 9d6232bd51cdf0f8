// Configuration type definitions

use std::time::Duration;

use serde::Deserialize;

fn default_command() -> String {
    "yt-dlp".to_string()
}

fn default_args() -> Vec<String> {
    vec![
        "--dump-single-json".to_string(),
        "--no-warnings".to_string(),
        "--skip-download".to_string(),
    ]
}

/// Default backend timeout in seconds
fn default_timeout_secs() -> u64 {
    120
}

fn default_thread_name() -> String {
    "courier-worker".to_string()
}

/// Metadata backend configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Executable invoked for every query
    #[serde(default = "default_command")]
    pub command: String,
    /// Arguments placed before the URL
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Kill the backend after this many seconds (0 = never)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            command: default_command(),
            args: default_args(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Worker thread configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            thread_name: default_thread_name(),
        }
    }
}

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output configuration section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Feature: config-system, Property 1: Valid format parsing
    // Any supported output format name parses into the matching variant.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_valid_format_parsing(format in prop::sample::select(vec!["text", "json"])) {
            let toml_content = format!(r#"
[output]
format = "{}"
"#, format);

            let config: Result<Config, _> = toml::from_str(&toml_content);
            prop_assert!(config.is_ok(), "Failed to parse valid format: {}", format);

            let expected = match format {
                "text" => OutputFormat::Text,
                "json" => OutputFormat::Json,
                _ => unreachable!(),
            };
            prop_assert_eq!(config.unwrap().output.format, expected);
        }
    }

    // Feature: config-system, Property 2: Backend settings round through TOML
    // For any command, argument list and timeout, parsing keeps them verbatim.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_backend_section_parsing(
            command in "[a-z][a-z0-9-]{0,15}",
            args in prop::collection::vec("--[a-z]{1,12}", 0..5),
            timeout_secs in 0u64..10_000,
        ) {
            let args_toml = args
                .iter()
                .map(|a| format!("\"{}\"", a))
                .collect::<Vec<_>>()
                .join(", ");
            let toml_content = format!(r#"
[backend]
command = "{}"
args = [{}]
timeout_secs = {}
"#, command, args_toml, timeout_secs);

            let config: Config = toml::from_str(&toml_content).unwrap();

            prop_assert_eq!(&config.backend.command, &command);
            prop_assert_eq!(&config.backend.args, &args);
            prop_assert_eq!(config.backend.timeout_secs, timeout_secs);
            prop_assert_eq!(config.backend.timeout().is_none(), timeout_secs == 0);
        }
    }

    // Feature: config-system, Property 3: Missing fields use defaults
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn prop_missing_fields_use_defaults(
            include_backend_section in prop::bool::ANY,
            include_worker_section in prop::bool::ANY,
        ) {
            let mut toml_content = String::new();
            if include_backend_section {
                toml_content.push_str("[backend]\n");
            }
            if include_worker_section {
                toml_content.push_str("[worker]\n");
            }

            let config: Config = toml::from_str(&toml_content).unwrap();

            prop_assert_eq!(config.backend.command, "yt-dlp");
            prop_assert_eq!(config.backend.args, default_args());
            prop_assert_eq!(config.backend.timeout_secs, 120);
            prop_assert_eq!(config.worker.thread_name, "courier-worker");
            prop_assert_eq!(config.output.format, OutputFormat::Text);
        }
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let toml = r#"
[output]
format = "yaml"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_disables_limit() {
        let config = BackendConfig {
            timeout_secs: 0,
            ..BackendConfig::default()
        };
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(
            BackendConfig::default().timeout(),
            Some(Duration::from_secs(120))
        );
    }
}
