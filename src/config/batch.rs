use crate::io::DEFAULT_PROFILE_SUFFIX;
use crate::pipeline::AnalyzerParams;
use crate::report::GroupBy;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where to write the JSON batch report.
    pub json_out: Option<PathBuf>,
    /// Also print every per-profile result.
    pub verbose: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BatchToolConfig {
    pub input_dir: PathBuf,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    #[serde(default)]
    pub params: AnalyzerParams,
    #[serde(default)]
    pub group_by: GroupBy,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_suffix() -> String {
    DEFAULT_PROFILE_SUFFIX.to_string()
}

pub fn load_config(path: &Path) -> Result<BatchToolConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    parse_config(&contents).map_err(|e| format!("Failed to parse config {}: {e}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<BatchToolConfig, serde_json::Error> {
    serde_json::from_str(contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::OuterPeakPolicy;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse_config(r#"{"input_dir": "data"}"#).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("data"));
        assert_eq!(config.suffix, "Profile.txt");
        assert_eq!(config.group_by, GroupBy::FirstDigit);
        assert_eq!(config.params, AnalyzerParams::default());
        assert!(config.output.json_out.is_none());
    }

    #[test]
    fn nested_params_override_defaults() {
        let config = parse_config(
            r#"{
                "input_dir": "data",
                "suffix": ".txt",
                "group_by": "none",
                "params": {
                    "normalize": {"smoothing_window": 8},
                    "metrics": {"positioning_scale": 3000.0, "outer_peaks": "highest"},
                    "trapezoid": {}
                },
                "output": {"json_out": "out/report.json"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.group_by, GroupBy::None);
        assert_eq!(config.params.normalize.smoothing_window, 8);
        assert_eq!(config.params.metrics.positioning_scale, Some(3000.0));
        assert_eq!(config.params.metrics.outer_peaks, OuterPeakPolicy::Highest);
        assert_eq!(config.params.trapezoid.unwrap().plateau_len, 9);
        assert_eq!(
            config.output.json_out,
            Some(PathBuf::from("out/report.json"))
        );
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/shield_align.json")).unwrap_err();
        assert!(err.contains("Failed to read config"), "{err}");
    }
}
