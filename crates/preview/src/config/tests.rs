use std::time::Duration;

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn empty_input_is_default() {
	assert_eq!(PreviewConfig::parse("").unwrap(), PreviewConfig::default());
}

#[test]
fn defaults_match_reference_behaviour() {
	let config = PreviewConfig::default();
	assert_eq!(config.debounce(), Duration::from_millis(50));
	assert_eq!(config.render_timeout(), Duration::from_secs(5));
	assert_eq!(config.diagram.languages, vec!["mermaid"]);
	assert_eq!(config.diagram.decorations.len(), DEFAULT_DECORATIONS.len());
	assert_eq!(config.navigation.allowed_schemes, vec!["http", "https"]);
}

#[test]
fn partial_tables_keep_other_defaults() {
	let config = PreviewConfig::parse(
		r#"
debounce_ms = 120

[diagram]
command = ["render-diagram", "--id", "{id}"]
"#,
	)
	.unwrap();
	assert_eq!(config.debounce(), Duration::from_millis(120));
	assert_eq!(config.diagram.command, vec!["render-diagram", "--id", "{id}"]);
	assert_eq!(config.diagram.languages, vec!["mermaid"]);
	assert_eq!(config.diagram.timeout(), Duration::from_secs(10));
}

#[test]
fn unknown_keys_are_rejected() {
	assert!(PreviewConfig::parse("debounce = 10").is_err());
	assert!(PreviewConfig::parse("[diagram]\nlanguage = [\"dot\"]").is_err());
}

#[test]
fn load_reports_missing_file() {
	let err = PreviewConfig::load("/nonexistent/glint/config.toml").unwrap_err();
	assert!(matches!(err, ConfigError::Io { .. }));
}
