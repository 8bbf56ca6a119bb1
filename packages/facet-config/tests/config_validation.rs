use std::{env, fs, path::PathBuf};

use facet_config::{Config, Error};

const SAMPLE_CONFIG_TOML: &str = r#"
[search]
default_timeout_ms = 30000

[cache]
ttl_seconds = 600

[results]
default_max_results = [1000000, 100, 10, 1]
default_store_size = [1000000, 100, 10, 1]
"#;

fn sample_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.")
}

fn temp_config_path(name: &str) -> PathBuf {
	env::temp_dir().join(format!("facet_config_{name}_{}.toml", std::process::id()))
}

#[test]
fn sample_config_validates() {
	assert!(facet_config::validate(&sample_config()).is_ok());
}

#[test]
fn load_round_trips_a_config_file() {
	let path = temp_config_path("round_trip");

	fs::write(&path, SAMPLE_CONFIG_TOML).expect("Failed to write temp config.");

	let cfg = facet_config::load(&path).expect("Failed to load config.");

	fs::remove_file(&path).ok();

	assert_eq!(cfg.search.default_timeout_ms, 30_000);
	assert_eq!(cfg.cache.ttl_seconds, 600);
	assert_eq!(cfg.results.default_max_results, vec![1_000_000, 100, 10, 1]);
}

#[test]
fn load_rejects_a_missing_file() {
	let path = temp_config_path("missing");

	assert!(matches!(facet_config::load(&path), Err(Error::ReadConfig { .. })));
}

#[test]
fn zero_timeout_fails_validation() {
	let mut cfg = sample_config();

	cfg.search.default_timeout_ms = 0;

	assert!(matches!(
		facet_config::validate(&cfg),
		Err(Error::Validation { message }) if message.contains("default_timeout_ms")
	));
}

#[test]
fn zero_cache_ttl_fails_validation() {
	let mut cfg = sample_config();

	cfg.cache.ttl_seconds = 0;

	assert!(facet_config::validate(&cfg).is_err());
}

#[test]
fn zero_size_caps_fail_validation() {
	let mut cfg = sample_config();

	cfg.results.default_store_size = vec![100, 0];

	assert!(matches!(
		facet_config::validate(&cfg),
		Err(Error::Validation { message }) if message.contains("default_store_size")
	));
}

#[test]
fn empty_cap_lists_are_allowed() {
	let mut cfg = sample_config();

	cfg.results.default_max_results = Vec::new();
	cfg.results.default_store_size = Vec::new();

	assert!(facet_config::validate(&cfg).is_ok());
}
