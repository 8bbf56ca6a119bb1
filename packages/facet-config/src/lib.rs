mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Cache, Config, Results, Search};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.search.default_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.default_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.ttl_seconds == 0 {
		return Err(Error::Validation {
			message: "cache.ttl_seconds must be greater than zero.".to_string(),
		});
	}

	for (label, sizes) in [
		("results.default_max_results", &cfg.results.default_max_results),
		("results.default_store_size", &cfg.results.default_store_size),
	] {
		if sizes.iter().any(|size| *size == 0) {
			return Err(Error::Validation {
				message: format!("{label} entries must be greater than zero."),
			});
		}
	}

	Ok(())
}
