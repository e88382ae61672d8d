//! Loading of configuration split across several files.
//!
//! The entry file may name other files in an `include` key. Included files
//! are merged into the entry file section by section; a top-level section may
//! appear in only one file.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Loads a configuration file together with the files it includes.
pub struct ConfigLoader {
	/// Directory relative includes are resolved against.
	base_path: PathBuf,
	/// Canonical paths already read, to reject include cycles.
	visited: HashSet<PathBuf>,
	/// File each top-level section came from, for error messages.
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			visited: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads, merges and validates the configuration rooted at `entry`.
	pub async fn load(&mut self, entry: impl AsRef<Path>) -> Result<Config, ConfigError> {
		let entry = self.resolve_path(entry)?;
		let content = self.read(&entry).await?;
		let mut root: toml::Value = toml::from_str(&content)?;

		let includes = match root.as_table_mut().and_then(|t| t.remove("include")) {
			Some(value) => Self::include_list(value)?,
			None => return content.parse(),
		};

		self.record_sections(&root, &entry)?;
		for include in includes {
			let path = self.resolve_path(&include)?;
			let included: toml::Value = toml::from_str(&self.read(&path).await?)?;
			self.record_sections(&included, &path)?;

			if let (Some(root_table), toml::Value::Table(included_table)) =
				(root.as_table_mut(), included)
			{
				for (key, value) in included_table {
					root_table.insert(key, value);
				}
			}
		}

		toml::to_string(&root)
			.map_err(|e| ConfigError::Parse(format!("Failed to serialize combined config: {}", e)))?
			.parse()
	}

	/// Reads a file once and resolves environment variables in it.
	async fn read(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;
		if !self.visited.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}
		let content = tokio::fs::read_to_string(&canonical).await?;
		resolve_env_vars(&content)
	}

	fn include_list(value: toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
		match value {
			toml::Value::String(path) => Ok(vec![PathBuf::from(path)]),
			toml::Value::Array(items) => items
				.into_iter()
				.map(|item| match item {
					toml::Value::String(path) => Ok(PathBuf::from(path)),
					_ => Err(ConfigError::Validation(
						"Include array must contain only strings".into(),
					)),
				})
				.collect(),
			_ => Err(ConfigError::Validation(
				"Include must be a string or array of strings".into(),
			)),
		}
	}

	fn record_sections(&mut self, value: &toml::Value, source: &Path) -> Result<(), ConfigError> {
		let Some(table) = value.as_table() else {
			return Ok(());
		};
		for key in table.keys() {
			if let Some(existing) = self.section_sources.get(key) {
				return Err(ConfigError::Validation(format!(
					"Duplicate section '{}' found in {} and {}",
					key,
					existing.display(),
					source.display()
				)));
			}
			self.section_sources.insert(key.clone(), source.to_path_buf());
		}
		Ok(())
	}

	fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};
		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}
		Ok(resolved)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	const SESSION: &str = r#"
[session]
group_id = "group0"
chain_id = "chain0"
"#;

	const SIGNER: &str = r#"
[signer]
primary = "local"
[signer.implementations.local]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcaf784d7bf4f2ff80"
"#;

	const TRANSPORT: &str = r#"
[transport]
primary = "jsonrpc"
[transport.implementations.jsonrpc]
url = "http://127.0.0.1:20200"
"#;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		let path = temp_dir.path().join("config.toml");
		fs::write(&path, format!("{}{}{}", SESSION, SIGNER, TRANSPORT)).unwrap();

		let config = Config::from_file(path.to_str().unwrap()).await.unwrap();
		assert_eq!(config.session.group_id, "group0");
		assert_eq!(config.signer.primary.as_deref(), Some("local"));
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();
		let main = format!("include = [\"signer.toml\", \"transport.toml\"]\n{}", SESSION);
		fs::write(temp_dir.path().join("main.toml"), main).unwrap();
		fs::write(temp_dir.path().join("signer.toml"), SIGNER).unwrap();
		fs::write(temp_dir.path().join("transport.toml"), TRANSPORT).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load("main.toml").await.unwrap();
		assert_eq!(config.transport.primary, "jsonrpc");
		assert!(config.signer.implementations.contains_key("local"));
	}

	#[tokio::test]
	async fn test_single_include_string() {
		let temp_dir = TempDir::new().unwrap();
		let main = format!("include = \"rest.toml\"\n{}", SESSION);
		fs::write(temp_dir.path().join("main.toml"), main).unwrap();
		fs::write(
			temp_dir.path().join("rest.toml"),
			format!("{}{}", SIGNER, TRANSPORT),
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		assert!(loader.load("main.toml").await.is_ok());
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let temp_dir = TempDir::new().unwrap();
		let main = format!("include = [\"dup.toml\"]\n{}", SESSION);
		fs::write(temp_dir.path().join("main.toml"), main).unwrap();
		fs::write(temp_dir.path().join("dup.toml"), SESSION).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load("main.toml").await.unwrap_err();
		assert!(err.to_string().contains("Duplicate section 'session'"));
	}

	#[tokio::test]
	async fn test_self_include_detection() {
		let temp_dir = TempDir::new().unwrap();
		let config = format!("include = [\"self.toml\"]\n{}", SESSION);
		fs::write(temp_dir.path().join("self.toml"), config).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load("self.toml").await.unwrap_err();
		assert!(err.to_string().contains("already loaded"));
	}

	#[tokio::test]
	async fn test_missing_include() {
		let temp_dir = TempDir::new().unwrap();
		let main = format!("include = [\"absent.toml\"]\n{}", SESSION);
		fs::write(temp_dir.path().join("main.toml"), main).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		assert!(matches!(
			loader.load("main.toml").await,
			Err(ConfigError::Io(_))
		));
	}
}
