//! Configuration loading from files.
//!
//! This module handles reading and validating `lectern.yaml`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use ::config::{File, FileFormat};

use super::{Config, ConfigError};

impl Config {
    /// Load the config from the command line argument, defaulting to `lectern.yaml`.
    ///
    /// Returns the config and its absolute path.
    pub fn load_from_arg(config_file: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let config_file = config_file.unwrap_or(Path::new("lectern.yaml"));
        let config_file = if config_file.is_relative() {
            std::env::current_dir()
                .map_err(ConfigError::CwdFailure)?
                .join(config_file)
        } else {
            config_file.to_path_buf()
        };

        let config = Self::load_from_file(&config_file)?;
        Ok((config, config_file))
    }

    /// Load the config from a file path.
    ///
    /// A missing file is not an error: every setting has a default.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
        }

        let config: Config = ::config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(false))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for collection in &self.collections {
            if collection.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "invalid config: every collection needs a non-empty 'name'".to_string(),
                ));
            }
            if !seen.insert(collection.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "invalid config: collection '{}' is declared more than once",
                    collection.name
                )));
            }
        }

        if let Some(command) = &self.search.command
            && command.is_empty()
        {
            return Err(ConfigError::Validation(
                "invalid config: 'search.command' must name a program".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectionConfig;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_file(&dir.path().join("lectern.yaml")).unwrap();

        assert_eq!(config.site.input, PathBuf::from("src"));
        assert_eq!(config.site.output, PathBuf::from("_site"));
        assert_eq!(
            config.collections,
            vec![CollectionConfig::new("posts", "posts/**/posts/*.md")]
        );
        assert_eq!(config.passthrough.len(), 5);
        assert!(config.search.enabled);
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lectern.yaml");
        std::fs::write(
            &path,
            r#"
site:
  name: Field Notes
  output: public
collections:
  - name: notes
    glob: "notes/**/*.md"
passthrough:
  - img
markdown:
  anchor_symbol: "¶"
search:
  command: ["npx", "pagefind"]
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.site.name, "Field Notes");
        assert_eq!(config.site.output, PathBuf::from("public"));
        // Unset fields keep their defaults
        assert_eq!(config.site.input, PathBuf::from("src"));
        assert_eq!(config.collections[0].glob, "notes/**/*.md");
        assert_eq!(config.passthrough, vec![PathBuf::from("img")]);
        assert_eq!(config.markdown.anchor_symbol, "¶");
        assert_eq!(config.markdown.anchor_class, "header-anchor");
        assert_eq!(
            config.search.command,
            Some(vec!["npx".to_string(), "pagefind".to_string()])
        );
    }

    #[test]
    fn test_duplicate_collection_rejected() {
        let mut config = Config::default();
        config.collections = vec![
            CollectionConfig::new("posts", "posts/*.md"),
            CollectionConfig::new("posts", "blog/*.md"),
        ];
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_empty_search_command_rejected() {
        let mut config = Config::default();
        config.search.command = Some(vec![]);
        assert!(config.validate().is_err());
    }
}
