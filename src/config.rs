//! Configuration loading for resource definitions.
//!
//! Resource definitions are configuration, not logic: a YAML file declares
//! each endpoint's URL, primary key, and native capabilities, and the bridge
//! consumes the loaded [`ResourceSpec`] values unchanged for the process
//! lifetime.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::resource::ResourceSpec;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BridgeConfig {
  #[serde(default)]
  pub resources: Vec<ResourceSpec>,
}

impl BridgeConfig {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./restbridge.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/restbridge/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(Error::Configuration(format!(
          "config file not found: {}",
          p.display()
        )));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(Error::Configuration(
        "no configuration file found; create one at ~/.config/restbridge/config.yaml".to_string(),
      )),
    }
  }

  /// Parse and validate configuration from a YAML string.
  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: BridgeConfig = serde_yaml::from_str(contents)
      .map_err(|e| Error::Configuration(format!("failed to parse config: {e}")))?;
    config.validate()?;
    Ok(config)
  }

  /// Look up a resource definition by name.
  pub fn resource(&self, name: &str) -> Option<&ResourceSpec> {
    self.resources.iter().find(|r| r.name == name)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("restbridge.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("restbridge").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
      Error::Configuration(format!("failed to read config file {}: {e}", path.display()))
    })?;

    serde_yaml::from_str::<BridgeConfig>(&contents)
      .map_err(|e| {
        Error::Configuration(format!("failed to parse config file {}: {e}", path.display()))
      })
      .and_then(|config| {
        config.validate()?;
        Ok(config)
      })
  }

  fn validate(&self) -> Result<()> {
    for resource in &self.resources {
      resource.validate()?;
    }

    for (i, resource) in self.resources.iter().enumerate() {
      if self.resources[..i].iter().any(|r| r.name == resource.name) {
        return Err(Error::Configuration(format!(
          "duplicate resource name `{}`",
          resource.name
        )));
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::resource::{Resource, Verb};

  const SAMPLE: &str = r#"
resources:
  - name: albums
    endpoint: https://api.test/albums
    filterable: [status]
    includable: [genre]
    verbs: [where]
    remember_for: 300
  - name: tracks
    endpoint: https://api.test/tracks
    primary_key: track_id
    envelope: body
"#;

  #[test]
  fn test_parses_resources() {
    let config = BridgeConfig::from_yaml(SAMPLE).unwrap();
    assert_eq!(config.resources.len(), 2);

    let albums = config.resource("albums").unwrap();
    assert!(albums.is_filterable("status"));
    assert!(albums.supports(Verb::Where));
    assert!(!albums.supports(Verb::OrderBy));
    assert_eq!(albums.remember_for, 300);

    let tracks = config.resource("tracks").unwrap();
    assert_eq!(tracks.primary_key(), "track_id");
    assert_eq!(tracks.collection_envelope(), Some("body"));
    assert!(tracks.supports(Verb::OrderBy), "no verb list means all verbs");
  }

  #[test]
  fn test_unknown_resource_lookup() {
    let config = BridgeConfig::from_yaml(SAMPLE).unwrap();
    assert!(config.resource("unknown").is_none());
  }

  #[test]
  fn test_duplicate_names_rejected() {
    let yaml = r#"
resources:
  - name: albums
    endpoint: https://api.test/a
  - name: albums
    endpoint: https://api.test/b
"#;
    let err = BridgeConfig::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
  }

  #[test]
  fn test_empty_endpoint_rejected() {
    let yaml = r#"
resources:
  - name: albums
    endpoint: ""
"#;
    let err = BridgeConfig::from_yaml(yaml).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
  }
}
