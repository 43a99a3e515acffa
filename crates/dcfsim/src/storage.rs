//! Registry file storage
//!
//! A registry file is a YAML document holding the calibrated input variables:
//!
//! ```yaml
//! variables:
//!   - name: price_factor
//!     distribution: { kind: triangular, min: 0.65, mode: 1.0, max: 1.35 }
//!     base_value: 1.0
//!     correlations:
//!       - { with: fx_factor, coefficient: 0.3 }
//! ```

use std::fs;
use std::path::Path;

use dcfsim_core::model::RegistryConfig;

use crate::util::io::atomic_write;

/// Error types for storage operations
#[derive(Debug)]
pub enum StorageError {
    Io(String),
    Parse(String),
    Serialize(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "IO error: {}", msg),
            StorageError::Parse(msg) => write!(f, "Parse error: {}", msg),
            StorageError::Serialize(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Parse a registry document from YAML text.
///
/// Distribution parameters are validated during deserialization; correlation
/// references are checked later when the registry is configured.
pub fn parse_registry(yaml: &str) -> Result<RegistryConfig, StorageError> {
    serde_saphyr::from_str(yaml).map_err(|e| StorageError::Parse(e.to_string()))
}

/// Load a registry document from disk
pub fn load_registry(path: &Path) -> Result<RegistryConfig, StorageError> {
    let content = fs::read_to_string(path).map_err(|e| {
        StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let registry = parse_registry(&content).map_err(|e| match e {
        StorageError::Parse(msg) => StorageError::Parse(format!("{}: {}", path.display(), msg)),
        other => other,
    })?;

    tracing::debug!(
        path = %path.display(),
        variables = registry.variables.len(),
        "registry loaded"
    );
    Ok(registry)
}

/// Save a registry document to disk atomically
pub fn save_registry(path: &Path, registry: &RegistryConfig) -> Result<(), StorageError> {
    let yaml = serde_saphyr::to_string(registry)
        .map_err(|e| StorageError::Serialize(format!("Failed to serialize registry: {}", e)))?;

    atomic_write(path, yaml)
        .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcfsim_core::model::{Distribution, Variable};
    use tempfile::tempdir;

    const REGISTRY_YAML: &str = r#"
variables:
  - name: price_factor
    description: Realized price relative to plan
    distribution:
      kind: triangular
      min: 0.65
      mode: 1.0
      max: 1.35
    base_value: 1.0
  - name: discount_rate
    distribution:
      kind: normal
      mean: 0.09
      std: 0.01
    base_value: 0.09
    correlations:
      - with: price_factor
        coefficient: -0.2
"#;

    #[test]
    fn test_parse_registry() {
        let registry = parse_registry(REGISTRY_YAML).unwrap();

        assert_eq!(registry.variables.len(), 2);
        assert_eq!(registry.variables[0].name, "price_factor");
        assert_eq!(
            registry.variables[0].distribution,
            Distribution::triangular(0.65, 1.0, 1.35).unwrap()
        );
        assert_eq!(registry.variables[1].correlations[0].with, "price_factor");
        assert_eq!(registry.variables[1].correlations[0].coefficient, -0.2);
        assert!(registry.variables[1].description.is_empty());
    }

    #[test]
    fn test_invalid_distribution_is_a_parse_error() {
        let yaml = r#"
variables:
  - name: bad
    distribution: { kind: normal, mean: 0.0, std: -1.0 }
    base_value: 0.0
"#;
        assert!(matches!(parse_registry(yaml), Err(StorageError::Parse(_))));
    }

    #[test]
    fn test_save_and_load_registry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("registry.yaml");
        let registry = RegistryConfig {
            variables: vec![
                Variable::new("volume_factor", Distribution::normal(1.0, 0.08).unwrap(), 1.0)
                    .description("Volume relative to plan"),
                Variable::new("tax_rate", Distribution::fixed(0.25).unwrap(), 0.25)
                    .correlated_with("volume_factor", 0.1),
            ],
        };

        save_registry(&path, &registry).unwrap();
        let loaded = load_registry(&path).unwrap();
        assert_eq!(loaded, registry);
    }

    #[test]
    fn test_bundled_registry_configures() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/registry.yaml");
        let registry = load_registry(&path).unwrap();
        assert_eq!(registry.variables.len(), 10);

        let config = dcfsim_core::config::SimulationConfig::try_from(registry).unwrap();
        assert!(config.correlation().conflicts().is_empty());
        assert!(!config.correlation().repair_outcome().repaired());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_registry(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
