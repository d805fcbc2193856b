use std::{env, fs, path::Path, str::FromStr};

use super::{ErrorKind, Result};
use crate::planner::CapacityCheck;

fn default_conflict_retries() -> u32 {
    1
}

/// Settings for the scaling backend
///
/// ```yaml
/// targetNamespaces:
/// - domain-ns1
/// - domain-ns2
/// conflictRetries: 1
/// capacityCheck: enforce
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Namespaces whose domains this backend manages
    #[serde(default)]
    pub target_namespaces: Vec<String>,

    /// How many times a conflicting write is re-planned before giving up
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,

    /// Whether scan results bound the requested replica count
    #[serde(default)]
    pub capacity_check: CapacityCheck,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            target_namespaces: vec![],
            conflict_retries: default_conflict_retries(),
            capacity_check: CapacityCheck::default(),
        }
    }
}

fn parse_namespaces(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl BackendConfig {
    pub fn new(target_namespaces: Vec<String>) -> Self {
        BackendConfig {
            target_namespaces,
            ..BackendConfig::default()
        }
    }

    /// Configure from the deployment's environment
    ///
    /// `TARGET_NAMESPACES` is mandatory, the rest fall back to defaults.
    pub fn from_evars() -> Result<Self> {
        let raw = env::var("TARGET_NAMESPACES").map_err(|_| ErrorKind::MissingTargetNamespaces)?;
        let mut cfg = BackendConfig::new(parse_namespaces(&raw));
        if let Ok(r) = env::var("SCALECAT_CONFLICT_RETRIES") {
            cfg.conflict_retries = r.trim().parse()?;
        }
        if let Ok(c) = env::var("SCALECAT_CAPACITY_CHECK") {
            cfg.capacity_check = c.parse()?;
        }
        cfg.verify()?;
        Ok(cfg)
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let cfg: BackendConfig = serde_yaml::from_str(data)?;
        cfg.verify()?;
        Ok(cfg)
    }

    /// Read a yaml config file
    pub fn read(pth: &Path) -> Result<Self> {
        debug!("Reading backend config from {}", pth.display());
        let data = fs::read_to_string(pth)?;
        Self::from_yaml(&data)
    }

    pub fn verify(&self) -> Result<()> {
        if self.target_namespaces.is_empty() {
            bail!(ErrorKind::MissingTargetNamespaces);
        }
        if let Some(ns) = self.target_namespaces.iter().find(|ns| ns.trim().is_empty()) {
            bail!(ErrorKind::InvalidConfig(format!("blank target namespace '{}'", ns)));
        }
        Ok(())
    }

    pub fn manages(&self, namespace: &str) -> bool {
        self.target_namespaces.iter().any(|ns| ns == namespace)
    }
}

impl FromStr for CapacityCheck {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "enforce" => Ok(CapacityCheck::Enforce),
            "skip" => Ok(CapacityCheck::Skip),
            other => bail!(ErrorKind::InvalidConfig(format!("unknown capacity check '{}'", other))),
        }
    }
}
