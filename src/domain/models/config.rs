//! Town/rig configuration domain model — KV-backed env-var mapping with
//! `****`-prefix secret-masking semantics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Prefix that marks an incoming PATCH value as "leave the stored value
/// unchanged" rather than a literal replacement.
pub const SECRET_MASK_PREFIX: &str = "****";

/// A town's or rig's env-var configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TownConfig {
    pub env_vars: BTreeMap<String, String>,
    pub git_auth_secret: Option<String>,
    pub default_model: String,
    pub refinery_enabled: bool,
    pub container_options: serde_json::Value,
}

impl TownConfig {
    /// Replaces `self.env_vars` wholesale with the incoming PATCH map: any
    /// key absent from `patch` is dropped, and any incoming value starting
    /// with the secret mask prefix bit-for-bit is substituted with whatever
    /// was previously stored under that key (or dropped if it never
    /// existed — there is nothing to preserve).
    pub fn apply_env_patch(&mut self, patch: BTreeMap<String, String>) {
        let previous = std::mem::take(&mut self.env_vars);
        for (key, incoming) in patch {
            if incoming.starts_with(SECRET_MASK_PREFIX) {
                if let Some(stored) = previous.get(&key) {
                    self.env_vars.insert(key, stored.clone());
                }
                continue;
            }
            self.env_vars.insert(key, incoming);
        }
    }
}

/// Per-rig override of the town-level config, stored under `rig:config/{rigId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RigConfig {
    pub env_vars: BTreeMap<String, String>,
}

impl RigConfig {
    /// Same wholesale-replace-with-mask-preservation semantics as
    /// [`TownConfig::apply_env_patch`].
    pub fn apply_env_patch(&mut self, patch: BTreeMap<String, String>) {
        let previous = std::mem::take(&mut self.env_vars);
        for (key, incoming) in patch {
            if incoming.starts_with(SECRET_MASK_PREFIX) {
                if let Some(stored) = previous.get(&key) {
                    self.env_vars.insert(key, stored.clone());
                }
                continue;
            }
            self.env_vars.insert(key, incoming);
        }
    }
}
