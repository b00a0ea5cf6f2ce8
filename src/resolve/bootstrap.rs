//! Forced fragment for the GitOps boot repository.

use std::collections::BTreeMap;

use scheduler_schema::{ConfigMapSpec, ConfigUpdaterPolicy, Fragment, ReplaceableList, CONFIG_UPDATER_PLUGIN};
use serde::{Deserialize, Serialize};

/// Where the scheduler service's own configuration files are mirrored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bootstrap {
    /// Repository path of the job document
    pub config_path: String,

    /// Repository path of the plugin document
    pub plugins_path: String,

    /// Config map receiving the job document
    pub config_map: String,

    /// Config map receiving the plugin document
    pub plugins_map: String,

    /// Namespace of both config maps (service namespace when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self {
            config_path: "config/config.yaml".to_string(),
            plugins_path: "config/plugins.yaml".to_string(),
            config_map: "config".to_string(),
            plugins_map: "plugins".to_string(),
            namespace: None,
        }
    }
}

impl Bootstrap {
    /// The highest-precedence fragment applied to the boot repository.
    ///
    /// The plugin list does not replace, so plugins from lower scopes still
    /// compile alongside `config-updater`.
    pub fn fragment(&self) -> Fragment {
        let spec = |name: &str| ConfigMapSpec {
            name: name.to_string(),
            namespace: self.namespace.clone(),
            key: None,
        };
        let map = BTreeMap::from([
            (self.config_path.clone(), spec(&self.config_map)),
            (self.plugins_path.clone(), spec(&self.plugins_map)),
        ]);

        Fragment {
            plugins: Some(ReplaceableList::new(vec![CONFIG_UPDATER_PLUGIN.to_string()])),
            config_updater: Some(ConfigUpdaterPolicy { map: Some(map) }),
            ..Default::default()
        }
    }
}
