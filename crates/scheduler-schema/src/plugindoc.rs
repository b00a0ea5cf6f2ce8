//! The compiled plugin document (`plugins.yaml`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fragment::{ApprovePolicy, ConfigMapSpec, ExternalPlugin, LgtmPolicy, TriggerPolicy};

/// Bot plugin configuration for every repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginDoc {
    /// Enabled plugin names keyed by `org/repo`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub plugins: BTreeMap<String, Vec<String>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub external_plugins: BTreeMap<String, Vec<ExternalPlugin>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approve: Vec<Approve>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lgtm: Vec<Lgtm>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<Trigger>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub welcome: Vec<Welcome>,

    #[serde(default, skip_serializing_if = "ConfigUpdater::is_empty")]
    pub config_updater: ConfigUpdater,
}

impl PluginDoc {
    pub fn from_yaml(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

fn names(repos: &[String], key: &str) -> bool {
    repos.iter().any(|r| r == key)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Approve {
    #[serde(default)]
    pub repos: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_self_approval: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lgtm_acts_as_approve: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_review_state: Option<bool>,
}

impl Approve {
    pub fn for_repo(key: &str, policy: &ApprovePolicy) -> Self {
        Self {
            repos: vec![key.to_string()],
            issue_required: policy.issue_required,
            require_self_approval: policy.require_self_approval,
            lgtm_acts_as_approve: policy.lgtm_acts_as_approve,
            ignore_review_state: policy.ignore_review_state,
        }
    }

    pub fn names(&self, key: &str) -> bool {
        names(&self.repos, key)
    }

    pub fn to_policy(&self) -> ApprovePolicy {
        ApprovePolicy {
            issue_required: self.issue_required,
            require_self_approval: self.require_self_approval,
            lgtm_acts_as_approve: self.lgtm_acts_as_approve,
            ignore_review_state: self.ignore_review_state,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lgtm {
    #[serde(default)]
    pub repos: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_acts_as_lgtm: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_tree_hash: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_team_for_sticky_lgtm: Option<String>,
}

impl Lgtm {
    pub fn for_repo(key: &str, policy: &LgtmPolicy) -> Self {
        Self {
            repos: vec![key.to_string()],
            review_acts_as_lgtm: policy.review_acts_as_lgtm,
            store_tree_hash: policy.store_tree_hash,
            trusted_team_for_sticky_lgtm: policy.trusted_team_for_sticky_lgtm.clone(),
        }
    }

    pub fn names(&self, key: &str) -> bool {
        names(&self.repos, key)
    }

    pub fn to_policy(&self) -> LgtmPolicy {
        LgtmPolicy {
            review_acts_as_lgtm: self.review_acts_as_lgtm,
            store_tree_hash: self.store_tree_hash,
            trusted_team_for_sticky_lgtm: self.trusted_team_for_sticky_lgtm.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default)]
    pub repos: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_org: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_org_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_org_members: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_ok_to_test: Option<bool>,
}

impl Trigger {
    pub fn for_repo(key: &str, policy: &TriggerPolicy) -> Self {
        Self {
            repos: vec![key.to_string()],
            trusted_org: policy.trusted_org.clone(),
            join_org_url: policy.join_org_url.clone(),
            only_org_members: policy.only_org_members,
            ignore_ok_to_test: policy.ignore_ok_to_test,
        }
    }

    pub fn names(&self, key: &str) -> bool {
        names(&self.repos, key)
    }

    pub fn to_policy(&self) -> TriggerPolicy {
        TriggerPolicy {
            trusted_org: self.trusted_org.clone(),
            join_org_url: self.join_org_url.clone(),
            only_org_members: self.only_org_members,
            ignore_ok_to_test: self.ignore_ok_to_test,
        }
    }
}

/// Welcome message shown to first-time contributors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Welcome {
    #[serde(default)]
    pub repos: Vec<String>,

    pub message_template: String,
}

impl Welcome {
    pub fn names(&self, key: &str) -> bool {
        names(&self.repos, key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdater {
    /// Target config map keyed by repository file path
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub maps: BTreeMap<String, ConfigMapSpec>,
}

impl ConfigUpdater {
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plugin_doc() {
        let yaml = r#"
plugins:
  acme/app: [approve, lgtm, trigger]
external_plugins:
  acme/app:
    - name: cherrypicker
      endpoint: http://cherrypicker
      events: [issue_comment]
approve:
  - repos: [acme/app]
    lgtm_acts_as_approve: true
triggers:
  - repos: [acme/app]
    trusted_org: acme
welcome:
  - repos: [acme/app, acme/lib]
    message_template: Welcome!
config_updater:
  maps:
    config/config.yaml:
      name: config
"#;
        let doc = PluginDoc::from_yaml(yaml).unwrap();
        assert_eq!(doc.plugins["acme/app"], vec!["approve", "lgtm", "trigger"]);
        assert_eq!(doc.external_plugins["acme/app"][0].name, "cherrypicker");
        assert!(doc.approve[0].names("acme/app"));
        assert_eq!(doc.approve[0].to_policy().lgtm_acts_as_approve, Some(true));
        assert_eq!(doc.triggers[0].trusted_org.as_deref(), Some("acme"));
        assert!(doc.welcome[0].names("acme/lib"));
        assert_eq!(doc.config_updater.maps["config/config.yaml"].name, "config");
    }

    #[test]
    fn test_policy_round_trip() {
        let policy = TriggerPolicy {
            trusted_org: Some("acme".to_string()),
            only_org_members: Some(true),
            ..Default::default()
        };
        let wire = Trigger::for_repo("acme/app", &policy);
        assert_eq!(wire.repos, vec!["acme/app"]);
        assert_eq!(wire.to_policy(), policy);
    }
}
