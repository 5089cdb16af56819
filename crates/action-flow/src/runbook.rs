//! Declarative runbooks: credentials, named targets and the scene list

use crate::{
    errors::FlowError,
    types::{Scene, Step},
};
use action_locator::TargetSpec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Credentials keyed by logical actor ("manager", "counter", ...)
///
/// Roles a runbook lists override the built-in ones; the rest keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Credential>")]
pub struct CredentialTable(BTreeMap<String, Credential>);

impl From<BTreeMap<String, Credential>> for CredentialTable {
    fn from(overrides: BTreeMap<String, Credential>) -> Self {
        let mut table = Self::default();
        table.0.extend(overrides);
        table
    }
}

impl Default for CredentialTable {
    fn default() -> Self {
        let mut roles = BTreeMap::new();
        roles.insert("manager".into(), Credential::new("nino", "helix_pass"));
        roles.insert("counter".into(), Credential::new("simona", "helix_pass"));
        roles.insert("mechanic".into(), Credential::new("maximo", "helix_pass"));
        Self(roles)
    }
}

impl CredentialTable {
    pub fn get(&self, role: &str) -> Option<&Credential> {
        self.0.get(role)
    }

    pub fn insert(&mut self, role: impl Into<String>, credential: Credential) {
        self.0.insert(role.into(), credential);
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Runbook {
    pub name: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub credentials: CredentialTable,
    #[serde(default)]
    pub targets: HashMap<String, TargetSpec>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

impl Runbook {
    /// Load, validate and resolve URLs relative to the file's directory
    pub fn load(path: &Path) -> Result<Self, FlowError> {
        let raw = std::fs::read_to_string(path)?;
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_yaml_str(&raw, &dir)
    }

    pub fn from_yaml_str(raw: &str, base_dir: &Path) -> Result<Self, FlowError> {
        let mut runbook: Runbook = serde_yaml::from_str(raw)?;
        runbook.validate()?;
        runbook.resolve_urls(base_dir)?;
        debug!(
            runbook = %runbook.name,
            scenes = runbook.scenes.len(),
            targets = runbook.targets.len(),
            "runbook loaded"
        );
        Ok(runbook)
    }

    pub fn validate(&self) -> Result<(), FlowError> {
        if self.name.trim().is_empty() {
            return Err(FlowError::InvalidRunbook("runbook has no name".into()));
        }
        if self.scenes.is_empty() {
            return Err(FlowError::InvalidRunbook(format!(
                "runbook '{}' has no scenes",
                self.name
            )));
        }

        let mut seen = HashSet::new();
        for scene in &self.scenes {
            if !seen.insert(scene.id.as_str()) {
                return Err(FlowError::InvalidRunbook(format!(
                    "duplicate scene id '{}'",
                    scene.id
                )));
            }
            for (index, step) in scene.steps.iter().enumerate() {
                self.validate_step(step)
                    .map_err(|reason| {
                        FlowError::InvalidRunbook(format!(
                            "scene '{}' step {}: {}",
                            scene.id,
                            index + 1,
                            reason
                        ))
                    })?;
            }
        }
        Ok(())
    }

    fn validate_step(&self, step: &Step) -> Result<(), String> {
        match step {
            Step::Click {
                selector,
                text,
                target,
                ..
            } => {
                if let Some(name) = target {
                    if !self.targets.contains_key(name) {
                        return Err(format!("unknown target '{name}'"));
                    }
                } else if selector.is_none() && text.is_empty() {
                    return Err("click needs a selector, text or target".into());
                }
            }
            Step::Login { role, .. } if self.credentials.get(role).is_none() => {
                return Err(format!("no credentials for role '{role}'"));
            }
            Step::Wait { ms: Some(_), pace: Some(_) } => {
                return Err("wait takes either ms or pace, not both".into());
            }
            Step::Zoom { factor: Some(factor) } if !(factor.is_finite() && *factor > 0.0) => {
                return Err(format!("invalid zoom factor {factor}"));
            }
            _ => {}
        }
        Ok(())
    }

    fn resolve_urls(&mut self, base_dir: &Path) -> Result<(), FlowError> {
        let base_url = self
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw)
                    .map_err(|err| FlowError::InvalidRunbook(format!("base_url '{raw}': {err}")))
            })
            .transpose()?;

        for scene in &mut self.scenes {
            for step in &mut scene.steps {
                let slot = match step {
                    Step::Navigate { url, .. } => Some(url),
                    Step::Logout { url } => url.as_mut(),
                    _ => None,
                };
                if let Some(url) = slot {
                    *url = resolve_location(url, base_url.as_ref(), base_dir)?;
                }
            }
        }
        Ok(())
    }
}

const PASSTHROUGH_SCHEMES: [&str; 4] = ["http://", "https://", "file://", "about:"];

/// `/path` joins `base_url`; anything else scheme-less is a local file
pub fn resolve_location(
    raw: &str,
    base_url: Option<&Url>,
    base_dir: &Path,
) -> Result<String, FlowError> {
    let raw = raw.trim();
    if PASSTHROUGH_SCHEMES.iter().any(|scheme| raw.starts_with(scheme)) {
        return Ok(raw.to_string());
    }

    if raw.starts_with('/') {
        if let Some(base) = base_url {
            return base
                .join(raw)
                .map(String::from)
                .map_err(|err| FlowError::InvalidRunbook(format!("cannot join '{raw}': {err}")));
        }
    }

    let path = PathBuf::from(raw);
    let path = if path.is_absolute() {
        path
    } else if base_dir.is_absolute() {
        base_dir.join(path)
    } else {
        std::env::current_dir()?.join(base_dir).join(path)
    };
    Url::from_file_path(&path)
        .map(String::from)
        .map_err(|_| FlowError::InvalidRunbook(format!("not a usable file path: {}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUNBOOK: &str = r##"
name: quote-to-invoice
base_url: https://camper.local:8443/app/
targets:
  approve:
    selectors: ["#approve-quote"]
    texts: [Approve, Approva]
    api:
      endpoint: /api/v1/quotations
      contains: brake
      deep_link: /quotations/{id}
scenes:
  - id: intro
    label: Intro card
    duration_ms: 5000
    steps:
      - type: navigate
        url: cards/intro.html
      - type: wait
        pace: intro
  - id: approve
    label: Approve a quote
    steps:
      - type: navigate
        url: /quotations
      - type: login
        role: manager
        verify_token: true
      - type: click
        target: approve
      - type: logout
"##;

    #[test]
    fn loads_and_resolves_urls() {
        let dir = tempfile::tempdir().unwrap();
        let runbook = Runbook::from_yaml_str(RUNBOOK, dir.path()).unwrap();

        assert_eq!(runbook.scenes.len(), 2);
        match &runbook.scenes[0].steps[0] {
            Step::Navigate { url, .. } => {
                assert!(url.starts_with("file://"));
                assert!(url.ends_with("/cards/intro.html"));
            }
            other => panic!("unexpected step {other:?}"),
        }
        match &runbook.scenes[1].steps[0] {
            Step::Navigate { url, .. } => assert_eq!(url, "https://camper.local:8443/quotations"),
            other => panic!("unexpected step {other:?}"),
        }
        assert_eq!(runbook.scenes[1].steps[3], Step::Logout { url: None });
        assert_eq!(
            runbook.credentials.get("manager"),
            Some(&Credential::new("nino", "helix_pass"))
        );
    }

    #[test]
    fn runbook_credentials_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "name: creds\ncredentials:\n  manager: {username: admin, password: s3cret}\n  auditor: {username: ada, password: pw}\nscenes:\n  - id: s1\n    steps:\n      - type: login\n        role: counter\n";
        let runbook = Runbook::from_yaml_str(yaml, dir.path()).unwrap();

        assert_eq!(
            runbook.credentials.get("manager"),
            Some(&Credential::new("admin", "s3cret"))
        );
        assert_eq!(
            runbook.credentials.get("counter"),
            Some(&Credential::new("simona", "helix_pass"))
        );
        assert!(runbook.credentials.get("mechanic").is_some());
        assert_eq!(runbook.credentials.roles().count(), 4);
    }

    #[test]
    fn rejects_unknown_target_and_role() {
        let dir = tempfile::tempdir().unwrap();
        let bad_target = RUNBOOK.replace("target: approve", "target: reject");
        let err = Runbook::from_yaml_str(&bad_target, dir.path()).unwrap_err();
        assert!(err.to_string().contains("unknown target 'reject'"));

        let bad_role = RUNBOOK.replace("role: manager", "role: auditor");
        let err = Runbook::from_yaml_str(&bad_role, dir.path()).unwrap_err();
        assert!(matches!(err, FlowError::InvalidRunbook(_)));
    }

    #[test]
    fn rejects_duplicate_scene_ids() {
        let dir = tempfile::tempdir().unwrap();
        let dup = RUNBOOK.replace("id: approve", "id: intro");
        assert!(Runbook::from_yaml_str(&dup, dir.path()).is_err());
    }

    #[test]
    fn passthrough_and_absolute_locations() {
        let base = Url::parse("https://example.test/").unwrap();
        let dir = Path::new("/tmp");
        assert_eq!(
            resolve_location("https://other.test/x", Some(&base), dir).unwrap(),
            "https://other.test/x"
        );
        assert_eq!(
            resolve_location("about:blank", None, dir).unwrap(),
            "about:blank"
        );
        assert_eq!(
            resolve_location("/home", Some(&base), dir).unwrap(),
            "https://example.test/home"
        );
        assert_eq!(
            resolve_location("/srv/cards/outro.html", None, dir).unwrap(),
            "file:///srv/cards/outro.html"
        );
    }
}
