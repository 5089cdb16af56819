//! Core types for target resolution

use serde::{Deserialize, Serialize};

/// Locator strategy enumeration, in fallback order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Attribute/selector patterns observed for this UI
    Specific,

    /// Generic element-type selectors
    Generic,

    /// Case-insensitive text scan
    Text,

    /// REST lookup producing a deep link
    Api,

    /// Explicit "first row/button" substitute
    FirstMatch,
}

impl StrategyKind {
    /// Get strategy name as string
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Specific => "specific",
            StrategyKind::Generic => "generic",
            StrategyKind::Text => "text",
            StrategyKind::Api => "api",
            StrategyKind::FirstMatch => "first-match",
        }
    }

    /// Get all strategies in fallback order
    pub fn fallback_chain() -> [StrategyKind; 5] {
        [
            StrategyKind::Specific,
            StrategyKind::Generic,
            StrategyKind::Text,
            StrategyKind::Api,
            StrategyKind::FirstMatch,
        ]
    }
}

/// REST lookup used when the DOM gives nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiLookup {
    /// Collection endpoint, absolute or same-origin
    pub endpoint: String,
    /// Row field compared against `contains`
    #[serde(default = "default_field")]
    pub field: String,
    #[serde(default)]
    pub contains: Option<String>,
    /// Page to open for the found row; `{id}` is replaced
    pub deep_link: String,
}

fn default_field() -> String {
    "title".to_string()
}

impl ApiLookup {
    pub fn expand(&self, id: &str) -> String {
        self.deep_link.replace("{id}", id)
    }
}

/// A semantic target ("the approve button") with every way to find it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSpec {
    pub name: String,
    pub selectors: Vec<String>,
    pub generic: Vec<String>,
    pub texts: Vec<String>,
    /// Elements scanned by the text strategy
    pub text_scope: Option<String>,
    pub api: Option<ApiLookup>,
    /// Opt-in substitute selector, consulted last
    pub first_match: Option<String>,
}

impl TargetSpec {
    pub fn selector(selector: impl Into<String>) -> Self {
        let selector = selector.into();
        Self {
            name: selector.clone(),
            selectors: vec![selector],
            ..Self::default()
        }
    }

    pub fn texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let texts: Vec<String> = texts.into_iter().map(Into::into).collect();
        Self {
            name: texts.join(" | "),
            texts,
            ..Self::default()
        }
    }

    /// Whether any strategy has something to work with
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
            && self.generic.is_empty()
            && self.texts.is_empty()
            && self.api.is_none()
            && self.first_match.is_none()
    }
}

/// Outcome of running the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// A live element addressable by `selector`
    Element {
        selector: String,
        strategy: StrategyKind,
    },

    /// No element, but the API produced an id and a page to open
    ViaFallbackId {
        id: String,
        deep_link: String,
        strategy: StrategyKind,
    },

    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        !matches!(self, Resolution::NotFound)
    }

    pub fn strategy(&self) -> Option<StrategyKind> {
        match self {
            Resolution::Element { strategy, .. } | Resolution::ViaFallbackId { strategy, .. } => {
                Some(*strategy)
            }
            Resolution::NotFound => None,
        }
    }
}
