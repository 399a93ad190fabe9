/// Why a source was flagged as broken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokenReason {
    /// Every attempt failed with a transient error
    RetriesExhausted,
    /// The site no longer matches what its adapter expects
    NeedsAdapterUpdate,
    /// No adapter is registered for the source host
    Unsupported,
}

impl BrokenReason {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::RetriesExhausted => "retries_exhausted",
            Self::NeedsAdapterUpdate => "needs_adapter_update",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "retries_exhausted" => Some(Self::RetriesExhausted),
            "needs_adapter_update" => Some(Self::NeedsAdapterUpdate),
            "unsupported" => Some(Self::Unsupported),
            _ => None,
        }
    }
}

/// One configured site/query to crawl every cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub url: String,
    pub name: String,
    /// Storage key; `None` for a source that has not been stored yet
    pub key: Option<String>,
    pub broken: bool,
    pub broken_reason: Option<BrokenReason>,
}

impl Source {
    /// A source that only exists for the duration of one scrape
    pub fn unsaved(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            key: None,
            broken: false,
            broken_reason: None,
        }
    }

    /// Human readable label for logs
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.url
        } else {
            &self.name
        }
    }
}

/// A configured notification target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationHandlerConfig {
    pub id: i64,
    /// Channel type name, e.g. `pushbullet`
    pub kind: String,
    pub api_key: String,
    pub name: String,
}
