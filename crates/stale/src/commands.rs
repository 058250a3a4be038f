use serde::Serialize;
use stale_invalidation::{
    BuildInvalidator, CacheKey, CacheKeyGenerator, CachePolicy, FingerprintStrategy,
    InvalidationConfig, Result, Target,
};

#[derive(Debug, Clone)]
pub enum Command {
    Status {
        id: String,
        fingerprint: String,
    },
    Show {
        id: String,
    },
    Mark {
        id: String,
        fingerprint: String,
    },
    Invalidate {
        id: String,
    },
    InvalidateAll,
    List,
    Key {
        id: String,
        fingerprint: String,
        base_inputs: Vec<String>,
        uncacheable: bool,
    },
}

/// A single persisted record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: String,
    pub fingerprint: String,
}

/// Result of a command, printable as text or JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Output {
    Status {
        id: String,
        fingerprint: String,
        recorded: Option<String>,
        stale: bool,
    },
    Show {
        id: String,
        fingerprint: Option<String>,
    },
    Marked {
        key: CacheKey,
    },
    Invalidated {
        id: String,
        removed: bool,
    },
    InvalidatedAll,
    List {
        records: Vec<Record>,
    },
    Key {
        key: CacheKey,
        cacheable: bool,
    },
}

impl Output {
    pub fn render_text(&self) -> String {
        match self {
            Self::Status { stale: true, .. } => "stale".to_string(),
            Self::Status { stale: false, .. } => "up-to-date".to_string(),
            Self::Show { fingerprint, .. } => {
                fingerprint.clone().unwrap_or_else(|| "unknown".to_string())
            }
            Self::Marked { key } => format!("recorded {key}"),
            Self::Invalidated { id, removed: true } => format!("invalidated {id}"),
            Self::Invalidated { id, removed: false } => format!("no record for {id}"),
            Self::InvalidatedAll => "invalidated all records".to_string(),
            Self::List { records } => records
                .iter()
                .map(|r| format!("{}\t{}", r.id, r.fingerprint))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Key { key, .. } => key.fingerprint().to_string(),
        }
    }

    pub fn render_json(&self) -> miette::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| miette::miette!("Failed to serialize output: {e}"))
    }
}

/// Target described entirely by command-line arguments
struct ArgTarget<'a> {
    id: &'a str,
    fingerprint: &'a str,
}

impl Target for ArgTarget<'_> {
    fn id(&self) -> &str {
        self.id
    }

    fn invalidation_hash(&self, strategy: Option<&dyn FingerprintStrategy<Self>>) -> Option<String> {
        strategy.map_or_else(
            || Some(self.fingerprint.to_string()),
            |s| s.compute_fingerprint(self),
        )
    }

    fn transitive_invalidation_hash(
        &self,
        strategy: Option<&dyn FingerprintStrategy<Self>>,
    ) -> Option<String> {
        self.invalidation_hash(strategy)
    }
}

pub struct CommandExecutor {
    config: InvalidationConfig,
    scope: Option<String>,
}

impl CommandExecutor {
    pub fn new(config: InvalidationConfig, scope: Option<String>) -> Self {
        Self { config, scope }
    }

    fn invalidator(&self) -> Result<BuildInvalidator> {
        self.config.invalidator(self.scope.as_deref())
    }

    #[tracing::instrument(name = "command", skip(self), fields(scope = ?self.scope))]
    pub fn execute(&self, command: Command) -> Result<Output> {
        match command {
            Command::Status { id, fingerprint } => {
                let invalidator = self.invalidator()?;
                let key = CacheKey::new(&id, &fingerprint);
                let stale = invalidator.needs_update(&key)?;
                let recorded = invalidator
                    .previous_key(&key)?
                    .map(|previous| previous.fingerprint().to_string());
                Ok(Output::Status {
                    id,
                    fingerprint,
                    recorded,
                    stale,
                })
            }
            Command::Show { id } => {
                let fingerprint = self.invalidator()?.recorded_fingerprint(&id)?;
                Ok(Output::Show { id, fingerprint })
            }
            Command::Mark { id, fingerprint } => {
                let key = CacheKey::new(id, fingerprint);
                self.invalidator()?.update(&key)?;
                Ok(Output::Marked { key })
            }
            Command::Invalidate { id } => {
                let invalidator = self.invalidator()?;
                let recorded = invalidator.recorded_fingerprint(&id)?;
                if let Some(fingerprint) = &recorded {
                    invalidator.force_invalidate(&CacheKey::new(&id, fingerprint))?;
                }
                Ok(Output::Invalidated {
                    id,
                    removed: recorded.is_some(),
                })
            }
            Command::InvalidateAll => {
                self.invalidator()?.force_invalidate_all()?;
                Ok(Output::InvalidatedAll)
            }
            Command::List => {
                let records = self
                    .invalidator()?
                    .entries()?
                    .into_iter()
                    .map(|(id, fingerprint)| Record { id, fingerprint })
                    .collect();
                Ok(Output::List { records })
            }
            Command::Key {
                id,
                fingerprint,
                base_inputs,
                uncacheable,
            } => {
                self.config.validate()?;
                let policy = if uncacheable {
                    CachePolicy::Disabled
                } else {
                    CachePolicy::Cacheable
                };
                let generator = self.config.key_generator(policy, &base_inputs);
                let target = ArgTarget {
                    id: &id,
                    fingerprint: &fingerprint,
                };
                let key = generator
                    .key_for_target(&target, false, None)
                    .unwrap_or_else(|| CacheKey::uncacheable(&id));
                let cacheable = key.is_cacheable();
                Ok(Output::Key { key, cacheable })
            }
        }
    }
}
