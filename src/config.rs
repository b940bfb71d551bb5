use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::selection::SelectionRules;

pub const DEFAULT_REPEAT_COUNT: u32 = 10;

/// Configuration of a [`RepeatingSource`](crate::source::RepeatingSource).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub source_path: PathBuf,
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,
    #[serde(default)]
    pub skip_records: u32,
    #[serde(default = "default_streams")]
    pub streams: usize,
    #[serde(default = "default_field_rules")]
    pub field_rules: Vec<String>,
}

fn default_repeat_count() -> u32 {
    DEFAULT_REPEAT_COUNT
}

fn default_streams() -> usize {
    1
}

fn default_field_rules() -> Vec<String> {
    vec!["keep *".to_string()]
}

/// One recognised configuration parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterDescription {
    pub name: &'static str,
    pub default: Option<&'static str>,
    pub comment: &'static str,
}

const PARAMETERS: &[ParameterDescription] = &[
    ParameterDescription {
        name: "source_path",
        default: None,
        comment: "Record store to read; required.",
    },
    ParameterDescription {
        name: "repeat_count",
        default: Some("10"),
        comment: "Number of records to read from the store and then repeat in sequence.",
    },
    ParameterDescription {
        name: "skip_records",
        default: Some("0"),
        comment: "Records to discard from the store before filling the cache.",
    },
    ParameterDescription {
        name: "streams",
        default: Some("1"),
        comment: "Number of concurrent consumer streams.",
    },
    ParameterDescription {
        name: "field_rules",
        default: Some("[\"keep *\"]"),
        comment: "Field selection rules, \"keep <glob>\" or \"drop <glob>\"; the last match wins.",
    },
];

impl SourceConfig {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            repeat_count: DEFAULT_REPEAT_COUNT,
            skip_records: 0,
            streams: default_streams(),
            field_rules: default_field_rules(),
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the configuration and compile its field selection rules.
    pub fn validate(&self) -> Result<SelectionRules> {
        if self.repeat_count == 0 {
            return Err(Error::InvalidConfig("repeat_count must be at least 1".into()));
        }
        if self.streams == 0 {
            return Err(Error::InvalidConfig("streams must be at least 1".into()));
        }
        SelectionRules::parse(&self.field_rules)
    }

    pub fn describe() -> &'static [ParameterDescription] {
        PARAMETERS
    }
}
