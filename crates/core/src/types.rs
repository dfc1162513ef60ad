//! Shared types used across the abibind crates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target language of the generated bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Rust,
    Go,
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lang::Rust => write!(f, "rust"),
            Lang::Go => write!(f, "go"),
        }
    }
}

impl FromStr for Lang {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "rust" | "rs" => Ok(Lang::Rust),
            "go" | "golang" => Ok(Lang::Go),
            other => Err(crate::Error::config(format!("unsupported binding language '{}'", other))),
        }
    }
}
