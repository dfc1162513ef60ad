//! Identifier normalization for generated bindings

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::lang::Language;
use abibind_core::{Error, Result};

/// Append 0, 1, 2, ... to `raw` until `used` no longer reports a conflict
pub fn resolve_name_conflict(raw: &str, used: impl Fn(&str) -> bool) -> String {
    if !used(raw) {
        return raw.to_string();
    }
    (0usize..)
        .map(|n| format!("{}{}", raw, n))
        .find(|candidate| !used(candidate))
        .unwrap_or_else(|| raw.to_string())
}

/// Which kind of contract member a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    Method,
    Event,
    Error,
}

impl MemberRole {
    /// Prefix making a digit-leading name a valid identifier
    fn digit_prefix(self) -> &'static str {
        match self {
            MemberRole::Method => "M",
            MemberRole::Event | MemberRole::Error => "E",
        }
    }
}

/// Turns raw ABI names into identifiers valid in the target language
pub struct Normalizer<'a> {
    lang: &'a dyn Language,
    aliases: BTreeMap<String, String>,
}

impl<'a> Normalizer<'a> {
    pub fn new(lang: &'a dyn Language) -> Self {
        Self {
            lang,
            aliases: BTreeMap::new(),
        }
    }

    /// Explicit renames applied before casing
    pub fn with_aliases(mut self, aliases: BTreeMap<String, String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Normalize a method, event or error name and record it in `used`.
    ///
    /// A collision is an error unless it was caused by the digit prefix, which
    /// is resolved silently.
    pub fn member_name(
        &self,
        raw: &str,
        role: MemberRole,
        used: &mut HashSet<String>,
    ) -> Result<String> {
        let aliased = self.aliases.get(raw).map(String::as_str).unwrap_or(raw);
        let case = |name: &str| match role {
            MemberRole::Method => self.lang.normalize_method_name(name),
            MemberRole::Event | MemberRole::Error => self.lang.normalize_type_name(name),
        };

        let mut name = case(aliased);
        let reserved = role == MemberRole::Method && self.lang.is_reserved_member(&name);
        if reserved || self.lang.is_keyword(&name) {
            name.push('_');
        }

        let name = if name.starts_with(|c: char| c.is_ascii_digit()) {
            let prefixed = case(&format!("{}{}", role.digit_prefix(), name));
            let resolved = resolve_name_conflict(&prefixed, |candidate| used.contains(candidate));
            debug!(raw, name = %resolved, "prefixed digit-leading identifier");
            resolved
        } else if used.contains(&name) {
            return Err(Error::duplicate(raw, name));
        } else {
            name
        };

        used.insert(name.clone());
        Ok(name)
    }

    /// Unique argument names; empty or reserved names become `arg<N>`
    pub fn arg_names(&self, raws: &[&str]) -> Vec<String> {
        self.unique_names(raws, |raw| self.lang.normalize_arg_name(raw))
    }

    /// Unique struct field names; empty or reserved names become `arg<N>`
    pub fn field_names(&self, raws: &[&str]) -> Vec<String> {
        self.unique_names(raws, |raw| self.lang.normalize_field_name(raw))
    }

    fn unique_names(&self, raws: &[&str], case: impl Fn(&str) -> String) -> Vec<String> {
        let mut used: HashSet<String> = HashSet::new();
        raws.iter()
            .enumerate()
            .map(|(i, raw)| {
                let mut name = case(raw);
                if name.is_empty() || self.lang.is_keyword(&name) {
                    name = case(&format!("arg{}", i));
                }
                let name = resolve_name_conflict(&name, |candidate| used.contains(candidate));
                used.insert(name.clone());
                name
            })
            .collect()
    }
}
