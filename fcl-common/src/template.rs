//! Cadence source templating.
//!
//! `template` fills `${name}` placeholders from a parameter map; `cadence` and `cdc` are the
//! names the rest of the library exposes it under. `resolve_imports` swaps `0xAlias`
//! placeholders for the contract addresses configured under the same key.
use std::collections::BTreeMap;

use regex::Regex;
use thiserror::Error;
use tracing::trace;

use crate::config::Config;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("No value supplied for placeholder ${{{0}}}")]
    MissingParam(String),

    #[error("Unterminated placeholder starting at byte {0}")]
    Unterminated(usize),

    #[error("Empty placeholder at byte {0}")]
    EmptyPlaceholder(usize),

    #[error("Failed to build import pattern for {0}: {1}")]
    ImportPattern(String, String),
}

/// Substitutes `${name}` placeholders in `source`. `$$` produces a literal `$`; any other `$`
/// is copied through untouched.
pub fn template(source: &str, params: &BTreeMap<String, String>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    let mut offset = 0;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        if let Some(after) = tail.strip_prefix('$') {
            out.push('$');
            offset += pos + 2;
            rest = after;
        } else if let Some(body) = tail.strip_prefix('{') {
            let end = body
                .find('}')
                .ok_or(TemplateError::Unterminated(offset + pos))?;
            let name = body[..end].trim();
            if name.is_empty() {
                return Err(TemplateError::EmptyPlaceholder(offset + pos));
            }
            let value = params
                .get(name)
                .ok_or_else(|| TemplateError::MissingParam(name.to_string()))?;
            out.push_str(value);
            let consumed = pos + 2 + end + 1;
            offset += consumed;
            rest = &rest[consumed..];
        } else {
            out.push('$');
            offset += pos + 1;
            rest = tail;
        }
    }
    out.push_str(rest);
    Ok(out)
}

pub use self::template as cadence;
pub use self::template as cdc;

/// Replaces every configured `0xAlias` token in `source` with its address.
pub fn resolve_imports(source: &str, config: &Config) -> Result<String, TemplateError> {
    let mut resolved = source.to_string();
    for (alias, address) in config.address_aliases() {
        let pattern = format!(r"{}\b", regex::escape(&alias));
        let regex = Regex::new(&pattern)
            .map_err(|e| TemplateError::ImportPattern(alias.clone(), e.to_string()))?;
        if regex.is_match(&resolved) {
            trace!(%alias, %address, "Resolving import alias");
            resolved = regex
                .replace_all(&resolved, regex::NoExpand(&address))
                .into_owned();
        }
    }
    Ok(resolved)
}
