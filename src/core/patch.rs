//! RZ-004: Patch engine: merge new packages into a running context.
//!
//! Replace ignores the prior context entirely. LooseAdd and StrictAdd apply
//! the new base packages on top of the prior base with last-wins override by
//! family name; prior subshells pass through untouched.

use super::error::EnvError;
use super::request;
use super::types::{EnvironmentContext, PackageSpec, PatchMode, Request};
use indexmap::IndexMap;

/// Merged request plus whether a prior context was actually patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub request: Request,
    pub patched: bool,
}

/// Pick the prior request text a patch mode reads from.
pub fn prior_source(mode: PatchMode, ctx: &EnvironmentContext) -> Option<&str> {
    match mode {
        PatchMode::Replace => None,
        PatchMode::LooseAdd => ctx.request.as_deref(),
        PatchMode::StrictAdd => ctx.resolve.as_deref(),
    }
}

/// Merge `new_packages` into `prior_text` according to `mode`.
///
/// A patch mode with no prior context falls back to Replace and still
/// succeeds.
pub fn patch<S: AsRef<str>>(
    prior_text: &str,
    new_packages: &[S],
    mode: PatchMode,
) -> Result<PatchOutcome, EnvError> {
    let new = request::parse_tokens(new_packages)?;

    if mode == PatchMode::Replace || prior_text.trim().is_empty() {
        return Ok(PatchOutcome {
            request: new,
            patched: false,
        });
    }

    let prior = request::parse(prior_text)?;
    Ok(PatchOutcome {
        request: merge(prior, new),
        patched: true,
    })
}

/// Apply `new` on top of `prior`.
pub fn merge(prior: Request, new: Request) -> Request {
    let mut base: IndexMap<String, PackageSpec> = IndexMap::new();
    for spec in prior.base.into_iter().chain(new.base) {
        // insert() on an existing key keeps the original position
        base.insert(spec.family().to_string(), spec);
    }

    let mut subshells = prior.subshells;
    subshells.extend(new.subshells);

    Request {
        base: base.into_values().collect(),
        subshells,
    }
}

/// Format the merged request the way it is reported on stderr:
/// `request: 'a' 'b' ...`.
pub fn describe(request: &Request) -> String {
    let quoted = request::encode(request)
        .split_whitespace()
        .map(|t| format!("'{}'", t))
        .collect::<Vec<_>>()
        .join(" ");
    format!("request: {}", quoted)
}
