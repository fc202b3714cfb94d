// src/version/matcher.rs

use super::Version;

/// Return the candidates that `target` refers to, in their original order.
///
/// `target` may be partial: `3.9` selects `3.9`, `3.9.4` and `3.9.0b1`, but
/// not `3.10`. A candidate must carry at least as many release segments as
/// the target, with the target's segments as a prefix.
///
/// Qualifiers on the target must match exactly (`3.9.0b1` only selects
/// `3.9.0b1`). An unqualified target that spells out a candidate's full
/// release never selects a pre-release or dev build of it: `3.9.0` does not
/// select `3.9.0b1`, while the shorter `3.9` does.
pub fn version_match(candidates: &[Version], target: &Version) -> Vec<Version> {
    candidates
        .iter()
        .filter(|candidate| matches(candidate, target))
        .cloned()
        .collect()
}

/// Single-candidate form of [`version_match`].
pub fn matches(candidate: &Version, target: &Version) -> bool {
    let wanted = target.release();
    let release = candidate.release();

    if release.len() < wanted.len() || release[..wanted.len()] != *wanted {
        return false;
    }

    if target.pre().is_some() && target.pre() != candidate.pre() {
        return false;
    }
    if target.post().is_some() && target.post() != candidate.post() {
        return false;
    }
    if target.dev().is_some() && target.dev() != candidate.dev() {
        return false;
    }
    if target.local().is_some() && target.local() != candidate.local() {
        return false;
    }

    if !target.has_qualifier() && candidate.is_prerelease() && release.len() == wanted.len() {
        return false;
    }

    true
}
