//! SKE: Kubernetes clusters and their kubeconfigs

pub mod cluster;
pub mod kubeconfig;

use std::cmp::Ordering;

use stackit_sdk::ske::{ProviderOptions, VERSION_STATE_SUPPORTED};

use crate::error::{ProviderError, ProviderResult};

pub(crate) const WAIT_TIMEOUT_MINUTES: u64 = 90;

/// A version known to the API together with its lifecycle state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate<'a> {
    pub version: &'a str,
    pub state: Option<&'a str>,
}

impl Candidate<'_> {
    fn is_supported(&self) -> bool {
        self.state == Some(VERSION_STATE_SUPPORTED)
    }
}

/// Numeric components of a dotted version, `None` when any part is not a number
fn parse_version(version: &str) -> Option<Vec<u64>> {
    let version = version.strip_prefix('v').unwrap_or(version);
    version.split('.').map(|p| p.parse().ok()).collect()
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    parse_version(a).cmp(&parse_version(b))
}

/// Pick the version to send for a `*_version_min` attribute
///
/// `major.minor` selects the newest supported patch of that minor release,
/// a full `major.minor.patch` must exist as is. A version already running
/// that is newer than the selection is kept, the API upgrades clusters on
/// its own during maintenance.
pub fn latest_matching_version(
    candidates: &[Candidate<'_>],
    version_min: Option<&str>,
    current: Option<&str>,
    kind: &str,
) -> ProviderResult<String> {
    let Some(min) = version_min else {
        if let Some(current) = current {
            return Ok(current.to_string());
        }
        return candidates
            .iter()
            .filter(|c| c.is_supported())
            .max_by(|a, b| compare_versions(a.version, b.version))
            .map(|c| c.version.to_string())
            .ok_or_else(|| ProviderError::invalid(format!("no supported {} version available", kind)));
    };

    let min_parts = parse_version(min)
        .filter(|p| p.len() == 2 || p.len() == 3)
        .ok_or_else(|| {
            ProviderError::invalid(format!(
                "{} version '{}' must be given as major.minor or major.minor.patch",
                kind, min
            ))
        })?;

    let selected = if min_parts.len() == 2 {
        candidates
            .iter()
            .filter(|c| c.is_supported())
            .filter(|c| parse_version(c.version).is_some_and(|p| p.starts_with(&min_parts)))
            .max_by(|a, b| compare_versions(a.version, b.version))
            .map(|c| c.version)
    } else {
        candidates
            .iter()
            .find(|c| parse_version(c.version).as_ref() == Some(&min_parts))
            .map(|c| c.version)
    };

    let Some(selected) = selected else {
        let mut available: Vec<&str> = candidates.iter().map(|c| c.version).collect();
        available.sort_by(|a, b| compare_versions(a, b));
        return Err(ProviderError::invalid(format!(
            "provided {} version '{}' is not available, available versions are: {}",
            kind,
            min,
            available.join(", ")
        )));
    };

    match current {
        Some(current) if compare_versions(current, selected) == Ordering::Greater => Ok(current.to_string()),
        _ => Ok(selected.to_string()),
    }
}

pub(crate) fn kubernetes_candidates(options: &ProviderOptions) -> Vec<Candidate<'_>> {
    options
        .kubernetes_versions
        .iter()
        .filter_map(|v| {
            Some(Candidate {
                version: v.version.as_deref()?,
                state: v.state.as_deref(),
            })
        })
        .collect()
}

pub(crate) fn machine_image_candidates<'a>(options: &'a ProviderOptions, image: &str) -> Vec<Candidate<'a>> {
    options
        .machine_images
        .iter()
        .filter(|i| i.name.as_deref() == Some(image))
        .flat_map(|i| i.versions.iter())
        .filter_map(|v| {
            Some(Candidate {
                version: v.version.as_deref()?,
                state: v.state.as_deref(),
            })
        })
        .collect()
}
