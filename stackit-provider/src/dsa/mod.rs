//! Data Service Access resources: LogMe, OpenSearch and MariaDB
//!
//! The three services share one API, so instances and credentials are
//! implemented once and parameterised by a [`DsaService`] marker.

pub mod credential;
pub mod instance;

use stackit_sdk::dsa::{self, ListOfferingsResponse};

use crate::error::{ProviderError, ProviderResult};

/// Default wait timeout of instance operations, in minutes
pub(crate) const WAIT_TIMEOUT_MINUTES: u64 = 60;

/// Marker for one Data Service Access service
pub trait DsaService: Default + Send + Sync + 'static {
    /// API service name, also the middle part of the type names
    const NAME: &'static str;
    const DISPLAY_NAME: &'static str;

    fn instance_type_name() -> String {
        format!("stackit_{}_instance", Self::NAME)
    }

    fn credential_type_name() -> String {
        format!("stackit_{}_credential", Self::NAME)
    }
}

#[derive(Debug, Default)]
pub struct LogMe;

impl DsaService for LogMe {
    const NAME: &'static str = dsa::LOGME;
    const DISPLAY_NAME: &'static str = "LogMe";
}

#[derive(Debug, Default)]
pub struct OpenSearch;

impl DsaService for OpenSearch {
    const NAME: &'static str = dsa::OPENSEARCH;
    const DISPLAY_NAME: &'static str = "OpenSearch";
}

#[derive(Debug, Default)]
pub struct MariaDb;

impl DsaService for MariaDb {
    const NAME: &'static str = dsa::MARIADB;
    const DISPLAY_NAME: &'static str = "MariaDB";
}

/// Find the plan id for `(version, plan_name)` in the service offerings
pub fn resolve_plan_id(offerings: &ListOfferingsResponse, version: &str, plan_name: &str) -> ProviderResult<String> {
    let mut available_versions = Vec::new();
    for offering in &offerings.offerings {
        let Some(offering_version) = offering.version.as_deref() else {
            continue;
        };
        available_versions.push(offering_version.to_string());
        if offering_version != version {
            continue;
        }

        let mut available_names = Vec::new();
        for plan in &offering.plans {
            let Some(name) = plan.name.as_deref() else {
                continue;
            };
            if name == plan_name
                && let Some(id) = &plan.id
            {
                return Ok(id.clone());
            }
            available_names.push(name.to_string());
        }
        return Err(ProviderError::invalid(format!(
            "couldn't find plan_name '{}' for version {}, available names are: {}",
            plan_name,
            version,
            available_names.join(", ")
        )));
    }

    Err(ProviderError::invalid(format!(
        "couldn't find version '{}', available versions are: {}",
        version,
        available_versions.join(", ")
    )))
}

/// Reverse lookup: plan name and version of a plan id
pub fn plan_name_and_version(offerings: &ListOfferingsResponse, plan_id: &str) -> Option<(String, String)> {
    offerings.offerings.iter().find_map(|offering| {
        offering
            .plans
            .iter()
            .find(|plan| plan.id.as_deref() == Some(plan_id))
            .and_then(|plan| Some((plan.name.clone()?, offering.version.clone()?)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackit_sdk::dsa::{Offering, Plan};

    fn offerings() -> ListOfferingsResponse {
        let plan = |id: &str, name: &str| Plan {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        };
        ListOfferingsResponse {
            offerings: vec![
                Offering {
                    version: Some("2".to_string()),
                    plans: vec![plan("p-2-s", "stackit-logme2-1.2.50-single")],
                    ..Default::default()
                },
                Offering {
                    version: Some("3".to_string()),
                    plans: vec![
                        plan("p-3-s", "stackit-logme2-1.2.50-single"),
                        plan("p-3-r", "stackit-logme2-1.2.50-replica"),
                    ],
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn resolves_plan_for_version() {
        let id = resolve_plan_id(&offerings(), "3", "stackit-logme2-1.2.50-replica").unwrap();
        assert_eq!(id, "p-3-r");
    }

    #[test]
    fn unknown_version_lists_available_versions() {
        let err = resolve_plan_id(&offerings(), "9", "any").unwrap_err();
        assert_eq!(
            err.to_string(),
            "couldn't find version '9', available versions are: 2, 3"
        );
    }

    #[test]
    fn unknown_plan_lists_available_names() {
        let err = resolve_plan_id(&offerings(), "2", "huge").unwrap_err();
        assert_eq!(
            err.to_string(),
            "couldn't find plan_name 'huge' for version 2, available names are: stackit-logme2-1.2.50-single"
        );
    }

    #[test]
    fn reverse_lookup_of_plan_id() {
        assert_eq!(
            plan_name_and_version(&offerings(), "p-3-s"),
            Some(("stackit-logme2-1.2.50-single".to_string(), "3".to_string()))
        );
        assert_eq!(plan_name_and_version(&offerings(), "missing"), None);
    }

    #[test]
    fn type_names_follow_service() {
        assert_eq!(LogMe::instance_type_name(), "stackit_logme_instance");
        assert_eq!(MariaDb::credential_type_name(), "stackit_mariadb_credential");
        assert_eq!(OpenSearch::DISPLAY_NAME, "OpenSearch");
    }
}
