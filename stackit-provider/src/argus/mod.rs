//! Argus monitoring instances and their credentials

pub mod credential;
pub mod instance;

use stackit_sdk::argus::Plan;

use crate::error::{ProviderError, ProviderResult};

pub(crate) const WAIT_TIMEOUT_MINUTES: u64 = 20;

/// Plan id for a plan name
pub fn resolve_plan_id(plans: &[Plan], plan_name: &str) -> ProviderResult<String> {
    if let Some(id) = plans
        .iter()
        .find(|p| p.name.as_deref() == Some(plan_name))
        .and_then(|p| p.plan_id.clone())
    {
        return Ok(id);
    }
    let available = plans
        .iter()
        .filter_map(|p| p.name.as_deref())
        .collect::<Vec<_>>()
        .join(", ");
    Err(ProviderError::invalid(format!(
        "couldn't find plan_name '{}', available names are: {}",
        plan_name, available
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plans() -> Vec<Plan> {
        ["Monitoring-Basic-EU01", "Monitoring-Medium-EU01"]
            .iter()
            .enumerate()
            .map(|(i, name)| Plan {
                plan_id: Some(format!("plan-{}", i)),
                name: Some(name.to_string()),
                description: None,
            })
            .collect()
    }

    #[test]
    fn plan_name_resolves_to_id() {
        assert_eq!(resolve_plan_id(&plans(), "Monitoring-Medium-EU01").unwrap(), "plan-1");
    }

    #[test]
    fn unknown_plan_lists_names() {
        let err = resolve_plan_id(&plans(), "Monitoring-Large-EU01").unwrap_err().to_string();
        assert!(err.contains("available names are: Monitoring-Basic-EU01, Monitoring-Medium-EU01"));
    }
}
