//! PostgreSQL Flex instances, users and databases

pub mod database;
pub mod instance;
pub mod user;

use stackit_sdk::postgresflex::Flavor;

use crate::error::{ProviderError, ProviderResult};

pub(crate) const WAIT_TIMEOUT_MINUTES: u64 = 45;

/// Find the flavor with exactly `cpu` cores and `ram` GB of memory
pub fn resolve_flavor(flavors: &[Flavor], cpu: i64, ram: i64) -> ProviderResult<Flavor> {
    if let Some(flavor) = flavors
        .iter()
        .find(|f| f.cpu == Some(cpu) && f.memory == Some(ram) && f.id.is_some())
    {
        return Ok(flavor.clone());
    }
    let available = flavors
        .iter()
        .filter_map(|f| Some(format!("\n- cpu={} ram={}", f.cpu?, f.memory?)))
        .collect::<String>();
    Err(ProviderError::invalid(format!(
        "couldn't find flavor with cpu={} ram={}, available specs are:{}",
        cpu, ram, available
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flavor(id: &str, cpu: i64, memory: i64) -> Flavor {
        Flavor {
            id: Some(id.to_string()),
            cpu: Some(cpu),
            memory: Some(memory),
            description: Some(format!("{} cores, {} GB", cpu, memory)),
        }
    }

    #[test]
    fn flavor_matches_cpu_and_ram() {
        let flavors = vec![flavor("2.4", 2, 4), flavor("4.8", 4, 8)];
        assert_eq!(resolve_flavor(&flavors, 4, 8).unwrap().id.as_deref(), Some("4.8"));
    }

    #[test]
    fn missing_flavor_lists_available_specs() {
        let flavors = vec![flavor("2.4", 2, 4), flavor("4.8", 4, 8)];
        let err = resolve_flavor(&flavors, 2, 8).unwrap_err().to_string();
        assert!(err.contains("cpu=2 ram=8"));
        assert!(err.contains("- cpu=2 ram=4"));
        assert!(err.contains("- cpu=4 ram=8"));
    }
}
