//! Registry of every resource and data source the provider serves
//!
//! The Data Service Access trio shares one implementation, instantiated once
//! per service marker.

use stackit_core::resource::{DataSource, Resource};

use crate::dsa::{LogMe, MariaDb, OpenSearch};
use crate::{argus, dsa, kms, postgresflex, resourcemanager, scf, ske};

macro_rules! dsa_resources {
    ($($service:ty),*) => {
        vec![$(
            Box::new(dsa::instance::InstanceResource::<$service>::default()) as Box<dyn Resource>,
            Box::new(dsa::credential::CredentialResource::<$service>::default()) as Box<dyn Resource>,
        )*]
    };
}

macro_rules! dsa_data_sources {
    ($($service:ty),*) => {
        vec![$(
            Box::new(dsa::instance::InstanceDataSource::<$service>::default()) as Box<dyn DataSource>,
            Box::new(dsa::credential::CredentialDataSource::<$service>::default()) as Box<dyn DataSource>,
        )*]
    };
}

/// Returns all managed resources supported by this provider
pub fn resources() -> Vec<Box<dyn Resource>> {
    let mut resources: Vec<Box<dyn Resource>> = vec![
        Box::new(kms::keyring::KeyRingResource::default()),
        Box::new(kms::key::KeyResource::default()),
        Box::new(kms::wrapping_key::WrappingKeyResource::default()),
        Box::new(resourcemanager::project::ProjectResource::default()),
        Box::new(resourcemanager::folder::FolderResource::default()),
        Box::new(scf::organization::OrganizationResource::default()),
        Box::new(ske::cluster::ClusterResource::default()),
        Box::new(ske::kubeconfig::KubeconfigResource::default()),
        Box::new(postgresflex::instance::InstanceResource::default()),
        Box::new(postgresflex::user::UserResource::default()),
        Box::new(postgresflex::database::DatabaseResource::default()),
        Box::new(argus::instance::InstanceResource::default()),
        Box::new(argus::credential::CredentialResource::default()),
    ];
    resources.extend(dsa_resources!(LogMe, OpenSearch, MariaDb));
    resources
}

/// Returns all data sources supported by this provider
pub fn data_sources() -> Vec<Box<dyn DataSource>> {
    let mut data_sources: Vec<Box<dyn DataSource>> = vec![
        Box::new(kms::keyring::KeyRingDataSource::default()),
        Box::new(kms::key::KeyDataSource::default()),
        Box::new(resourcemanager::project::ProjectDataSource::default()),
        Box::new(resourcemanager::folder::FolderDataSource::default()),
        Box::new(scf::organization::OrganizationDataSource::default()),
        Box::new(scf::platform::PlatformDataSource::default()),
        Box::new(ske::cluster::ClusterDataSource::default()),
        Box::new(postgresflex::instance::InstanceDataSource::default()),
        Box::new(postgresflex::user::UserDataSource::default()),
        Box::new(postgresflex::database::DatabaseDataSource::default()),
        Box::new(argus::instance::InstanceDataSource::default()),
    ];
    data_sources.extend(dsa_data_sources!(LogMe, OpenSearch, MariaDb));
    data_sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::provider::TYPE_NAME;

    #[test]
    fn resource_names_match_schemas() {
        let mut seen = BTreeSet::new();
        for resource in resources() {
            let name = resource.metadata(TYPE_NAME);
            assert_eq!(resource.schema().type_name, name);
            assert!(seen.insert(name.clone()), "duplicate resource {}", name);
        }
        assert_eq!(seen.len(), 19);
        assert!(seen.contains("stackit_opensearch_credential"));
    }

    #[test]
    fn data_source_names_match_schemas() {
        let mut seen = BTreeSet::new();
        for data_source in data_sources() {
            let name = data_source.metadata(TYPE_NAME);
            assert_eq!(data_source.schema().type_name, name);
            assert!(seen.insert(name.clone()), "duplicate data source {}", name);
        }
        assert_eq!(seen.len(), 17);
        assert!(seen.contains("stackit_scf_platform"));
        assert!(!seen.contains("stackit_ske_kubeconfig"));
    }

    #[test]
    fn data_source_schemas_have_no_optional_attributes() {
        for data_source in data_sources() {
            let schema = data_source.schema();
            for attribute in &schema.attributes {
                assert!(
                    attribute.is_required() || attribute.is_computed(),
                    "{}.{} is neither required nor computed",
                    schema.type_name,
                    attribute.name
                );
            }
        }
    }
}
