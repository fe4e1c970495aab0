//! `stackit_ske_cluster`

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stackit_core::ProviderData;
use stackit_core::diagnostics::Diagnostics;
use stackit_core::error::{CoreError, CoreResult};
use stackit_core::ids::build_id;
use stackit_core::resource::{
    BoxFuture, CreateRequest, DataSource, DeleteRequest, ImportStateRequest, ReadDataSourceRequest,
    ReadRequest, Resource, Response, UpdateRequest, import_composite_id,
};
use stackit_core::schema::{AttributeSchema, AttributeType, ResourceSchema, Validator, common};
use stackit_core::types::{Attr, BoolAttr, IntAttr, ListAttr, MapAttr, StringAttr, list_from_api, string_list};
use stackit_sdk::ske::{
    self, Acl, AutoUpdate, Cluster, CreateOrUpdateClusterPayload, Cri, Extensions, Hibernation,
    HibernationSchedule, Image, Kubernetes, Machine, Maintenance, Network, Nodepool, ProviderOptions,
    SkeClient, Taint, TimeWindow, Volume,
};

use super::{WAIT_TIMEOUT_MINUTES, kubernetes_candidates, latest_matching_version, machine_image_candidates};
use crate::error::{ApiContext, ProviderResult};
use crate::utils::{
    configure_client, ensure_found, finish, is_gone, record_then_wait, require_client, wait_timeout,
};

pub const TYPE_NAME: &str = "stackit_ske_cluster";
const ID_FIELDS: &[&str] = &["project_id", "name"];

const DEFAULT_OS_NAME: &str = "flatcar";
const DEFAULT_VOLUME_TYPE: &str = "storage_premium_perf1";
const DEFAULT_VOLUME_SIZE: i64 = 20;
const DEFAULT_CRI: &str = "containerd";
const DEFAULT_MAX_SURGE: i64 = 1;
const DEFAULT_MAX_UNAVAILABLE: i64 = 0;

/// An updated cluster keeps reporting its previous state for a short while
const UPDATE_SETTLE_DELAY: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaintModel {
    pub effect: StringAttr,
    pub key: StringAttr,
    pub value: StringAttr,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodePool {
    pub name: StringAttr,
    pub machine_type: StringAttr,
    pub os_name: StringAttr,
    pub os_version_min: StringAttr,
    pub os_version_used: StringAttr,
    pub minimum: IntAttr,
    pub maximum: IntAttr,
    pub max_surge: IntAttr,
    pub max_unavailable: IntAttr,
    pub volume_type: StringAttr,
    pub volume_size: IntAttr,
    pub labels: MapAttr<String>,
    pub taints: ListAttr<TaintModel>,
    pub cri: StringAttr,
    pub availability_zones: ListAttr<String>,
}

impl NodePool {
    fn os_name(&self) -> String {
        self.os_name.to_option().unwrap_or_else(|| DEFAULT_OS_NAME.to_string())
    }

    /// `os_version_min` only lives in configuration and is carried over from `prior`
    fn from_api(pool: &Nodepool, prior: Option<&NodePool>) -> Self {
        let image = pool.machine.as_ref().and_then(|m| m.image.as_ref());
        let taints = pool.taints.as_ref().map(|taints| {
            taints
                .iter()
                .map(|t| TaintModel {
                    effect: Attr::from_option(t.effect.clone()),
                    key: Attr::from_option(t.key.clone()),
                    value: Attr::from_option(t.value.clone()),
                })
                .collect::<Vec<_>>()
        });
        let prior_taints = prior.map(|p| p.taints.clone()).unwrap_or_default();
        let prior_labels = prior.map(|p| p.labels.clone()).unwrap_or_default();

        Self {
            name: Attr::from_option(pool.name.clone()),
            machine_type: Attr::from_option(pool.machine.as_ref().and_then(|m| m.machine_type.clone())),
            os_name: Attr::from_option(image.and_then(|i| i.name.clone())),
            os_version_min: prior.map(|p| p.os_version_min.clone()).unwrap_or_default(),
            os_version_used: Attr::from_option(image.and_then(|i| i.version.clone())),
            minimum: Attr::from_option(pool.minimum),
            maximum: Attr::from_option(pool.maximum),
            max_surge: Attr::from_option(pool.max_surge),
            max_unavailable: Attr::from_option(pool.max_unavailable),
            volume_type: Attr::from_option(pool.volume.as_ref().and_then(|v| v.volume_type.clone())),
            volume_size: Attr::from_option(pool.volume.as_ref().and_then(|v| v.size)),
            labels: match &pool.labels {
                Some(labels) if !labels.is_empty() => Attr::Known(labels.clone()),
                _ if matches!(&prior_labels, Attr::Known(l) if l.is_empty()) => Attr::Known(BTreeMap::new()),
                _ => Attr::Null,
            },
            taints: list_from_api(&prior_taints, taints.as_deref()),
            cri: Attr::from_option(pool.cri.as_ref().and_then(|c| c.name.clone())),
            availability_zones: Attr::Known(pool.availability_zones.clone()),
        }
    }

    fn to_api(&self, os_version: &str) -> Nodepool {
        let taints = self.taints.value().map(|taints| {
            taints
                .iter()
                .map(|t| Taint {
                    effect: t.effect.to_option(),
                    key: t.key.to_option(),
                    value: t.value.to_option(),
                })
                .collect()
        });
        Nodepool {
            name: self.name.to_option(),
            machine: Some(Machine {
                machine_type: self.machine_type.to_option(),
                image: Some(Image {
                    name: Some(self.os_name()),
                    version: Some(os_version.to_string()),
                }),
            }),
            minimum: self.minimum.to_option(),
            maximum: self.maximum.to_option(),
            max_surge: Some(self.max_surge.to_option().unwrap_or(DEFAULT_MAX_SURGE)),
            max_unavailable: Some(self.max_unavailable.to_option().unwrap_or(DEFAULT_MAX_UNAVAILABLE)),
            volume: Some(Volume {
                volume_type: Some(
                    self.volume_type
                        .to_option()
                        .unwrap_or_else(|| DEFAULT_VOLUME_TYPE.to_string()),
                ),
                size: Some(self.volume_size.to_option().unwrap_or(DEFAULT_VOLUME_SIZE)),
            }),
            availability_zones: string_list(&self.availability_zones),
            labels: self.labels.to_option(),
            taints,
            cri: Some(Cri {
                name: Some(self.cri.to_option().unwrap_or_else(|| DEFAULT_CRI.to_string())),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceModel {
    pub enable_kubernetes_version_updates: BoolAttr,
    pub enable_machine_image_version_updates: BoolAttr,
    pub start: StringAttr,
    pub end: StringAttr,
}

impl MaintenanceModel {
    fn from_api(maintenance: &Maintenance) -> Self {
        let auto_update = maintenance.auto_update.as_ref();
        let window = maintenance.time_window.as_ref();
        Self {
            enable_kubernetes_version_updates: Attr::from_option(auto_update.and_then(|a| a.kubernetes_version)),
            enable_machine_image_version_updates: Attr::from_option(auto_update.and_then(|a| a.machine_image_version)),
            start: Attr::from_option(window.and_then(|w| w.start.clone())),
            end: Attr::from_option(window.and_then(|w| w.end.clone())),
        }
    }

    fn to_api(&self) -> Maintenance {
        Maintenance {
            auto_update: Some(AutoUpdate {
                kubernetes_version: self.enable_kubernetes_version_updates.to_option(),
                machine_image_version: self.enable_machine_image_version_updates.to_option(),
            }),
            time_window: Some(TimeWindow {
                start: self.start.to_option(),
                end: self.end.to_option(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HibernationModel {
    pub start: StringAttr,
    pub end: StringAttr,
    pub timezone: StringAttr,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclModel {
    pub enabled: BoolAttr,
    pub allowed_cidrs: ListAttr<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsModel {
    pub acl: Attr<AclModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkModel {
    pub id: StringAttr,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    pub id: StringAttr,
    pub project_id: StringAttr,
    pub name: StringAttr,
    pub kubernetes_version_min: StringAttr,
    pub kubernetes_version_used: StringAttr,
    pub node_pools: ListAttr<NodePool>,
    pub maintenance: Attr<MaintenanceModel>,
    pub hibernations: ListAttr<HibernationModel>,
    pub extensions: Attr<ExtensionsModel>,
    pub network: Attr<NetworkModel>,
    pub egress_address_ranges: ListAttr<String>,
}

fn node_pool_schema() -> AttributeType {
    let string = |name: &str, description: &str| AttributeSchema::new(name, AttributeType::String).with_description(description);
    let int = |name: &str, description: &str| AttributeSchema::new(name, AttributeType::Int).with_description(description);
    AttributeType::list_of(AttributeType::Object(vec![
        string("name", "Specifies the name of the node pool.")
            .required()
            .with_validator(Validator::LengthBetween(1, 15)),
        string("machine_type", "The machine type.").required(),
        string("os_name", "The name of the OS image. Defaults to `flatcar`.").optional_computed(),
        string("os_version_min", "The minimum OS image version. The newest matching supported version is used."),
        string("os_version_used", "Full OS image version used.").computed(),
        int("minimum", "Minimum number of nodes in the pool.")
            .required()
            .with_validator(Validator::IntBetween(1, 100)),
        int("maximum", "Maximum number of nodes in the pool.")
            .required()
            .with_validator(Validator::IntBetween(1, 100)),
        int("max_surge", "Maximum number of additional VMs that are created during an update.").optional_computed(),
        int("max_unavailable", "Maximum number of VMs that can be unavailable during an update.").optional_computed(),
        string("volume_type", "Specifies the volume type.").optional_computed(),
        int("volume_size", "The volume size in GB.").optional_computed(),
        AttributeSchema::new("labels", AttributeType::map_of(AttributeType::String))
            .with_description("Labels to add to each node."),
        AttributeSchema::new(
            "taints",
            AttributeType::list_of(AttributeType::Object(vec![
                string("effect", "The taint effect.")
                    .required()
                    .with_validator(Validator::one_of(&["NoSchedule", "PreferNoSchedule", "NoExecute"])),
                string("key", "Taint key to be applied to a node.").required(),
                string("value", "Taint value corresponding to the taint key."),
            ])),
        )
        .with_description("Specifies a taint list as defined in Kubernetes."),
        string("cri", "Specifies the container runtime. Defaults to `containerd`.").optional_computed(),
        AttributeSchema::new("availability_zones", AttributeType::list_of(AttributeType::String))
            .required()
            .with_description("Specify a list of availability zones."),
    ]))
}

pub fn schema() -> ResourceSchema {
    let bool_attr = |name: &str, description: &str| {
        AttributeSchema::new(name, AttributeType::Bool)
            .required()
            .with_description(description)
    };
    let time = |name: &str, description: &str| {
        AttributeSchema::new(name, AttributeType::String)
            .required()
            .with_description(description)
    };

    ResourceSchema::new(TYPE_NAME)
        .with_description("SKE Cluster Resource schema.")
        .attribute(common::id(ID_FIELDS))
        .attribute(common::project_id())
        .attribute(
            AttributeSchema::new("name", AttributeType::String)
                .required()
                .requires_replace()
                .with_validator(Validator::NoSeparator)
                .with_validator(Validator::LengthBetween(1, 11))
                .with_description("The cluster name."),
        )
        .attribute(
            AttributeSchema::new("kubernetes_version_min", AttributeType::String)
                .with_validator(Validator::pattern(r"^\d+\.\d+(\.\d+)?$", "must be major.minor or major.minor.patch"))
                .with_description("The minimum Kubernetes version. The newest matching supported version is used."),
        )
        .attribute(
            AttributeSchema::new("kubernetes_version_used", AttributeType::String)
                .computed()
                .with_description("Full Kubernetes version used."),
        )
        .attribute(
            AttributeSchema::new("node_pools", node_pool_schema())
                .required()
                .with_description("One or more node pools of the cluster."),
        )
        .attribute(
            AttributeSchema::new(
                "maintenance",
                AttributeType::Object(vec![
                    bool_attr("enable_kubernetes_version_updates", "Flag to enable/disable auto-updates of the Kubernetes version."),
                    bool_attr("enable_machine_image_version_updates", "Flag to enable/disable auto-updates of the OS image version."),
                    time("start", "Time for maintenance window start. E.g. `01:23:45Z`."),
                    time("end", "Time for maintenance window end. E.g. `05:00:00+02:00`."),
                ]),
            )
            .optional_computed()
            .with_description("A single maintenance block as defined below."),
        )
        .attribute(
            AttributeSchema::new(
                "hibernations",
                AttributeType::list_of(AttributeType::Object(vec![
                    time("start", "Start time of cluster hibernation in crontab syntax."),
                    time("end", "End time of hibernation in crontab syntax."),
                    AttributeSchema::new("timezone", AttributeType::String)
                        .optional_computed()
                        .with_description("Timezone name corresponding to a file in the IANA Time Zone database."),
                ])),
            )
            .with_description("One or more hibernation blocks."),
        )
        .attribute(
            AttributeSchema::new(
                "extensions",
                AttributeType::Object(vec![AttributeSchema::new(
                    "acl",
                    AttributeType::Object(vec![
                        bool_attr("enabled", "Is ACL enabled?"),
                        AttributeSchema::new("allowed_cidrs", AttributeType::list_of(AttributeType::String))
                            .required()
                            .with_description("Specify a list of CIDRs to whitelist."),
                    ]),
                )
                .with_description("Cluster access control configuration.")]),
            )
            .with_description("A single extensions block."),
        )
        .attribute(
            AttributeSchema::new(
                "network",
                AttributeType::Object(vec![
                    AttributeSchema::new("id", AttributeType::String)
                        .with_validator(Validator::Uuid)
                        .with_description("ID of the STACKIT Network Area (SNA) network into which the cluster will be deployed."),
                ]),
            )
            .with_description("Network block."),
        )
        .attribute(
            AttributeSchema::new("egress_address_ranges", AttributeType::list_of(AttributeType::String))
                .computed()
                .with_description("The outgoing network ranges (in CIDR notation) of traffic originating from workload on the cluster."),
        )
}

/// Versions sent to the API for one create or update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedVersions {
    pub kubernetes: String,
    /// Machine image version by node pool name
    pub machine_images: BTreeMap<String, String>,
}

/// Resolve every `*_version_min` against the provider options
///
/// `current` is the cluster as it runs now, if it exists.
pub fn resolve_versions(
    model: &Model,
    options: &ProviderOptions,
    current: Option<&Cluster>,
) -> ProviderResult<ResolvedVersions> {
    let current_kubernetes = current
        .and_then(|c| c.kubernetes.as_ref())
        .and_then(|k| k.version.as_deref());
    let kubernetes = latest_matching_version(
        &kubernetes_candidates(options),
        model.kubernetes_version_min.as_str(),
        current_kubernetes,
        "Kubernetes",
    )?;

    let mut machine_images = BTreeMap::new();
    for pool in model.node_pools.value().into_iter().flatten() {
        let name = pool.name.value_string();
        let os_name = pool.os_name();
        let current_image = current
            .into_iter()
            .flat_map(|c| c.nodepools.iter())
            .find(|p| p.name.as_deref() == Some(name.as_str()))
            .and_then(|p| p.machine.as_ref())
            .and_then(|m| m.image.as_ref())
            .filter(|i| i.name.as_deref() == Some(os_name.as_str()))
            .and_then(|i| i.version.as_deref());
        let version = latest_matching_version(
            &machine_image_candidates(options, &os_name),
            pool.os_version_min.as_str(),
            current_image,
            &format!("{} machine image", os_name),
        )?;
        machine_images.insert(name, version);
    }

    Ok(ResolvedVersions {
        kubernetes,
        machine_images,
    })
}

pub fn map_fields(response: Option<&Cluster>, model: Option<&mut Model>) -> CoreResult<()> {
    let response = response.ok_or_else(|| CoreError::mapping("response input is nil"))?;
    let model = model.ok_or_else(|| CoreError::mapping("model input is nil"))?;

    let name = match (&response.name, model.name.as_str()) {
        (Some(name), _) => name.clone(),
        (None, Some(name)) => name.to_string(),
        (None, None) => return Err(CoreError::mapping("cluster name not present")),
    };

    model.id = Attr::known(build_id(&[&model.project_id.value_string(), &name]));
    model.name = Attr::known(name);
    model.kubernetes_version_used =
        Attr::from_option(response.kubernetes.as_ref().and_then(|k| k.version.clone()));

    let prior_pools = model.node_pools.to_option().unwrap_or_default();
    model.node_pools = Attr::Known(
        response
            .nodepools
            .iter()
            .map(|pool| {
                let prior = prior_pools.iter().find(|p| p.name.as_str() == pool.name.as_deref());
                NodePool::from_api(pool, prior)
            })
            .collect(),
    );

    model.maintenance = Attr::from_option(response.maintenance.as_ref().map(MaintenanceModel::from_api));

    let schedules: Option<Vec<HibernationModel>> = response.hibernation.as_ref().map(|h| {
        h.schedules
            .iter()
            .map(|s| HibernationModel {
                start: Attr::from_option(s.start.clone()),
                end: Attr::from_option(s.end.clone()),
                timezone: Attr::from_option(s.timezone.clone()),
            })
            .collect()
    });
    model.hibernations = list_from_api(&model.hibernations, schedules.as_deref());

    let acl = response.extensions.as_ref().and_then(|e| e.acl.as_ref());
    model.extensions = match acl {
        Some(acl) => Attr::Known(ExtensionsModel {
            acl: Attr::Known(AclModel {
                enabled: Attr::from_option(acl.enabled),
                allowed_cidrs: Attr::Known(acl.allowed_cidrs.clone()),
            }),
        }),
        // Keep an explicitly disabled ACL block stable
        None => match &model.extensions {
            Attr::Known(e) if e.acl.value().is_some_and(|a| a.enabled.value() == Some(&false)) => {
                model.extensions.clone()
            }
            _ => Attr::Null,
        },
    };

    model.network = Attr::from_option(
        response
            .network
            .as_ref()
            .filter(|n| n.id.is_some())
            .map(|n| NetworkModel {
                id: Attr::from_option(n.id.clone()),
            }),
    );

    let egress = response.status.as_ref().map(|s| s.egress_address_ranges.as_slice());
    model.egress_address_ranges = list_from_api(&model.egress_address_ranges, egress);
    Ok(())
}

/// Full cluster specification, the API replaces the cluster with it
pub fn to_payload(model: Option<&Model>, versions: &ResolvedVersions) -> CoreResult<CreateOrUpdateClusterPayload> {
    let model = model.ok_or_else(|| CoreError::mapping("nil model"))?;

    let pools = model.node_pools.value().map(Vec::as_slice).unwrap_or_default();
    if pools.is_empty() {
        return Err(CoreError::mapping("at least one node pool is required"));
    }
    let mut nodepools = Vec::with_capacity(pools.len());
    for pool in pools {
        let name = pool.name.value_string();
        if let (Some(min), Some(max)) = (pool.minimum.value(), pool.maximum.value())
            && max < min
        {
            return Err(CoreError::mapping(format!(
                "node pool {}: maximum ({}) must not be lower than minimum ({})",
                name, max, min
            )));
        }
        let os_version = versions
            .machine_images
            .get(&name)
            .ok_or_else(|| CoreError::mapping(format!("no machine image version resolved for node pool {}", name)))?;
        nodepools.push(pool.to_api(os_version));
    }

    let hibernation = model.hibernations.value().map(|schedules| Hibernation {
        schedules: schedules
            .iter()
            .map(|s| HibernationSchedule {
                start: s.start.to_option(),
                end: s.end.to_option(),
                timezone: s.timezone.to_option(),
            })
            .collect(),
    });

    let extensions = model.extensions.value().map(|e| Extensions {
        acl: e.acl.value().map(|acl| Acl {
            enabled: acl.enabled.to_option(),
            allowed_cidrs: string_list(&acl.allowed_cidrs),
        }),
    });

    Ok(CreateOrUpdateClusterPayload {
        kubernetes: Some(Kubernetes {
            version: Some(versions.kubernetes.clone()),
        }),
        nodepools,
        maintenance: model.maintenance.value().map(MaintenanceModel::to_api),
        hibernation,
        extensions,
        network: model.network.value().map(|n| Network { id: n.id.to_option() }),
    })
}

#[derive(Default)]
pub struct ClusterResource {
    client: Option<SkeClient>,
    provider_data: ProviderData,
}

impl ClusterResource {
    /// PUT the specification and wait for the cluster to settle
    async fn apply_cluster(
        &self,
        mut model: Model,
        current: Option<&Cluster>,
        resp: &mut Response,
    ) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let project_id = model.project_id.value_string();
        let name = model.name.value_string();

        let options = client.list_provider_options().await.context("Calling API")?;
        let versions = resolve_versions(&model, &options, current)?;
        let payload = to_payload(Some(&model), &versions)?;
        log::debug!(
            "Cluster {} uses Kubernetes {} and machine images {:?}",
            name,
            versions.kubernetes,
            versions.machine_images
        );

        client
            .create_or_update_cluster(&project_id, &name, &payload)
            .await
            .context("Calling API")?;

        let id = build_id(&[&project_id, &name]);
        let mut handler = ske::wait::create_or_update_cluster_wait_handler(client, &project_id, &name)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES));
        if current.is_some() {
            handler = handler.set_sleep_before_wait(UPDATE_SETTLE_DELAY);
        }
        let wait = handler.wait();
        let cluster = record_then_wait(
            &mut resp.state,
            &[("id", id.as_str()), ("project_id", project_id.as_str()), ("name", name.as_str())],
            wait,
            "Waiting for cluster to become ready",
        )
        .await?;

        map_fields(Some(&cluster), Some(&mut model))?;
        resp.state.set(&model)?;
        Ok(())
    }

    async fn create_cluster(&self, req: CreateRequest, resp: &mut Response) -> ProviderResult<()> {
        let model: Model = req.plan.get()?;
        let name = model.name.value_string();
        self.apply_cluster(model, None, resp).await?;
        log::info!("Cluster {} created", name);
        Ok(())
    }

    async fn read_cluster(&self, req: ReadRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let mut model: Model = req.state.get()?;
        let project_id = model.project_id.value_string();
        let name = model.name.value_string();

        let cluster = match client.get_cluster(&project_id, &name).await.context("Calling API") {
            Ok(c) => c,
            Err(e) if is_gone(&e) => {
                resp.state.remove_resource();
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        map_fields(Some(&cluster), Some(&mut model))?;
        resp.state.set(&model)?;
        Ok(())
    }

    async fn update_cluster(&self, req: UpdateRequest, resp: &mut Response) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let model: Model = req.plan.get()?;
        let project_id = model.project_id.value_string();
        let name = model.name.value_string();

        let current = client.get_cluster(&project_id, &name).await.context("Calling API")?;
        self.apply_cluster(model, Some(&current), resp).await?;
        log::info!("Cluster {} updated", name);
        Ok(())
    }

    async fn delete_cluster(&self, req: DeleteRequest) -> ProviderResult<()> {
        let client = require_client(&self.client)?;
        let model: Model = req.state.get()?;
        let project_id = model.project_id.value_string();
        let name = model.name.value_string();

        match client.delete_cluster(&project_id, &name).await.context("Calling API") {
            Err(e) if is_gone(&e) => return Ok(()),
            Err(e) => return Err(e),
            Ok(()) => {}
        }
        ske::wait::delete_cluster_wait_handler(client, &project_id, &name)
            .set_timeout(wait_timeout(&self.provider_data, WAIT_TIMEOUT_MINUTES))
            .wait()
            .await
            .context("Waiting for cluster deletion")?;
        log::info!("Cluster {} deleted", name);
        Ok(())
    }
}

impl Resource for ClusterResource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_ske_cluster", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        schema()
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.client = configure_client(provider_data, ske::SERVICE, SkeClient::new, diags);
        self.provider_data = provider_data.clone();
    }

    fn create(&self, req: CreateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.create_cluster(req, &mut resp).await;
            finish(resp, result, "Error creating cluster")
        })
    }

    fn read(&self, req: ReadRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.read_cluster(req, &mut resp).await;
            finish(resp, result, "Error reading cluster")
        })
    }

    fn update(&self, req: UpdateRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self.update_cluster(req, &mut resp).await;
            finish(resp, result, "Error updating cluster")
        })
    }

    fn delete(&self, req: DeleteRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let result = self.delete_cluster(req).await;
            finish(Response::default(), result, "Error deleting cluster")
        })
    }

    fn import_state(&self, req: ImportStateRequest) -> Response {
        import_composite_id(&req.id, ID_FIELDS, "Error importing cluster")
    }
}

#[derive(Default)]
pub struct ClusterDataSource {
    resource: ClusterResource,
}

impl DataSource for ClusterDataSource {
    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_ske_cluster", provider_type_name)
    }

    fn schema(&self) -> ResourceSchema {
        schema().as_data_source(TYPE_NAME, ID_FIELDS)
    }

    fn configure(&mut self, provider_data: &ProviderData, diags: &mut Diagnostics) {
        self.resource.configure(provider_data, diags);
    }

    fn read(&self, req: ReadDataSourceRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            let mut resp = Response::default();
            let result = self
                .resource
                .read_cluster(ReadRequest { state: req.config }, &mut resp)
                .await
                .and_then(|_| ensure_found(&resp.state, "Cluster"));
            finish(resp, result, "Error reading cluster")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stackit_core::differ::{Diff, diff};
    use stackit_sdk::ske::{ClusterStatus, KubernetesVersion, MachineImage, MachineImageVersion};

    fn options() -> ProviderOptions {
        ProviderOptions {
            kubernetes_versions: vec![
                KubernetesVersion {
                    version: Some("1.29.4".to_string()),
                    state: Some("supported".to_string()),
                    expiration_date: None,
                },
                KubernetesVersion {
                    version: Some("1.29.7".to_string()),
                    state: Some("supported".to_string()),
                    expiration_date: None,
                },
            ],
            machine_images: vec![MachineImage {
                name: Some("flatcar".to_string()),
                versions: vec![
                    MachineImageVersion {
                        version: Some("3815.2.1".to_string()),
                        state: Some("supported".to_string()),
                        ..Default::default()
                    },
                    MachineImageVersion {
                        version: Some("3815.2.5".to_string()),
                        state: Some("supported".to_string()),
                        ..Default::default()
                    },
                ],
            }],
        }
    }

    fn model() -> Model {
        serde_json::from_value(json!({
            "project_id": "pid",
            "name": "demo",
            "kubernetes_version_min": "1.29",
            "node_pools": [{
                "name": "np",
                "machine_type": "c1.2",
                "os_version_min": "3815.2",
                "minimum": 1,
                "maximum": 3,
                "availability_zones": ["eu01-1"]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn versions_resolve_to_newest_patch() {
        let versions = resolve_versions(&model(), &options(), None).unwrap();
        assert_eq!(versions.kubernetes, "1.29.7");
        assert_eq!(versions.machine_images.get("np").map(String::as_str), Some("3815.2.5"));
    }

    #[test]
    fn unknown_os_image_fails() {
        let mut model = model();
        if let Attr::Known(pools) = &mut model.node_pools {
            pools[0].os_name = Attr::known("ubuntu");
        }
        let err = resolve_versions(&model, &options(), None).unwrap_err();
        assert!(err.to_string().contains("ubuntu machine image"));
    }

    #[test]
    fn payload_applies_defaults() {
        let versions = resolve_versions(&model(), &options(), None).unwrap();
        let payload = to_payload(Some(&model()), &versions).unwrap();
        let pool = &payload.nodepools[0];
        assert_eq!(pool.volume.as_ref().unwrap().size, Some(DEFAULT_VOLUME_SIZE));
        assert_eq!(pool.cri.as_ref().unwrap().name.as_deref(), Some("containerd"));
        assert_eq!(
            pool.machine.as_ref().unwrap().image.as_ref().unwrap().version.as_deref(),
            Some("3815.2.5")
        );
        assert!(payload.maintenance.is_none());
        assert!(payload.network.is_none());
    }

    #[test]
    fn payload_rejects_inverted_scaling() {
        let mut model = model();
        if let Attr::Known(pools) = &mut model.node_pools {
            pools[0].minimum = Attr::Known(5);
        }
        let versions = resolve_versions(&model, &options(), None).unwrap();
        assert!(to_payload(Some(&model), &versions).is_err());
        assert!(to_payload(None, &versions).is_err());
    }

    #[test]
    fn map_fields_keeps_configured_minimums() {
        let mut model = model();
        let versions = resolve_versions(&model, &options(), None).unwrap();
        let payload = to_payload(Some(&model), &versions).unwrap();
        let response = Cluster {
            name: Some("demo".to_string()),
            kubernetes: payload.kubernetes.clone(),
            nodepools: payload.nodepools.clone(),
            status: Some(ClusterStatus {
                aggregated: Some(ske::CLUSTER_STATE_HEALTHY.to_string()),
                egress_address_ranges: vec!["193.148.160.0/19".to_string()],
                ..Default::default()
            }),
            ..Default::default()
        };

        map_fields(Some(&response), Some(&mut model)).unwrap();
        assert_eq!(model.id, Attr::known("pid,demo"));
        assert_eq!(model.kubernetes_version_min, Attr::known("1.29"));
        assert_eq!(model.kubernetes_version_used, Attr::known("1.29.7"));
        let pool = &model.node_pools.value().unwrap()[0];
        assert_eq!(pool.os_version_min, Attr::known("3815.2"));
        assert_eq!(pool.os_version_used, Attr::known("3815.2.5"));
        assert_eq!(pool.os_name, Attr::known("flatcar"));
        assert!(pool.taints.is_null());
        assert_eq!(model.egress_address_ranges.value().map(Vec::len), Some(1));
        assert!(model.extensions.is_null());
    }

    #[test]
    fn unchanged_config_plans_nothing_after_defaults_are_filled() {
        let config = json!({
            "project_id": "pid",
            "name": "demo",
            "kubernetes_version_min": "1.29",
            "node_pools": [{
                "name": "np",
                "machine_type": "c1.2",
                "os_version_min": "3815.2",
                "minimum": 1,
                "maximum": 3,
                "availability_zones": ["eu01-1"]
            }]
        });
        let mut model: Model = serde_json::from_value(config.clone()).unwrap();
        let versions = resolve_versions(&model, &options(), None).unwrap();
        let payload = to_payload(Some(&model), &versions).unwrap();
        let response = Cluster {
            name: Some("demo".to_string()),
            kubernetes: payload.kubernetes.clone(),
            nodepools: payload.nodepools.clone(),
            ..Default::default()
        };
        map_fields(Some(&response), Some(&mut model)).unwrap();
        let state = serde_json::to_value(&model).unwrap();
        assert_eq!(state["node_pools"][0]["cri"], json!("containerd"));

        assert_eq!(diff(&schema(), &config, Some(&state)), Diff::NoChange);

        let mut scaled = config.clone();
        scaled["node_pools"][0]["maximum"] = json!(5);
        assert_eq!(
            diff(&schema(), &scaled, Some(&state)),
            Diff::Update {
                changed: vec!["node_pools".to_string()]
            }
        );
    }

    #[test]
    fn running_versions_are_not_downgraded() {
        let current = Cluster {
            kubernetes: Some(Kubernetes {
                version: Some("1.30.0".to_string()),
            }),
            ..Default::default()
        };
        let versions = resolve_versions(&model(), &options(), Some(&current)).unwrap();
        assert_eq!(versions.kubernetes, "1.30.0");
    }

    #[test]
    fn map_fields_requires_name() {
        let mut model = Model::default();
        assert!(map_fields(Some(&Cluster::default()), Some(&mut model)).is_err());
        assert!(map_fields(None, Some(&mut model)).is_err());
    }

    #[test]
    fn schema_validates_node_pool_blocks() {
        let schema = schema();
        let config = json!({
            "project_id": "7e5cf5f1-8a7c-4c5d-9f8e-4c1f2e3d4a5b",
            "name": "demo",
            "kubernetes_version_min": "1.29",
            "node_pools": [{
                "name": "np",
                "machine_type": "c1.2",
                "minimum": 1,
                "maximum": 3,
                "availability_zones": ["eu01-1"],
                "taints": [{"effect": "NoSchedule", "key": "dedicated"}]
            }]
        });
        assert!(schema.validate(&config).is_ok());

        let config = json!({
            "project_id": "7e5cf5f1-8a7c-4c5d-9f8e-4c1f2e3d4a5b",
            "name": "demo",
            "node_pools": [{"name": "np"}]
        });
        assert!(schema.validate(&config).is_err());
    }
}
