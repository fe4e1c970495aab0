mod config;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{Value, json};

use stackit_core::Diagnostics;
use stackit_core::differ::{DesiredResource, create_plan, planned_state};
use stackit_core::plan::{Effect, Plan, ResourceAddress};
use stackit_core::resource::{
    CreateRequest, DeleteRequest, ImportStateRequest, ReadDataSourceRequest, ReadRequest, Resource,
    State, UpdateRequest,
};
use stackit_core::schema::ResourceSchema;
use stackit_provider::StackitProvider;
use stackit_state::{LockInfo, ResourceMode, ResourceState, StateBackend, StateFile, create_backend};

use config::{Block, HostConfig, reference_values, resolve, sort_by_dependencies, unresolved};

const DEFAULT_CONFIG: &str = "stackit.json";

#[derive(Parser)]
#[command(name = "stackit-tf")]
#[command(about = "Manage STACKIT resources from a JSON configuration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate {
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Destroy every managed resource recorded in the state
    Destroy {
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Bring an existing remote object under management
    Import {
        file: PathBuf,
        /// Resource address, e.g. stackit_kms_keyring.main
        address: String,
        /// Import identifier, e.g. [project_id],[region],[keyring_id]
        id: String,
    },
    /// Release a state lock left behind by an interrupted run
    ForceUnlock {
        /// Lock ID reported by the failed command
        lock_id: String,

        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
    /// Print resource and data source schemas as JSON
    Schema {
        /// Only this type
        type_name: Option<String>,
    },
    /// State inspection commands
    State {
        #[command(subcommand)]
        command: StateCommands,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List stored addresses and ids
    List {
        #[arg(default_value = DEFAULT_CONFIG)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&file).await,
        Commands::Apply { file } => run_apply(&file).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&file, auto_approve).await,
        Commands::Import { file, address, id } => run_import(&file, &address, &id).await,
        Commands::ForceUnlock { lock_id, file } => run_force_unlock(&file, &lock_id).await,
        Commands::Schema { type_name } => run_schema(type_name.as_deref()),
        Commands::State {
            command: StateCommands::List { file },
        } => run_state_list(&file).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_validate(file: &Path) -> Result<(), String> {
    let config = HostConfig::load(file)?;
    println!("{}", "Validating...".cyan());

    let mut errors = config.check().err().unwrap_or_default();
    for (prefix, blocks) in [("data.", &config.data), ("", &config.resources)] {
        if let Err(e) = sort_by_dependencies(blocks, prefix) {
            errors.push(e);
        }
    }

    let provider = StackitProvider::new();
    for (data, blocks) in [(true, &config.data), (false, &config.resources)] {
        for block in blocks {
            let diags = provider.validate_config(&block.resource_type, data, &block.config());
            let prefix = if data { "data." } else { "" };
            errors.extend(diags.errors().map(|d| format!("{}{}: {}", prefix, block.address(), d)));
        }
    }

    if !errors.is_empty() {
        for error in &errors {
            println!("  {} {}", "✗".red(), error);
        }
        return Err(format!("{} validation error(s)", errors.len()));
    }

    println!(
        "{}",
        format!(
            "✓ {} blocks validated successfully.",
            config.data.len() + config.resources.len()
        )
        .green()
        .bold()
    );
    for block in &config.data {
        println!("  • data.{}", block.address());
    }
    for block in &config.resources {
        println!("  • {}", block.address());
    }
    Ok(())
}

async fn run_plan(file: &Path) -> Result<(), String> {
    let session = Session::open(file).await?;
    let mut state = session.load_state().await?;
    session.read_data_sources(&mut state).await?;
    session.refresh(&mut state).await?;
    let plan = session.build_plan(&state)?;
    print_plan(&plan);
    Ok(())
}

async fn run_apply(file: &Path) -> Result<(), String> {
    let session = Session::open(file).await?;
    let lock = session.lock("apply").await?;
    let result = session.apply().await;
    session.unlock(&lock).await;
    result
}

async fn run_destroy(file: &Path, auto_approve: bool) -> Result<(), String> {
    let session = Session::open(file).await?;
    let state = session.load_state().await?;
    let order = state.managed_order();
    if order.is_empty() {
        println!("{}", "No managed resources in state.".yellow());
        return Ok(());
    }

    if !auto_approve {
        println!("{}", "The following resources will be destroyed:".red().bold());
        for address in order.iter().rev() {
            println!("  {} {}", "-".red().bold(), address);
        }
        println!();
        println!("  {}", "This action cannot be undone. Type 'yes' to confirm.".yellow());
        print!("\n  Enter a value: ");
        std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input).map_err(|e| e.to_string())?;
        if input.trim() != "yes" {
            println!();
            println!("{}", "Destroy cancelled.".yellow());
            return Ok(());
        }
        println!();
    }

    let lock = session.lock("destroy").await?;
    let result = session.destroy().await;
    session.unlock(&lock).await;
    result
}

async fn run_import(file: &Path, address: &str, id: &str) -> Result<(), String> {
    let address = ResourceAddress::parse(address)
        .ok_or_else(|| format!("Invalid address '{}', expected <type>.<name>", address))?;
    let session = Session::open(file).await?;
    session.block(&address)?;
    let lock = session.lock("import").await?;
    let result = session.import(&address, id).await;
    session.unlock(&lock).await;
    result
}

fn run_schema(type_name: Option<&str>) -> Result<(), String> {
    let provider = StackitProvider::new();
    let output = match type_name {
        Some(t) => {
            let resource = provider.resource(t).map(|r| r.schema());
            let data_source = provider.data_source(t).map(|d| d.schema());
            if resource.is_none() && data_source.is_none() {
                return Err(format!("Unknown type {}", t));
            }
            json!({"resource": resource, "data_source": data_source})
        }
        None => {
            let resources: Vec<ResourceSchema> = provider
                .resource_types()
                .iter()
                .filter_map(|t| provider.resource(t))
                .map(|r| r.schema())
                .collect();
            let data_sources: Vec<ResourceSchema> = provider
                .data_source_types()
                .iter()
                .filter_map(|t| provider.data_source(t))
                .map(|d| d.schema())
                .collect();
            json!({"provider": provider.schema(), "resources": resources, "data_sources": data_sources})
        }
    };
    println!("{}", serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?);
    Ok(())
}

async fn run_state_list(file: &Path) -> Result<(), String> {
    let config = HostConfig::load(file)?;
    let backend = create_backend(&config.backend).await.map_err(|e| e.to_string())?;
    let Some(state) = backend.read_state().await.map_err(|e| e.to_string())? else {
        println!("{}", "No state.".yellow());
        return Ok(());
    };
    for resource in &state.resources {
        let prefix = match resource.mode {
            ResourceMode::Managed => "",
            ResourceMode::Data => "data.",
        };
        println!(
            "{}{}  {}",
            prefix,
            resource.address(),
            resource.id.as_deref().unwrap_or("-").dimmed()
        );
    }
    Ok(())
}

async fn run_force_unlock(file: &Path, lock_id: &str) -> Result<(), String> {
    let config = HostConfig::load(file)?;
    let backend = create_backend(&config.backend).await.map_err(|e| e.to_string())?;
    backend.force_unlock(lock_id).await.map_err(|e| e.to_string())?;
    println!("{}", format!("State lock {} released.", lock_id).green());
    Ok(())
}

/// Print diagnostics of one block, failing when any of them is an error
fn report(address: &str, diags: &Diagnostics) -> Result<(), String> {
    for diag in diags.iter() {
        if diag.is_error() {
            eprintln!("  {} {}: {}", "Error".red().bold(), address, diag);
        } else {
            eprintln!("  {} {}: {}", "Warning".yellow().bold(), address, diag);
        }
    }
    if diags.has_error() {
        Err(format!("{} failed", address))
    } else {
        Ok(())
    }
}

/// Symbol and plain description of one effect
fn describe_effect(effect: &Effect) -> (&'static str, String) {
    match effect {
        Effect::Read(a) => ("<=", format!("data.{}", a)),
        Effect::Create(a) => ("+", a.to_string()),
        Effect::Update { address, changed } => ("~", format!("{} ({})", address, changed.join(", "))),
        Effect::Replace {
            address, forced_by, ..
        } => ("-/+", format!("{} (forced by {})", address, forced_by.join(", "))),
        Effect::Delete(a) => ("-", a.to_string()),
    }
}

fn print_plan(plan: &Plan) {
    if plan.mutation_count() == 0 {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();
    for effect in plan.effects() {
        let (symbol, text) = describe_effect(effect);
        let symbol = match effect {
            Effect::Read(_) => symbol.normal(),
            Effect::Create(_) => symbol.green().bold(),
            Effect::Update { .. } => symbol.yellow().bold(),
            Effect::Replace { .. } | Effect::Delete(_) => symbol.red().bold(),
        };
        println!("  {} {}", symbol, text);
    }
    println!();
    println!("{}", plan.summary().to_string().bold());
}

/// Configuration, configured provider and state backend of one command
struct Session {
    config: HostConfig,
    provider: StackitProvider,
    backend: Box<dyn StateBackend>,
}

impl Session {
    async fn open(file: &Path) -> Result<Self, String> {
        let config = HostConfig::load(file)?;
        config.check().map_err(|errors| errors.join("\n"))?;

        let mut provider = StackitProvider::new();
        let diags = provider.configure(&config.provider);
        report("provider", &diags)?;

        let backend = create_backend(&config.backend).await.map_err(|e| e.to_string())?;
        Ok(Self {
            config,
            provider,
            backend,
        })
    }

    async fn lock(&self, operation: &str) -> Result<LockInfo, String> {
        self.backend.acquire_lock(operation).await.map_err(|e| e.to_string())
    }

    async fn unlock(&self, lock: &LockInfo) {
        if let Err(e) = self.backend.release_lock(lock).await {
            log::warn!("Failed to release state lock {}: {}", lock.id, e);
        }
    }

    async fn load_state(&self) -> Result<StateFile, String> {
        let state = self.backend.read_state().await.map_err(|e| e.to_string())?;
        Ok(state.unwrap_or_default())
    }

    async fn save_state(&self, state: &mut StateFile) -> Result<(), String> {
        state.increment_serial();
        self.backend.write_state(state).await.map_err(|e| e.to_string())
    }

    fn resource(&self, type_name: &str) -> Result<&dyn Resource, String> {
        self.provider
            .resource(type_name)
            .ok_or_else(|| format!("Unsupported resource type {}", type_name))
    }

    fn block(&self, address: &ResourceAddress) -> Result<&Block, String> {
        self.config
            .resources
            .iter()
            .find(|b| &b.address() == address)
            .ok_or_else(|| format!("{} is not declared in the configuration", address))
    }

    /// Resolve references of a block against the state, failing on leftovers
    fn resolved_config(&self, name: &str, block: &Block, state: &StateFile) -> Result<Value, String> {
        let config = resolve(&block.config(), &reference_values(state));
        let pending = unresolved(&config);
        if pending.is_empty() {
            Ok(config)
        } else {
            Err(format!("{}: unresolved references {}", name, pending.join(", ")))
        }
    }

    async fn read_data_sources(&self, state: &mut StateFile) -> Result<(), String> {
        for block in sort_by_dependencies(&self.config.data, "data.")? {
            let address = block.address();
            let name = format!("data.{}", address);
            let config = self.resolved_config(&name, block, state)?;
            let data_source = self
                .provider
                .data_source(&block.resource_type)
                .ok_or_else(|| format!("Unsupported data source type {}", block.resource_type))?;

            let resp = data_source
                .read(ReadDataSourceRequest {
                    config: State::new(config),
                })
                .await;
            report(&name, &resp.diagnostics)?;
            state.upsert(ResourceState::data(&address, resp.state.into_raw().unwrap_or(Value::Null)));
            log::info!("{} read", name);
        }
        Ok(())
    }

    /// Read every managed resource, dropping the ones that are gone
    async fn refresh(&self, state: &mut StateFile) -> Result<(), String> {
        for address in state.managed_order() {
            let resource = self.resource(&address.resource_type)?;
            let Some(stored) = state.find(ResourceMode::Managed, &address) else {
                continue;
            };
            let resp = resource
                .read(ReadRequest {
                    state: State::new(stored.attributes.clone()),
                })
                .await;
            report(&address.to_string(), &resp.diagnostics)?;
            match resp.state.into_raw() {
                Some(attributes) => state.upsert(ResourceState::managed(&address, attributes)),
                None => {
                    println!("  {} {} no longer exists", "!".yellow(), address);
                    state.remove(ResourceMode::Managed, &address);
                }
            }
        }
        Ok(())
    }

    fn build_plan(&self, state: &StateFile) -> Result<Plan, String> {
        let sorted = sort_by_dependencies(&self.config.resources, "")?;
        let values = reference_values(state);
        let schemas = sorted
            .iter()
            .map(|b| self.resource(&b.resource_type).map(|r| r.schema()))
            .collect::<Result<Vec<_>, _>>()?;
        let desired: Vec<DesiredResource<'_>> = sorted
            .iter()
            .zip(&schemas)
            .map(|(block, schema)| DesiredResource {
                address: block.address(),
                schema,
                config: resolve(&block.config(), &values),
            })
            .collect();

        let mut plan = Plan::new();
        for block in &self.config.data {
            plan.add(Effect::Read(block.address()));
        }
        let changes = create_plan(&desired, &state.managed_attributes(), &state.managed_order());
        for effect in changes.effects() {
            plan.add(effect.clone());
        }
        Ok(plan)
    }

    async fn apply(&self) -> Result<(), String> {
        let mut state = self.load_state().await?;
        self.read_data_sources(&mut state).await?;
        self.refresh(&mut state).await?;
        self.save_state(&mut state).await?;

        let plan = self.build_plan(&state)?;
        print_plan(&plan);
        if plan.mutation_count() == 0 {
            return Ok(());
        }

        println!();
        println!("{}", "Applying changes...".cyan().bold());
        let mut applied = 0;
        for effect in plan.effects() {
            let outcome = match effect {
                Effect::Read(_) => continue,
                Effect::Create(address) => self.create(address, &mut state).await,
                Effect::Update { address, .. } => self.update(address, &mut state).await,
                Effect::Replace { address, .. } => match self.delete(address, &mut state).await {
                    Ok(()) => self.create(address, &mut state).await,
                    Err(e) => Err(e),
                },
                Effect::Delete(address) => self.delete(address, &mut state).await,
            };
            // partial results, such as ids written before a failed wait, are kept
            self.save_state(&mut state).await?;
            outcome?;

            let (_, text) = describe_effect(effect);
            println!("  {} {}", "✓".green(), text);
            applied += 1;
        }

        println!();
        println!(
            "{}",
            format!("Apply complete! {} change(s) applied.", applied).green().bold()
        );
        Ok(())
    }

    async fn destroy(&self) -> Result<(), String> {
        let mut state = self.load_state().await?;
        for address in state.managed_order().into_iter().rev() {
            let outcome = self.delete(&address, &mut state).await;
            self.save_state(&mut state).await?;
            outcome?;
            println!("  {} {}", "✓".green(), address);
        }
        println!("{}", "Destroy complete!".green().bold());
        Ok(())
    }

    async fn import(&self, address: &ResourceAddress, id: &str) -> Result<(), String> {
        let mut state = self.load_state().await?;
        if state.find(ResourceMode::Managed, address).is_some() {
            return Err(format!("{} is already managed", address));
        }
        let resource = self.resource(&address.resource_type)?;

        let imported = resource.import_state(ImportStateRequest { id: id.to_string() });
        report(&address.to_string(), &imported.diagnostics)?;
        let resp = resource.read(ReadRequest { state: imported.state }).await;
        report(&address.to_string(), &resp.diagnostics)?;
        let attributes = resp
            .state
            .into_raw()
            .ok_or_else(|| format!("Cannot import non-existent remote object {}", id))?;

        state.upsert(ResourceState::managed(address, attributes));
        self.save_state(&mut state).await?;
        println!("{}", format!("✓ Imported {}", address).green().bold());
        Ok(())
    }

    async fn create(&self, address: &ResourceAddress, state: &mut StateFile) -> Result<(), String> {
        let block = self.block(address)?;
        let resource = self.resource(&block.resource_type)?;
        let config = self.resolved_config(&address.to_string(), block, state)?;
        let planned = planned_state(&resource.schema(), &config, None);

        let resp = resource
            .create(CreateRequest {
                plan: State::new(planned),
                config: State::new(config),
            })
            .await;
        if let Some(attributes) = resp.state.raw() {
            state.upsert(ResourceState::managed(address, attributes.clone()));
        }
        report(&address.to_string(), &resp.diagnostics)
    }

    async fn update(&self, address: &ResourceAddress, state: &mut StateFile) -> Result<(), String> {
        let block = self.block(address)?;
        let resource = self.resource(&block.resource_type)?;
        let config = self.resolved_config(&address.to_string(), block, state)?;
        let prior = state
            .find(ResourceMode::Managed, address)
            .map(|r| r.attributes.clone())
            .ok_or_else(|| format!("{} is not in the state", address))?;
        let planned = planned_state(&resource.schema(), &config, Some(&prior));

        let resp = resource
            .update(UpdateRequest {
                plan: State::new(planned),
                state: State::new(prior),
                config: State::new(config),
            })
            .await;
        if !resp.has_error()
            && let Some(attributes) = resp.state.raw()
        {
            state.upsert(ResourceState::managed(address, attributes.clone()));
        }
        report(&address.to_string(), &resp.diagnostics)
    }

    async fn delete(&self, address: &ResourceAddress, state: &mut StateFile) -> Result<(), String> {
        let Some(stored) = state.find(ResourceMode::Managed, address) else {
            return Ok(());
        };
        let resource = self.resource(&address.resource_type)?;
        let resp = resource
            .delete(DeleteRequest {
                state: State::new(stored.attributes.clone()),
            })
            .await;
        report(&address.to_string(), &resp.diagnostics)?;
        state.remove(ResourceMode::Managed, address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::tempdir;

    fn write_config(dir: &Path, body: Value) -> PathBuf {
        let path = dir.join("stackit.json");
        std::fs::write(&path, body.to_string()).unwrap();
        path
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_import_and_destroy() {
        let cli = Cli::parse_from(["stackit-tf", "import", "infra.json", "stackit_kms_keyring.main", "p,eu01,k"]);
        assert!(matches!(
            cli.command,
            Commands::Import { ref address, ref id, .. } if address == "stackit_kms_keyring.main" && id == "p,eu01,k"
        ));
        let cli = Cli::parse_from(["stackit-tf", "force-unlock", "3f1c"]);
        assert!(matches!(cli.command, Commands::ForceUnlock { ref lock_id, .. } if lock_id == "3f1c"));
        let cli = Cli::parse_from(["stackit-tf", "destroy", "--auto-approve"]);
        assert!(matches!(cli.command, Commands::Destroy { auto_approve: true, ref file } if file == Path::new(DEFAULT_CONFIG)));
    }

    #[test]
    fn effects_are_described() {
        let address = ResourceAddress::new("stackit_kms_key", "k");
        assert_eq!(describe_effect(&Effect::Create(address.clone())), ("+", "stackit_kms_key.k".to_string()));
        assert_eq!(
            describe_effect(&Effect::Replace {
                address: address.clone(),
                changed: vec!["algorithm".to_string(), "description".to_string()],
                forced_by: vec!["algorithm".to_string()],
            }),
            ("-/+", "stackit_kms_key.k (forced by algorithm)".to_string())
        );
        assert_eq!(describe_effect(&Effect::Read(address)).1, "data.stackit_kms_key.k");
    }

    #[test]
    fn report_fails_on_errors_only() {
        let mut diags = Diagnostics::new();
        diags.add_warning("Careful", "something");
        assert!(report("stackit_kms_key.k", &diags).is_ok());
        diags.add_error("Broken", "something else");
        assert_eq!(report("stackit_kms_key.k", &diags).unwrap_err(), "stackit_kms_key.k failed");
    }

    #[test]
    fn validate_accepts_valid_config() {
        let dir = tempdir().unwrap();
        let file = write_config(
            dir.path(),
            json!({
                "resources": [{
                    "type": "stackit_resourcemanager_folder",
                    "name": "team",
                    "attributes": {"name": "team", "container_parent_id": "organization-abc", "owner_email": "owner@example.com"}
                }]
            }),
        );
        run_validate(&file).unwrap();
    }

    #[test]
    fn validate_reports_missing_attributes() {
        let dir = tempdir().unwrap();
        let file = write_config(
            dir.path(),
            json!({"resources": [{"type": "stackit_resourcemanager_folder", "name": "team", "attributes": {}}]}),
        );
        assert!(run_validate(&file).is_err());
    }

    #[test]
    fn schema_of_unknown_type_fails() {
        assert!(run_schema(Some("stackit_nope")).is_err());
        assert!(run_schema(Some("stackit_scf_platform")).is_ok());
    }

    #[tokio::test]
    async fn empty_configuration_applies_cleanly() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("test.state.json");
        let file = write_config(
            dir.path(),
            json!({"backend": {"type": "local", "path": state_path.to_str().unwrap()}}),
        );

        run_apply(&file).await.unwrap();
        assert!(state_path.exists());
        assert!(!dir.path().join("test.state.lock").exists());

        run_destroy(&file, true).await.unwrap();
        run_state_list(&file).await.unwrap();
    }

    #[tokio::test]
    async fn force_unlock_releases_a_stale_lock() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("test.state.json");
        let file = write_config(
            dir.path(),
            json!({"backend": {"type": "local", "path": state_path.to_str().unwrap()}}),
        );
        let config = HostConfig::load(&file).unwrap();
        let backend = create_backend(&config.backend).await.unwrap();
        let lock = backend.acquire_lock("apply").await.unwrap();

        assert!(run_apply(&file).await.is_err());
        assert!(run_force_unlock(&file, "not-the-lock").await.is_err());
        run_force_unlock(&file, &lock.id).await.unwrap();
        run_apply(&file).await.unwrap();
    }

    #[tokio::test]
    async fn import_requires_declared_block() {
        let dir = tempdir().unwrap();
        let state_path = dir.path().join("test.state.json");
        let file = write_config(
            dir.path(),
            json!({"backend": {"type": "local", "path": state_path.to_str().unwrap()}}),
        );
        let err = run_import(&file, "stackit_kms_keyring.main", "p,eu01,k").await.unwrap_err();
        assert!(err.contains("not declared"));
        assert!(run_import(&file, "no-dot", "x").await.is_err());
    }
}
