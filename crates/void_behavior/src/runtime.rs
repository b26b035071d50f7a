//! Hot-swap orchestrator
//!
//! [`BehaviorRuntime`] owns the only handles to loaded modules, the type
//! registry and every behavior instance. The host drives it with one
//! [`tick`](BehaviorRuntime::tick) per frame:
//!
//! 1. Scan sources. No changes means no compilation.
//! 2. On change, compile the full source set.
//! 3. On error, report diagnostics and leave everything running as it was.
//! 4. On success, load the new module, tear down and detach every instance,
//!    rebuild the type registry, unload the previous module and rebind each
//!    entity to a fresh instance of the same type.
//!
//! After the swap step, entities are synchronized with their declarations
//! and every active instance receives its update.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use void_script::EntityRef;

use crate::compiler::{
    CompilationPipeline, CompilationRequest, CompileStats, CompilerOptions, Diagnostic,
};
use crate::config::RuntimeConfig;
use crate::entity::EntityHost;
use crate::error::{BehaviorError, InstantiationError, Result};
use crate::event::Event;
use crate::host::HostEnvironment;
use crate::instance::{BehaviorInstance, InstanceId};
use crate::loader::{LoadedModule, LoaderOptions, ModuleId, ModuleLoader, UnloadStatus};
use crate::references::ReferenceValidator;
use crate::source::{ChangeSet, SourceFingerprint, SourceRegistry};
use crate::types::TypeRegistry;

/// Pseudo-source for failures reading the source directory
const SOURCES_SOURCE: &str = "<sources>";
/// Pseudo-source for failures loading a compiled module
const LOADER_SOURCE: &str = "<loader>";

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapState {
    Idle,
    Compiling,
    Swapping,
    /// The last attempt failed; cleared by the next tick
    SwapFailed,
}

/// What started a swap attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapTrigger {
    /// Change detection found modified sources
    Changes(ChangeSet),
    /// Explicit recompile request
    Forced,
    /// A source written through the runtime
    SourceUpdate(String),
}

impl fmt::Display for SwapTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapTrigger::Changes(changes) => write!(f, "source changes ({})", changes),
            SwapTrigger::Forced => write!(f, "forced recompile"),
            SwapTrigger::SourceUpdate(name) => write!(f, "update of '{}'", name),
        }
    }
}

/// Step of a swap attempt that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapStage {
    /// Reading the source directory
    ReadSources,
    Compile,
    /// Linking the compiled module or evaluating its constants
    Load,
}

impl fmt::Display for SwapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwapStage::ReadSources => write!(f, "reading sources"),
            SwapStage::Compile => write!(f, "compiling"),
            SwapStage::Load => write!(f, "loading"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapOutcome {
    Swapped,
    Failed,
}

/// An entity that could not be rebound after a swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebindFailure {
    pub entity: EntityRef,
    pub type_name: String,
    pub reason: String,
}

/// Result of one swap attempt
#[derive(Debug, Clone)]
pub struct SwapReport {
    pub trigger: SwapTrigger,
    pub outcome: SwapOutcome,
    /// Where a failed attempt stopped
    pub failed_stage: Option<SwapStage>,
    /// Errors on failure, warnings on success
    pub diagnostics: Vec<Diagnostic>,
    /// The newly active module
    pub module: Option<ModuleId>,
    /// Instances torn down before rebinding
    pub torn_down: usize,
    /// Entities bound to a fresh instance
    pub rebound: usize,
    pub rebind_failures: Vec<RebindFailure>,
    /// Outcome of unloading the previous module, if there was one
    pub unload: Option<UnloadStatus>,
}

impl SwapReport {
    fn new(trigger: SwapTrigger, outcome: SwapOutcome, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            trigger,
            outcome,
            failed_stage: None,
            diagnostics,
            module: None,
            torn_down: 0,
            rebound: 0,
            rebind_failures: Vec::new(),
            unload: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == SwapOutcome::Swapped
    }

    /// Error diagnostics only
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub swap: Option<SwapReport>,
    /// Instances whose `on_create` ran, rebound ones included
    pub created: usize,
    /// Instances whose `on_update` ran
    pub updated: usize,
    /// Instances destroyed because their entity dropped the behavior
    pub destroyed: usize,
    /// Callback failures this tick
    pub faults: usize,
}

/// Owns modules, types and instances, and drives hot swaps
pub struct BehaviorRuntime {
    config: RuntimeConfig,
    host: Arc<HostEnvironment>,
    sources: SourceRegistry,
    pipeline: CompilationPipeline,
    loader: ModuleLoader,
    types: TypeRegistry,
    active: Option<LoadedModule>,
    instances: BTreeMap<EntityRef, BehaviorInstance>,
    state: SwapState,
    /// Source snapshot of the last failed attempt
    failed_fingerprint: Option<SourceFingerprint>,
    last_diagnostics: Vec<Diagnostic>,
    /// Unresolvable declarations already reported for the active module
    unresolved: HashSet<(EntityRef, String)>,
}

impl BehaviorRuntime {
    /// Create a runtime; nothing is compiled until the first tick
    pub fn new(config: RuntimeConfig, host: Arc<HostEnvironment>) -> Result<Self> {
        config.validate()?;

        let sources = SourceRegistry::new(&config.source_dir, &config.extension);
        sources.ensure_directory()?;

        let pipeline = CompilationPipeline::new(
            ReferenceValidator::new(config.required_references.iter().cloned()),
            CompilerOptions {
                debug_symbols: config.debug_symbols,
            },
        );
        let loader = ModuleLoader::new(LoaderOptions {
            force_reclaim: config.force_reclaim,
            reclaim_passes: config.reclaim_passes,
        });

        log::info!(
            "Behavior runtime watching {} (*.{})",
            sources.directory().display(),
            config.extension
        );

        Ok(Self {
            config,
            host,
            sources,
            pipeline,
            loader,
            types: TypeRegistry::new(),
            active: None,
            instances: BTreeMap::new(),
            state: SwapState::Idle,
            failed_fingerprint: None,
            last_diagnostics: Vec::new(),
            unresolved: HashSet::new(),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn host(&self) -> &Arc<HostEnvironment> {
        &self.host
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn state(&self) -> SwapState {
        self.state
    }

    /// Diagnostics of the last swap attempt
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.last_diagnostics
    }

    pub fn compile_stats(&self) -> CompileStats {
        self.pipeline.stats()
    }

    /// Id of the active module
    pub fn active_module(&self) -> Option<ModuleId> {
        self.active.as_ref().map(|module| module.id())
    }

    pub fn type_registry(&self) -> &TypeRegistry {
        &self.types
    }

    /// Unloaded modules something still references
    pub fn pending_reclaim(&self) -> Vec<ModuleId> {
        self.loader.pending_reclaim()
    }

    pub fn instance(&self, entity: EntityRef) -> Option<&BehaviorInstance> {
        self.instances.get(&entity)
    }

    pub fn instances(&self) -> impl Iterator<Item = &BehaviorInstance> {
        self.instances.values()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Drive one frame
    pub fn tick(&mut self, world: &mut dyn EntityHost, dt: f64) -> TickReport {
        if self.state == SwapState::SwapFailed {
            self.state = SwapState::Idle;
        }

        let mut report = TickReport {
            swap: self.poll_sources(world),
            ..TickReport::default()
        };
        if let Some(swap) = &report.swap {
            report.created += swap.rebound;
        }

        report.destroyed = self.sync_entities(world);

        for instance in self.instances.values_mut() {
            let faults_before = instance.fault_count();
            if instance.activate() {
                report.created += 1;
            }
            if instance.update(dt).ran() {
                report.updated += 1;
            }
            report.faults += (instance.fault_count() - faults_before) as usize;
        }

        if !self.loader.pending_reclaim().is_empty() {
            self.loader.collect();
        }

        report
    }

    /// Forward an event to every active instance; returns how many handled it
    pub fn dispatch(&mut self, event: &Event) -> usize {
        let mut handled = 0;
        for instance in self.instances.values_mut() {
            if instance.dispatch(event).ran() {
                handled += 1;
            }
        }
        handled
    }

    /// Behavior names of the last successful build, sorted
    pub fn list_available_behavior_names(&self) -> Vec<String> {
        self.types.names()
    }

    /// Current text of a source unit
    pub fn get_source(&self, name: &str) -> Result<String> {
        self.sources.read_source(name)
    }

    /// Write a source unit and swap synchronously
    ///
    /// Fails with [`BehaviorError::Compile`] when the new source set does
    /// not build, or [`BehaviorError::Swap`] when the sources cannot be read
    /// or the module does not load. The running module is left untouched.
    pub fn create_or_update_source(
        &mut self,
        world: &mut dyn EntityHost,
        name: &str,
        text: &str,
    ) -> Result<SwapReport> {
        self.sources.write_source(name, text)?;
        let report = self.swap(world, SwapTrigger::SourceUpdate(name.to_string()));
        match report.failed_stage {
            None => Ok(report),
            Some(SwapStage::Compile) => Err(BehaviorError::Compile(report.diagnostics)),
            Some(stage) => Err(BehaviorError::Swap {
                stage,
                diagnostics: report.diagnostics,
            }),
        }
    }

    /// Delete a source unit; the next tick picks up the removal
    pub fn delete_source(&mut self, name: &str) -> Result<bool> {
        self.sources.delete_source(name)
    }

    /// Rebuild from the current sources regardless of change detection
    pub fn force_recompile(&mut self, world: &mut dyn EntityHost) -> SwapReport {
        self.swap(world, SwapTrigger::Forced)
    }

    /// Bind a new instance of `type_name` to `entity`
    ///
    /// Any instance already bound is destroyed. The new one is activated on
    /// the next tick.
    pub fn instantiate(
        &mut self,
        world: &mut dyn EntityHost,
        entity: EntityRef,
        type_name: &str,
    ) -> std::result::Result<InstanceId, InstantiationError> {
        if !world.is_alive(entity) {
            return Err(InstantiationError::EntityNotFound(entity));
        }
        let descriptor = self
            .types
            .resolve(type_name)
            .ok_or_else(|| InstantiationError::UnknownType(type_name.to_string()))?;
        let instance = descriptor.instantiate(entity)?;
        let id = instance.id();

        if let Some(mut previous) = self.instances.remove(&entity) {
            previous.destroy();
        }
        world.attach(entity, type_name, id);
        self.instances.insert(entity, instance);

        log::debug!("Instantiated {} on {}", type_name, entity);
        Ok(id)
    }

    /// Destroy the instance bound to `entity` and clear its declaration
    pub fn remove_behavior(&mut self, world: &mut dyn EntityHost, entity: EntityRef) -> bool {
        world.remove(entity);
        match self.instances.remove(&entity) {
            Some(mut instance) => {
                instance.destroy();
                true
            }
            None => false,
        }
    }

    /// End the session: destroy every instance and unload the active module
    pub fn shutdown(&mut self, world: &mut dyn EntityHost) -> usize {
        let count = self.instances.len();
        for (entity, mut instance) in std::mem::take(&mut self.instances) {
            instance.destroy();
            world.detach(entity);
        }

        self.types.clear();
        if let Some(module) = self.active.take() {
            self.loader.unload(module);
        }
        self.unresolved.clear();
        self.state = SwapState::Idle;

        log::info!("Behavior runtime shut down, {} instance(s) destroyed", count);
        count
    }

    /// Change detection step of a tick
    fn poll_sources(&mut self, world: &mut dyn EntityHost) -> Option<SwapReport> {
        let changes = match self.sources.scan() {
            Ok(changes) => changes,
            Err(e) => {
                log::warn!("Source scan failed: {}", e);
                return None;
            }
        };
        if changes.is_empty() {
            return None;
        }

        if let Some(failed) = &self.failed_fingerprint {
            match self.sources.disk_fingerprint() {
                Ok(current) if current == *failed => return None,
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Source scan failed: {}", e);
                    return None;
                }
            }
        }

        log::info!("Detected source changes: {}", changes);
        Some(self.swap(world, SwapTrigger::Changes(changes)))
    }

    /// Compile the full source set and, on success, swap modules
    fn swap(&mut self, world: &mut dyn EntityHost, trigger: SwapTrigger) -> SwapReport {
        self.state = SwapState::Compiling;

        let units = match self.sources.read_all() {
            Ok(units) => units,
            Err(e) => {
                let diagnostic = Diagnostic::error(SOURCES_SOURCE, e.to_string());
                let fingerprint = self.sources.disk_fingerprint().ok();
                return self.fail(trigger, SwapStage::ReadSources, fingerprint, vec![diagnostic]);
            }
        };
        let fingerprint = SourceFingerprint::of_units(&units);

        let request = CompilationRequest::from_units(&units);
        let output = match self.pipeline.compile(&request, &self.host) {
            Ok(output) => output,
            Err(diagnostics) => {
                return self.fail(trigger, SwapStage::Compile, Some(fingerprint), diagnostics)
            }
        };

        self.state = SwapState::Swapping;

        // Loading first keeps the running module intact if linking fails
        let module = match self.loader.load(&output.artifact, &self.host) {
            Ok(module) => module,
            Err(e) => {
                let diagnostic = Diagnostic::error(LOADER_SOURCE, e.to_string());
                return self.fail(trigger, SwapStage::Load, Some(fingerprint), vec![diagnostic]);
            }
        };

        self.sources.record_all(&units);
        self.failed_fingerprint = None;

        let mut report = SwapReport::new(trigger, SwapOutcome::Swapped, output.warnings);
        report.module = Some(module.id());

        // Tear down and detach everything bound to the previous module
        let preserve_state = self.config.preserve_state;
        let mut captured = Vec::with_capacity(self.instances.len());
        for (entity, mut instance) in std::mem::take(&mut self.instances) {
            let state = if preserve_state && instance.is_active() {
                instance.snapshot_state()
            } else {
                None
            };
            instance.destroy();
            world.detach(entity);
            report.torn_down += 1;

            if !world.is_alive(entity) {
                continue;
            }
            // The entity owns its declaration; a change since the last sync
            // is left to entity sync
            match world.declared(entity) {
                Some(declared) if declared == instance.type_name() => {
                    captured.push((entity, declared, state));
                }
                Some(declared) => {
                    log::debug!("{} now declares {}, not rebinding", entity, declared)
                }
                None => {}
            }
        }

        self.types.clear();
        let previous = self.active.take();
        self.types.rebuild(&module);
        self.active = Some(module);
        report.unload = previous.map(|previous| self.loader.unload(previous));
        self.unresolved.clear();

        for (entity, type_name, state) in captured {
            let created = match self.types.resolve(&type_name) {
                Some(descriptor) => descriptor.instantiate(entity).map_err(|e| e.to_string()),
                None => Err(format!("Behavior type '{}' no longer exists", type_name)),
            };

            match created {
                Ok(mut instance) => {
                    if let Some(bytes) = state {
                        instance.restore_state(&bytes);
                    }
                    world.attach(entity, &type_name, instance.id());
                    instance.activate();
                    self.instances.insert(entity, instance);
                    report.rebound += 1;
                }
                Err(reason) => {
                    log::warn!("Could not rebind {} on {}: {}", type_name, entity, reason);
                    world.remove(entity);
                    report.rebind_failures.push(RebindFailure {
                        entity,
                        type_name,
                        reason,
                    });
                }
            }
        }

        for warning in &report.diagnostics {
            log::warn!("{}", warning);
        }
        log::info!(
            "Swapped to {} after {}: {} rebound, {} failed",
            report.module.map(|id| id.to_string()).unwrap_or_default(),
            report.trigger,
            report.rebound,
            report.rebind_failures.len()
        );

        self.last_diagnostics = report.diagnostics.clone();
        self.state = SwapState::Idle;
        report
    }

    fn fail(
        &mut self,
        trigger: SwapTrigger,
        stage: SwapStage,
        fingerprint: Option<SourceFingerprint>,
        diagnostics: Vec<Diagnostic>,
    ) -> SwapReport {
        for diagnostic in &diagnostics {
            if diagnostic.is_error() {
                log::error!("{}", diagnostic);
            } else {
                log::warn!("{}", diagnostic);
            }
        }
        log::warn!(
            "Swap after {} failed while {}; keeping the running behaviors",
            trigger,
            stage
        );

        if fingerprint.is_some() {
            self.failed_fingerprint = fingerprint;
        }
        self.last_diagnostics = diagnostics.clone();
        self.state = SwapState::SwapFailed;
        let mut report = SwapReport::new(trigger, SwapOutcome::Failed, diagnostics);
        report.failed_stage = Some(stage);
        report
    }

    /// Match instances to entity declarations; returns how many were destroyed
    fn sync_entities(&mut self, world: &mut dyn EntityHost) -> usize {
        let declared: BTreeMap<EntityRef, String> = world.declared_behaviors().into_iter().collect();

        let stale: Vec<EntityRef> = self
            .instances
            .iter()
            .filter(|(entity, instance)| {
                declared.get(*entity).map(String::as_str) != Some(instance.type_name())
            })
            .map(|(entity, _)| *entity)
            .collect();

        for entity in &stale {
            if let Some(mut instance) = self.instances.remove(entity) {
                instance.destroy();
                world.detach(*entity);
                log::debug!("Destroyed {} on {}", instance.type_name(), entity);
            }
        }

        for (entity, type_name) in declared {
            if self.instances.contains_key(&entity) {
                continue;
            }

            let created = match self.types.resolve(&type_name) {
                Some(descriptor) => descriptor.instantiate(entity).map_err(|e| e.to_string()),
                None => Err(format!("Unknown behavior '{}'", type_name)),
            };

            match created {
                Ok(instance) => {
                    world.attach(entity, &type_name, instance.id());
                    self.instances.insert(entity, instance);
                }
                Err(reason) => {
                    if self.unresolved.insert((entity, type_name)) {
                        log::warn!("Cannot create behavior for {}: {}", entity, reason);
                    }
                }
            }
        }

        stale.len()
    }
}

impl Drop for BehaviorRuntime {
    fn drop(&mut self) {
        if !self.instances.is_empty() {
            log::debug!(
                "Dropping behavior runtime with {} live instance(s)",
                self.instances.len()
            );
        }
        for instance in self.instances.values_mut() {
            instance.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityTable;
    use crate::host::OutputBuffer;
    use tempfile::TempDir;

    fn runtime(dir: &TempDir, output: &OutputBuffer) -> BehaviorRuntime {
        let config = RuntimeConfig::with_source_dir(dir.path());
        let host = Arc::new(HostEnvironment::standard_with_output(output.sink()));
        BehaviorRuntime::new(config, host).unwrap()
    }

    const SPINNER: &str = r#"
use core;
behavior Spinner {
    let turns = 0;
    fn on_create() { print("spin up"); }
    fn on_update(dt) { self.turns = self.turns + 1; }
    fn on_destroy() { print("spin down"); }
}
"#;

    #[test]
    fn test_empty_directory_is_idle() {
        let dir = TempDir::new().unwrap();
        let output = OutputBuffer::new();
        let mut runtime = runtime(&dir, &output);
        let mut world = EntityTable::new();

        let report = runtime.tick(&mut world, 0.016);
        assert!(report.swap.is_none());
        assert_eq!(runtime.state(), SwapState::Idle);
        assert_eq!(runtime.compile_stats().compilations, 0);
        assert!(runtime.list_available_behavior_names().is_empty());
    }

    #[test]
    fn test_declared_entities_get_instances() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Spinner.vs"), SPINNER).unwrap();
        let output = OutputBuffer::new();
        let mut runtime = runtime(&dir, &output);
        let mut world = EntityTable::new();
        let e = world.spawn_with("Spinner");

        let report = runtime.tick(&mut world, 0.016);
        assert!(report.swap.as_ref().unwrap().succeeded());
        assert_eq!(report.created, 1);
        assert_eq!(report.updated, 1);
        assert_eq!(output.take(), vec!["spin up"]);

        let id = runtime.instance(e).unwrap().id();
        assert_eq!(world.attachment(e), Some(id));

        runtime.tick(&mut world, 0.016);
        assert_eq!(runtime.instance(e).unwrap().field("turns"), Some(&void_script::Value::Int(2)));

        // Dropping the declaration destroys the instance
        world.undeclare(e);
        let report = runtime.tick(&mut world, 0.016);
        assert_eq!(report.destroyed, 1);
        assert!(runtime.instance(e).is_none());
        assert_eq!(output.take(), vec!["spin down"]);
    }

    #[test]
    fn test_failed_snapshot_is_not_recompiled() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Broken.vs"), "behavior Broken {").unwrap();
        let output = OutputBuffer::new();
        let mut runtime = runtime(&dir, &output);
        let mut world = EntityTable::new();

        let report = runtime.tick(&mut world, 0.016);
        assert_eq!(report.swap.unwrap().outcome, SwapOutcome::Failed);
        assert_eq!(runtime.state(), SwapState::SwapFailed);
        assert!(!runtime.diagnostics().is_empty());

        assert!(runtime.tick(&mut world, 0.016).swap.is_none());
        assert!(runtime.tick(&mut world, 0.016).swap.is_none());
        assert_eq!(runtime.compile_stats().compilations, 1);
        assert_eq!(runtime.state(), SwapState::Idle);

        // A forced recompile ignores the remembered failure
        assert!(!runtime.force_recompile(&mut world).succeeded());
        assert_eq!(runtime.compile_stats().compilations, 2);

        std::fs::write(dir.path().join("Broken.vs"), "behavior Broken { fn on_create() {} }").unwrap();
        let report = runtime.tick(&mut world, 0.016);
        assert!(report.swap.unwrap().succeeded());
        assert_eq!(runtime.list_available_behavior_names(), vec!["Broken"]);
    }

    #[test]
    fn test_unreadable_source_is_not_reread() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Garbled.vs"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        let output = OutputBuffer::new();
        let mut runtime = runtime(&dir, &output);
        let mut world = EntityTable::new();

        let swap = runtime.tick(&mut world, 0.016).swap.unwrap();
        assert_eq!(swap.outcome, SwapOutcome::Failed);
        assert_eq!(swap.failed_stage, Some(SwapStage::ReadSources));

        let attempts = (0..5)
            .filter(|_| runtime.tick(&mut world, 0.016).swap.is_some())
            .count();
        assert_eq!(attempts, 0);
        assert_eq!(runtime.compile_stats().compilations, 0);

        std::fs::write(dir.path().join("Garbled.vs"), "behavior Garbled { fn on_create() {} }").unwrap();
        assert!(runtime.tick(&mut world, 0.016).swap.unwrap().succeeded());
    }

    #[test]
    fn test_instantiate_and_remove() {
        let dir = TempDir::new().unwrap();
        let output = OutputBuffer::new();
        let mut runtime = runtime(&dir, &output);
        let mut world = EntityTable::new();
        runtime
            .create_or_update_source(&mut world, "Spinner", SPINNER)
            .unwrap();

        let e = world.spawn();
        let id = runtime.instantiate(&mut world, e, "Spinner").unwrap();
        assert_eq!(world.declared(e).as_deref(), Some("Spinner"));
        assert_eq!(world.attachment(e), Some(id));

        assert!(matches!(
            runtime.instantiate(&mut world, e, "Ghost"),
            Err(InstantiationError::UnknownType(_))
        ));

        // Activation waits for the next tick
        assert!(output.lines().is_empty());
        let report = runtime.tick(&mut world, 0.016);
        assert_eq!(report.created, 1);

        assert!(runtime.remove_behavior(&mut world, e));
        assert!(!runtime.remove_behavior(&mut world, e));
        assert_eq!(world.declared(e), None);
        assert_eq!(output.take(), vec!["spin up", "spin down"]);

        world.despawn(e);
        assert!(matches!(
            runtime.instantiate(&mut world, e, "Spinner"),
            Err(InstantiationError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_declaration_reported_once() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Spinner.vs"), SPINNER).unwrap();
        let output = OutputBuffer::new();
        let mut runtime = runtime(&dir, &output);
        let mut world = EntityTable::new();
        let e = world.spawn_with("Ghost");

        runtime.tick(&mut world, 0.016);
        runtime.tick(&mut world, 0.016);
        assert!(runtime.instance(e).is_none());
        assert_eq!(runtime.unresolved.len(), 1);
    }

    #[test]
    fn test_shutdown() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Spinner.vs"), SPINNER).unwrap();
        let output = OutputBuffer::new();
        let mut runtime = runtime(&dir, &output);
        let mut world = EntityTable::new();
        let e = world.spawn_with("Spinner");
        runtime.tick(&mut world, 0.016);

        assert_eq!(runtime.shutdown(&mut world), 1);
        assert!(runtime.active_module().is_none());
        assert!(runtime.pending_reclaim().is_empty());
        assert_eq!(world.attachment(e), None);
        assert_eq!(output.take(), vec!["spin up", "spin down"]);
    }

    #[test]
    fn test_dispatch_reaches_active_instances() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("Jumper.vs"),
            "use core;\nbehavior Jumper { fn on_jump(event) { print(\"jump\"); } }",
        )
        .unwrap();
        let output = OutputBuffer::new();
        let mut runtime = runtime(&dir, &output);
        let mut world = EntityTable::new();
        world.spawn_with("Jumper");
        world.spawn_with("Jumper");

        // Not yet compiled or activated
        assert_eq!(runtime.dispatch(&Event::new("jump")), 0);

        runtime.tick(&mut world, 0.016);
        assert_eq!(runtime.dispatch(&Event::new("jump")), 2);
        assert_eq!(runtime.dispatch(&Event::new("land")), 0);
        assert_eq!(output.take(), vec!["jump", "jump"]);
    }
}
