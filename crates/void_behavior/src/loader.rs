//! Module loading and unloading
//!
//! A [`LoadedModule`] is an isolated context built from one module image:
//! its own globals, its own behavior classes, its own id. Host functions
//! are never rebuilt per module. Linking binds the host's own
//! `NativeFunction` handles into the module's globals, so an entity helper
//! seen by generation 1 and generation 7 is the same allocation.
//!
//! Unloading drops the loader's strong handle and keeps a weak one. The
//! context is released once nothing else holds it; until then it stays
//! pending and later [`ModuleLoader::collect`] calls check again.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};
use void_script::ast::FieldDecl;
use void_script::{Function, Interpreter, Scope, Value};

use crate::compiler::{CompiledArtifact, DebugImage, ModuleImage};
use crate::error::LoadError;
use crate::host::{HostEnvironment, HostModule};
use crate::instance::catch_panic;

/// Unique id of a loaded module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u64);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

/// A behavior type inside a loaded module
#[derive(Debug)]
pub struct BehaviorClass {
    name: String,
    unit: String,
    fields: Vec<FieldDecl>,
    methods: HashMap<String, Function>,
}

impl BehaviorClass {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Source unit that defined the class
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Fields with their initializers, in declaration order
    pub fn fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&Function> {
        self.methods.get(name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

/// An isolated execution context
pub struct ModuleContext {
    id: ModuleId,
    globals: Arc<Scope>,
    imports: Vec<Arc<HostModule>>,
    classes: BTreeMap<String, Arc<BehaviorClass>>,
    /// Script definitions replaced by a host symbol
    redirected: Vec<String>,
    debug: Option<DebugImage>,
}

impl ModuleContext {
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Read-only module globals
    pub fn globals(&self) -> &Arc<Scope> {
        &self.globals
    }

    /// Global by name
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Linked host modules
    pub fn imports(&self) -> &[Arc<HostModule>] {
        &self.imports
    }

    pub fn class(&self, name: &str) -> Option<&Arc<BehaviorClass>> {
        self.classes.get(name)
    }

    /// Behavior classes, sorted by name
    pub fn classes(&self) -> impl Iterator<Item = &Arc<BehaviorClass>> {
        self.classes.values()
    }

    pub fn redirected(&self) -> &[String] {
        &self.redirected
    }

    pub fn debug(&self) -> Option<&DebugImage> {
        self.debug.as_ref()
    }

    /// `file:line:column` of a function or `Behavior.method`
    pub fn locate(&self, qualified_name: &str) -> Option<String> {
        self.debug.as_ref()?.locate(qualified_name)
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("id", &self.id)
            .field("globals", &self.globals.len())
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Shared handle to a loaded module
pub type LoadedModule = Arc<ModuleContext>;

/// Result of an unload request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadStatus {
    /// Nothing holds the module any more
    Released,
    /// Something still holds a strong reference
    Pending,
}

/// Loader options
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Run `reclaim_passes` passes on unload instead of one
    pub force_reclaim: bool,
    pub reclaim_passes: u32,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            force_reclaim: cfg!(debug_assertions),
            reclaim_passes: 3,
        }
    }
}

struct PendingModule {
    id: ModuleId,
    handle: Weak<ModuleContext>,
}

/// Loads module images into isolated contexts
pub struct ModuleLoader {
    options: LoaderOptions,
    next_id: u64,
    pending: Vec<PendingModule>,
}

impl ModuleLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self {
            options,
            next_id: 1,
            pending: Vec::new(),
        }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Load an artifact into a fresh context linked against `host`
    pub fn load(
        &mut self,
        artifact: &CompiledArtifact,
        host: &HostEnvironment,
    ) -> Result<LoadedModule, LoadError> {
        let image = ModuleImage::decode(&artifact.binary_image)?;
        let debug = artifact.debug_image.as_deref().and_then(|bytes| {
            DebugImage::from_json(bytes)
                .map_err(|e| log::warn!("Ignoring unreadable debug image: {}", e))
                .ok()
        });

        let mut globals = Scope::new();
        let imports = link_imports(&image.imports, host, &mut globals)?;
        let mut redirected = Vec::new();

        for function in &image.functions {
            let decl = &function.decl;
            if globals.contains(&decl.name) {
                redirected.push(decl.name.clone());
                continue;
            }
            let value = Function::new(
                decl.name.clone(),
                decl.params.clone(),
                Arc::new(decl.body.clone()),
            );
            globals.define(decl.name.clone(), Value::Function(value));
        }

        // Constants see host symbols, functions, and constants before them
        for constant in &image.constants {
            if globals.contains(&constant.name) {
                redirected.push(constant.name.clone());
                continue;
            }
            let mut interpreter = Interpreter::new(Arc::new(globals.clone()));
            let value = catch_panic(|| interpreter.eval_expr(&constant.value))
                .map_err(|source| LoadError::Initializer {
                    name: constant.name.clone(),
                    source,
                })?;
            globals.define(constant.name.clone(), value);
        }

        for name in &redirected {
            log::debug!("'{}' redirected to the host definition", name);
        }

        let classes = image
            .behaviors
            .iter()
            .map(|behavior| {
                let decl = &behavior.decl;
                let methods = decl
                    .methods
                    .iter()
                    .map(|m| {
                        let function =
                            Function::new(m.name.clone(), m.params.clone(), Arc::new(m.body.clone()));
                        (m.name.clone(), function)
                    })
                    .collect();
                let class = BehaviorClass {
                    name: decl.name.clone(),
                    unit: behavior.unit.clone(),
                    fields: decl.fields.clone(),
                    methods,
                };
                (decl.name.clone(), Arc::new(class))
            })
            .collect();

        let id = ModuleId(self.next_id);
        self.next_id += 1;

        let module = Arc::new(ModuleContext {
            id,
            globals: Arc::new(globals),
            imports,
            classes,
            redirected,
            debug,
        });
        log::info!(
            "Loaded {} with {} behavior class(es)",
            id,
            module.classes.len()
        );
        Ok(module)
    }

    /// Release the loader's handle and reclaim the context
    pub fn unload(&mut self, module: LoadedModule) -> UnloadStatus {
        let id = module.id;
        let handle = Arc::downgrade(&module);
        drop(module);

        self.pending.push(PendingModule { id, handle });
        let passes = if self.options.force_reclaim {
            self.options.reclaim_passes.max(1)
        } else {
            1
        };

        for pass in 1..=passes {
            if self.reclaim_pass() == 0 || !self.is_pending(id) {
                log::debug!("Reclaimed {} after {} pass(es)", id, pass);
                break;
            }
            std::thread::yield_now();
        }

        if self.is_pending(id) {
            log::warn!("{} is still referenced after unload", id);
            UnloadStatus::Pending
        } else {
            UnloadStatus::Released
        }
    }

    /// Modules unloaded but still referenced
    pub fn pending_reclaim(&self) -> Vec<ModuleId> {
        self.pending.iter().map(|p| p.id).collect()
    }

    /// Retry reclamation; returns how many modules were released
    pub fn collect(&mut self) -> usize {
        let before = self.pending.len();
        self.reclaim_pass();
        before - self.pending.len()
    }

    fn is_pending(&self, id: ModuleId) -> bool {
        self.pending.iter().any(|p| p.id == id)
    }

    /// Drop released entries; returns how many remain pending
    fn reclaim_pass(&mut self) -> usize {
        self.pending.retain(|p| {
            let alive = p.handle.strong_count() > 0;
            if !alive {
                log::debug!("{} released", p.id);
            }
            alive
        });
        self.pending.len()
    }
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new(LoaderOptions::default())
    }
}

/// Bind every import's functions into `globals`, sharing the host handles
fn link_imports(
    names: &[String],
    host: &HostEnvironment,
    globals: &mut Scope,
) -> Result<Vec<Arc<HostModule>>, LoadError> {
    let mut imports = Vec::with_capacity(names.len());

    for name in names {
        let module = host
            .module(name)
            .ok_or_else(|| LoadError::UnknownHostModule(name.clone()))?;

        for native in module.natives().iter() {
            if globals.contains(&native.name) {
                log::debug!(
                    "'{}' from host module '{}' already linked from an earlier import",
                    native.name,
                    name
                );
                continue;
            }
            globals.define(native.name.clone(), Value::Native(native.clone()));
        }
        imports.push(Arc::clone(module));
    }

    Ok(imports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompilationPipeline, CompilationRequest, CompilerOptions, SourceText};
    use crate::references::ReferenceValidator;
    use std::path::PathBuf;

    fn compile(host: &HostEnvironment, sources: &[(&str, &str)]) -> CompiledArtifact {
        let request = CompilationRequest::new(
            sources
                .iter()
                .map(|(name, text)| SourceText {
                    name: name.to_string(),
                    path: PathBuf::from(format!("{}.vs", name)),
                    text: text.to_string(),
                })
                .collect(),
        );
        CompilationPipeline::new(ReferenceValidator::default(), CompilerOptions { debug_symbols: true })
            .compile(&request, host)
            .unwrap()
            .artifact
    }

    #[test]
    fn test_host_symbols_share_identity_across_loads() {
        let host = HostEnvironment::standard();
        let artifact = compile(&host, &[("A", "use entity;\nbehavior A { fn on_create() {} }")]);
        let mut loader = ModuleLoader::default();

        let first = loader.load(&artifact, &host).unwrap();
        let second = loader.load(&artifact, &host).unwrap();
        assert_ne!(first.id(), second.id());

        let host_native = host.module("entity").unwrap().natives().get("same_entity").unwrap();
        for module in [&first, &second] {
            match module.global("same_entity") {
                Some(Value::Native(native)) => {
                    assert!(Arc::ptr_eq(&native.func, &host_native.func));
                }
                other => panic!("expected a linked native, got {:?}", other),
            }
            assert!(Arc::ptr_eq(&module.imports()[0], host.module("entity").unwrap()));
        }
    }

    #[test]
    fn test_script_definition_redirected_to_host() {
        let host = HostEnvironment::standard();
        let artifact = compile(
            &host,
            &[("A", "use core;\nfn abs(x) { return 0; }\nlet MAX = max(1, 5);\nbehavior A { fn on_create() {} }")],
        );
        let module = ModuleLoader::default().load(&artifact, &host).unwrap();

        assert_eq!(module.redirected(), ["abs"]);
        assert!(matches!(module.global("abs"), Some(Value::Native(_))));
        assert_eq!(module.global("MAX"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_classes_and_debug_info() {
        let host = HostEnvironment::standard();
        let artifact = compile(
            &host,
            &[("Mover", "behavior Mover {\n  let speed = 1;\n  fn on_update(dt) {}\n}")],
        );
        let module = ModuleLoader::default().load(&artifact, &host).unwrap();

        let class = module.class("Mover").unwrap();
        assert_eq!(class.unit(), "Mover");
        assert!(class.has_field("speed"));
        assert!(class.has_method("on_update"));
        assert_eq!(module.locate("Mover.on_update").as_deref(), Some("Mover.vs:3:3"));
    }

    #[test]
    fn test_constant_failure_is_a_load_error() {
        let host = HostEnvironment::standard();
        let artifact = compile(&host, &[("A", "let BAD = 1 / 0;")]);
        let err = ModuleLoader::default().load(&artifact, &host).unwrap_err();
        assert!(matches!(err, LoadError::Initializer { ref name, .. } if name == "BAD"));
    }

    #[test]
    fn test_constant_panic_is_a_load_error() {
        let mut host = HostEnvironment::standard();
        let mut natives = void_script::NativeTable::new();
        natives.register_native("explode", |_| panic!("native exploded"));
        host.register(crate::host::HostModule::new("danger", natives));

        let artifact = compile(&host, &[("A", "use danger;\nlet BOOM = explode();")]);
        let mut loader = ModuleLoader::default();
        let err = loader.load(&artifact, &host).unwrap_err();
        assert!(matches!(err, LoadError::Initializer { ref name, .. } if name == "BOOM"));
        assert!(err.to_string().contains("native exploded"));
    }

    #[test]
    fn test_unknown_host_module_at_link_time() {
        let host = HostEnvironment::standard();
        let artifact = compile(&host, &[("A", "use input;\nbehavior A { fn on_create() {} }")]);

        let mut bare = HostEnvironment::new();
        bare.register(crate::host::core_module(bare.output().clone()));
        let err = ModuleLoader::default().load(&artifact, &bare).unwrap_err();
        assert!(matches!(err, LoadError::UnknownHostModule(ref name) if name == "input"));
    }

    #[test]
    fn test_unload_released_and_pending() {
        let host = HostEnvironment::standard();
        let artifact = compile(&host, &[("A", "behavior A { fn on_create() {} }")]);
        let mut loader = ModuleLoader::new(LoaderOptions {
            force_reclaim: true,
            reclaim_passes: 2,
        });

        let module = loader.load(&artifact, &host).unwrap();
        assert_eq!(loader.unload(module), UnloadStatus::Released);
        assert!(loader.pending_reclaim().is_empty());

        let module = loader.load(&artifact, &host).unwrap();
        let id = module.id();
        let leaked = Arc::clone(&module);
        assert_eq!(loader.unload(module), UnloadStatus::Pending);
        assert_eq!(loader.pending_reclaim(), vec![id]);
        assert_eq!(loader.collect(), 0);

        drop(leaked);
        assert_eq!(loader.collect(), 1);
        assert!(loader.pending_reclaim().is_empty());
    }
}
