//! Behavior type registry
//!
//! Maps a behavior name to a factory bound to the module that defines it.
//! The registry is rebuilt from scratch after every load; it never mixes
//! types from two modules.

use std::collections::BTreeMap;
use std::sync::Arc;
use void_script::EntityRef;

use crate::error::InstantiationError;
use crate::instance::BehaviorInstance;
use crate::loader::{LoadedModule, ModuleId};

/// Creates an instance of one behavior type bound to an entity
pub type BehaviorFactory =
    Arc<dyn Fn(EntityRef) -> Result<BehaviorInstance, InstantiationError> + Send + Sync>;

/// A behavior type of the active module
#[derive(Clone)]
pub struct TypeDescriptor {
    pub name: String,
    pub module: ModuleId,
    factory: BehaviorFactory,
}

impl TypeDescriptor {
    /// Create a fresh instance bound to `entity`
    pub fn instantiate(&self, entity: EntityRef) -> Result<BehaviorInstance, InstantiationError> {
        (self.factory)(entity)
    }
}

impl std::fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("module", &self.module)
            .finish()
    }
}

/// Name to factory mapping for the active module
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: BTreeMap<String, TypeDescriptor>,
    module: Option<ModuleId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every entry with the behavior classes of `module`
    pub fn rebuild(&mut self, module: &LoadedModule) {
        self.clear();

        for class in module.classes() {
            let factory_module = Arc::clone(module);
            let factory_class = Arc::clone(class);
            let factory: BehaviorFactory = Arc::new(move |entity| {
                BehaviorInstance::new(entity, Arc::clone(&factory_module), Arc::clone(&factory_class))
            });

            self.types.insert(
                class.name().to_string(),
                TypeDescriptor {
                    name: class.name().to_string(),
                    module: module.id(),
                    factory,
                },
            );
        }

        self.module = Some(module.id());
        log::debug!("Type registry rebuilt from {}: {:?}", module.id(), self.names());
    }

    /// Drop every entry, releasing the module references they hold
    pub fn clear(&mut self) {
        self.types.clear();
        self.module = None;
    }

    pub fn resolve(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Type names, sorted
    pub fn names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Module the registry was built from
    pub fn module(&self) -> Option<ModuleId> {
        self.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompilationPipeline, CompilationRequest, CompilerOptions, SourceText};
    use crate::host::HostEnvironment;
    use crate::loader::{ModuleLoader, UnloadStatus};
    use crate::references::ReferenceValidator;
    use std::path::PathBuf;

    fn load(loader: &mut ModuleLoader, host: &HostEnvironment, text: &str) -> LoadedModule {
        let request = CompilationRequest::new(vec![SourceText {
            name: "Unit".into(),
            path: PathBuf::from("Unit.vs"),
            text: text.into(),
        }]);
        let artifact = CompilationPipeline::new(ReferenceValidator::default(), CompilerOptions::default())
            .compile(&request, host)
            .unwrap()
            .artifact;
        loader.load(&artifact, host).unwrap()
    }

    #[test]
    fn test_rebuild_replaces_entries() {
        let host = HostEnvironment::standard();
        let mut loader = ModuleLoader::default();
        let mut registry = TypeRegistry::new();

        let first = load(&mut loader, &host, "behavior A { fn on_create() {} }\nbehavior B { fn on_create() {} }");
        registry.rebuild(&first);
        assert_eq!(registry.names(), vec!["A", "B"]);
        assert_eq!(registry.module(), Some(first.id()));

        let second = load(&mut loader, &host, "behavior C { fn on_create() {} }");
        registry.rebuild(&second);
        assert_eq!(registry.names(), vec!["C"]);
        assert!(registry.resolve("A").is_none());
        assert_eq!(registry.resolve("C").unwrap().module, second.id());

        // Nothing in the registry keeps the first module alive
        assert_eq!(loader.unload(first), UnloadStatus::Released);
    }

    #[test]
    fn test_factory_creates_bound_instances() {
        let host = HostEnvironment::standard();
        let mut loader = ModuleLoader::default();
        let module = load(&mut loader, &host, "behavior A { let hp = 3; fn on_create() {} }");
        let mut registry = TypeRegistry::new();
        registry.rebuild(&module);

        let entity = EntityRef::new(1, 0);
        let instance = registry.resolve("A").unwrap().instantiate(entity).unwrap();
        assert_eq!(instance.entity(), entity);
        assert_eq!(instance.type_name(), "A");
        assert_eq!(instance.module_id(), module.id());
        assert_eq!(instance.field("hp"), Some(&void_script::Value::Int(3)));

        // A live instance pins its module after the registry lets go
        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(loader.unload(module), UnloadStatus::Pending);
        drop(instance);
        assert_eq!(loader.collect(), 1);
    }

    #[test]
    fn test_field_initializer_failure() {
        let host = HostEnvironment::standard();
        let mut loader = ModuleLoader::default();
        let module = load(&mut loader, &host, "behavior A { let bad = 1 % 0; fn on_create() {} }");
        let mut registry = TypeRegistry::new();
        registry.rebuild(&module);

        let err = registry.resolve("A").unwrap().instantiate(EntityRef::new(1, 0)).unwrap_err();
        assert!(matches!(err, InstantiationError::FieldInitializer { ref field, .. } if field == "bad"));
    }
}
