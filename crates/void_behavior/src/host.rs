//! Host modules exposed to behavior code
//!
//! Each module is a named table of native functions owned by the host and
//! shared (`Arc`) with every loaded behavior module that imports it. A
//! loaded module never gets its own copy of a host function: the linker
//! binds the host's handle directly, so host values keep one identity
//! across reloads.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use void_script::{standard_library, NativeTable, Value};

use crate::event::{is_event_value, KIND_FIELD};

/// Destination of script `print` output
pub type OutputSink = Arc<dyn Fn(&str) + Send + Sync>;

/// A named set of host functions
#[derive(Debug)]
pub struct HostModule {
    name: String,
    natives: NativeTable,
}

impl HostModule {
    /// Create a module from a native table
    pub fn new(name: impl Into<String>, natives: NativeTable) -> Self {
        Self {
            name: name.into(),
            natives,
        }
    }

    /// Module name as used in `use <name>;`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exported functions
    pub fn natives(&self) -> &NativeTable {
        &self.natives
    }

    /// Whether the module exports a symbol
    pub fn exports(&self, symbol: &str) -> bool {
        self.natives.contains(symbol)
    }

    /// Exported symbol names, sorted
    pub fn export_names(&self) -> impl Iterator<Item = &str> {
        self.natives.names()
    }
}

/// The set of host modules behavior code can link against
pub struct HostEnvironment {
    modules: BTreeMap<String, Arc<HostModule>>,
    output: OutputSink,
}

impl HostEnvironment {
    /// Empty environment printing to the log
    pub fn new() -> Self {
        Self::with_output_sink(log_sink())
    }

    /// Empty environment with a custom print destination
    pub fn with_output_sink(output: OutputSink) -> Self {
        Self {
            modules: BTreeMap::new(),
            output,
        }
    }

    /// The `core`, `entity` and `input` modules, printing to the log
    pub fn standard() -> Self {
        Self::standard_with_output(log_sink())
    }

    /// The standard modules with a custom print destination
    pub fn standard_with_output(output: OutputSink) -> Self {
        let mut env = Self::with_output_sink(output);
        env.register(core_module(Arc::clone(&env.output)));
        env.register(entity_module());
        env.register(input_module());
        env
    }

    /// Register a module, replacing any module with the same name
    pub fn register(&mut self, module: HostModule) -> Arc<HostModule> {
        let module = Arc::new(module);
        if self
            .modules
            .insert(module.name().to_string(), Arc::clone(&module))
            .is_some()
        {
            log::warn!("Host module '{}' replaced", module.name());
        }
        module
    }

    /// Shared handle of a module
    pub fn module(&self, name: &str) -> Option<&Arc<HostModule>> {
        self.modules.get(name)
    }

    /// Whether a module exists
    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Module names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// First module exporting a symbol
    pub fn exporter_of(&self, symbol: &str) -> Option<&str> {
        self.modules
            .values()
            .find(|m| m.exports(symbol))
            .map(|m| m.name())
    }

    /// Print destination
    pub fn output(&self) -> &OutputSink {
        &self.output
    }
}

impl Default for HostEnvironment {
    fn default() -> Self {
        Self::standard()
    }
}

fn log_sink() -> OutputSink {
    Arc::new(|line: &str| log::info!(target: "void_behavior::script", "{}", line))
}

fn joined(args: &[Value]) -> String {
    args.iter()
        .map(Value::to_string_value)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `core`: standard library plus output
pub fn core_module(output: OutputSink) -> HostModule {
    let mut natives = standard_library();

    natives.register_native("print", move |args| {
        output(&joined(&args));
        Ok(Value::Null)
    });
    natives.register_native("log", |args| {
        log::info!(target: "void_behavior::script", "{}", joined(&args));
        Ok(Value::Null)
    });
    natives.register_native("warn", |args| {
        log::warn!(target: "void_behavior::script", "{}", joined(&args));
        Ok(Value::Null)
    });

    HostModule::new("core", natives)
}

/// `entity`: entity handle helpers
pub fn entity_module() -> HostModule {
    let mut natives = NativeTable::new();

    natives.register_native_with_arity("entity_id", 1, |args| match &args[0] {
        Value::Entity(entity) => Ok(Value::Int(entity.id as i64)),
        other => Err(format!("entity_id() expects an entity, got {}", other.type_name())),
    });
    natives.register_native_with_arity("same_entity", 2, |args| {
        Ok(Value::Bool(matches!(
            (&args[0], &args[1]),
            (Value::Entity(a), Value::Entity(b)) if a == b
        )))
    });
    natives.register_native_with_arity("is_entity", 1, |args| {
        Ok(Value::Bool(args[0].as_entity().is_some()))
    });

    HostModule::new("entity", natives)
}

/// `input`: event helpers
pub fn input_module() -> HostModule {
    let mut natives = NativeTable::new();

    natives.register_native_with_arity("is_event", 1, |args| {
        Ok(Value::Bool(is_event_value(&args[0])))
    });
    natives.register_native_with_arity("event_kind", 1, |args| match &args[0] {
        Value::Object(obj) if is_event_value(&args[0]) => {
            Ok(obj.get(KIND_FIELD).cloned().unwrap_or(Value::Null))
        }
        other => Err(format!("event_kind() expects an event, got {}", other.type_name())),
    });
    natives.register_native_with_arity("event_field", 2, |args| match (&args[0], &args[1]) {
        (Value::Object(obj), Value::String(name)) if is_event_value(&args[0]) => {
            Ok(obj.get(name).cloned().unwrap_or(Value::Null))
        }
        _ => Err("event_field() expects an event and a field name".to_string()),
    });

    HostModule::new("input", natives)
}

/// Collects printed lines in memory
#[derive(Clone, Default)]
pub struct OutputBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl OutputBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink appending to this buffer
    pub fn sink(&self) -> OutputSink {
        let lines = Arc::clone(&self.lines);
        Arc::new(move |line: &str| lines.lock().push(line.to_string()))
    }

    /// Copy of the lines so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Remove and return the lines so far
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use void_script::EntityRef;

    fn call(env: &HostEnvironment, module: &str, name: &str, args: Vec<Value>) -> Value {
        env.module(module)
            .unwrap()
            .natives()
            .get(name)
            .unwrap()
            .call(args)
            .unwrap()
    }

    #[test]
    fn test_standard_modules() {
        let env = HostEnvironment::standard();
        let names: Vec<&str> = env.names().collect();
        assert_eq!(names, vec!["core", "entity", "input"]);
        assert_eq!(env.exporter_of("print"), Some("core"));
        assert_eq!(env.exporter_of("same_entity"), Some("entity"));
        assert_eq!(env.exporter_of("nope"), None);
    }

    #[test]
    fn test_print_goes_to_sink() {
        let buffer = OutputBuffer::new();
        let env = HostEnvironment::standard_with_output(buffer.sink());

        call(&env, "core", "print", vec![Value::from("hp"), Value::Int(3)]);
        assert_eq!(buffer.take(), vec!["hp 3"]);
        assert!(buffer.lines().is_empty());
    }

    #[test]
    fn test_entity_helpers() {
        let env = HostEnvironment::standard();
        let e = Value::Entity(EntityRef::new(9, 2));

        assert_eq!(call(&env, "entity", "entity_id", vec![e.clone()]), Value::Int(9));
        assert_eq!(
            call(&env, "entity", "same_entity", vec![e.clone(), e.clone()]),
            Value::Bool(true)
        );
        assert_eq!(
            call(&env, "entity", "same_entity", vec![e, Value::Entity(EntityRef::new(9, 3))]),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_input_helpers() {
        let env = HostEnvironment::standard();
        let event = Event::new("jump").with("height", 2.0).to_value();

        assert_eq!(call(&env, "input", "is_event", vec![event.clone()]), Value::Bool(true));
        assert_eq!(
            call(&env, "input", "event_kind", vec![event.clone()]),
            Value::String("jump".into())
        );
        assert_eq!(
            call(&env, "input", "event_field", vec![event.clone(), Value::from("height")]),
            Value::Float(2.0)
        );
        assert_eq!(
            call(&env, "input", "event_field", vec![event, Value::from("missing")]),
            Value::Null
        );
    }

    #[test]
    fn test_register_replaces() {
        let mut env = HostEnvironment::new();
        env.register(HostModule::new("physics", NativeTable::new()));
        let mut natives = NativeTable::new();
        natives.register_native("gravity", |_| Ok(Value::Float(9.81)));
        env.register(HostModule::new("physics", natives));

        assert!(env.module("physics").unwrap().exports("gravity"));
    }
}
