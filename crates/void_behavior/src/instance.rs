//! Behavior instance lifecycle
//!
//! Each entity with a behavior gets one instance: the behavior's field
//! values plus an interpreter over the owning module's globals. Lifecycle
//! is linear, `Uninitialized -> Active -> Destroyed`.
//!
//! Callback failures never escape an instance. Runtime errors and panics
//! raised inside natives are logged with the entity, the behavior and the
//! source location, counted, and the instance keeps receiving ticks.

use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use void_script::{EntityRef, Interpreter, RuntimeError, SerializableValue, Value};

use crate::error::InstantiationError;
use crate::event::{Event, CATCH_ALL_HANDLER};
use crate::loader::{BehaviorClass, LoadedModule, ModuleId};

/// Name of the instance object inside methods
pub const SELF_NAME: &str = "self";
/// Read-only field holding the bound entity
pub const ENTITY_FIELD: &str = "entity";

pub const ON_CREATE: &str = "on_create";
pub const ON_UPDATE: &str = "on_update";
pub const ON_DESTROY: &str = "on_destroy";

/// Parameter count of a lifecycle callback, `None` for plain methods
pub fn callback_arity(name: &str) -> Option<usize> {
    match name {
        ON_CREATE | ON_DESTROY => Some(0),
        ON_UPDATE => Some(1),
        _ if name.starts_with("on_") && name.len() > 3 => Some(1),
        _ => None,
    }
}

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a behavior instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

impl InstanceId {
    /// Create a new instance ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocate a process-unique id
    pub fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceState {
    Uninitialized,
    Active,
    Destroyed,
}

/// How a callback invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The behavior has no such callback
    Missing,
    Completed,
    /// The callback raised an error or panicked
    Faulted(String),
}

impl CallbackOutcome {
    pub fn ran(&self) -> bool {
        !matches!(self, CallbackOutcome::Missing)
    }
}

/// A live behavior bound to one entity
pub struct BehaviorInstance {
    id: InstanceId,
    entity: EntityRef,
    module: LoadedModule,
    class: Arc<BehaviorClass>,
    interpreter: Interpreter,
    fields: HashMap<String, Value>,
    state: InstanceState,
    fault_count: u32,
}

impl BehaviorInstance {
    /// Create an instance and run its field initializers
    pub fn new(
        entity: EntityRef,
        module: LoadedModule,
        class: Arc<BehaviorClass>,
    ) -> Result<Self, InstantiationError> {
        let mut interpreter = Interpreter::new(Arc::clone(module.globals()));
        let mut fields = HashMap::new();

        for field in class.fields() {
            let value = catch_panic(|| interpreter.eval_expr(&field.value)).map_err(|source| {
                InstantiationError::field_initializer(class.name(), &field.name, source)
            })?;
            fields.insert(field.name.clone(), value);
        }

        Ok(Self {
            id: InstanceId::next(),
            entity,
            module,
            class,
            interpreter,
            fields,
            state: InstanceState::Uninitialized,
            fault_count: 0,
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn entity(&self) -> EntityRef {
        self.entity
    }

    pub fn type_name(&self) -> &str {
        self.class.name()
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    /// Module the instance's type came from
    pub fn module_id(&self) -> ModuleId {
        self.module.id()
    }

    /// Number of callbacks that raised an error or panicked
    pub fn fault_count(&self) -> u32 {
        self.fault_count
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    pub fn is_active(&self) -> bool {
        self.state == InstanceState::Active
    }

    /// `Uninitialized -> Active`, running `on_create` once
    ///
    /// Returns false when the instance was not uninitialized.
    pub fn activate(&mut self) -> bool {
        if self.state != InstanceState::Uninitialized {
            return false;
        }
        self.state = InstanceState::Active;
        self.invoke(ON_CREATE, Vec::new());
        true
    }

    /// Per-tick update with elapsed seconds
    pub fn update(&mut self, dt: f64) -> CallbackOutcome {
        if !self.is_active() {
            return CallbackOutcome::Missing;
        }
        self.invoke(ON_UPDATE, vec![Value::Float(dt)])
    }

    /// Forward an event to `on_<kind>`, falling back to `on_event`
    pub fn dispatch(&mut self, event: &Event) -> CallbackOutcome {
        if !self.is_active() {
            return CallbackOutcome::Missing;
        }
        let handler = event.handler_name();
        let lifecycle = matches!(handler.as_str(), ON_CREATE | ON_UPDATE | ON_DESTROY);
        let handler = if !lifecycle && self.class.has_method(&handler) {
            handler
        } else {
            CATCH_ALL_HANDLER.to_string()
        };
        self.invoke(&handler, vec![event.to_value()])
    }

    /// Move to `Destroyed`, running `on_destroy` if `on_create` ran
    pub fn destroy(&mut self) {
        match self.state {
            InstanceState::Active => {
                self.state = InstanceState::Destroyed;
                self.invoke(ON_DESTROY, Vec::new());
            }
            InstanceState::Uninitialized => self.state = InstanceState::Destroyed,
            InstanceState::Destroyed => {}
        }
    }

    /// Serializable field values, bincode-encoded
    pub fn snapshot_state(&self) -> Option<Vec<u8>> {
        let state: BTreeMap<&str, SerializableValue> = self
            .fields
            .iter()
            .filter(|(_, value)| !value.is_callable())
            .map(|(name, value)| (name.as_str(), SerializableValue::from(value)))
            .collect();

        match bincode::serialize(&state) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::warn!("Failed to snapshot {} on {}: {}", self.type_name(), self.entity, e);
                None
            }
        }
    }

    /// Restore fields the class still declares; returns how many
    pub fn restore_state(&mut self, bytes: &[u8]) -> usize {
        let state: BTreeMap<String, SerializableValue> = match bincode::deserialize(bytes) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("Discarding unreadable state for {}: {}", self.entity, e);
                return 0;
            }
        };

        let mut restored = 0;
        for (name, value) in state {
            if self.class.has_field(&name) {
                self.fields.insert(name, Value::from(value));
                restored += 1;
            }
        }
        restored
    }

    /// The `self` object handed to methods
    fn self_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert(ENTITY_FIELD.to_string(), Value::Entity(self.entity));
        Value::Object(object)
    }

    fn invoke(&mut self, name: &str, args: Vec<Value>) -> CallbackOutcome {
        let class = Arc::clone(&self.class);
        let Some(method) = class.method(name) else {
            return CallbackOutcome::Missing;
        };

        let this = self.self_value();
        let interpreter = &mut self.interpreter;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            interpreter.call_method(method, this, args)
        }));

        let error = match result {
            Ok(Ok((_, this))) => {
                self.absorb(this);
                return CallbackOutcome::Completed;
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => {
                // Unwinding can leave the call stack half popped
                self.interpreter = Interpreter::new(Arc::clone(self.module.globals()));
                format!("panic: {}", panic_message(payload.as_ref()))
            }
        };

        self.fault_count += 1;
        let qualified = format!("{}.{}", self.type_name(), name);
        let location = self.module.locate(&qualified).unwrap_or_else(|| self.class.unit().to_string());
        log::error!(
            "{} on {} failed ({}): {}",
            qualified,
            self.entity,
            location,
            error
        );
        CallbackOutcome::Faulted(error)
    }

    /// Keep field writes a method made to `self`
    fn absorb(&mut self, this: Value) {
        if let Value::Object(mut object) = this {
            object.remove(ENTITY_FIELD);
            self.fields = object;
        }
    }
}

impl std::fmt::Debug for BehaviorInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorInstance")
            .field("id", &self.id)
            .field("entity", &self.entity)
            .field("type_name", &self.type_name())
            .field("state", &self.state)
            .field("module", &self.module.id())
            .finish()
    }
}

/// Run interpreter work, turning a panic raised by a native into an error
pub(crate) fn catch_panic<T>(
    work: impl FnOnce() -> Result<T, RuntimeError>,
) -> Result<T, RuntimeError> {
    panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        Err(RuntimeError::NativeError(format!(
            "panic: {}",
            panic_message(payload.as_ref())
        )))
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
