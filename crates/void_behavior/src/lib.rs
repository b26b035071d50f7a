//! # void_behavior - Hot-Reloadable Behaviors
//!
//! Compiles VoidScript behavior sources into isolated modules and swaps
//! them into a running session without restarting it.
//!
//! ## Overview
//!
//! Behavior sources live one per file in a directory. Every frame the
//! runtime checks the directory; when something changed it recompiles the
//! whole set, loads the result next to the running module, and moves every
//! entity over to a fresh instance of its behavior. A source that does not
//! compile never replaces working code.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │ SourceRegistry  │────▶│ CompilationPipe │──▶ Diagnostics
//! │ (*.vs on disk)  │     │ line            │
//! └─────────────────┘     └────────┬────────┘
//!                                  │ CompiledArtifact
//!                                  ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ HostEnvironment │────▶│  ModuleLoader   │
//! │ (core, entity,  │     │ (links imports) │
//! │  input, ...)    │     └────────┬────────┘
//! └─────────────────┘              │ LoadedModule
//!                                  ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ BehaviorRuntime │────▶│  TypeRegistry   │
//! │ (swap state     │     └────────┬────────┘
//! │  machine)       │              ▼
//! └────────┬────────┘     ┌─────────────────┐
//!          └─────────────▶│BehaviorInstance │ ◀── one per entity
//!                         └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use void_behavior::{BehaviorRuntime, EntityTable, HostEnvironment, RuntimeConfig};
//!
//! let config = RuntimeConfig::with_source_dir("behaviors");
//! let mut runtime = BehaviorRuntime::new(config, Arc::new(HostEnvironment::standard()))?;
//!
//! let mut world = EntityTable::new();
//! world.spawn_with("Mover");
//!
//! loop {
//!     let report = runtime.tick(&mut world, 1.0 / 60.0);
//!     // ...
//! }
//! ```

pub mod compiler;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod host;
pub mod instance;
pub mod loader;
pub mod references;
pub mod runtime;
pub mod source;
pub mod types;

pub use compiler::{
    CompilationPipeline, CompilationRequest, CompileOutput, CompiledArtifact, CompilerOptions,
    Diagnostic, Severity, SourceText,
};
pub use config::{RuntimeConfig, ENV_DEBUG, ENV_PRESERVE_STATE, ENV_SOURCE_DIR};
pub use entity::{EntityHost, EntityTable};
pub use error::{BehaviorError, ConfigError, InstantiationError, LoadError, Result};
pub use event::Event;
pub use host::{
    core_module, entity_module, input_module, HostEnvironment, HostModule, OutputBuffer,
    OutputSink,
};
pub use instance::{BehaviorInstance, CallbackOutcome, InstanceId, InstanceState};
pub use loader::{BehaviorClass, LoadedModule, LoaderOptions, ModuleId, ModuleLoader, UnloadStatus};
pub use references::{MissingReferences, ReferenceValidator};
pub use runtime::{
    BehaviorRuntime, RebindFailure, SwapOutcome, SwapReport, SwapStage, SwapState, SwapTrigger,
    TickReport,
};
pub use source::{ChangeSet, SourceFingerprint, SourceRegistry, SourceUnit};
pub use types::{TypeDescriptor, TypeRegistry};

pub use void_script::EntityRef;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::RuntimeConfig;
    pub use crate::entity::{EntityHost, EntityTable};
    pub use crate::error::{BehaviorError, Result};
    pub use crate::event::Event;
    pub use crate::host::HostEnvironment;
    pub use crate::runtime::{BehaviorRuntime, SwapReport, TickReport};
    pub use void_script::EntityRef;
}
