//! Behavior compilation pipeline
//!
//! Turns the full set of source units into a module image:
//! - Reference validation against the host environment
//! - Independent parse per unit
//! - Whole-unit semantic checks
//! - Binary image emit (bincode), plus an optional JSON debug image

pub mod diagnostic;
pub mod image;
pub mod resolve;

pub use diagnostic::{has_errors, sort_diagnostics, Diagnostic, Severity};
pub use image::{DebugImage, DebugSymbol, DebugUnit, ModuleImage, IMAGE_FORMAT_VERSION};

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;
use void_script::ast::Item;
use void_script::Program;

use crate::host::HostEnvironment;
use crate::references::ReferenceValidator;
use crate::source::SourceUnit;
use image::{ImageBehavior, ImageConstant, ImageFunction};

/// Pseudo-source for diagnostics raised while emitting
const EMIT_SOURCE: &str = "<emit>";

/// One unit of a compilation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub name: String,
    pub path: PathBuf,
    pub text: String,
}

/// Immutable snapshot of every unit to compile together
#[derive(Debug, Clone, Default)]
pub struct CompilationRequest {
    units: Vec<SourceText>,
}

impl CompilationRequest {
    /// Build a request, ordered by unit name
    pub fn new(mut units: Vec<SourceText>) -> Self {
        units.sort_by(|a, b| a.name.cmp(&b.name));
        Self { units }
    }

    /// Snapshot of source units
    pub fn from_units(units: &[SourceUnit]) -> Self {
        Self::new(
            units
                .iter()
                .map(|unit| SourceText {
                    name: unit.name.clone(),
                    path: unit.path.clone(),
                    text: unit.text.clone(),
                })
                .collect(),
        )
    }

    pub fn units(&self) -> &[SourceText] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Compiler output handed to the module loader
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    /// bincode-encoded [`ModuleImage`]
    pub binary_image: Vec<u8>,
    /// JSON-encoded [`DebugImage`], when debug symbols are enabled
    pub debug_image: Option<Vec<u8>>,
}

/// A successful compilation
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub artifact: CompiledArtifact,
    /// Warnings, sorted
    pub warnings: Vec<Diagnostic>,
    /// Behavior names defined by the artifact
    pub behaviors: Vec<String>,
}

/// A parsed unit, input to the semantic pass
#[derive(Debug, Clone)]
pub struct ParsedUnit {
    pub name: String,
    pub path: PathBuf,
    pub program: Program,
}

/// Compiler options
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Emit the debug image
    pub debug_symbols: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            debug_symbols: cfg!(debug_assertions),
        }
    }
}

/// Compilation statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileStats {
    pub compilations: u64,
    pub failures: u64,
    pub last_duration_ms: f64,
}

/// Compiles source sets against a host environment
pub struct CompilationPipeline {
    validator: ReferenceValidator,
    options: CompilerOptions,
    stats: CompileStats,
}

impl CompilationPipeline {
    /// Create a pipeline
    pub fn new(validator: ReferenceValidator, options: CompilerOptions) -> Self {
        Self {
            validator,
            options,
            stats: CompileStats::default(),
        }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn validator(&self) -> &ReferenceValidator {
        &self.validator
    }

    pub fn stats(&self) -> CompileStats {
        self.stats
    }

    /// Compile every unit of `request` together
    ///
    /// On failure returns all diagnostics (errors and warnings), sorted.
    pub fn compile(
        &mut self,
        request: &CompilationRequest,
        host: &HostEnvironment,
    ) -> Result<CompileOutput, Vec<Diagnostic>> {
        let start = Instant::now();
        let result = self.run(request, host);

        self.stats.compilations += 1;
        self.stats.last_duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        match &result {
            Ok(output) => log::debug!(
                "Compiled {} unit(s), {} behavior(s) in {:.2}ms",
                request.len(),
                output.behaviors.len(),
                self.stats.last_duration_ms
            ),
            Err(diagnostics) => {
                self.stats.failures += 1;
                log::debug!(
                    "Compilation of {} unit(s) failed with {} diagnostic(s)",
                    request.len(),
                    diagnostics.len()
                );
            }
        }
        result
    }

    fn run(
        &self,
        request: &CompilationRequest,
        host: &HostEnvironment,
    ) -> Result<CompileOutput, Vec<Diagnostic>> {
        // 1. Host references, before any parse
        self.validator
            .validate(host)
            .map_err(|missing| missing.to_diagnostics())?;

        // 2. Parse each unit on its own
        let mut diagnostics = Vec::new();
        let mut parsed = Vec::with_capacity(request.len());
        for unit in request.units() {
            match void_script::parse_unit(&unit.text) {
                Ok(program) => parsed.push(ParsedUnit {
                    name: unit.name.clone(),
                    path: unit.path.clone(),
                    program,
                }),
                Err(e) => {
                    let mut diagnostic = Diagnostic::error(&unit.name, e.to_string());
                    diagnostic.location = e.span();
                    diagnostics.push(diagnostic);
                }
            }
        }

        // 3. Check everything that parsed as one unit
        diagnostics.extend(resolve::check_units(&parsed, host));
        sort_diagnostics(&mut diagnostics);

        // 4. No emit with errors pending
        if has_errors(&diagnostics) {
            return Err(diagnostics);
        }

        // 5. Emit
        let image = build_image(&parsed);
        let behaviors = image.behavior_names().map(str::to_string).collect();
        let binary_image = image.encode().map_err(|e| {
            vec![Diagnostic::error(EMIT_SOURCE, format!("Failed to encode module image: {}", e))]
        })?;
        let debug_image = if self.options.debug_symbols {
            let debug = build_debug_image(request, &parsed);
            Some(debug.to_json().map_err(|e| {
                vec![Diagnostic::error(EMIT_SOURCE, format!("Failed to encode debug image: {}", e))]
            })?)
        } else {
            None
        };

        Ok(CompileOutput {
            artifact: CompiledArtifact {
                binary_image,
                debug_image,
            },
            warnings: diagnostics,
            behaviors,
        })
    }
}

fn build_image(units: &[ParsedUnit]) -> ModuleImage {
    let mut image = ModuleImage::new();
    let mut imports = BTreeSet::new();

    for unit in units {
        for item in &unit.program.items {
            match item {
                Item::Use { module, .. } => {
                    imports.insert(module.clone());
                }
                Item::Const { name, value, span } => image.constants.push(ImageConstant {
                    unit: unit.name.clone(),
                    name: name.clone(),
                    value: value.clone(),
                    span: *span,
                }),
                Item::Function(decl) => image.functions.push(ImageFunction {
                    unit: unit.name.clone(),
                    decl: decl.clone(),
                }),
                Item::Behavior(decl) => image.behaviors.push(ImageBehavior {
                    unit: unit.name.clone(),
                    decl: decl.clone(),
                }),
            }
        }
    }

    image.imports = imports.into_iter().collect();
    image
}

fn build_debug_image(request: &CompilationRequest, units: &[ParsedUnit]) -> DebugImage {
    let mut debug = DebugImage {
        units: request
            .units()
            .iter()
            .map(|unit| DebugUnit {
                name: unit.name.clone(),
                path: unit.path.clone(),
                text: unit.text.clone(),
            })
            .collect(),
        symbols: Vec::new(),
    };

    for unit in units {
        for decl in unit.program.functions() {
            debug.symbols.push(DebugSymbol {
                qualified_name: decl.name.clone(),
                unit: unit.name.clone(),
                span: decl.span,
            });
        }
        for behavior in unit.program.behaviors() {
            for method in &behavior.methods {
                debug.symbols.push(DebugSymbol {
                    qualified_name: format!("{}.{}", behavior.name, method.name),
                    unit: unit.name.clone(),
                    span: method.span,
                });
            }
        }
    }

    debug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(sources: &[(&str, &str)]) -> CompilationRequest {
        CompilationRequest::new(
            sources
                .iter()
                .map(|(name, text)| SourceText {
                    name: name.to_string(),
                    path: PathBuf::from(format!("{}.vs", name)),
                    text: text.to_string(),
                })
                .collect(),
        )
    }

    fn pipeline(debug_symbols: bool) -> CompilationPipeline {
        CompilationPipeline::new(ReferenceValidator::default(), CompilerOptions { debug_symbols })
    }

    #[test]
    fn test_compile_success() {
        let mut pipeline = pipeline(true);
        let host = HostEnvironment::standard();
        let output = pipeline
            .compile(
                &request(&[
                    ("B", "use core;\nbehavior Second { fn on_update(dt) { print(dt); } }"),
                    ("A", "use core;\nuse core;\nbehavior First { fn on_create() {} }"),
                ]),
                &host,
            )
            .unwrap();

        assert_eq!(output.behaviors, vec!["First", "Second"]);
        assert_eq!(output.warnings.len(), 1);
        assert_eq!(output.warnings[0].message, "Duplicate import of 'core'");

        let image = ModuleImage::decode(&output.artifact.binary_image).unwrap();
        assert_eq!(image.imports, vec!["core"]);

        let debug = DebugImage::from_json(output.artifact.debug_image.as_deref().unwrap()).unwrap();
        assert_eq!(debug.locate("Second.on_update").as_deref(), Some("B.vs:2:19"));
        assert_eq!(pipeline.stats().compilations, 1);
    }

    #[test]
    fn test_no_debug_image_without_symbols() {
        let mut pipeline = pipeline(false);
        let output = pipeline
            .compile(&request(&[("A", "behavior A { fn on_create() {} }")]), &HostEnvironment::standard())
            .unwrap();
        assert!(output.artifact.debug_image.is_none());
    }

    #[test]
    fn test_missing_references_stop_before_parse() {
        let mut pipeline = pipeline(false);
        let mut host = HostEnvironment::new();
        host.register(crate::host::core_module(host.output().clone()));

        let diagnostics = pipeline
            .compile(&request(&[("A", "this does not parse")]), &host)
            .unwrap_err();

        let sources: Vec<&str> = diagnostics.iter().map(|d| d.source_name.as_str()).collect();
        assert_eq!(sources, vec!["<references>", "<references>"]);
        assert!(diagnostics.iter().all(Diagnostic::is_error));
        assert_eq!(pipeline.stats().failures, 1);
    }

    #[test]
    fn test_parse_errors_per_unit() {
        let mut pipeline = pipeline(false);
        let diagnostics = pipeline
            .compile(
                &request(&[
                    ("Good", "behavior Good { fn on_create() {} }"),
                    ("Bad", "behavior Bad {\n  fn on_create( {}\n}"),
                ]),
                &HostEnvironment::standard(),
            )
            .unwrap_err();

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].source_name, "Bad");
        assert_eq!(diagnostics[0].location.map(|s| s.line), Some(2));
    }

    #[test]
    fn test_cross_unit_references() {
        let mut pipeline = pipeline(false);
        let output = pipeline.compile(
            &request(&[
                ("Shared", "let BASE = 10;\nfn bonus(x) { return x + BASE; }"),
                ("Player", "behavior Player { let hp = bonus(5); fn on_create() {} }"),
            ]),
            &HostEnvironment::standard(),
        );
        assert!(output.is_ok());
    }
}
