//! Binary and debug images produced by the compiler

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use void_script::{BehaviorDecl, Expr, FunctionDecl, Span};

use crate::error::LoadError;

/// Version written into every module image
pub const IMAGE_FORMAT_VERSION: u32 = 1;

/// Everything the loader needs to build a module context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleImage {
    pub format_version: u32,
    /// Host modules to link, sorted and deduplicated
    pub imports: Vec<String>,
    pub functions: Vec<ImageFunction>,
    /// Module constants in evaluation order
    pub constants: Vec<ImageConstant>,
    pub behaviors: Vec<ImageBehavior>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFunction {
    pub unit: String,
    pub decl: FunctionDecl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConstant {
    pub unit: String,
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageBehavior {
    pub unit: String,
    pub decl: BehaviorDecl,
}

impl ModuleImage {
    /// Empty image at the current format version
    pub fn new() -> Self {
        Self {
            format_version: IMAGE_FORMAT_VERSION,
            imports: Vec::new(),
            functions: Vec::new(),
            constants: Vec::new(),
            behaviors: Vec::new(),
        }
    }

    /// Encode with bincode
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decode and check the format version
    pub fn decode(bytes: &[u8]) -> Result<Self, LoadError> {
        let image: Self =
            bincode::deserialize(bytes).map_err(|e| LoadError::Decode(e.to_string()))?;
        if image.format_version != IMAGE_FORMAT_VERSION {
            return Err(LoadError::UnsupportedVersion {
                found: image.format_version,
                expected: IMAGE_FORMAT_VERSION,
            });
        }
        Ok(image)
    }

    /// Behavior names in image order
    pub fn behavior_names(&self) -> impl Iterator<Item = &str> {
        self.behaviors.iter().map(|b| b.decl.name.as_str())
    }
}

impl Default for ModuleImage {
    fn default() -> Self {
        Self::new()
    }
}

/// Source map emitted next to the binary image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugImage {
    pub units: Vec<DebugUnit>,
    pub symbols: Vec<DebugSymbol>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugUnit {
    pub name: String,
    pub path: PathBuf,
    pub text: String,
}

/// Definition site of a function or method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugSymbol {
    /// `name` for free functions, `Behavior.method` for methods
    pub qualified_name: String,
    pub unit: String,
    pub span: Span,
}

impl DebugImage {
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Symbol by qualified name
    pub fn symbol(&self, qualified_name: &str) -> Option<&DebugSymbol> {
        self.symbols
            .iter()
            .find(|s| s.qualified_name == qualified_name)
    }

    /// `file:line:column` of a symbol
    pub fn locate(&self, qualified_name: &str) -> Option<String> {
        let symbol = self.symbol(qualified_name)?;
        let file = self
            .units
            .iter()
            .find(|u| u.name == symbol.unit)
            .and_then(|u| u.path.file_name())
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| symbol.unit.clone());
        Some(format!("{}:{}", file, symbol.span))
    }

    /// One line of a unit's source text (1-based)
    pub fn source_line(&self, unit: &str, line: u32) -> Option<&str> {
        let index = usize::try_from(line).ok()?.checked_sub(1)?;
        self.units
            .iter()
            .find(|u| u.name == unit)?
            .text
            .lines()
            .nth(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_check() {
        let mut image = ModuleImage::new();
        image.format_version = IMAGE_FORMAT_VERSION + 1;
        let bytes = image.encode().unwrap();

        assert!(matches!(
            ModuleImage::decode(&bytes),
            Err(LoadError::UnsupportedVersion { .. })
        ));
        assert!(matches!(
            ModuleImage::decode(&[1, 2, 3]),
            Err(LoadError::Decode(_))
        ));
    }

    #[test]
    fn test_debug_locate() {
        let debug = DebugImage {
            units: vec![DebugUnit {
                name: "Foo".into(),
                path: PathBuf::from("/tmp/behaviors/Foo.vs"),
                text: "use core;\nbehavior Foo {\n}".into(),
            }],
            symbols: vec![DebugSymbol {
                qualified_name: "Foo.on_update".into(),
                unit: "Foo".into(),
                span: Span::new(4, 5),
            }],
        };

        assert_eq!(debug.locate("Foo.on_update").as_deref(), Some("Foo.vs:4:5"));
        assert_eq!(debug.locate("Foo.on_create"), None);
        assert_eq!(debug.source_line("Foo", 2), Some("behavior Foo {"));
        assert_eq!(debug.source_line("Foo", 0), None);

        let restored = DebugImage::from_json(&debug.to_json().unwrap()).unwrap();
        assert_eq!(restored, debug);
    }
}
