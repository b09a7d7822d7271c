use miette::Diagnostic;
use thiserror::Error;

/// Construction-time failure of the Composite Builder.
///
/// All variants are fatal: the model is malformed and no partial composite is
/// produced.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum BuildError {
    #[error("cyclic instantiation at '{instance}': {reason}")]
    #[diagnostic(
        code(vigil::build::cyclic_instantiation),
        help("parameter bindings and defines must not depend on the instance's own subtree")
    )]
    CyclicInstantiation { instance: String, reason: String },

    #[error("unbound reference '{name}' in scope '{scope}'")]
    #[diagnostic(code(vigil::build::unbound_reference))]
    UnboundReference { scope: String, name: String },

    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    #[diagnostic(code(vigil::build::type_mismatch))]
    TypeMismatch {
        context: String,
        expected: String,
        found: String,
    },

    #[error("duplicate declaration '{name}' in {scope}")]
    #[diagnostic(code(vigil::build::duplicate_declaration))]
    DuplicateDeclaration { scope: String, name: String },
}

impl BuildError {
    pub(crate) fn mismatch(
        context: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        BuildError::TypeMismatch {
            context: context.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Stable machine-readable class of the error.
    pub fn kind(&self) -> &'static str {
        match self {
            BuildError::CyclicInstantiation { .. } => "cyclic_instantiation",
            BuildError::UnboundReference { .. } => "unbound_reference",
            BuildError::TypeMismatch { .. } => "type_mismatch",
            BuildError::DuplicateDeclaration { .. } => "duplicate_declaration",
        }
    }
}
