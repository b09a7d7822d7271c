//! Module definitions, instances and the model description handed to the
//! Composite Builder.

use crate::domain::Domain;
use crate::expr::Expr;

/// Formal parameter of a module definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct FormalParam {
    pub name: String,
    pub domain: Domain,
}

/// State variable declared by a module definition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VarDecl {
    pub name: String,
    pub domain: Domain,
}

/// Derived expression (`DEFINE name := expr`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DefineDecl {
    pub name: String,
    pub expr: Expr,
}

/// `init(var) := expr` or `next(var) := expr`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Assignment {
    pub var: String,
    pub expr: Expr,
}

/// Placement of a module definition, with one binding per formal parameter.
///
/// Bindings are expressions over the enclosing scope: sibling instances'
/// variables and defines, the parent's own members, or constants.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ModuleInstance {
    pub name: String,
    pub module: String,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub bindings: Vec<Expr>,
}

impl ModuleInstance {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            bindings: Vec::new(),
        }
    }

    pub fn bind(mut self, expr: Expr) -> Self {
        self.bindings.push(expr);
        self
    }
}

/// Reusable finite-state template.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ModuleDefinition {
    pub name: String,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub params: Vec<FormalParam>,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub vars: Vec<VarDecl>,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub defines: Vec<DefineDecl>,
    /// Child instances created for every instance of this definition.
    #[cfg_attr(feature = "serialize", serde(default))]
    pub instances: Vec<ModuleInstance>,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub init: Vec<Assignment>,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub next: Vec<Assignment>,
    /// Two-state transition constraints (`TRANS`). Resolved in this scope,
    /// enforced globally.
    #[cfg_attr(feature = "serialize", serde(default))]
    pub constraints: Vec<Expr>,
}

impl ModuleDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            vars: Vec::new(),
            defines: Vec::new(),
            instances: Vec::new(),
            init: Vec::new(),
            next: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, domain: Domain) -> Self {
        self.params.push(FormalParam {
            name: name.into(),
            domain,
        });
        self
    }

    pub fn with_var(mut self, name: impl Into<String>, domain: Domain) -> Self {
        self.vars.push(VarDecl {
            name: name.into(),
            domain,
        });
        self
    }

    pub fn with_define(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.defines.push(DefineDecl {
            name: name.into(),
            expr,
        });
        self
    }

    pub fn with_instance(mut self, instance: ModuleInstance) -> Self {
        self.instances.push(instance);
        self
    }

    pub fn with_init(mut self, var: impl Into<String>, expr: Expr) -> Self {
        self.init.push(Assignment {
            var: var.into(),
            expr,
        });
        self
    }

    pub fn with_next(mut self, var: impl Into<String>, expr: Expr) -> Self {
        self.next.push(Assignment {
            var: var.into(),
            expr,
        });
        self
    }

    pub fn with_constraint(mut self, expr: Expr) -> Self {
        self.constraints.push(expr);
        self
    }
}

/// Safety property `G formula`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyDecl {
    pub name: String,
    /// Resolved in the root instance's scope.
    pub formula: Expr,
}

/// A fully described model: definitions, the root instance, and the
/// properties to verify.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Model {
    pub definitions: Vec<ModuleDefinition>,
    pub root: ModuleInstance,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub properties: Vec<PropertyDecl>,
}

impl Model {
    pub fn new(root: ModuleInstance) -> Self {
        Self {
            definitions: Vec::new(),
            root,
            properties: Vec::new(),
        }
    }

    pub fn with_definition(mut self, definition: ModuleDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, formula: Expr) -> Self {
        self.properties.push(PropertyDecl {
            name: name.into(),
            formula,
        });
        self
    }

    pub fn definition(&self, name: &str) -> Option<&ModuleDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }
}
