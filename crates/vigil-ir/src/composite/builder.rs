use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, warn};

use crate::compiled::{CExpr, DefineId, Reference, SymbolId, Value};
use crate::domain::{Domain, Literal};
use crate::error::BuildError;
use crate::expr::{BinOp, Expr};
use crate::module::{Assignment, Model, ModuleDefinition, ModuleInstance, PropertyDecl};
use crate::state::VarId;

use super::{
    Codec, CompositeModel, ConstraintInfo, DefineInfo, InstanceId, InstanceInfo, PropertyInfo, Ty,
    VarInfo,
};

/// Flatten `model` into a [`CompositeModel`].
///
/// Instances are expanded depth-first from the root: each instance
/// contributes its own variables, then its children's. Root variables keep
/// their bare names; everything else is qualified by instance path
/// (`SC.G1.state`). Parameter references are replaced by the compiled
/// binding, so the result is a single flat product automaton.
pub fn build(model: &Model) -> Result<CompositeModel, BuildError> {
    let mut builder = Builder::new(model)?;
    if let Some(name) = model.root.bindings.iter().find_map(first_reference) {
        return Err(BuildError::UnboundReference {
            scope: model.root.name.clone(),
            name: name.to_string(),
        });
    }
    let root = builder.expand(&model.root, None, &mut Vec::new())?;

    for inst in 0..builder.nodes.len() {
        for idx in 0..builder.nodes[inst].param_slots.len() {
            builder.param(inst, idx)?;
        }
    }
    let compiled_defines = (0..builder.defines.len())
        .map(|define| builder.ensure_define(define))
        .collect::<Result<Vec<_>, _>>()?;

    let (init_rules, next_rules) = builder.compile_rules()?;
    let constraints = builder.compile_constraints()?;
    let properties = builder.compile_properties(root, &model.properties)?;
    let composite = builder.finish(
        compiled_defines,
        init_rules,
        next_rules,
        constraints,
        properties,
    );

    // An empty initial set would make every property hold vacuously.
    for (var, info) in composite.vars.iter().enumerate() {
        if composite.init_candidates(var).is_empty() {
            return Err(BuildError::mismatch(
                format!("init({})", info.path),
                "at least one initial value",
                "no initial value",
            ));
        }
    }

    info!(
        instances = composite.instances.len(),
        variables = composite.vars.len(),
        defines = composite.defines.len(),
        constraints = composite.constraints.len(),
        properties = composite.properties.len(),
        "Composite model built"
    );
    Ok(composite)
}

/// Compilation context of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// A single current-state value (defines, bindings, guards, properties).
    Scalar,
    /// `init`/`next` right-hand side: `{..}` choices allowed at result positions.
    Rule,
    /// Transition constraint: `next(..)` allowed.
    Transition,
}

impl Mode {
    fn operand(self) -> Mode {
        match self {
            Mode::Rule => Mode::Scalar,
            other => other,
        }
    }
}

#[derive(Debug)]
enum Slot {
    Pending,
    InProgress,
    Done(CExpr, Ty),
}

enum Resolved {
    Var(VarId),
    Define(DefineId),
    Param(InstanceId, usize),
}

struct Node<'m> {
    info: InstanceInfo,
    def: &'m ModuleDefinition,
    bindings: &'m [Expr],
    children: IndexMap<&'m str, InstanceId>,
    vars: IndexMap<&'m str, VarId>,
    defines: IndexMap<&'m str, DefineId>,
    params: IndexMap<&'m str, usize>,
    param_slots: Vec<Slot>,
}

struct PendingDefine<'m> {
    path: String,
    instance: InstanceId,
    expr: &'m Expr,
    slot: Slot,
}

struct Builder<'m> {
    definitions: IndexMap<&'m str, &'m ModuleDefinition>,
    nodes: Vec<Node<'m>>,
    symbols: IndexSet<String>,
    vars: Vec<VarInfo>,
    defines: Vec<PendingDefine<'m>>,
}

fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn first_reference(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Lit(_) => None,
        Expr::Ref(path) | Expr::Next(path) => Some(path),
        Expr::Not(inner) => first_reference(inner),
        Expr::Binary { lhs, rhs, .. } => first_reference(lhs).or_else(|| first_reference(rhs)),
        Expr::Count(items) | Expr::Choice(items) => items.iter().find_map(first_reference),
        Expr::Case(arms) => arms
            .iter()
            .find_map(|arm| first_reference(&arm.guard).or_else(|| first_reference(&arm.result))),
    }
}

fn check_domain(context: &str, domain: &Domain) -> Result<(), BuildError> {
    match domain {
        Domain::Boolean => Ok(()),
        Domain::Enum(symbols) => {
            if symbols.is_empty() {
                return Err(BuildError::mismatch(context, "non-empty symbol set", "{}"));
            }
            let mut seen = HashSet::new();
            for symbol in symbols {
                if !seen.insert(symbol.as_str()) {
                    return Err(BuildError::DuplicateDeclaration {
                        scope: format!("domain of {context}"),
                        name: symbol.clone(),
                    });
                }
            }
            Ok(())
        }
        Domain::Range { min, max } => {
            if min > max {
                Err(BuildError::mismatch(
                    context,
                    "range with min <= max",
                    format!("{min}..{max}"),
                ))
            } else if domain.size() > u32::MAX as usize {
                Err(BuildError::mismatch(
                    context,
                    "range with at most 2^32 values",
                    format!("{min}..{max}"),
                ))
            } else {
                Ok(())
            }
        }
    }
}

fn codec_for(domain: &Domain, symbols: &mut IndexSet<String>) -> Codec {
    match domain {
        Domain::Boolean => Codec::Boolean,
        Domain::Range { min, .. } => Codec::Range { min: *min },
        Domain::Enum(names) => Codec::Enum(
            names
                .iter()
                .map(|name| symbols.insert_full(name.clone()).0 as SymbolId)
                .collect(),
        ),
    }
}

impl<'m> Builder<'m> {
    fn new(model: &'m Model) -> Result<Self, BuildError> {
        let mut definitions = IndexMap::new();
        for def in &model.definitions {
            if definitions.insert(def.name.as_str(), def).is_some() {
                return Err(BuildError::DuplicateDeclaration {
                    scope: "model".to_string(),
                    name: def.name.clone(),
                });
            }
            let scope = format!("module '{}'", def.name);
            let mut names = HashSet::new();
            let declared = def
                .params
                .iter()
                .map(|p| &p.name)
                .chain(def.vars.iter().map(|v| &v.name))
                .chain(def.defines.iter().map(|d| &d.name))
                .chain(def.instances.iter().map(|i| &i.name));
            for name in declared {
                if !names.insert(name.as_str()) {
                    return Err(BuildError::DuplicateDeclaration {
                        scope,
                        name: name.clone(),
                    });
                }
            }
            for param in &def.params {
                check_domain(&format!("parameter '{}.{}'", def.name, param.name), &param.domain)?;
            }
            for var in &def.vars {
                check_domain(&format!("variable '{}.{}'", def.name, var.name), &var.domain)?;
            }
        }
        Ok(Self {
            definitions,
            nodes: Vec::new(),
            symbols: IndexSet::new(),
            vars: Vec::new(),
            defines: Vec::new(),
        })
    }

    fn expand(
        &mut self,
        decl: &'m ModuleInstance,
        parent: Option<InstanceId>,
        stack: &mut Vec<&'m str>,
    ) -> Result<InstanceId, BuildError> {
        let (path, label, scope) = match parent {
            None => (String::new(), decl.name.clone(), "model".to_string()),
            Some(p) => {
                let path = qualify(&self.nodes[p].info.path, &decl.name);
                (path.clone(), path, self.nodes[p].info.label.clone())
            }
        };
        let def = *self
            .definitions
            .get(decl.module.as_str())
            .ok_or_else(|| BuildError::UnboundReference {
                scope,
                name: decl.module.clone(),
            })?;
        if stack.contains(&def.name.as_str()) {
            let mut chain = stack.clone();
            chain.push(&def.name);
            return Err(BuildError::CyclicInstantiation {
                instance: label,
                reason: format!(
                    "module '{}' instantiates itself ({})",
                    def.name,
                    chain.join(" -> ")
                ),
            });
        }
        if decl.bindings.len() != def.params.len() {
            return Err(BuildError::mismatch(
                format!("instance '{label}' of module '{}'", def.name),
                format!("{} parameter binding(s)", def.params.len()),
                decl.bindings.len().to_string(),
            ));
        }

        let id = self.nodes.len();
        let mut vars = IndexMap::new();
        for var in &def.vars {
            vars.insert(var.name.as_str(), self.vars.len());
            let codec = codec_for(&var.domain, &mut self.symbols);
            self.vars.push(VarInfo {
                path: qualify(&path, &var.name),
                instance: id,
                domain: var.domain.clone(),
                codec,
            });
        }
        let mut defines = IndexMap::new();
        for define in &def.defines {
            defines.insert(define.name.as_str(), self.defines.len());
            self.defines.push(PendingDefine {
                path: qualify(&path, &define.name),
                instance: id,
                expr: &define.expr,
                slot: Slot::Pending,
            });
        }
        self.nodes.push(Node {
            info: InstanceInfo {
                path,
                label,
                module: def.name.clone(),
                parent,
            },
            def,
            bindings: &decl.bindings,
            children: IndexMap::new(),
            vars,
            defines,
            params: def
                .params
                .iter()
                .enumerate()
                .map(|(idx, p)| (p.name.as_str(), idx))
                .collect(),
            param_slots: def.params.iter().map(|_| Slot::Pending).collect(),
        });

        stack.push(def.name.as_str());
        for child in &def.instances {
            let child_id = self.expand(child, Some(id), stack)?;
            self.nodes[id].children.insert(child.name.as_str(), child_id);
        }
        stack.pop();
        Ok(id)
    }

    fn label(&self, inst: InstanceId) -> String {
        self.nodes[inst].info.label.clone()
    }

    /// Resolve a dotted path relative to `scope`: local variable, define,
    /// parameter, or a member of a child instance.
    fn resolve(&self, scope: InstanceId, path: &str) -> Result<Resolved, BuildError> {
        let segments: Vec<&str> = path.split('.').collect();
        let mut node = scope;
        for (i, segment) in segments.iter().enumerate() {
            let n = &self.nodes[node];
            if i + 1 == segments.len() {
                if let Some(&var) = n.vars.get(segment) {
                    return Ok(Resolved::Var(var));
                }
                if let Some(&define) = n.defines.get(segment) {
                    return Ok(Resolved::Define(define));
                }
                if let Some(&param) = n.params.get(segment) {
                    return Ok(Resolved::Param(node, param));
                }
            } else if let Some(&child) = n.children.get(segment) {
                node = child;
                continue;
            }
            break;
        }
        Err(BuildError::UnboundReference {
            scope: self.label(scope),
            name: path.to_string(),
        })
    }

    fn ensure_define(&mut self, id: DefineId) -> Result<(CExpr, Ty), BuildError> {
        match &self.defines[id].slot {
            Slot::Done(expr, ty) => return Ok((expr.clone(), ty.clone())),
            Slot::InProgress => {
                return Err(BuildError::CyclicInstantiation {
                    instance: self.label(self.defines[id].instance),
                    reason: format!("define '{}' depends on itself", self.defines[id].path),
                })
            }
            Slot::Pending => {}
        }
        self.defines[id].slot = Slot::InProgress;
        let instance = self.defines[id].instance;
        let expr = self.defines[id].expr;
        let context = format!("define '{}'", self.defines[id].path);
        let (compiled, ty) = self.compile(instance, expr, Mode::Scalar, &context)?;
        self.defines[id].slot = Slot::Done(compiled.clone(), ty.clone());
        Ok((compiled, ty))
    }

    /// Compiled binding of parameter `idx` of instance `inst`, typed by the
    /// formal parameter's domain.
    fn param(&mut self, inst: InstanceId, idx: usize) -> Result<(CExpr, Ty), BuildError> {
        let def = self.nodes[inst].def;
        let formal = &def.params[idx];
        match &self.nodes[inst].param_slots[idx] {
            Slot::Done(expr, ty) => return Ok((expr.clone(), ty.clone())),
            Slot::InProgress => {
                return Err(BuildError::CyclicInstantiation {
                    instance: self.label(inst),
                    reason: format!("binding of parameter '{}' depends on itself", formal.name),
                })
            }
            Slot::Pending => {}
        }
        self.nodes[inst].param_slots[idx] = Slot::InProgress;

        let bindings = self.nodes[inst].bindings;
        let scope = self.nodes[inst].info.parent.unwrap_or(inst);
        let context = format!(
            "binding of parameter '{}' of '{}'",
            formal.name,
            self.label(inst)
        );
        let (compiled, ty) = self.compile(scope, &bindings[idx], Mode::Scalar, &context)?;
        if !ty.conforms(&formal.domain, &self.symbols) {
            return Err(BuildError::mismatch(
                context,
                formal.domain.to_string(),
                ty.describe(&self.symbols),
            ));
        }
        let own_read = self.footprint(&compiled).into_iter().find_map(|r| {
            let (owner, path) = self.owner(r);
            self.within(owner, inst).then(|| path.to_string())
        });
        if let Some(path) = own_read {
            return Err(BuildError::CyclicInstantiation {
                instance: self.label(inst),
                reason: format!(
                    "binding of parameter '{}' reads '{path}' inside the instance's own subtree",
                    formal.name
                ),
            });
        }

        let formal_ty = Ty::of_domain(&formal.domain, &mut self.symbols);
        self.nodes[inst].param_slots[idx] = Slot::Done(compiled.clone(), formal_ty.clone());
        Ok((compiled, formal_ty))
    }

    fn owner(&self, reference: Reference) -> (InstanceId, &str) {
        match reference {
            Reference::Var(v) => (self.vars[v].instance, &self.vars[v].path),
            Reference::Define(d) => (self.defines[d].instance, &self.defines[d].path),
        }
    }

    fn within(&self, node: InstanceId, ancestor: InstanceId) -> bool {
        let mut current = Some(node);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.nodes[c].info.parent;
        }
        false
    }

    /// Every variable and define `expr` reads, following defines
    /// transitively, in discovery order.
    fn footprint(&self, expr: &CExpr) -> Vec<Reference> {
        let mut pending = Vec::new();
        expr.for_each_ref(&mut |r| pending.push(r));
        pending.reverse();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        while let Some(reference) = pending.pop() {
            if !seen.insert(reference) {
                continue;
            }
            out.push(reference);
            if let Reference::Define(d) = reference {
                if let Slot::Done(body, _) = &self.defines[d].slot {
                    let mut inner = Vec::new();
                    body.for_each_ref(&mut |r| inner.push(r));
                    pending.extend(inner.into_iter().rev());
                }
            }
        }
        out
    }

    fn constant(&mut self, literal: &Literal) -> (CExpr, Ty) {
        match literal {
            Literal::Bool(b) => (CExpr::Const(Value::Bool(*b)), Ty::Bool),
            Literal::Int(v) => (CExpr::Const(Value::Int(*v)), Ty::int(*v)),
            Literal::Symbol(name) => {
                let id = self.symbols.insert_full(name.clone()).0 as SymbolId;
                (
                    CExpr::Const(Value::Symbol(id)),
                    Ty::Sym(std::iter::once(id).collect()),
                )
            }
        }
    }

    fn reference(
        &mut self,
        scope: InstanceId,
        path: &str,
        next: bool,
    ) -> Result<(CExpr, Ty), BuildError> {
        match self.resolve(scope, path)? {
            Resolved::Var(v) => {
                let ty = Ty::of_domain(&self.vars[v].domain, &mut self.symbols);
                Ok((if next { CExpr::NextVar(v) } else { CExpr::Var(v) }, ty))
            }
            Resolved::Define(d) => {
                let (_, ty) = self.ensure_define(d)?;
                Ok((if next { CExpr::NextDefine(d) } else { CExpr::Define(d) }, ty))
            }
            Resolved::Param(inst, idx) => {
                let (expr, ty) = self.param(inst, idx)?;
                Ok((if next { expr.shifted_to_next() } else { expr }, ty))
            }
        }
    }

    fn expect_bool(&self, ty: &Ty, context: &str) -> Result<(), BuildError> {
        if *ty == Ty::Bool {
            Ok(())
        } else {
            Err(BuildError::mismatch(context, "boolean", ty.describe(&self.symbols)))
        }
    }

    fn binary_type(&self, op: BinOp, lhs: &Ty, rhs: &Ty, context: &str) -> Result<Ty, BuildError> {
        if op.is_logical() {
            self.expect_bool(lhs, context)?;
            self.expect_bool(rhs, context)?;
            return Ok(Ty::Bool);
        }
        if op.is_ordering() || op.is_arithmetic() {
            let (Ty::Int { lo: a, hi: b }, Ty::Int { lo: c, hi: d }) = (lhs, rhs) else {
                return Err(BuildError::mismatch(
                    context,
                    format!("integer operands for '{}'", op.symbol()),
                    format!(
                        "{} {} {}",
                        lhs.describe(&self.symbols),
                        op.symbol(),
                        rhs.describe(&self.symbols)
                    ),
                ));
            };
            return Ok(match op {
                BinOp::Add => Ty::Int {
                    lo: a.saturating_add(*c),
                    hi: b.saturating_add(*d),
                },
                BinOp::Sub => Ty::Int {
                    lo: a.saturating_sub(*d),
                    hi: b.saturating_sub(*c),
                },
                _ => Ty::Bool,
            });
        }
        if lhs.comparable(rhs) {
            Ok(Ty::Bool)
        } else {
            Err(BuildError::mismatch(
                context,
                format!("operand comparable with {}", lhs.describe(&self.symbols)),
                rhs.describe(&self.symbols),
            ))
        }
    }

    fn union(&self, acc: Option<Ty>, ty: Ty, context: &str) -> Result<Ty, BuildError> {
        match acc {
            None => Ok(ty),
            Some(prev) => prev.union(&ty).ok_or_else(|| {
                BuildError::mismatch(
                    context,
                    prev.describe(&self.symbols),
                    ty.describe(&self.symbols),
                )
            }),
        }
    }

    fn compile(
        &mut self,
        scope: InstanceId,
        expr: &'m Expr,
        mode: Mode,
        context: &str,
    ) -> Result<(CExpr, Ty), BuildError> {
        match expr {
            Expr::Lit(literal) => Ok(self.constant(literal)),
            Expr::Ref(path) => self.reference(scope, path, false),
            Expr::Next(path) => {
                if mode != Mode::Transition {
                    return Err(BuildError::mismatch(
                        context,
                        "current-state expression",
                        format!("next({path})"),
                    ));
                }
                self.reference(scope, path, true)
            }
            Expr::Not(inner) => {
                let (compiled, ty) = self.compile(scope, inner, mode.operand(), context)?;
                self.expect_bool(&ty, context)?;
                Ok((CExpr::Not(Box::new(compiled)), Ty::Bool))
            }
            Expr::Binary { op, lhs, rhs } => {
                let (l, lt) = self.compile(scope, lhs, mode.operand(), context)?;
                let (r, rt) = self.compile(scope, rhs, mode.operand(), context)?;
                let ty = self.binary_type(*op, &lt, &rt, context)?;
                Ok((CExpr::Binary(*op, Box::new(l), Box::new(r)), ty))
            }
            Expr::Count(items) => {
                let mut compiled = Vec::with_capacity(items.len());
                for item in items {
                    let (c, ty) = self.compile(scope, item, mode.operand(), context)?;
                    self.expect_bool(&ty, context)?;
                    compiled.push(c);
                }
                let hi = compiled.len() as i64;
                Ok((CExpr::Count(compiled), Ty::Int { lo: 0, hi }))
            }
            Expr::Case(arms) => {
                if arms.is_empty() {
                    return Err(BuildError::mismatch(
                        context,
                        "at least one case branch",
                        "empty case",
                    ));
                }
                let mut compiled = Vec::with_capacity(arms.len());
                let mut result_ty = None;
                for arm in arms {
                    let (guard, gt) = self.compile(scope, &arm.guard, mode.operand(), context)?;
                    self.expect_bool(&gt, context)?;
                    let (result, rt) = self.compile(scope, &arm.result, mode, context)?;
                    result_ty = Some(self.union(result_ty, rt, context)?);
                    compiled.push((guard, result));
                }
                let exhaustive = compiled.last().is_some_and(|(guard, _)| guard.is_true_literal());
                if !exhaustive {
                    if mode != Mode::Rule {
                        return Err(BuildError::mismatch(
                            context,
                            "case ending in a TRUE branch",
                            "non-exhaustive case",
                        ));
                    }
                    warn!(
                        context,
                        "case has no TRUE branch; states matching no guard yield no candidate"
                    );
                }
                let ty = result_ty.unwrap_or(Ty::Bool);
                Ok((CExpr::Case(compiled), ty))
            }
            Expr::Choice(items) => {
                if mode != Mode::Rule {
                    return Err(BuildError::mismatch(
                        context,
                        "single value",
                        "nondeterministic choice",
                    ));
                }
                if items.is_empty() {
                    return Err(BuildError::mismatch(context, "at least one value", "{}"));
                }
                let mut compiled = Vec::with_capacity(items.len());
                let mut ty = None;
                for item in items {
                    let (c, t) = self.compile(scope, item, Mode::Rule, context)?;
                    ty = Some(self.union(ty, t, context)?);
                    compiled.push(c);
                }
                Ok((CExpr::Choice(compiled), ty.unwrap_or(Ty::Bool)))
            }
        }
    }

    fn compile_rule(
        &mut self,
        inst: InstanceId,
        rule: &'m Assignment,
        kind: &str,
    ) -> Result<(VarId, CExpr), BuildError> {
        let var = *self.nodes[inst]
            .vars
            .get(rule.var.as_str())
            .ok_or_else(|| BuildError::UnboundReference {
                scope: self.label(inst),
                name: rule.var.clone(),
            })?;
        let context = format!("{kind}({})", self.vars[var].path);
        let (compiled, ty) = self.compile(inst, &rule.expr, Mode::Rule, &context)?;
        if !ty.conforms(&self.vars[var].domain, &self.symbols) {
            return Err(BuildError::mismatch(
                context,
                self.vars[var].domain.to_string(),
                ty.describe(&self.symbols),
            ));
        }
        Ok((var, compiled))
    }

    #[allow(clippy::type_complexity)]
    fn compile_rules(
        &mut self,
    ) -> Result<(Vec<Option<CExpr>>, Vec<Option<CExpr>>), BuildError> {
        let mut init: Vec<Option<CExpr>> = vec![None; self.vars.len()];
        let mut next: Vec<Option<CExpr>> = vec![None; self.vars.len()];
        for inst in 0..self.nodes.len() {
            let def = self.nodes[inst].def;
            for rule in &def.init {
                let (var, compiled) = self.compile_rule(inst, rule, "init")?;
                let state_read = self
                    .footprint(&compiled)
                    .into_iter()
                    .find_map(|r| match r {
                        Reference::Var(v) => Some(self.vars[v].path.clone()),
                        Reference::Define(_) => None,
                    });
                if let Some(path) = state_read {
                    return Err(BuildError::mismatch(
                        format!("init({})", self.vars[var].path),
                        "state-independent expression",
                        format!("read of '{path}'"),
                    ));
                }
                if init[var].is_some() {
                    return Err(BuildError::DuplicateDeclaration {
                        scope: format!("init rules of '{}'", self.label(inst)),
                        name: rule.var.clone(),
                    });
                }
                init[var] = Some(compiled);
            }
            for rule in &def.next {
                let (var, compiled) = self.compile_rule(inst, rule, "next")?;
                if next[var].is_some() {
                    return Err(BuildError::DuplicateDeclaration {
                        scope: format!("next rules of '{}'", self.label(inst)),
                        name: rule.var.clone(),
                    });
                }
                next[var] = Some(compiled);
            }
        }
        for (var, rule) in next.iter().enumerate() {
            if rule.is_none() {
                debug!(var = %self.vars[var].path, "No next rule; value ranges over its domain");
            }
        }
        Ok((init, next))
    }

    fn compile_constraints(&mut self) -> Result<Vec<ConstraintInfo>, BuildError> {
        let mut out = Vec::new();
        for inst in 0..self.nodes.len() {
            let def = self.nodes[inst].def;
            for (i, constraint) in def.constraints.iter().enumerate() {
                let origin = self.label(inst);
                let context = format!("constraint #{} of '{origin}'", i + 1);
                let (expr, ty) = self.compile(inst, constraint, Mode::Transition, &context)?;
                self.expect_bool(&ty, &context)?;
                out.push(ConstraintInfo {
                    origin,
                    text: constraint.to_string(),
                    expr,
                });
            }
        }
        Ok(out)
    }

    fn compile_properties(
        &mut self,
        root: InstanceId,
        properties: &'m [PropertyDecl],
    ) -> Result<Vec<PropertyInfo>, BuildError> {
        let mut names = HashSet::new();
        let mut out = Vec::with_capacity(properties.len());
        for property in properties {
            if !names.insert(property.name.as_str()) {
                return Err(BuildError::DuplicateDeclaration {
                    scope: "properties".to_string(),
                    name: property.name.clone(),
                });
            }
            let context = format!("property '{}'", property.name);
            let (formula, ty) = self.compile(root, &property.formula, Mode::Scalar, &context)?;
            self.expect_bool(&ty, &context)?;
            out.push(PropertyInfo {
                name: property.name.clone(),
                text: property.formula.to_string(),
                formula,
            });
        }
        Ok(out)
    }

    fn finish(
        self,
        compiled_defines: Vec<(CExpr, Ty)>,
        init_rules: Vec<Option<CExpr>>,
        next_rules: Vec<Option<CExpr>>,
        constraints: Vec<ConstraintInfo>,
        properties: Vec<PropertyInfo>,
    ) -> CompositeModel {
        let defines: Vec<DefineInfo> = self
            .defines
            .into_iter()
            .zip(compiled_defines)
            .map(|(d, (expr, ty))| DefineInfo {
                path: d.path,
                instance: d.instance,
                expr,
                ty,
            })
            .collect();
        CompositeModel {
            var_index: self
                .vars
                .iter()
                .enumerate()
                .map(|(id, v)| (v.path.clone(), id))
                .collect(),
            define_index: defines
                .iter()
                .enumerate()
                .map(|(id, d)| (d.path.clone(), id))
                .collect(),
            symbols: self.symbols,
            instances: self.nodes.into_iter().map(|n| n.info).collect(),
            vars: self.vars,
            defines,
            init_rules,
            next_rules,
            constraints,
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::module::ModuleDefinition;

    fn toggle() -> ModuleDefinition {
        ModuleDefinition::new("Toggle")
            .with_param("enable", Domain::Boolean)
            .with_var("on", Domain::Boolean)
            .with_define("lit", Expr::path("on").and(Expr::path("enable")))
            .with_init("on", Expr::bool(false))
            .with_next(
                "on",
                Expr::case([
                    (Expr::path("enable"), Expr::path("on").negate()),
                    (Expr::bool(true), Expr::path("on")),
                ]),
            )
    }

    fn root_with(def: ModuleDefinition) -> Model {
        Model::new(ModuleInstance::new("main", "Main"))
            .with_definition(toggle())
            .with_definition(def)
    }

    #[test]
    fn variables_are_qualified_depth_first() {
        let main = ModuleDefinition::new("Main")
            .with_var("go", Domain::Boolean)
            .with_instance(ModuleInstance::new("A", "Toggle").bind(Expr::path("go")))
            .with_instance(ModuleInstance::new("B", "Toggle").bind(Expr::path("A.lit")));
        let composite = build(&root_with(main)).expect("builds");
        let paths: Vec<&str> = composite.vars().iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["go", "A.on", "B.on"]);
        assert!(composite.define_id("B.lit").is_some());
        assert_eq!(composite.instances()[0].label, "main");
    }

    #[test]
    fn unknown_path_is_unbound() {
        let main = ModuleDefinition::new("Main")
            .with_instance(ModuleInstance::new("A", "Toggle").bind(Expr::path("missing")));
        let err = build(&root_with(main)).unwrap_err();
        assert_eq!(
            err,
            BuildError::UnboundReference {
                scope: "main".into(),
                name: "missing".into()
            }
        );
    }

    #[test]
    fn unknown_module_is_unbound() {
        let main = ModuleDefinition::new("Main").with_instance(ModuleInstance::new("A", "Nope"));
        assert_eq!(build(&root_with(main)).unwrap_err().kind(), "unbound_reference");
    }

    #[test]
    fn binding_reading_own_subtree_is_cyclic() {
        let main = ModuleDefinition::new("Main")
            .with_instance(ModuleInstance::new("A", "Toggle").bind(Expr::path("A.lit")));
        let err = build(&root_with(main)).unwrap_err();
        assert!(
            matches!(err, BuildError::CyclicInstantiation { ref instance, .. } if instance == "A"),
            "{err}"
        );
    }

    #[test]
    fn mutually_dependent_bindings_are_cyclic() {
        let main = ModuleDefinition::new("Main")
            .with_instance(ModuleInstance::new("A", "Toggle").bind(Expr::path("B.lit")))
            .with_instance(ModuleInstance::new("B", "Toggle").bind(Expr::path("A.lit")));
        assert_eq!(build(&root_with(main)).unwrap_err().kind(), "cyclic_instantiation");
    }

    #[test]
    fn self_instantiation_is_cyclic() {
        let main = ModuleDefinition::new("Main").with_instance(ModuleInstance::new("again", "Main"));
        assert_eq!(build(&root_with(main)).unwrap_err().kind(), "cyclic_instantiation");
    }

    #[test]
    fn binding_outside_formal_domain_is_mismatch() {
        let main = ModuleDefinition::new("Main")
            .with_instance(ModuleInstance::new("A", "Toggle").bind(Expr::int(3)));
        assert_eq!(build(&root_with(main)).unwrap_err().kind(), "type_mismatch");
    }

    #[test]
    fn arity_mismatch_is_reported() {
        let main = ModuleDefinition::new("Main").with_instance(ModuleInstance::new("A", "Toggle"));
        assert_eq!(build(&root_with(main)).unwrap_err().kind(), "type_mismatch");
    }

    #[test]
    fn rule_result_outside_domain_is_mismatch() {
        let main = ModuleDefinition::new("Main")
            .with_var("mode", Domain::enumeration(["a", "b"]))
            .with_next("mode", Expr::choice([Expr::sym("a"), Expr::sym("c")]));
        let err = build(&root_with(main)).unwrap_err();
        assert!(matches!(err, BuildError::TypeMismatch { ref context, .. } if context == "next(mode)"));
    }

    #[test]
    fn next_outside_constraint_is_mismatch() {
        let main = ModuleDefinition::new("Main")
            .with_var("x", Domain::Boolean)
            .with_define("bad", Expr::next("x"));
        assert_eq!(build(&root_with(main)).unwrap_err().kind(), "type_mismatch");
    }

    #[test]
    fn state_dependent_init_is_mismatch() {
        let main = ModuleDefinition::new("Main")
            .with_var("x", Domain::Boolean)
            .with_var("y", Domain::Boolean)
            .with_init("y", Expr::path("x"));
        assert_eq!(build(&root_with(main)).unwrap_err().kind(), "type_mismatch");
    }

    #[test]
    fn duplicate_member_names_are_rejected() {
        let main = ModuleDefinition::new("Main")
            .with_var("x", Domain::Boolean)
            .with_define("x", Expr::bool(true));
        assert_eq!(
            build(&root_with(main)).unwrap_err(),
            BuildError::DuplicateDeclaration {
                scope: "module 'Main'".into(),
                name: "x".into()
            }
        );
    }

    #[test]
    fn root_bindings_must_be_constant() {
        let model = Model::new(ModuleInstance::new("main", "Toggle").bind(Expr::path("x")))
            .with_definition(toggle());
        assert_eq!(build(&model).unwrap_err().kind(), "unbound_reference");

        let model = Model::new(ModuleInstance::new("main", "Toggle").bind(Expr::bool(true)))
            .with_definition(toggle());
        let composite = build(&model).expect("builds");
        assert_eq!(composite.vars()[0].path, "on");
    }

    #[test]
    fn scalar_case_needs_true_branch() {
        let main = ModuleDefinition::new("Main")
            .with_var("x", Domain::Boolean)
            .with_define("d", Expr::case([(Expr::path("x"), Expr::bool(true))]));
        assert_eq!(build(&root_with(main)).unwrap_err().kind(), "type_mismatch");
    }

    #[test]
    fn unmatched_init_case_leaves_no_initial_value() {
        let main = ModuleDefinition::new("Main")
            .with_var("x", Domain::Boolean)
            .with_init("x", Expr::case([(Expr::bool(false), Expr::bool(true))]));
        let err = build(&root_with(main)).unwrap_err();
        assert_eq!(
            err,
            BuildError::TypeMismatch {
                context: "init(x)".into(),
                expected: "at least one initial value".into(),
                found: "no initial value".into(),
            }
        );
    }

    #[test]
    fn matched_init_case_without_true_branch_builds() {
        let main = ModuleDefinition::new("Main")
            .with_var("x", Domain::Boolean)
            .with_init(
                "x",
                Expr::case([(Expr::int(1).equals(Expr::int(1)), Expr::bool(true))]),
            );
        let composite = build(&root_with(main)).expect("builds");
        assert_eq!(composite.init_candidates(0), vec![1]);
    }

    #[test]
    fn parameter_under_next_reads_next_state() {
        let watcher = ModuleDefinition::new("Watcher")
            .with_param("signal", Domain::Boolean)
            .with_constraint(Expr::next("signal").implies(Expr::path("signal")));
        let main = ModuleDefinition::new("Main")
            .with_var("s", Domain::Boolean)
            .with_instance(ModuleInstance::new("W", "Watcher").bind(Expr::path("s")));
        let model = root_with(main).with_definition(watcher);
        let composite = build(&model).expect("builds");
        let c = &composite.constraints()[0];
        assert_eq!(c.origin, "W");
        assert_eq!(
            c.expr,
            CExpr::Binary(
                BinOp::Implies,
                Box::new(CExpr::NextVar(0)),
                Box::new(CExpr::Var(0))
            )
        );
    }
}
