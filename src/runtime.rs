use std::rc::Rc;

use crate::{
    ast::{Block, Expr, ForInTarget, ForInit, LexicalDecl, Program, Stmt, StmtKind, SwitchCase},
    completion::{Completion, EvalResult, Exception, Label},
    conversions::{strict_equals, to_boolean},
    diagnostics::{Result, TesseraError},
    environment::{Environment, EnvironmentRef},
    object::{Attributes, DescriptorPatch},
    parser,
    realm::Realm,
    stack::ensure_sufficient_stack,
    stdlib,
    value::Value,
};

/// Script calls nested deeper than this raise a fatal stack overflow.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1_000;

/// Argument lists spread from array-likes longer than this raise a RangeError.
pub const MAX_ARGUMENT_COUNT: u32 = 65_536;

/// Host-level engine configuration.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub max_call_depth: usize,
    /// Evaluate every script as if it began with `"use strict"`.
    pub strict: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            strict: false,
        }
    }
}

#[derive(Clone)]
pub struct ExecutionContext {
    pub lexical_environment: EnvironmentRef,
    pub variable_environment: EnvironmentRef,
    pub this_value: Value,
    pub strict: bool,
}

pub struct Interpreter {
    pub(crate) realm: Realm,
    contexts: Vec<ExecutionContext>,
    pub(crate) options: EngineOptions,
    pub(crate) call_depth: usize,
}

/// What a loop does after its body completes.
enum LoopStep {
    Next,
    Exit,
    Propagate(Completion),
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        let realm = Realm::new();
        let base = ExecutionContext {
            lexical_environment: realm.script_env.clone(),
            variable_environment: realm.global_env.clone(),
            this_value: Value::Object(realm.global_object.clone()),
            strict: options.strict,
        };
        let mut interpreter = Self {
            realm,
            contexts: vec![base],
            options,
            call_depth: 0,
        };
        stdlib::install(&mut interpreter);
        interpreter
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn eval_source(&mut self, source: &str) -> Result<Value> {
        let program = parser::parse_program(source, self.options.strict).map_err(TesseraError::from)?;
        self.eval_program(&program)
    }

    /// Runs a parsed script in the global scope. Script-level `let`/`const`
    /// bindings persist into later scripts.
    pub fn eval_program(&mut self, program: &Program) -> Result<Value> {
        tracing::debug!(strict = program.strict, statements = program.body.len(), "evaluating script");
        self.push_context(ExecutionContext {
            lexical_environment: self.realm.script_env.clone(),
            variable_environment: self.realm.global_env.clone(),
            this_value: Value::Object(self.realm.global_object.clone()),
            strict: program.strict,
        });
        let result = self.run_script(program);
        self.pop_context();

        match result {
            Ok(value) => Ok(value.unwrap_or(Value::Undefined)),
            Err(Exception::Throw(value)) => {
                let message = self.describe_exception(&value);
                tracing::debug!(%message, "uncaught exception");
                Err(TesseraError::Uncaught { value, message })
            }
            Err(Exception::Fatal(err)) => {
                tracing::debug!(error = %err, "fatal error");
                Err(TesseraError::Fatal(err))
            }
        }
    }

    fn run_script(&mut self, program: &Program) -> EvalResult<Option<Value>> {
        self.instantiate_global_declarations(program)?;
        let mut last = None;
        for stmt in &program.body {
            match self.execute_statement(stmt)? {
                Completion::Normal(value) => {
                    if value.is_some() {
                        last = value;
                    }
                }
                // Rejected by the parser; nothing to resume.
                _ => break,
            }
        }
        Ok(last)
    }

    fn instantiate_global_declarations(&mut self, program: &Program) -> EvalResult<()> {
        let script_env = self.realm.script_env.clone();
        let global = self.realm.global_object.clone();

        for decl in &program.scope.lexical {
            if script_env.borrow().has_binding(&decl.name) {
                return Err(self.syntax_error(format!(
                    "Identifier '{}' has already been declared",
                    decl.name
                )));
            }
        }
        Self::create_lexical_bindings(&script_env, &program.scope.lexical);

        for node in &program.scope.functions {
            let Some(name) = node.name.clone() else {
                continue;
            };
            let function = self.create_script_function(node, script_env.clone());
            let existing = global.get_own_property(&name);
            match existing {
                Some(desc) if !desc.configurable => {
                    if desc.is_accessor() || desc.writable() != Some(true) || !desc.enumerable {
                        return Err(self.type_error(format!("Cannot redefine global function '{name}'")));
                    }
                    self.put(&global, &name, Value::Object(function), program.strict)?;
                }
                _ => {
                    let patch = DescriptorPatch::data(Value::Object(function), Attributes::new(true, true, false));
                    self.define_own_property(&global, &name, patch, true)?;
                }
            }
        }

        for name in &program.scope.var_names {
            if global.get_own_property(name).is_none() {
                let patch = DescriptorPatch::data(Value::Undefined, Attributes::new(true, true, false));
                self.define_own_property(&global, name, patch, true)?;
            }
        }
        Ok(())
    }

    /// Creates uninitialized `let`/`const` bindings in `env`.
    pub(crate) fn create_lexical_bindings(env: &EnvironmentRef, declarations: &[LexicalDecl]) {
        let mut record = env.borrow_mut();
        for decl in declarations {
            if decl.constant {
                record.create_immutable_binding(decl.name.clone(), true);
            } else {
                record.create_mutable_binding(decl.name.clone(), false);
            }
        }
    }

    pub(crate) fn push_context(&mut self, context: ExecutionContext) {
        self.contexts.push(context);
        tracing::trace!(depth = self.contexts.len(), "push context");
    }

    pub(crate) fn pop_context(&mut self) {
        if self.contexts.len() > 1 {
            self.contexts.pop();
        }
        tracing::trace!(depth = self.contexts.len(), "pop context");
    }

    pub(crate) fn context(&self) -> &ExecutionContext {
        &self.contexts[self.contexts.len() - 1]
    }

    pub(crate) fn lexical_environment(&self) -> EnvironmentRef {
        self.context().lexical_environment.clone()
    }

    pub(crate) fn is_strict(&self) -> bool {
        self.context().strict
    }

    /// Runs `f` with `env` as the current lexical environment, restoring the
    /// previous one on every exit path.
    pub(crate) fn with_lexical_environment<T>(
        &mut self,
        env: EnvironmentRef,
        f: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        let last = self.contexts.len() - 1;
        let saved = std::mem::replace(&mut self.contexts[last].lexical_environment, env);
        let result = f(self);
        let last = self.contexts.len() - 1;
        self.contexts[last].lexical_environment = saved;
        result
    }

    pub(crate) fn execute_statements(&mut self, stmts: &[Stmt]) -> EvalResult<Completion> {
        let mut last: Option<Value> = None;
        for stmt in stmts {
            match self.execute_statement(stmt)? {
                Completion::Normal(value) => {
                    if value.is_some() {
                        last = value;
                    }
                }
                abrupt => return Ok(abrupt.fill_jump_value(last)),
            }
        }
        Ok(Completion::Normal(last))
    }

    pub(crate) fn execute_statement(&mut self, stmt: &Stmt) -> EvalResult<Completion> {
        ensure_sufficient_stack(|| self.execute_labelled(stmt, &[]))
    }

    fn execute_labelled(&mut self, stmt: &Stmt, labels: &[Label]) -> EvalResult<Completion> {
        match &stmt.kind {
            StmtKind::Var(declarations) => {
                for decl in declarations {
                    if let Some(init) = &decl.init {
                        let value = self.evaluate(init)?;
                        let reference = self.resolve_identifier(&decl.name);
                        self.put_value(&reference, value)?;
                    }
                }
                Ok(Completion::EMPTY)
            }
            StmtKind::Lexical { declarations, .. } => {
                for decl in declarations {
                    let value = match &decl.init {
                        Some(init) => self.evaluate(init)?,
                        None => Value::Undefined,
                    };
                    self.lexical_environment()
                        .borrow_mut()
                        .initialize_binding(&decl.name, value);
                }
                Ok(Completion::EMPTY)
            }
            StmtKind::FunctionDeclaration(_) | StmtKind::Empty | StmtKind::Debugger => {
                Ok(Completion::EMPTY)
            }
            StmtKind::Expr(expr) => Ok(Completion::Normal(Some(self.evaluate(expr)?))),
            StmtKind::Block(block) => self.execute_block(block),
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                let condition = self.evaluate(test)?;
                if to_boolean(&condition) {
                    self.execute_statement(consequent)
                } else if let Some(alternate) = alternate {
                    self.execute_statement(alternate)
                } else {
                    Ok(Completion::EMPTY)
                }
            }
            StmtKind::While { test, body } => {
                let mut value = None;
                loop {
                    let condition = self.evaluate(test)?;
                    if !to_boolean(&condition) {
                        break;
                    }
                    let completion = self.execute_statement(body)?;
                    match loop_step(completion, labels, &mut value) {
                        LoopStep::Next => {}
                        LoopStep::Exit => break,
                        LoopStep::Propagate(completion) => return Ok(completion),
                    }
                }
                Ok(Completion::Normal(value))
            }
            StmtKind::DoWhile { body, test } => {
                let mut value = None;
                loop {
                    let completion = self.execute_statement(body)?;
                    match loop_step(completion, labels, &mut value) {
                        LoopStep::Next => {}
                        LoopStep::Exit => break,
                        LoopStep::Propagate(completion) => return Ok(completion),
                    }
                    let condition = self.evaluate(test)?;
                    if !to_boolean(&condition) {
                        break;
                    }
                }
                Ok(Completion::Normal(value))
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => self.execute_for(init.as_ref(), test.as_ref(), update.as_ref(), body, labels),
            StmtKind::ForIn {
                target,
                object,
                body,
            } => self.execute_for_in(target, object, body, labels),
            StmtKind::Return(argument) => {
                let value = match argument {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            StmtKind::Break(label) => Ok(Completion::Break(label.clone(), None)),
            StmtKind::Continue(label) => Ok(Completion::Continue(label.clone(), None)),
            StmtKind::Throw(expr) => {
                let value = self.evaluate(expr)?;
                Err(Exception::Throw(value))
            }
            StmtKind::Try {
                block,
                handler,
                finalizer,
            } => {
                let mut result = self.execute_block(block);
                if let Some(handler) = handler {
                    let thrown = match &result {
                        Err(Exception::Throw(thrown)) => Some(thrown.clone()),
                        _ => None,
                    };
                    if let Some(thrown) = thrown {
                        let env = Environment::new_declarative(Some(self.lexical_environment()));
                        env.borrow_mut().declare(handler.param.clone(), thrown);
                        result = self.with_lexical_environment(env, |interp| interp.execute_block(&handler.body));
                    }
                }
                if let Some(finalizer) = finalizer {
                    if matches!(result, Err(Exception::Fatal(_))) {
                        return result;
                    }
                    let outcome = self.execute_block(finalizer)?;
                    if outcome.is_abrupt() {
                        return Ok(outcome);
                    }
                }
                result.map(|completion| completion.update_empty(Some(Value::Undefined)))
            }
            StmtKind::Labeled { label, body } => {
                let mut nested = labels.to_vec();
                nested.push(label.clone());
                let completion = ensure_sufficient_stack(|| self.execute_labelled(body, &nested))?;
                match completion {
                    Completion::Break(Some(target), value) if target == *label => Ok(Completion::Normal(value)),
                    other => Ok(other),
                }
            }
            StmtKind::Switch {
                discriminant,
                cases,
                lexical,
            } => {
                let value = self.evaluate(discriminant)?;
                let completion = if lexical.is_empty() {
                    self.execute_switch_cases(&value, cases)?
                } else {
                    let env = Environment::new_declarative(Some(self.lexical_environment()));
                    Self::create_lexical_bindings(&env, lexical);
                    self.with_lexical_environment(env, |interp| interp.execute_switch_cases(&value, cases))?
                };
                match completion {
                    Completion::Break(None, value) => Ok(Completion::Normal(value)),
                    Completion::Break(Some(target), value) if labels.contains(&target) => {
                        Ok(Completion::Normal(value))
                    }
                    other => Ok(other),
                }
            }
            StmtKind::With { object, body } => {
                let value = self.evaluate(object)?;
                let binding_object = self.to_object(&value)?;
                let env = Environment::new_object(binding_object, true, Some(self.lexical_environment()));
                self.with_lexical_environment(env, |interp| interp.execute_statement(body))
            }
        }
    }

    pub(crate) fn execute_block(&mut self, block: &Block) -> EvalResult<Completion> {
        if block.lexical.is_empty() {
            return self.execute_statements(&block.body);
        }
        let env = Environment::new_declarative(Some(self.lexical_environment()));
        Self::create_lexical_bindings(&env, &block.lexical);
        self.with_lexical_environment(env, |interp| interp.execute_statements(&block.body))
    }

    fn execute_switch_cases(&mut self, value: &Value, cases: &[SwitchCase]) -> EvalResult<Completion> {
        let mut start = None;
        for (idx, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let candidate = self.evaluate(test)?;
                if strict_equals(value, &candidate) {
                    start = Some(idx);
                    break;
                }
            }
        }
        let start = match start.or_else(|| cases.iter().position(|case| case.test.is_none())) {
            Some(idx) => idx,
            None => return Ok(Completion::EMPTY),
        };

        let mut last = None;
        for case in &cases[start..] {
            match self.execute_statements(&case.body)? {
                Completion::Normal(value) => {
                    if value.is_some() {
                        last = value;
                    }
                }
                abrupt => return Ok(abrupt.fill_jump_value(last)),
            }
        }
        Ok(Completion::Normal(last))
    }

    fn execute_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        labels: &[Label],
    ) -> EvalResult<Completion> {
        let mut per_iteration: Vec<Rc<str>> = Vec::new();
        let outer = self.lexical_environment();
        let mut loop_env = None;

        match init {
            Some(ForInit::Var(declarations)) => {
                for decl in declarations {
                    if let Some(init) = &decl.init {
                        let value = self.evaluate(init)?;
                        let reference = self.resolve_identifier(&decl.name);
                        self.put_value(&reference, value)?;
                    }
                }
            }
            Some(ForInit::Expr(expr)) => {
                self.evaluate(expr)?;
            }
            Some(ForInit::Lexical {
                constant,
                declarations,
            }) => {
                let env = Environment::new_declarative(Some(outer.clone()));
                let decls: Vec<LexicalDecl> = declarations
                    .iter()
                    .map(|decl| LexicalDecl {
                        name: decl.name.clone(),
                        constant: *constant,
                    })
                    .collect();
                Self::create_lexical_bindings(&env, &decls);
                self.with_lexical_environment(env.clone(), |interp| {
                    for decl in declarations {
                        let value = match &decl.init {
                            Some(init) => interp.evaluate(init)?,
                            None => Value::Undefined,
                        };
                        env.borrow_mut().initialize_binding(&decl.name, value);
                    }
                    Ok(())
                })?;
                if !constant {
                    per_iteration = declarations.iter().map(|decl| decl.name.clone()).collect();
                }
                loop_env = Some(env);
            }
            None => {}
        }

        let Some(env) = loop_env else {
            return self.run_for_loop(test, update, body, labels, &[], &outer);
        };
        self.with_lexical_environment(env, |interp| {
            interp.run_for_loop(test, update, body, labels, &per_iteration, &outer)
        })
    }

    fn run_for_loop(
        &mut self,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        labels: &[Label],
        per_iteration: &[Rc<str>],
        outer: &EnvironmentRef,
    ) -> EvalResult<Completion> {
        let mut value = None;
        self.copy_iteration_environment(per_iteration, outer);
        loop {
            if let Some(test) = test {
                let condition = self.evaluate(test)?;
                if !to_boolean(&condition) {
                    break;
                }
            }
            let completion = self.execute_statement(body)?;
            match loop_step(completion, labels, &mut value) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Propagate(completion) => return Ok(completion),
            }
            self.copy_iteration_environment(per_iteration, outer);
            if let Some(update) = update {
                self.evaluate(update)?;
            }
        }
        Ok(Completion::Normal(value))
    }

    /// Gives each iteration of a `for (let ...)` loop fresh bindings seeded
    /// with the previous iteration's values.
    fn copy_iteration_environment(&mut self, names: &[Rc<str>], outer: &EnvironmentRef) {
        if names.is_empty() {
            return;
        }
        let current = self.lexical_environment();
        let fresh = Environment::new_declarative(Some(outer.clone()));
        {
            let source = current.borrow();
            let mut target = fresh.borrow_mut();
            for name in names {
                let value = source
                    .binding(name)
                    .map(|binding| binding.value.clone())
                    .unwrap_or(Value::Undefined);
                target.declare(name.clone(), value);
            }
        }
        let last = self.contexts.len() - 1;
        self.contexts[last].lexical_environment = fresh;
    }

    fn execute_for_in(
        &mut self,
        target: &ForInTarget,
        object: &Expr,
        body: &Stmt,
        labels: &[Label],
    ) -> EvalResult<Completion> {
        let subject = self.evaluate(object)?;
        if subject.is_nullish() {
            return Ok(Completion::EMPTY);
        }
        let subject = self.to_object(&subject)?;
        let mut value = None;

        for key in subject.enumerate() {
            let key_value = Value::String(key);
            let completion = match target {
                ForInTarget::Var(name) => {
                    let reference = self.resolve_identifier(name);
                    self.put_value(&reference, key_value)?;
                    self.execute_statement(body)?
                }
                ForInTarget::Expr(expr) => {
                    let reference = self.evaluate_reference(expr)?;
                    self.put_value(&reference, key_value)?;
                    self.execute_statement(body)?
                }
                ForInTarget::Lexical { constant, name } => {
                    let env = Environment::new_declarative(Some(self.lexical_environment()));
                    {
                        let mut record = env.borrow_mut();
                        if *constant {
                            record.create_immutable_binding(name.clone(), true);
                        } else {
                            record.create_mutable_binding(name.clone(), false);
                        }
                        record.initialize_binding(name, key_value);
                    }
                    self.with_lexical_environment(env, |interp| interp.execute_statement(body))?
                }
            };
            match loop_step(completion, labels, &mut value) {
                LoopStep::Next => {}
                LoopStep::Exit => break,
                LoopStep::Propagate(completion) => return Ok(completion),
            }
        }
        Ok(Completion::Normal(value))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Classifies a loop body's completion against the loop's label set,
/// recording the last produced value.
fn loop_step(completion: Completion, labels: &[Label], value: &mut Option<Value>) -> LoopStep {
    let owned = |label: &Option<Label>| {
        label.as_ref().map_or(true, |label| labels.contains(label))
    };
    match completion {
        Completion::Normal(produced) => {
            if produced.is_some() {
                *value = produced;
            }
            LoopStep::Next
        }
        Completion::Continue(label, produced) if owned(&label) => {
            if produced.is_some() {
                *value = produced;
            }
            LoopStep::Next
        }
        Completion::Break(label, produced) if owned(&label) => {
            if produced.is_some() {
                *value = produced;
            }
            LoopStep::Exit
        }
        other => LoopStep::Propagate(other.fill_jump_value(value.clone())),
    }
}
