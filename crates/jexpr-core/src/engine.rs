use crate::builtins;
use crate::compiler::{
    AsyncInterpreter, Handler, HandlerResult, InterpreterSpec, SyncInterpreter, raw_async,
    raw_sync, unsupported_async, unsupported_sync,
};
use crate::evaluator::SIGIL;
use crate::runtime::{Context, EvalError, RuntimeMode};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What can be registered under an expression identifier.
#[derive(Clone)]
pub enum Definition {
    /// Handler plus declared parameter shapes; compiled into both modes.
    Spec(InterpreterSpec),
    /// Handler that receives every argument evaluated, unvalidated.
    Raw(Handler),
    /// Explicit executables per mode. `None` makes the interpreter refuse
    /// that mode with `ModeUnsupported`.
    Pair {
        sync: Option<SyncInterpreter>,
        async_: Option<AsyncInterpreter>,
    },
}

impl Definition {
    pub fn raw<F>(handler: F) -> Self
    where
        F: Fn(&[Value], &Context) -> HandlerResult + Send + Sync + 'static,
    {
        Definition::Raw(Arc::new(handler))
    }

    fn compile(&self, id: &str) -> Result<Interpreter, EvalError> {
        Ok(match self {
            Definition::Spec(spec) => Interpreter {
                sync: spec.compile_sync()?,
                async_: spec.compile_async()?,
            },
            Definition::Raw(handler) => Interpreter {
                sync: raw_sync(Arc::clone(handler)),
                async_: raw_async(Arc::clone(handler)),
            },
            Definition::Pair { sync, async_ } => Interpreter {
                sync: sync.clone().unwrap_or_else(|| unsupported_sync(id)),
                async_: async_.clone().unwrap_or_else(|| unsupported_async(id)),
            },
        })
    }
}

impl From<InterpreterSpec> for Definition {
    fn from(spec: InterpreterSpec) -> Self {
        Definition::Spec(spec)
    }
}

/// Compiled executables behind one identifier.
#[derive(Clone)]
pub struct Interpreter {
    pub sync: SyncInterpreter,
    pub async_: AsyncInterpreter,
}

/// Immutable identifier → interpreter map.
///
/// Holds no per-call state, so one registry can back any number of
/// concurrent evaluations.
pub struct Registry {
    interpreters: HashMap<String, Interpreter>,
    runtime_mode: RuntimeMode,
}

impl Registry {
    /// Builder preloaded with the core scope interpreters.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn get(&self, id: &str) -> Option<&Interpreter> {
        self.interpreters.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.interpreters.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.interpreters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.interpreters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interpreters.is_empty()
    }

    pub fn runtime_mode(&self) -> RuntimeMode {
        self.runtime_mode
    }

    pub fn diagnostics(&self) -> bool {
        self.runtime_mode.diagnostics()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.ids().collect();
        ids.sort_unstable();
        f.debug_struct("Registry")
            .field("interpreters", &ids)
            .field("runtime_mode", &self.runtime_mode)
            .finish()
    }
}

/// Collects definitions; `build` compiles every one of them exactly once.
#[derive(Clone)]
pub struct RegistryBuilder {
    definitions: HashMap<String, Definition>,
    runtime_mode: RuntimeMode,
}

impl RegistryBuilder {
    /// Start with `$value`, `$literal` and `$evaluate` registered.
    pub fn new() -> Self {
        let mut builder = Self::empty();
        builder.register_all(builtins::core_definitions());
        builder
    }

    /// Start with nothing registered.
    pub fn empty() -> Self {
        Self {
            definitions: HashMap::new(),
            runtime_mode: RuntimeMode::from_env(),
        }
    }

    /// Register or replace a definition.
    pub fn register(&mut self, id: impl Into<String>, definition: impl Into<Definition>) -> &mut Self {
        self.definitions.insert(id.into(), definition.into());
        self
    }

    pub fn register_all<I, K, D>(&mut self, definitions: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<String>,
        D: Into<Definition>,
    {
        for (id, definition) in definitions {
            self.register(id, definition);
        }
        self
    }

    pub fn runtime_mode(&mut self, mode: RuntimeMode) -> &mut Self {
        self.runtime_mode = mode;
        self
    }

    /// Compile everything. Malformed specs fail here, never at call time.
    pub fn build(&self) -> Result<Arc<Registry>, EvalError> {
        self.check_default_substitution()?;
        let mut interpreters = HashMap::with_capacity(self.definitions.len());
        for (id, definition) in &self.definitions {
            if !id.starts_with(SIGIL) {
                return Err(EvalError::invalid_type_spec(format!(
                    "interpreter id `{id}` must start with `{SIGIL}`"
                ))
                .within(id));
            }
            let interpreter = definition.compile(id).map_err(|err| err.within(id))?;
            interpreters.insert(id.clone(), interpreter);
        }
        tracing::debug!(
            interpreters = interpreters.len(),
            runtime_mode = ?self.runtime_mode,
            "built expression registry"
        );
        Ok(Arc::new(Registry {
            interpreters,
            runtime_mode: self.runtime_mode,
        }))
    }
}

impl RegistryBuilder {
    /// Omitted default params are rewritten to `["$value", null]`, which is
    /// only an expression while `$value` is registered.
    fn check_default_substitution(&self) -> Result<(), EvalError> {
        if self.definitions.contains_key(builtins::VALUE) {
            return Ok(());
        }
        let dependent = self.definitions.iter().find_map(|(id, definition)| match definition {
            Definition::Spec(spec) if spec.default_index().is_some() => Some(id),
            _ => None,
        });
        match dependent {
            Some(id) => Err(EvalError::invalid_type_spec(format!(
                "default param substitution requires `{}` to be registered",
                builtins::VALUE
            ))
            .within(id)),
            None => Ok(()),
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
