//! Explicit type environments for late-bound parameter types.
//!
//! Deferred parameter types are [`TypeExpr`]s resolved against a
//! [`TypeEnv`] at emission time. The environment is an explicit map owned
//! by the function descriptor; specialization rebinds names by inserting
//! into a cloned map, never by capturing or mutating closure state.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use oriel_ir::Type;

use crate::error::*;

/// A reified generic binding: a concrete type or a constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Ty(Type),
    Const(i64),
}

impl Binding {
    /// Identifier-safe rendering used to key specialized symbols.
    pub fn suffix(&self) -> String {
        match self {
            Binding::Ty(ty) => ty.suffix(),
            Binding::Const(v) => v.to_string(),
        }
    }
}

impl From<Type> for Binding {
    fn from(ty: Type) -> Self {
        Binding::Ty(ty)
    }
}

impl From<i64> for Binding {
    fn from(v: i64) -> Self {
        Binding::Const(v)
    }
}

/// Name-to-binding environment with deterministic iteration order.
pub type TypeEnv = BTreeMap<String, Binding>;

/// A parameter type that may be deferred until emission.
#[derive(Clone)]
pub enum TypeExpr {
    /// Statically known type.
    Ty(Type),
    /// Name looked up in the environment at emission time.
    Var(String),
    /// Thunk over the explicit environment.
    Thunk(Rc<dyn Fn(&TypeEnv) -> Result<Type>>),
}

impl TypeExpr {
    pub fn var(name: impl Into<String>) -> Self {
        TypeExpr::Var(name.into())
    }

    pub fn thunk(f: impl Fn(&TypeEnv) -> Result<Type> + 'static) -> Self {
        TypeExpr::Thunk(Rc::new(f))
    }

    /// Resolve to a concrete type against `env`.
    pub fn resolve(&self, env: &TypeEnv) -> Result<Type> {
        match self {
            TypeExpr::Ty(ty) => Ok(ty.clone()),
            TypeExpr::Var(name) => match env.get(name) {
                Some(Binding::Ty(ty)) => Ok(ty.clone()),
                Some(Binding::Const(_)) => NonTypeBindingSnafu { name: name.clone() }.fail(),
                None => UnboundTypeVarSnafu { name: name.clone() }.fail(),
            },
            TypeExpr::Thunk(f) => f(env),
        }
    }
}

impl fmt::Debug for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Ty(ty) => f.debug_tuple("Ty").field(ty).finish(),
            TypeExpr::Var(name) => f.debug_tuple("Var").field(name).finish(),
            TypeExpr::Thunk(_) => f.write_str("Thunk(..)"),
        }
    }
}

impl From<Type> for TypeExpr {
    fn from(ty: Type) -> Self {
        TypeExpr::Ty(ty)
    }
}

impl From<&str> for TypeExpr {
    fn from(name: &str) -> Self {
        TypeExpr::Var(name.to_owned())
    }
}
