use std::sync::Arc;

use crate::semantic::index::BindingId;

/// A resolved type, the currency of template argument matching.
///
/// `Ty` is small and hashable on purpose: instantiation cache keys embed
/// argument lists directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    /// A class or class template named as a type.
    Class(BindingId),
    /// An instantiated class template. `primary` is the primary template's
    /// binding; the chosen specialization is the engine's concern.
    Instance {
        primary: BindingId,
        args: Vec<Ty>,
    },
    Pointer(Box<Ty>),
    /// A template parameter of the enclosing template, by position.
    Param(u32),
    /// A non-type argument value, kept textually (`false`, `0`).
    Value(Arc<str>),
    /// A stand-in for "some unknown concrete type" during partial
    /// ordering. Skolems match nothing but themselves.
    Skolem(u32),
    /// The type of something that failed to resolve.
    Error,
}

impl Ty {
    /// True if the type mentions a template parameter anywhere, which
    /// makes it dependent and blocks instantiation.
    pub fn is_dependent(&self) -> bool {
        match self {
            Ty::Param(_) => true,
            Ty::Pointer(inner) => inner.is_dependent(),
            Ty::Instance { args, .. } => args.iter().any(Ty::is_dependent),
            Ty::Class(_) | Ty::Value(_) | Ty::Skolem(_) | Ty::Error => false,
        }
    }

    /// Replace every `Param(i)` with `Skolem(i)`.
    pub fn skolemize(&self) -> Ty {
        match self {
            Ty::Param(i) => Ty::Skolem(*i),
            Ty::Pointer(inner) => Ty::Pointer(Box::new(inner.skolemize())),
            Ty::Instance { primary, args } => Ty::Instance {
                primary: *primary,
                args: args.iter().map(Ty::skolemize).collect(),
            },
            other => other.clone(),
        }
    }

    /// Substitute parameters by position. Missing substitutions leave the
    /// parameter in place.
    pub fn substitute(&self, subst: &[Ty]) -> Ty {
        match self {
            Ty::Param(i) => subst.get(*i as usize).cloned().unwrap_or_else(|| self.clone()),
            Ty::Pointer(inner) => Ty::Pointer(Box::new(inner.substitute(subst))),
            Ty::Instance { primary, args } => Ty::Instance {
                primary: *primary,
                args: args.iter().map(|a| a.substitute(subst)).collect(),
            },
            other => other.clone(),
        }
    }
}
