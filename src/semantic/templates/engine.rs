use std::sync::Arc;
use std::sync::OnceLock;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::base::Span;
use crate::semantic::index::{BindingId, SymbolIndex};
use crate::semantic::symbol_table::StructuralKind;
use crate::semantic::types::SemanticError;

use super::ordering::{match_pattern, more_specialized};
use super::ty::Ty;

/// Cache key: one instantiation per (primary template, argument list).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstKey {
    pub primary: BindingId,
    pub args: Vec<Ty>,
}

/// A specialization candidate offered to the engine. The primary template
/// itself is the implicit fallback and is not listed.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub binding: BindingId,
    /// Lowered argument pattern (`<T*>` as `[Pointer(Param(0))]`).
    pub pattern: Vec<Ty>,
    /// Canonical pattern text, for diagnostics.
    pub display: Arc<str>,
}

/// The outcome of instantiating a class template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instantiation {
    pub primary: BindingId,
    /// The specialization (or the primary) the arguments selected.
    pub chosen: BindingId,
    pub args: Vec<Ty>,
    /// Bindings for the chosen declaration's parameters, by position.
    pub substitutions: Vec<Ty>,
}

type InstCell = Arc<OnceLock<Result<Arc<Instantiation>, SemanticError>>>;

/// Instantiates class templates, at most once per distinct key.
///
/// Concurrent resolvers racing on the same key share one cell; whichever
/// thread wins computes the result, the rest read it.
#[derive(Debug, Default)]
pub struct InstantiationEngine {
    cache: Mutex<FxHashMap<InstKey, InstCell>>,
}

impl InstantiationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the best specialization for `args`, consulting the cache.
    ///
    /// Selection order: an exactly-matching explicit specialization wins,
    /// then the unique most specialized matching partial specialization,
    /// then the primary template. Two incomparable maximal candidates are
    /// an [`SemanticError::AmbiguousSpecialization`].
    pub fn instantiate(
        &self,
        template_name: &str,
        primary: BindingId,
        args: Vec<Ty>,
        candidates: &[Candidate],
        span: Span,
    ) -> Result<Arc<Instantiation>, SemanticError> {
        let key = InstKey {
            primary,
            args: args.clone(),
        };
        let cell = self.cache.lock().entry(key).or_default().clone();
        let result =
            cell.get_or_init(|| select(template_name, primary, args, candidates, span));
        result.clone().map_err(|e| e.with_span(span))
    }

    /// Drop cached instantiations affected by re-merged bindings.
    pub fn invalidate(&self, index: &SymbolIndex, dirty: &FxHashSet<BindingId>) {
        if dirty.is_empty() {
            return;
        }
        // A new or changed specialization anywhere under a template's name
        // can change which candidate wins, so match on (scope, name) too.
        let dirty_templates: FxHashSet<(Arc<str>, Arc<str>)> = dirty
            .iter()
            .filter_map(|&id| index.get(id))
            .filter(|b| b.kind() == StructuralKind::ClassTemplate)
            .map(|b| (b.key.scope_path.clone(), b.key.name.clone()))
            .collect();

        let mut cache = self.cache.lock();
        let before = cache.len();
        cache.retain(|key, _| {
            let Some(primary) = index.get(key.primary) else {
                return false;
            };
            if dirty.contains(&key.primary)
                || dirty_templates
                    .contains(&(primary.key.scope_path.clone(), primary.key.name.clone()))
            {
                return false;
            }
            !key.args.iter().any(|a| mentions_dirty(a, dirty))
        });
        debug!(dropped = before - cache.len(), "invalidated instantiation cache");
    }
}

fn mentions_dirty(ty: &Ty, dirty: &FxHashSet<BindingId>) -> bool {
    match ty {
        Ty::Class(id) => dirty.contains(id),
        Ty::Instance { primary, args } => {
            dirty.contains(primary) || args.iter().any(|a| mentions_dirty(a, dirty))
        }
        Ty::Pointer(inner) => mentions_dirty(inner, dirty),
        Ty::Param(_) | Ty::Value(_) | Ty::Skolem(_) | Ty::Error => false,
    }
}

struct Match<'a> {
    binding: BindingId,
    pattern: &'a [Ty],
    display: &'a Arc<str>,
    subst: Vec<Ty>,
}

fn select(
    template_name: &str,
    primary: BindingId,
    args: Vec<Ty>,
    candidates: &[Candidate],
    span: Span,
) -> Result<Arc<Instantiation>, SemanticError> {
    let mut matching: Vec<Match<'_>> = Vec::new();
    for candidate in candidates {
        let Some(subst) = match_pattern(&candidate.pattern, &args) else {
            continue;
        };
        if candidate.pattern.iter().all(|t| !t.is_dependent()) {
            // Explicit specialization: an exact argument match, no
            // ordering needed.
            debug!(template = template_name, pattern = %candidate.display, "explicit specialization");
            return Ok(Arc::new(Instantiation {
                primary,
                chosen: candidate.binding,
                args,
                substitutions: Vec::new(),
            }));
        }
        matching.push(Match {
            binding: candidate.binding,
            pattern: &candidate.pattern,
            display: &candidate.display,
            subst,
        });
    }

    let maximal: Vec<&Match<'_>> = matching
        .iter()
        .filter(|m| {
            !matching
                .iter()
                .any(|other| other.binding != m.binding && more_specialized(other.pattern, m.pattern))
        })
        .collect();

    match maximal.as_slice() {
        [] => Ok(Arc::new(Instantiation {
            primary,
            chosen: primary,
            substitutions: args.clone(),
            args,
        })),
        [winner] => {
            debug!(template = template_name, pattern = %winner.display, "partial specialization");
            Ok(Arc::new(Instantiation {
                primary,
                chosen: winner.binding,
                args,
                substitutions: winner.subst.clone(),
            }))
        }
        [first, second, ..] => Err(SemanticError::AmbiguousSpecialization {
            template_name: template_name.to_string(),
            first: first.display.to_string(),
            second: second.display.to_string(),
            span,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(n: u32) -> Ty {
        Ty::Class(BindingId(n))
    }

    fn ptr(inner: Ty) -> Ty {
        Ty::Pointer(Box::new(inner))
    }

    fn candidate(binding: u32, pattern: Vec<Ty>, display: &str) -> Candidate {
        Candidate {
            binding: BindingId(binding),
            pattern,
            display: display.into(),
        }
    }

    const SPAN: Span = Span {
        start: crate::base::Position { line: 0, column: 0 },
        end: crate::base::Position { line: 0, column: 0 },
    };

    #[test]
    fn test_explicit_specialization_wins() {
        let engine = InstantiationEngine::new();
        let candidates = [
            candidate(1, vec![ptr(Ty::Param(0))], "<$0*>"),
            candidate(2, vec![class(10), class(11)], "<B, C>"),
        ];
        let inst = engine
            .instantiate("A", BindingId(0), vec![class(10), class(11)], &candidates, SPAN)
            .unwrap();
        assert_eq!(inst.chosen, BindingId(2));
        assert!(inst.substitutions.is_empty());
    }

    #[test]
    fn test_pointer_partial_specialization_selected() {
        let engine = InstantiationEngine::new();
        let candidates = [candidate(1, vec![ptr(Ty::Param(0))], "<$0*>")];
        let inst = engine
            .instantiate("atomic", BindingId(0), vec![ptr(class(10))], &candidates, SPAN)
            .unwrap();
        assert_eq!(inst.chosen, BindingId(1));
        assert_eq!(inst.substitutions, vec![class(10)]);
    }

    #[test]
    fn test_falls_back_to_primary() {
        let engine = InstantiationEngine::new();
        let candidates = [candidate(1, vec![ptr(Ty::Param(0))], "<$0*>")];
        let inst = engine
            .instantiate("atomic", BindingId(0), vec![class(10)], &candidates, SPAN)
            .unwrap();
        assert_eq!(inst.chosen, BindingId(0));
        assert_eq!(inst.substitutions, vec![class(10)]);
    }

    #[test]
    fn test_incomparable_candidates_are_ambiguous() {
        let engine = InstantiationEngine::new();
        let candidates = [
            candidate(1, vec![Ty::Param(0), class(11)], "<$0, C>"),
            candidate(2, vec![class(10), Ty::Param(0)], "<B, $0>"),
        ];
        let err = engine
            .instantiate("A", BindingId(0), vec![class(10), class(11)], &candidates, SPAN)
            .unwrap_err();
        assert!(matches!(err, SemanticError::AmbiguousSpecialization { .. }));
    }

    #[test]
    fn test_repeated_instantiation_shares_one_result() {
        let engine = InstantiationEngine::new();
        let candidates = [candidate(1, vec![ptr(Ty::Param(0))], "<$0*>")];
        let first = engine
            .instantiate("atomic", BindingId(0), vec![ptr(class(10))], &candidates, SPAN)
            .unwrap();
        let second = engine
            .instantiate("atomic", BindingId(0), vec![ptr(class(10))], &candidates, SPAN)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
