use super::ty::Ty;

/// Match a specialization's argument pattern against concrete arguments,
/// accumulating a consistent substitution for the pattern's parameters.
///
/// Returns the substitution (indexed by parameter position) on success.
pub fn match_pattern(pattern: &[Ty], args: &[Ty]) -> Option<Vec<Ty>> {
    if pattern.len() != args.len() {
        return None;
    }
    let mut subst: Vec<Option<Ty>> = Vec::new();
    for (p, a) in pattern.iter().zip(args) {
        if !unify(p, a, &mut subst) {
            return None;
        }
    }
    Some(
        subst
            .into_iter()
            .map(|s| s.unwrap_or(Ty::Error))
            .collect(),
    )
}

fn unify(pattern: &Ty, arg: &Ty, subst: &mut Vec<Option<Ty>>) -> bool {
    match (pattern, arg) {
        (Ty::Param(i), _) => {
            let i = *i as usize;
            if subst.len() <= i {
                subst.resize(i + 1, None);
            }
            match &subst[i] {
                Some(bound) => bound == arg,
                None => {
                    subst[i] = Some(arg.clone());
                    true
                }
            }
        }
        (Ty::Pointer(p), Ty::Pointer(a)) => unify(p, a, subst),
        (
            Ty::Instance {
                primary: pp,
                args: pa,
            },
            Ty::Instance {
                primary: ap,
                args: aa,
            },
        ) => {
            pp == ap
                && pa.len() == aa.len()
                && pa.iter().zip(aa).all(|(p, a)| unify(p, a, subst))
        }
        (Ty::Class(p), Ty::Class(a)) => p == a,
        (Ty::Value(p), Ty::Value(a)) => p == a,
        (Ty::Skolem(p), Ty::Skolem(a)) => p == a,
        _ => false,
    }
}

/// Partial ordering of specializations: `a` is strictly more specialized
/// than `b` when `b`'s pattern matches `a`'s pattern with its parameters
/// treated as opaque concrete types, and not vice versa.
///
/// `<T*>` is more specialized than `<T>`: `T` matches the skolemized `S*`,
/// but `T*` cannot match a bare skolem.
pub fn more_specialized(a: &[Ty], b: &[Ty]) -> bool {
    at_least_as_specialized(a, b) && !at_least_as_specialized(b, a)
}

fn at_least_as_specialized(a: &[Ty], b: &[Ty]) -> bool {
    let skolemized: Vec<Ty> = a.iter().map(Ty::skolemize).collect();
    match_pattern(b, &skolemized).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::index::BindingId;
    use rstest::rstest;

    fn class(n: u32) -> Ty {
        Ty::Class(BindingId(n))
    }

    fn ptr(inner: Ty) -> Ty {
        Ty::Pointer(Box::new(inner))
    }

    #[test]
    fn test_match_binds_parameters_consistently() {
        // <T, T> against <B, B> binds; against <B, C> fails.
        let pattern = vec![Ty::Param(0), Ty::Param(0)];
        assert_eq!(
            match_pattern(&pattern, &[class(1), class(1)]),
            Some(vec![class(1)])
        );
        assert!(match_pattern(&pattern, &[class(1), class(2)]).is_none());
    }

    #[test]
    fn test_pointer_pattern_strips_one_level() {
        // <T*> against <B*> binds T = B.
        let pattern = vec![ptr(Ty::Param(0))];
        assert_eq!(match_pattern(&pattern, &[ptr(class(1))]), Some(vec![class(1)]));
        assert!(match_pattern(&pattern, &[class(1)]).is_none());
    }

    #[rstest]
    #[case::pointer_beats_bare(vec![ptr(Ty::Param(0))], vec![Ty::Param(0)], true)]
    #[case::bare_does_not_beat_pointer(vec![Ty::Param(0)], vec![ptr(Ty::Param(0))], false)]
    #[case::concrete_beats_parameter(vec![class(1)], vec![Ty::Param(0)], true)]
    #[case::equal_patterns_tie(vec![ptr(Ty::Param(0))], vec![ptr(Ty::Param(0))], false)]
    fn test_partial_ordering(#[case] a: Vec<Ty>, #[case] b: Vec<Ty>, #[case] expected: bool) {
        assert_eq!(more_specialized(&a, &b), expected);
    }

    #[test]
    fn test_incomparable_patterns() {
        // <T, B> vs <B, T>: neither subsumes the other.
        let a = vec![Ty::Param(0), class(1)];
        let b = vec![class(1), Ty::Param(0)];
        assert!(!more_specialized(&a, &b));
        assert!(!more_specialized(&b, &a));
    }
}
