#![allow(clippy::unwrap_used)]
//! Cross-file name resolution: include-closure visibility, anonymous
//! namespaces, and namespace alias chains.

use std::sync::Arc;

use ccindex::project::Project;
use ccindex::semantic::resolver::Resolution;
use ccindex::semantic::templates::{Instantiation, Ty};
use ccindex::semantic::types::DiagnosticKind;
use ccindex::{BuildOutcome, Workspace};

fn build(fixture: &str) -> (Workspace, BuildOutcome) {
    let (project, outcome) = Project::build(fixture);
    (project.workspace, outcome)
}

fn instances(ws: &Workspace, path: &str) -> Vec<Arc<Instantiation>> {
    ws.resolutions(path)
        .iter()
        .filter_map(|u| match u.result.as_ref().ok()? {
            Resolution::Instance(inst) => Some(inst.clone()),
            _ => None,
        })
        .collect()
}

fn binding_name(ws: &Workspace, resolution: &Resolution) -> String {
    match resolution {
        Resolution::Binding(id) => ws.index().binding(*id).qualified_name.to_string(),
        other => panic!("expected a binding, got {other:?}"),
    }
}

#[test]
fn test_declaration_and_definition_merge_through_includes() {
    let (ws, outcome) = build(
        r#"
//- a.h
namespace ns { class A; }
//- a.cpp
#include "a.h"
namespace ns { class A {}; }
//- test.cpp *
#include "a.h"
void test() {
  ns::A* a;
}
"#,
    );
    assert!(!outcome.has_errors(), "{:?}", outcome.diagnostics);
    let a = ws
        .index()
        .bindings()
        .find(|b| b.qualified_name.as_ref() == "ns::A")
        .unwrap();
    assert_eq!(a.decls.len(), 2);
    assert!(a.is_defined());

    let uses = ws.resolutions("test.cpp");
    assert_eq!(binding_name(&ws, uses[0].result.as_ref().unwrap()), "ns::A");
}

#[test]
fn test_anonymous_namespace_resolves_within_its_own_file() {
    let (ws, outcome) = build(
        r#"
//- one.cpp
namespace { struct B {}; }
void test1() {
  B b;
}
//- two.cpp
namespace { struct B {}; }
void test2() {
  B b;
}
"#,
    );
    assert!(!outcome.has_errors(), "{:?}", outcome.diagnostics);

    let b_bindings: Vec<_> = ws
        .index()
        .bindings()
        .filter(|b| b.name().as_ref() == "B")
        .collect();
    assert_eq!(b_bindings.len(), 2, "file-local classes must not merge");

    for path in ["one.cpp", "two.cpp"] {
        let file = ws.file_id(path).unwrap();
        let uses = ws.resolutions(path);
        let Resolution::Binding(id) = uses[0].result.as_ref().unwrap() else {
            panic!("expected a binding");
        };
        let binding = ws.index().binding(*id);
        assert!(
            binding.decls.iter().all(|&(f, _)| f == file),
            "{path}: B resolved into another file's anonymous namespace"
        );
    }
}

#[test]
fn test_anonymous_namespace_shadows_included_global() {
    let (ws, outcome) = build(
        r#"
//- b.h
struct B {};
//- test.cpp *
#include "b.h"
namespace { struct B {}; }
void test() {
  B b;
}
"#,
    );
    assert!(!outcome.has_errors(), "{:?}", outcome.diagnostics);
    let file = ws.file_id("test.cpp").unwrap();
    let uses = ws.resolutions("test.cpp");
    let Resolution::Binding(id) = uses[0].result.as_ref().unwrap() else {
        panic!("expected a binding");
    };
    assert!(
        ws.index()
            .binding(*id)
            .decls
            .iter()
            .all(|&(f, _)| f == file)
    );
}

#[test]
fn test_unrelated_translation_unit_does_not_leak() {
    let (ws, outcome) = build(
        r#"
//- ns.h
namespace ns1 { namespace ns2 { class A {}; } }
//- other.cpp
namespace ns1 { namespace ns2 { class Confuser {}; } }
//- test.cpp *
#include "ns.h"
void test() {
  ns1::ns2::A* a;
  ns1::ns2::Confuser* c;
}
"#,
    );
    let uses = ws.resolutions("test.cpp");
    assert!(uses[0].result.is_ok(), "{:?}", uses[0]);
    assert!(
        uses[1].result.is_err(),
        "Confuser is only declared in a translation unit test.cpp does not include"
    );
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnresolvedName
                && d.file.as_ref() == "test.cpp"
                && d.message.contains("Confuser"))
    );
    // other.cpp itself is clean.
    assert!(
        outcome
            .diagnostics
            .iter()
            .all(|d| d.file.as_ref() != "other.cpp")
    );
}

#[test]
fn test_alias_chain_collapses_to_canonical_namespace() {
    let (ws, outcome) = build(
        r#"
//- ns.h
namespace ns1 { class A {}; }
namespace ns2 = ns1;
namespace waldo = ns2;
//- test.cpp *
#include "ns.h"
void test() {
  waldo::A* x;
  ns2::A* y;
  ns1::A* z;
}
"#,
    );
    assert!(!outcome.has_errors(), "{:?}", outcome.diagnostics);
    let uses = ws.resolutions("test.cpp");
    assert_eq!(uses.len(), 3);
    for resolved in uses {
        assert_eq!(
            binding_name(&ws, resolved.result.as_ref().unwrap()),
            "ns1::A",
            "every alias spelling must reach the same binding"
        );
    }
}

#[test]
fn test_instantiation_argument_is_the_included_class_not_a_confuser() {
    let (ws, outcome) = build(
        r#"
//- A.h
template <typename T> struct A { void m(T p); };
//- B.h
struct B {};
//- confuser.cpp
#include "A.h"
namespace { struct B {}; }
void confuse() {
  A<B*> x;
}
//- test.cpp *
#include "A.h"
#include "B.h"
void test() {
  A<B*> a;
  B b;
  a.m(b);
}
"#,
    );
    assert!(!outcome.has_errors(), "{:?}", outcome.diagnostics);

    let class_argument = |insts: &[Arc<Instantiation>]| {
        assert_eq!(insts.len(), 1);
        let Ty::Pointer(inner) = &insts[0].args[0] else {
            panic!("expected a pointer argument");
        };
        let Ty::Class(id) = inner.as_ref() else {
            panic!("expected a class argument");
        };
        *id
    };

    // test.cpp instantiates A with the B from B.h, not the file-local B
    // another translation unit instantiated with.
    let bh = ws.file_id("B.h").unwrap();
    let arg = class_argument(&instances(&ws, "test.cpp"));
    assert!(
        ws.index().binding(arg).decls.iter().all(|&(f, _)| f == bh),
        "test.cpp picked up a B other than the one from B.h"
    );

    // confuser.cpp keeps its own anonymous-namespace B.
    let confuser = ws.file_id("confuser.cpp").unwrap();
    let arg = class_argument(&instances(&ws, "confuser.cpp"));
    assert!(
        ws.index()
            .binding(arg)
            .decls
            .iter()
            .all(|&(f, _)| f == confuser)
    );

    // a.m(b) lands in A's body.
    let member = ws
        .resolutions("test.cpp")
        .iter()
        .find_map(|u| match u.result.as_ref().ok()? {
            Resolution::Binding(id) => {
                let b = ws.index().binding(*id);
                (b.name().as_ref() == "m").then_some(b)
            }
            _ => None,
        })
        .expect("a.m(b) did not resolve");
    assert_eq!(member.qualified_name.as_ref(), "A::m");
}

#[test]
fn test_alias_links_spread_across_headers_still_collapse() {
    let (ws, outcome) = build(
        r#"
//- ns1.h
namespace ns1 { class A {}; }
//- ns2.h
#include "ns1.h"
namespace ns2 = ns1;
//- waldo.h
#include "ns2.h"
namespace waldo = ns2;
//- test.cpp *
#include "waldo.h"
void test() {
  waldo::A* x;
}
"#,
    );
    assert!(!outcome.has_errors(), "{:?}", outcome.diagnostics);
    let uses = ws.resolutions("test.cpp");
    assert_eq!(
        binding_name(&ws, uses[0].result.as_ref().unwrap()),
        "ns1::A",
        "an alias chain split across headers must reach the canonical namespace"
    );
}

#[test]
fn test_alias_cycle_is_reported_not_looped() {
    let (_, outcome) = build(
        r#"
//- test.cpp *
namespace a = b;
namespace b = a;
void test() {
  a::X* x;
}
"#,
    );
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::CyclicAlias)
    );
}

#[test]
fn test_missing_include_is_a_warning() {
    let (ws, outcome) = build(
        r#"
//- test.cpp *
#include "nowhere.h"
class A {};
void test() {
  A* a;
}
"#,
    );
    assert!(!outcome.has_errors(), "{:?}", outcome.diagnostics);
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::MissingInclude)
    );
    assert!(ws.resolutions("test.cpp")[0].result.is_ok());
}

#[test]
fn test_argument_dependent_lookup_finds_friend_function() {
    let (ws, outcome) = build(
        r#"
//- b.h
struct B {
  friend void waldo(B b);
};
//- test.cpp *
#include "b.h"
void test() {
  B b;
  waldo(b);
}
"#,
    );
    assert!(!outcome.has_errors(), "{:?}", outcome.diagnostics);
    let uses = ws.resolutions("test.cpp");
    let call = uses
        .iter()
        .find_map(|u| match u.result.as_ref().unwrap() {
            Resolution::Binding(id) => {
                let b = ws.index().binding(*id);
                (b.name().as_ref() == "waldo").then_some(b)
            }
            _ => None,
        })
        .expect("call did not resolve to waldo");
    assert_eq!(
        call.kind(),
        ccindex::semantic::symbol_table::StructuralKind::Function
    );
}

#[test]
fn test_friend_function_is_invisible_to_ordinary_lookup() {
    let (_, outcome) = build(
        r#"
//- b.h
struct B {
  friend void waldo(B b);
};
//- test.cpp *
#include "b.h"
void test() {
  waldo();
}
"#,
    );
    assert!(
        outcome
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnresolvedName && d.message.contains("waldo")),
        "a call with no arguments of class type must not see the friend"
    );
}
