//! Memory-access depth over concrete Go fragments.
//!
//! Each test builds the unit a front end would export for a small function
//! body, runs definitions and depth, and checks the stored rows.

mod common;

use common::{TestEnv, UnitBuilder, access_at};
use memdepth::syntax::{DeclSite, ExprNode};
use memdepth::{AnalysisMode, MemAccessKind, Position, UNKNOWN_ID, VariableId};

// === var a int; b := &a; c := *b ===

#[test]
fn address_of_and_dereference() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("ptr"), "ptr");
    let int = b.int();
    let ptr = b.pointer(int);

    let a = b.var("a", Some(int));
    let a_use = b.use_var(&a);
    let a_span = a_use.span;
    let addr = b.addr(a_use, Some(ptr));
    let addr_span = addr.span;
    let pb = b.define("b", addr);
    let b_use = b.use_var(&pb);
    let deref = b.star(b_use, Some(int));
    let deref_span = deref.span;
    b.define("c", deref);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::All);
    let records = env.accesses(&path);

    let a_var = env.variable(&a.site).expect("a should be recorded");
    let b_var = env.variable(&pb.site).expect("b should be recorded");

    let ident = access_at(&records, a_span).expect("a is an access");
    assert_eq!(ident.kind, MemAccessKind::Ident);
    assert_eq!(ident.depth, 0);
    assert_eq!(ident.base_name.as_deref(), Some("a"));
    assert_eq!(ident.base_variable, Some(a_var));

    let reference = access_at(&records, addr_span).expect("&a is an access");
    assert_eq!(reference.kind, MemAccessKind::Ref);
    assert_eq!(reference.depth, -1);
    assert_eq!(reference.base_variable, Some(a_var));
    assert_eq!(reference.inner, Some(ident.expr_id));

    let deref = access_at(&records, deref_span).expect("*b is an access");
    assert_eq!(deref.kind, MemAccessKind::Deref);
    assert_eq!(deref.depth, 1);
    assert_eq!(deref.base_name.as_deref(), Some("b"));
    assert_eq!(deref.base_variable, Some(b_var));
}

#[test]
fn defining_identifiers_are_not_accesses() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("def"), "def");
    let lit = b.int_lit("1");
    b.define("x", lit);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::All);

    assert!(env.accesses(&path).is_empty());
}

// === type S struct{f int}; var s S; var p *S; x := s.f; y := p.f ===

#[test]
fn value_and_indirect_field_access() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("fields"), "fields");
    let int = b.int();
    let s_ty = b.named_struct("S", &[("f", int)]);
    let p_ty = b.pointer(s_ty);
    let f = b.field("f", Some(int));

    let s = b.var("s", Some(s_ty));
    let p = b.var("p", Some(p_ty));

    let s_use = b.use_var(&s);
    let sf = b.select(s_use, "f", f, Some(int));
    let sf_span = sf.span;
    b.define("x", sf);

    let p_use = b.use_var(&p);
    let pf = b.select(p_use, "f", f, Some(int));
    let pf_span = pf.span;
    b.define("y", pf);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::All);
    let records = env.accesses(&path);

    let x = access_at(&records, sf_span).expect("s.f is an access");
    assert_eq!(x.kind, MemAccessKind::FieldAccess);
    assert_eq!(x.depth, 0);
    assert_eq!(x.base_name.as_deref(), Some("s"));
    assert_eq!(x.base_variable, env.variable(&s.site));

    let y = access_at(&records, pf_span).expect("p.f is an access");
    assert_eq!(y.kind, MemAccessKind::IndirectFieldAccess);
    assert_eq!(y.depth, 1);
    assert_eq!(y.base_name.as_deref(), Some("p"));
    assert_eq!(y.base_variable, env.variable(&p.site));
}

// === var sl []int; z := sl[0]; var arr [4]int; w := arr[0] ===

#[test]
fn slice_and_array_indexing() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("index"), "index");
    let int = b.int();
    let slice = b.slice(int);
    let array = b.array(4, int);

    let sl = b.var("sl", Some(slice));
    let arr = b.var("arr", Some(array));

    let sl_use = b.use_var(&sl);
    let z = b.index(sl_use, Some(int));
    let z_span = z.span;
    b.define("z", z);

    let arr_use = b.use_var(&arr);
    let w = b.index(arr_use, Some(int));
    let w_span = w.span;
    b.define("w", w);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::All);
    let records = env.accesses(&path);

    let z = access_at(&records, z_span).expect("sl[0] is an access");
    assert_eq!(z.kind, MemAccessKind::SliceIndex);
    assert_eq!(z.depth, 1);
    assert_eq!(z.base_name.as_deref(), Some("sl"));

    let w = access_at(&records, w_span).expect("arr[0] is an access");
    assert_eq!(w.kind, MemAccessKind::ArrayIndex);
    assert_eq!(w.depth, 0);
    assert_eq!(w.base_name.as_deref(), Some("arr"));
}

#[test]
fn map_index_adds_a_level() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("maps"), "maps");
    let int = b.int();
    let map = b.map(int, int);
    let m = b.var("m", Some(map));
    let m_use = b.use_var(&m);
    let mk = b.index(m_use, Some(int));
    let span = mk.span;
    b.expr_stmt(mk);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::All);

    let record = access_at(&env.accesses(&path), span).cloned().expect("m[k] is an access");
    assert_eq!(record.kind, MemAccessKind::MapIndex);
    assert_eq!(record.depth, 1);
}

// === Slicing ===

#[test]
fn slicing_an_array_removes_a_level() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("views"), "views");
    let int = b.int();
    let array = b.array(4, int);
    let slice = b.slice(int);

    let arr = b.var("arr", Some(array));
    let sl = b.var("sl", Some(slice));

    let arr_use = b.use_var(&arr);
    let arr_view = b.slice_of(arr_use, Some(slice));
    let arr_span = arr_view.span;
    b.define("v", arr_view);

    let sl_use = b.use_var(&sl);
    let sl_view = b.slice_of(sl_use, Some(slice));
    let sl_span = sl_view.span;
    b.define("u", sl_view);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::All);
    let records = env.accesses(&path);

    let of_array = access_at(&records, arr_span).expect("arr[1:3] is an access");
    assert_eq!(of_array.kind, MemAccessKind::SliceOfArray);
    assert_eq!(of_array.depth, -1, "array slicing subtracts one level");

    let of_slice = access_at(&records, sl_span).expect("sl[1:3] is an access");
    assert_eq!(of_slice.kind, MemAccessKind::SliceOfSlice);
    assert_eq!(of_slice.depth, 0);
}

// === Parens and chains ===

#[test]
fn parens_pass_depth_through() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("parens"), "parens");
    let int = b.int();
    let ptr = b.pointer(int);
    let p = b.var("p", Some(ptr));

    let p_use = b.use_var(&p);
    let deref = b.star(p_use, Some(int));
    let deref_span = deref.span;
    let paren = b.paren(deref);
    let paren_span = paren.span;
    b.expr_stmt(paren);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::All);
    let records = env.accesses(&path);

    let inner = access_at(&records, deref_span).expect("*p is an access");
    let outer = access_at(&records, paren_span).expect("(*p) is an access");
    assert_eq!(outer.kind, MemAccessKind::Paren);
    assert_eq!(outer.depth, inner.depth);
    assert_eq!(outer.uncertainty, inner.uncertainty);
    assert_eq!(outer.base_variable, inner.base_variable);
    assert_eq!(outer.inner, Some(inner.expr_id));
}

#[test]
fn depth_accumulates_along_a_chain() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("chain"), "chain");
    let int = b.int();
    let slice = b.slice(int);
    let node = b.named_struct("Node", &[("items", slice)]);
    let node_ptr = b.pointer(node);
    let items = b.field("items", Some(slice));

    // n.items[0] where n is *Node: +1 for the pointer, +1 for the slice
    let n = b.var("n", Some(node_ptr));
    let n_use = b.use_var(&n);
    let sel = b.select(n_use, "items", items, Some(slice));
    let idx = b.index(sel, Some(int));
    let idx_span = idx.span;
    b.expr_stmt(idx);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::All);

    let record = access_at(&env.accesses(&path), idx_span)
        .cloned()
        .expect("n.items[0] is an access");
    assert_eq!(record.kind, MemAccessKind::SliceIndex);
    assert_eq!(record.depth, 2);
    assert_eq!(record.base_name.as_deref(), Some("n"));
}

// === Unresolved types ===

#[test]
fn unresolved_operands_record_uncertainty_without_a_base() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("unknown"), "unknown");
    let f = b.field("f", None);
    let u = b.var("u", None);

    let u_use = b.use_var(&u);
    let uf = b.select(u_use, "f", f, None);
    let uf_span = uf.span;
    let idx = b.index(uf, None);
    let idx_span = idx.span;
    b.expr_stmt(idx);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::All);
    let records = env.accesses(&path);

    let field = access_at(&records, uf_span).expect("u.f is an access");
    assert_eq!(field.kind, MemAccessKind::UnknownFieldAccess);
    assert_eq!(field.depth, 0);
    assert_eq!(field.uncertainty, 1);
    assert_eq!(field.base_name.as_deref(), Some("u"));
    assert_eq!(field.base_variable, None);

    let index = access_at(&records, idx_span).expect("u.f[0] is an access");
    assert_eq!(index.kind, MemAccessKind::UnknownIndex);
    assert_eq!(index.uncertainty, 2);
    assert_eq!(index.base_variable, None);
}

// === Calls and package members ===

#[test]
fn call_results_are_fresh_accesses() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("calls"), "calls");
    let int = b.int();
    let call = b.call("g", Some(int));
    let call_span = call.span;
    let ExprNode::Call { fun, .. } = &call.node else {
        unreachable!("builder returns a call");
    };
    let callee_span = fun.span;
    b.expr_stmt(call);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::All);
    let records = env.accesses(&path);

    let record = access_at(&records, call_span).expect("g() is an access");
    assert_eq!(record.kind, MemAccessKind::FunctionCall);
    assert_eq!(record.depth, 0);
    assert_eq!(record.base_name, None);
    assert_eq!(record.base_variable, Some(VariableId(UNKNOWN_ID)));
    assert!(access_at(&records, callee_span).is_none(), "a function name is not an access");
}

#[test]
fn selecting_from_a_call_result_is_plain() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("callsel"), "callsel");
    let int = b.int();
    let s_ty = b.named_struct("S", &[("f", int)]);
    let f = b.field("f", Some(int));
    let call = b.call("make_s", Some(s_ty));
    let sel = b.select(call, "f", f, Some(int));
    let sel_span = sel.span;
    b.expr_stmt(sel);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::All);

    assert!(access_at(&env.accesses(&path), sel_span).is_none());
}

/// Neither site has a variable row here, so both fall back to the unknown base.
#[test]
fn package_variables_start_one_level_down() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("pkgsel"), "pkgsel");
    let int = b.int();

    let in_corpus = DeclSite {
        file: env.root().join("config").join("config.go"),
        position: Position::new(3, 5),
    };
    let outside = DeclSite {
        file: "/usr/lib/go/src/os/file.go".into(),
        position: Position::new(60, 2),
    };
    let local = b.package_var("config", "Default", Some(int), in_corpus);
    let local_span = local.span;
    b.expr_stmt(local);
    let stdlib = b.package_var("os", "Stdout", Some(int), outside);
    let stdlib_span = stdlib.span;
    b.expr_stmt(stdlib);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::All);
    let records = env.accesses(&path);

    for (span, name) in [(local_span, "Default"), (stdlib_span, "Stdout")] {
        let record = access_at(&records, span).expect("package variable is an access");
        assert_eq!(record.kind, MemAccessKind::Ident);
        assert_eq!(record.depth, 1);
        assert_eq!(record.base_name.as_deref(), Some(name));
        assert_eq!(record.base_variable, Some(VariableId(UNKNOWN_ID)));
    }
}

#[test]
fn package_variable_in_corpus_uses_its_definition_as_base() {
    let env = TestEnv::new();

    let mut b = UnitBuilder::new(&env.root().join("config"), "config");
    let int = b.int();
    let default = b.var("Default", Some(int));
    let config = b.finish();
    env.analyze(&config, AnalysisMode::Defs);
    let real = env.variable(&default.site).expect("variable row written");
    assert_ne!(real, VariableId(UNKNOWN_ID));

    let mut b = UnitBuilder::new(&env.root().join("app"), "app");
    let int = b.int();
    let member = b.package_var("config", "Default", Some(int), default.site.clone());
    let span = member.span;
    b.expr_stmt(member);
    let path = b.path.clone();
    let app = b.finish();
    env.analyze(&app, AnalysisMode::Depth);

    let records = env.accesses(&path);
    let record = access_at(&records, span).expect("package variable is an access");
    assert_eq!(record.kind, MemAccessKind::Ident);
    assert_eq!(record.depth, 1);
    assert_eq!(record.uncertainty, 0);
    assert_eq!(record.base_variable, Some(real));
}

// === Whole-file invariants ===

#[test]
fn every_row_keeps_base_and_uncertainty_exclusive() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("mixed"), "mixed");
    let int = b.int();
    let ptr = b.pointer(int);
    let f = b.field("f", None);

    let known = b.var("known", Some(ptr));
    let unknown = b.var("unknown", None);
    for _ in 0..3 {
        let k = b.use_var(&known);
        let d = b.star(k, Some(int));
        let a = b.addr(d, Some(ptr));
        b.expr_stmt(a);

        let u = b.use_var(&unknown);
        let s = b.select(u, "f", f, None);
        let d = b.star(s, None);
        b.expr_stmt(d);
    }
    let call = b.call("g", None);
    b.expr_stmt(call);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::All);
    let records = env.accesses(&path);

    assert!(!records.is_empty());
    for record in &records {
        assert_eq!(
            record.base_variable.is_some(),
            record.uncertainty == 0,
            "exclusivity violated at {:?}",
            record.span
        );
    }
}

#[test]
fn depth_without_definitions_stores_the_sentinel() {
    let env = TestEnv::new();
    let mut b = UnitBuilder::new(&env.root().join("nodefs"), "nodefs");
    let int = b.int();
    let a = b.var("a", Some(int));
    let a_use = b.use_var(&a);
    let span = a_use.span;
    b.expr_stmt(a_use);

    let path = b.path.clone();
    let unit = b.finish();
    env.analyze(&unit, AnalysisMode::Depth);

    let record = access_at(&env.accesses(&path), span).cloned().expect("a is an access");
    assert_eq!(record.base_variable, Some(VariableId(UNKNOWN_ID)));
}
