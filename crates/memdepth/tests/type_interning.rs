//! Type interning across workers, units and self-referential types.

mod common;

use std::thread;

use common::TestEnv;
use memdepth::syntax::{BasicKind, TypeData, TypeField, TypeRef, TypeTable};
use memdepth::{TypeId, TypeKind};

fn int(table: &mut TypeTable) -> TypeRef {
    table.push(
        "int",
        TypeData::Basic {
            basic: BasicKind::Int,
        },
    )
}

/// `type Node struct { next *Node; value int }` in package `list`.
fn linked_list(table: &mut TypeTable) -> TypeRef {
    let node = table.reserve("list.Node");
    let pointer = table.push("*list.Node", TypeData::Pointer { elem: node });
    let value = int(table);
    let underlying = table.push(
        "struct{next *list.Node; value int}",
        TypeData::Struct {
            fields: vec![
                TypeField {
                    name: "next".into(),
                    ty: pointer,
                    embedded: false,
                },
                TypeField {
                    name: "value".into(),
                    ty: value,
                    embedded: false,
                },
            ],
        },
    );
    table.define(
        node,
        TypeData::Named {
            package: Some("list".into()),
            name: "Node".into(),
            underlying,
        },
    );
    node
}

fn intern(env: &TestEnv, table: &TypeTable, r: TypeRef) -> TypeId {
    let mut session = env.ctx.database().session().expect("should open session");
    env.ctx
        .interner()
        .type_id(&mut session, table, Some(r))
        .expect("should intern")
}

#[test]
fn self_referential_type_interns_once() {
    let env = TestEnv::new();
    let mut table = TypeTable::new();
    let node = linked_list(&mut table);

    let id = intern(&env, &table, node);

    let db = env.ctx.database();
    let stored = db
        .type_by_name("list.Node")
        .expect("query")
        .expect("named type stored");
    assert_eq!(stored.id, id);
    assert_eq!(stored.kind, TypeKind::Named);

    let pointer = db
        .type_by_name("*list.Node")
        .expect("query")
        .expect("pointer stored");
    assert_eq!(pointer.kind, TypeKind::Pointer);
    assert!(
        db.type_by_name("struct{next *list.Node; value int}")
            .expect("query")
            .is_some()
    );
}

#[test]
fn same_name_in_another_unit_reuses_the_row() {
    let env = TestEnv::new();

    let mut first = TypeTable::new();
    let node = linked_list(&mut first);
    let id = intern(&env, &first, node);

    // Same type, different arena layout.
    let mut second = TypeTable::new();
    int(&mut second);
    second.push("bool", TypeData::Basic { basic: BasicKind::Bool });
    let again = linked_list(&mut second);

    assert_eq!(intern(&env, &second, again), id);
    assert_eq!(
        env.ctx.database().stats().expect("stats").types,
        4,
        "int, list.Node, its pointer and its struct"
    );
}

#[test]
fn cache_answers_after_first_sight() {
    let env = TestEnv::new();
    let mut table = TypeTable::new();
    let node = linked_list(&mut table);

    assert_eq!(env.ctx.interner().cached("list.Node"), None);
    let id = intern(&env, &table, node);

    assert_eq!(env.ctx.interner().cached("list.Node"), Some(id));
    assert!(env.ctx.interner().cached("int").is_some());
}

#[test]
fn missing_type_is_an_error_or_none() {
    let env = TestEnv::new();
    let table = TypeTable::new();
    let mut session = env.ctx.database().session().expect("should open session");
    let interner = env.ctx.interner();

    let err = interner
        .type_id(&mut session, &table, None)
        .expect_err("nil type");
    assert!(err.is_nil_type());

    let dangling = interner
        .optional_type_id(&mut session, &table, Some(TypeRef(7)))
        .expect("dangling reference is not a storage error");
    assert_eq!(dangling, None);
}

#[test]
fn concurrent_workers_agree_on_every_id() {
    let env = TestEnv::new();
    let mut table = TypeTable::new();
    let node = linked_list(&mut table);
    let element = int(&mut table);
    let slice = table.push("[]int", TypeData::Slice { elem: element });
    let roots = [node, slice, element];

    let results: Vec<Vec<TypeId>> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(|| {
                    roots
                        .iter()
                        .map(|r| intern(&env, &table, *r))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker should not panic"))
            .collect()
    });

    assert!(results.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(env.ctx.database().stats().expect("stats").types, 5);
}
