use super::*;

fn samples() -> Vec<Ty> {
    vec![
        Ty::Unknown,
        Ty::Invalid,
        Ty::NUMBER,
        Ty::STRING,
        Ty::NIL,
        Ty::class("A"),
        Ty::class("B"),
        Ty::array(Ty::NUMBER),
        Ty::generic(Ty::class("List"), [Ty::STRING]),
        Ty::NUMBER.union(&Ty::STRING),
        Ty::class("A").union(&Ty::NIL),
    ]
}

fn has_nested_union(ty: &Ty) -> bool {
    match ty {
        Ty::Union(union) => union.members().iter().any(|m| matches!(m, Ty::Union(_))),
        _ => false,
    }
}

#[test]
fn union_is_commutative_and_idempotent() {
    for a in samples() {
        assert_eq!(a.union(&a), a, "idempotence for {a:?}");
        for b in samples() {
            assert_eq!(a.union(&b), b.union(&a), "commutativity for {a:?} | {b:?}");
        }
    }
}

#[test]
fn invalid_is_absorbed() {
    for a in samples() {
        if a.is_invalid() {
            continue;
        }
        assert_eq!(a.union(&Ty::Invalid), a);
        assert_eq!(Ty::Unknown.union(&a), a);
    }
    assert_eq!(Ty::Invalid.union(&Ty::Invalid), Ty::Invalid);
    assert_eq!(Ty::Invalid.union(&Ty::Unknown), Ty::Unknown);
}

#[test]
fn unions_are_flat() {
    for a in samples() {
        for b in samples() {
            assert!(!has_nested_union(&a.union(&b)));
        }
    }
    let nested = Ty::NUMBER
        .union(&Ty::STRING)
        .union(&Ty::class("A").union(&Ty::NIL));
    let Ty::Union(union) = nested else {
        panic!("expected union");
    };
    assert_eq!(union.members().len(), 4);
}

#[test]
fn duplicates_keep_first_position() {
    let ty = Ty::NUMBER.union(&Ty::STRING).union(&Ty::NUMBER);
    let Ty::Union(union) = ty else {
        panic!("expected union");
    };
    assert_eq!(union.members(), &[Ty::NUMBER, Ty::STRING]);
}

#[test]
fn union_all_folds() {
    let types = [Ty::Unknown, Ty::NUMBER, Ty::NUMBER, Ty::STRING];
    assert_eq!(Ty::union_all(&types), Ty::NUMBER.union(&Ty::STRING));
    assert_eq!(Ty::union_all(&[]), Ty::Unknown);
    assert_eq!(Ty::union_all(&[Ty::Invalid]), Ty::Invalid);
}

#[test]
fn builder_reports_empty() {
    let mut builder = UnionBuilder::new();
    builder.add(&Ty::Unknown);
    assert!(builder.is_empty());
    assert_eq!(builder.build_non_empty(), None);
}
