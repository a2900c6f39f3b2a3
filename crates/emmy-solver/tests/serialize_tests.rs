use super::*;

fn round_trip(ty: &Ty) -> Ty {
    let json = serde_json::to_string(&TyRepr::from(ty)).expect("serialize");
    let repr: TyRepr = serde_json::from_str(&json).expect("deserialize");
    repr.to_ty()
}

#[test]
fn class_stub_keeps_declared_details() {
    let class = ClassTy::declared(
        "Dog",
        ClassDetails {
            generic_names: vec![Name::from("T")],
            super_class_names: vec![Name::from("Animal"), Name::from("Pet")],
            alias_name: Some(Name::from("Hound")),
        },
    );
    let stub = ClassStub::from_class(&class);
    let json = serde_json::to_string(&stub).expect("serialize");
    let back: ClassStub = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, stub);

    let restored = back.to_class();
    assert_eq!(restored, class);
    let details = restored.resolved_details().expect("details preset");
    assert_eq!(details.super_class_names.len(), 2);
    assert_eq!(details.generic_names[0].as_ref(), "T");
    assert_eq!(details.alias_name.as_deref(), Some("Hound"));
}

#[test]
fn stub_json_uses_camel_case_keys() {
    let stub = ClassStub::from_class(&ClassTy::global("foo"));
    let value = serde_json::to_value(&stub).expect("serialize");
    assert_eq!(value["className"], "$foo");
    assert_eq!(value["varName"], "foo");
    assert_eq!(value["flags"], u64::from(ClassFlags::GLOBAL.bits()));
}

#[test]
fn global_flag_survives() {
    let global = Ty::Class(Arc::new(ClassTy::global("foo")));
    let back = round_trip(&global);
    assert_eq!(back, global);
    assert!(back.as_class().is_some_and(|c| c.is_global()));
}

#[test]
fn lazy_class_stays_lazy() {
    let back = ClassStub::from_class(&ClassTy::lazy("Later")).to_class();
    assert!(back.resolved_details().is_none());
}

#[test]
fn compound_types_round_trip() {
    let sig = Signature::new(
        [ParamInfo::new("a", Ty::class("T"))],
        Ty::tuple([Ty::NUMBER, Ty::STRING]),
    )
    .with_type_params(vec![TypeParamInfo::bounded("T", "Base")])
    .with_vararg(Ty::BOOLEAN)
    .with_colon_call(true);
    let ty = Ty::union_all(&[
        Ty::function(sig),
        Ty::generic(Ty::class("table"), [Ty::STRING, Ty::array(Ty::NUMBER)]),
        Ty::NIL,
    ]);
    assert_eq!(round_trip(&ty), ty);
}

#[test]
fn doc_tables_round_trip_with_fields() {
    let fields = vec![DocTableField {
        name: Name::from("x"),
        ty: Ty::NUMBER,
    }];
    let ty = Ty::Class(Arc::new(ClassTy::doc_table("a.lua", 3, fields)));
    let back = round_trip(&ty);
    assert_eq!(back, ty);
    assert_eq!(back.to_string(), "{ x: number }");
}

#[test]
fn function_returning_function_round_trips() {
    let inner = Ty::function(Signature::new([ParamInfo::new("s", Ty::STRING)], Ty::NUMBER));
    let outer = Ty::function(Signature::new([], inner.clone()).with_vararg(inner));
    let value = serde_json::to_value(TyRepr::from(&outer)).expect("serialize");
    assert_eq!(value["kind"], "function");
    assert_eq!(value["main"]["ret"]["kind"], "function");
    assert_eq!(round_trip(&outer), outer);
}
