//! End-to-end inference over small projects, through the public API only.

use emmy_checker::syntax::BinaryOp;
use emmy_checker::{
    ClassIndex, DocComment, LexicalScopes, NodeKind, PathModuleResolver, Program, ProgramBuilder,
    TypeInferrer,
};
use emmy_common::{NodeId, Settings};
use emmy_solver::{Signature, Ty, TypeParamInfo};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

struct Project {
    program: Program,
    index: ClassIndex,
    settings: Settings,
}

impl Project {
    fn new(program: Program) -> Self {
        Self::with_settings(program, Settings::default())
    }

    fn with_settings(program: Program, settings: Settings) -> Self {
        let index = ClassIndex::from_program(&program);
        Self {
            program,
            index,
            settings,
        }
    }

    fn infer(&self, node: NodeId) -> Ty {
        let scopes = LexicalScopes::new(&self.program);
        let modules = PathModuleResolver::new(&self.program);
        TypeInferrer::new(&self.program, &scopes, &self.index, &modules, &self.settings).infer(node)
    }
}

#[test]
fn table_literal_field() {
    // local t = {x = 1}; return t.x
    let mut b = ProgramBuilder::new();
    let one = b.number("1");
    let field = b.field("x", one);
    let table = b.table(vec![field]);
    let local = b.local(&["t"], vec![table]);
    let t = b.name("t");
    let access = b.index(t, "x");
    let ret = b.ret(vec![access]);
    b.add_file("main.lua", vec![local, ret]);

    assert_eq!(Project::new(b.build()).infer(access), Ty::NUMBER);
}

/// ---@class Animal
/// local Animal = {}
/// ---@return string
/// function Animal:speak() end
/// ---@class Dog : Animal
/// local Dog = {}
///
/// ---@type Dog
/// local d
/// return d:speak()
fn animals() -> (Program, NodeId) {
    let mut b = ProgramBuilder::new();
    let empty = b.table(vec![]);
    let animal = b.local(&["Animal"], vec![empty]);
    b.doc(animal, DocComment::class("Animal"));
    let prefix = b.name("Animal");
    let speak = b.method(prefix, "speak", true, &[], vec![]);
    b.doc(speak, DocComment::default().with_return(Ty::STRING));
    let empty = b.table(vec![]);
    let dog = b.local(&["Dog"], vec![empty]);
    b.doc(dog, DocComment::class("Dog").with_super("Animal"));
    b.add_file("animals.lua", vec![animal, speak, dog]);

    let local = b.local(&["d"], vec![]);
    b.doc(local, DocComment::typed(Ty::class("Dog")));
    let d = b.name("d");
    let callee = b.colon_index(d, "speak");
    let call = b.call(callee, vec![]);
    let ret = b.ret(vec![call]);
    b.add_file("main.lua", vec![local, ret]);
    (b.build(), call)
}

#[test]
fn inherited_method_call() {
    let (program, call) = animals();
    assert_eq!(Project::new(program).infer(call), Ty::STRING);
}

#[test]
fn string_keyed_map_access() {
    // ---@type table<string, number>
    // local m = {}
    // ---@type table<number, string>
    // local ids = {}
    // return m["k"], ids.k
    let mut b = ProgramBuilder::new();
    let empty = b.table(vec![]);
    let map = b.local(&["m"], vec![empty]);
    b.doc(
        map,
        DocComment::typed(Ty::generic(Ty::table(), [Ty::STRING, Ty::NUMBER])),
    );
    let empty = b.table(vec![]);
    let ids = b.local(&["ids"], vec![empty]);
    b.doc(
        ids,
        DocComment::typed(Ty::generic(Ty::table(), [Ty::NUMBER, Ty::STRING])),
    );
    let m = b.name("m");
    let key = b.string("k");
    let by_key = b.bracket(m, key);
    let ids_ref = b.name("ids");
    let by_field = b.index(ids_ref, "k");
    let ret = b.ret(vec![by_key, by_field]);
    b.add_file("main.lua", vec![map, ids, ret]);
    let project = Project::new(b.build());

    assert_eq!(project.infer(by_key), Ty::NUMBER);
    assert_eq!(project.infer(by_field), Ty::Unknown);
}

#[test]
fn non_string_keyed_generic_uses_class_members() {
    // ---@class Dict<K, V>
    // ---@field size number
    // ---@field first V
    // local Dict = {}
    //
    // ---@type Dict<number, string>
    // local d = {}
    // return d.size, d.first
    let mut b = ProgramBuilder::new();
    let empty = b.table(vec![]);
    let dict = b.local(&["Dict"], vec![empty]);
    b.doc(
        dict,
        DocComment::class("Dict")
            .with_class_generic("K")
            .with_class_generic("V")
            .with_field("size", Ty::NUMBER)
            .with_field("first", Ty::class("V")),
    );
    let empty = b.table(vec![]);
    let local = b.local(&["d"], vec![empty]);
    b.doc(
        local,
        DocComment::typed(Ty::generic(Ty::class("Dict"), [Ty::NUMBER, Ty::STRING])),
    );
    let d = b.name("d");
    let size = b.index(d, "size");
    let d = b.name("d");
    let first = b.index(d, "first");
    let ret = b.ret(vec![size, first]);
    b.add_file("main.lua", vec![dict, local, ret]);
    let project = Project::new(b.build());

    assert_eq!(project.infer(size), Ty::NUMBER);
    assert_eq!(project.infer(first), Ty::STRING);
}

#[test]
fn generic_identity_across_files() {
    // lib.lua:
    // ---@generic T
    // ---@param v T
    // ---@return T
    // function identity(v) return v end
    // main.lua: return identity("s")
    let mut b = ProgramBuilder::new();
    let v = b.name("v");
    let ret = b.ret(vec![v]);
    let func = b.function("identity", &["v"], false, vec![ret]);
    b.doc(
        func,
        DocComment::default()
            .with_generic(TypeParamInfo::new("T"))
            .with_param("v", Ty::class("T"))
            .with_return(Ty::class("T")),
    );
    b.add_file("lib.lua", vec![func]);
    let identity = b.name("identity");
    let arg = b.string("s");
    let call = b.call(identity, vec![arg]);
    let ret = b.ret(vec![call]);
    b.add_file("main.lua", vec![ret]);

    assert_eq!(Project::new(b.build()).infer(call), Ty::STRING);
}

#[test]
fn custom_require_like_function() {
    // conf.lua: return { port = 80 }
    // main.lua: local conf = import("conf"); return conf.port
    let mut b = ProgramBuilder::new();
    let port = b.number("80");
    let field = b.field("port", port);
    let table = b.table(vec![field]);
    let export = b.ret(vec![table]);
    b.add_file("conf.lua", vec![export]);
    let import = b.name("import");
    let path = b.string("conf");
    let call = b.call(import, vec![path]);
    let local = b.local(&["conf"], vec![call]);
    let conf = b.name("conf");
    let access = b.index(conf, "port");
    let ret = b.ret(vec![access]);
    b.add_file("main.lua", vec![local, ret]);
    let program = b.build();

    let settings = Settings::from_json_str(
        &serde_json::json!({ "requireLikeFunctions": ["import"] }).to_string(),
    )
    .unwrap();
    assert_eq!(Project::with_settings(program.clone(), settings).infer(access), Ty::NUMBER);
    assert_eq!(Project::new(program).infer(access), Ty::Unknown);
}

#[test]
fn iterator_and_arithmetic() {
    // ---@type fun(): string, number
    // local next_pair
    // for name, count in next_pair do local total = count + 1 end
    let mut b = ProgramBuilder::new();
    let local = b.local(&["next_pair"], vec![]);
    b.doc(
        local,
        DocComment::typed(Ty::function(Signature::new(
            [],
            Ty::tuple([Ty::STRING, Ty::NUMBER]),
        ))),
    );
    let count = b.name("count");
    let one = b.number("1");
    let sum = b.binary(BinaryOp::Add, count, one);
    let total = b.local(&["total"], vec![sum]);
    let iter = b.name("next_pair");
    let loop_stat = b.for_in(&["name", "count"], vec![iter], vec![total]);
    b.add_file("main.lua", vec![local, loop_stat]);
    let project = Project::new(b.build());

    let Some(NodeKind::ForIn { vars, .. }) = project.program.kind(loop_stat) else {
        panic!("expected generic for");
    };
    assert_eq!(project.infer(vars[0]), Ty::STRING);
    assert_eq!(project.infer(count), Ty::NUMBER);
    assert_eq!(project.infer(sum), Ty::NUMBER);
}

#[test]
fn concurrent_requests_share_one_index() {
    let (program, call) = animals();
    let index = ClassIndex::from_program(&program);
    let scopes = LexicalScopes::new(&program);
    let modules = PathModuleResolver::new(&program);
    let settings = Settings::default();
    let inferrer = TypeInferrer::new(&program, &scopes, &index, &modules, &settings);

    let results: Vec<Ty> = (0..64).into_par_iter().map(|_| inferrer.infer(call)).collect();
    assert!(results.iter().all(|ty| *ty == Ty::STRING));
}

#[test]
fn degraded_registry_and_cancellation_yield_unknown() {
    let (program, call) = animals();
    let index = ClassIndex::from_program(&program);
    let scopes = LexicalScopes::new(&program);
    let modules = PathModuleResolver::new(&program);
    let settings = Settings::default();

    let inferrer = TypeInferrer::new(&program, &scopes, &index, &modules, &settings);
    assert_eq!(inferrer.infer(call), Ty::STRING);
    index.set_ready(false);
    assert_eq!(inferrer.infer(call), Ty::Unknown);
    index.set_ready(true);

    let cancel = Arc::new(AtomicBool::new(true));
    let cancelled = inferrer.clone().with_cancel(cancel);
    assert_eq!(cancelled.infer(call), Ty::Unknown);
}

#[test]
fn registry_outage_does_not_outlive_the_request() {
    let (program, call) = animals();
    let index = ClassIndex::from_program(&program);
    let scopes = LexicalScopes::new(&program);
    let modules = PathModuleResolver::new(&program);
    let settings = Settings::default();
    let inferrer = TypeInferrer::new(&program, &scopes, &index, &modules, &settings);

    index.set_ready(false);
    assert_eq!(inferrer.infer(call), Ty::Unknown);
    index.set_ready(true);
    assert_eq!(inferrer.infer(call), Ty::STRING);
}

#[test]
fn settings_file_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        serde_json::json!({
            "constructorNames": ["create"],
            "recognizeGlobalNameAsType": false
        })
        .to_string(),
    )?;

    let settings = Settings::from_path(&path)?;
    assert!(settings.is_constructor_name("create"));
    assert!(!settings.is_constructor_name("new"));
    assert!(settings.is_require_like("require"));
    assert!(!settings.recognize_global_name_as_type);

    assert!(Settings::from_json_str("{ not json").is_err());
    Ok(())
}
