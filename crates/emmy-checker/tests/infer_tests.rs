use super::*;
use crate::builder::ProgramBuilder;
use crate::index::ClassIndex;
use crate::modules::PathModuleResolver;
use crate::scope::LexicalScopes;
use crate::syntax::Program;
use emmy_common::Settings;
use emmy_solver::class::table_type_name;
use emmy_solver::{ParamInfo, TypeParamInfo};
use std::sync::atomic::AtomicBool;

fn infer_with(program: &Program, settings: &Settings, node: NodeId) -> Ty {
    let index = ClassIndex::from_program(program);
    let scopes = LexicalScopes::new(program);
    let modules = PathModuleResolver::new(program);
    InferContext::new(program, &scopes, &index, &modules, settings).infer(node)
}

fn infer(program: &Program, node: NodeId) -> Ty {
    infer_with(program, &Settings::default(), node)
}

fn table_ty(program: &Program, table: NodeId) -> Ty {
    let file = program.file_of(table).unwrap();
    Ty::Class(Arc::new(ClassTy::table(
        &file.path,
        file.id,
        table,
        program.offset(table),
        0,
    )))
}

fn has_class(ty: &Ty, name: &str) -> bool {
    ty.each()
        .filter_map(Ty::as_class)
        .any(|class| &**class.name() == name)
}

// =============================================================================
// Operators and literals
// =============================================================================

#[test]
fn operators_have_fixed_result_types() {
    let mut b = ProgramBuilder::new();
    let (l, r) = (b.number("1"), b.number("2"));
    let add = b.binary(BinaryOp::Add, l, r);
    let (l, r) = (b.string("a"), b.string("b"));
    let concat = b.binary(BinaryOp::Concat, l, r);
    let (l, r) = (b.number("1"), b.number("2"));
    let less = b.binary(BinaryOp::Lt, l, r);
    let operand = b.boolean(true);
    let not = b.unary(UnaryOp::Not, operand);
    let operand = b.string("abc");
    let len = b.unary(UnaryOp::Len, operand);
    let nil = b.nil();
    let stmt = b.ret(vec![add, concat, less, not, len, nil]);
    b.add_file("ops.lua", vec![stmt]);
    let program = b.build();

    assert_eq!(infer(&program, add), Ty::NUMBER);
    assert_eq!(infer(&program, concat), Ty::STRING);
    assert_eq!(infer(&program, less), Ty::BOOLEAN);
    assert_eq!(infer(&program, not), Ty::BOOLEAN);
    assert_eq!(infer(&program, len), Ty::NUMBER);
    assert_eq!(infer(&program, nil), Ty::NIL);
}

#[test]
fn or_unions_both_operands() {
    let mut b = ProgramBuilder::new();
    let one = b.number("1");
    let local_a = b.local(&["a"], vec![one]);
    let a = b.name("a");
    let s = b.string("s");
    let or = b.binary(BinaryOp::Or, a, s);
    let local_b = b.local(&["b"], vec![or]);
    b.add_file("or.lua", vec![local_a, local_b]);
    let program = b.build();

    assert_eq!(infer(&program, or), Ty::NUMBER.union(&Ty::STRING));
}

#[test]
fn or_reading_its_own_target_is_the_right_operand() {
    // local x = x or {}
    let mut b = ProgramBuilder::new();
    let x = b.name("x");
    let empty = b.table(vec![]);
    let or = b.binary(BinaryOp::Or, x, empty);
    let local = b.local(&["x"], vec![or]);
    b.add_file("self.lua", vec![local]);
    let program = b.build();

    let Some(NodeKind::LocalDef { names, .. }) = program.kind(local) else {
        panic!("expected local");
    };
    assert_eq!(infer(&program, names[0]), table_ty(&program, empty));
}

#[test]
fn or_reading_a_shadowed_outer_local_keeps_both_operands() {
    // local x = 1
    // do local x = x or "s" end
    let mut b = ProgramBuilder::new();
    let one = b.number("1");
    let outer = b.local(&["x"], vec![one]);
    let x = b.name("x");
    let s = b.string("s");
    let or = b.binary(BinaryOp::Or, x, s);
    let inner = b.local(&["x"], vec![or]);
    let block = b.do_stat(vec![inner]);
    b.add_file("shadow.lua", vec![outer, block]);
    let program = b.build();

    assert_eq!(infer(&program, x), Ty::NUMBER);
    assert_eq!(infer(&program, or), Ty::NUMBER.union(&Ty::STRING));
}

#[test]
fn and_reading_its_own_target_is_unknown() {
    // v = flag and v; w = flag and 1
    let mut b = ProgramBuilder::new();
    let target = b.name("v");
    let flag = b.name("flag");
    let rhs = b.name("v");
    let own = b.binary(BinaryOp::And, flag, rhs);
    let first = b.assign(vec![target], vec![own]);
    let target = b.name("w");
    let flag = b.name("flag");
    let one = b.number("1");
    let other = b.binary(BinaryOp::And, flag, one);
    let second = b.assign(vec![target], vec![other]);
    b.add_file("and.lua", vec![first, second]);
    let program = b.build();

    assert_eq!(infer(&program, own), Ty::Unknown);
    assert_eq!(infer(&program, other), Ty::NUMBER);
}

// =============================================================================
// Tables and members
// =============================================================================

#[test]
fn table_literal_field_access() {
    // local t = {x = 1}; return t.x
    let mut b = ProgramBuilder::new();
    let one = b.number("1");
    let field = b.field("x", one);
    let table = b.table(vec![field]);
    let local = b.local(&["t"], vec![table]);
    let t = b.name("t");
    let access = b.index(t, "x");
    let ret = b.ret(vec![access]);
    b.add_file("t.lua", vec![local, ret]);
    let program = b.build();

    assert_eq!(infer(&program, access), Ty::NUMBER);
}

#[test]
fn fields_assigned_after_construction_extend_the_table() {
    // local t = {}; t.y = "s"; return t.y
    let mut b = ProgramBuilder::new();
    let empty = b.table(vec![]);
    let local = b.local(&["t"], vec![empty]);
    let t = b.name("t");
    let target = b.index(t, "y");
    let s = b.string("s");
    let assign = b.assign(vec![target], vec![s]);
    let t = b.name("t");
    let access = b.index(t, "y");
    let ret = b.ret(vec![access]);
    b.add_file("t.lua", vec![local, assign, ret]);
    let program = b.build();

    assert_eq!(infer(&program, access), Ty::STRING);
}

#[test]
fn anonymous_locals_collect_assigned_fields() {
    // local o = make(); o.k = true; return o.k
    let mut b = ProgramBuilder::new();
    let make = b.name("make");
    let call = b.call(make, vec![]);
    let local = b.local(&["o"], vec![call]);
    let o = b.name("o");
    let target = b.index(o, "k");
    let value = b.boolean(true);
    let assign = b.assign(vec![target], vec![value]);
    let o = b.name("o");
    let access = b.index(o, "k");
    let ret = b.ret(vec![access]);
    b.add_file("anon.lua", vec![local, assign, ret]);
    let program = b.build();

    assert_eq!(infer(&program, access), Ty::BOOLEAN);
}

#[test]
fn doc_type_on_assignment_target_wins() {
    // ---@type number
    // t.count = compute()
    let mut b = ProgramBuilder::new();
    let empty = b.table(vec![]);
    let local = b.local(&["t"], vec![empty]);
    let t = b.name("t");
    let target = b.index(t, "count");
    let compute = b.name("compute");
    let call = b.call(compute, vec![]);
    let assign = b.assign(vec![target], vec![call]);
    b.doc(assign, DocComment::typed(Ty::NUMBER));
    b.add_file("doc.lua", vec![local, assign]);
    let program = b.build();

    assert_eq!(infer(&program, target), Ty::NUMBER);
}

#[test]
fn unresolved_assignment_target_uses_the_assigned_value() {
    // local t = make(); t[1] = "s"
    let mut b = ProgramBuilder::new();
    let make = b.name("make");
    let call = b.call(make, vec![]);
    let local = b.local(&["t"], vec![call]);
    let t = b.name("t");
    let key = b.number("1");
    let target = b.bracket(t, key);
    let s = b.string("s");
    let assign = b.assign(vec![target], vec![s]);
    b.add_file("fallback.lua", vec![local, assign]);
    let program = b.build();

    assert_eq!(infer(&program, target), Ty::STRING);
}

#[test]
fn array_and_map_indexing() {
    let mut b = ProgramBuilder::new();
    let empty = b.table(vec![]);
    let list_local = b.local(&["list"], vec![empty]);
    b.doc(list_local, DocComment::typed(Ty::array(Ty::STRING)));
    let empty = b.table(vec![]);
    let map_local = b.local(&["map"], vec![empty]);
    b.doc(
        map_local,
        DocComment::typed(Ty::generic(Ty::table(), [Ty::STRING, Ty::NUMBER])),
    );
    let empty = b.table(vec![]);
    let ids_local = b.local(&["ids"], vec![empty]);
    b.doc(
        ids_local,
        DocComment::typed(Ty::generic(Ty::table(), [Ty::NUMBER, Ty::STRING])),
    );

    let list = b.name("list");
    let one = b.number("1");
    let element = b.bracket(list, one);
    let map = b.name("map");
    let key = b.string("k");
    let by_key = b.bracket(map, key);
    let map = b.name("map");
    let by_name = b.index(map, "k");
    let ids = b.name("ids");
    let by_field = b.index(ids, "k");
    let ret = b.ret(vec![element, by_key, by_name, by_field]);
    b.add_file("index.lua", vec![list_local, map_local, ids_local, ret]);
    let program = b.build();

    assert_eq!(infer(&program, element), Ty::STRING);
    assert_eq!(infer(&program, by_key), Ty::NUMBER);
    assert_eq!(infer(&program, by_name), Ty::NUMBER);
    assert_eq!(infer(&program, by_field), Ty::Unknown);
}

#[test]
fn vararg_table_is_an_array_of_the_vararg_type() {
    // ---@vararg string
    // function f(...) local args = {...} return ... end
    let mut b = ProgramBuilder::new();
    let dots = b.vararg();
    let item = b.item(dots);
    let table = b.table(vec![item]);
    let local = b.local(&["args"], vec![table]);
    let dots = b.vararg();
    let ret = b.ret(vec![dots]);
    let func = b.function("f", &[], true, vec![local, ret]);
    b.doc(func, DocComment::default().with_vararg(Ty::STRING));
    b.add_file("va.lua", vec![func]);
    let program = b.build();

    assert_eq!(infer(&program, table), Ty::array(Ty::STRING));
    assert_eq!(infer(&program, dots), Ty::STRING);
}

// =============================================================================
// Methods, self and calls
// =============================================================================

#[test]
fn self_in_a_method_is_the_receiver_class() {
    // ---@class A
    // local A = {}
    // ---@return string
    // function A:name() end
    // function A:run() return self:name() end
    let mut b = ProgramBuilder::new();
    let empty = b.table(vec![]);
    let local = b.local(&["A"], vec![empty]);
    b.doc(local, DocComment::class("A"));
    let prefix = b.name("A");
    let name_method = b.method(prefix, "name", true, &[], vec![]);
    b.doc(name_method, DocComment::default().with_return(Ty::STRING));
    let receiver = b.name("self");
    let callee = b.colon_index(receiver, "name");
    let call = b.call(callee, vec![]);
    let ret = b.ret(vec![call]);
    let prefix = b.name("A");
    let run = b.method(prefix, "run", true, &[], vec![ret]);
    b.add_file("a.lua", vec![local, name_method, run]);
    let program = b.build();

    assert_eq!(infer(&program, receiver), Ty::class("A"));
    assert_eq!(infer(&program, call), Ty::STRING);
}

#[test]
fn generic_call_binds_the_argument_type() {
    // ---@generic T
    // ---@param v T
    // ---@return T
    // local function id(v) return v end
    // local r = id(1)
    let mut b = ProgramBuilder::new();
    let v = b.name("v");
    let ret = b.ret(vec![v]);
    let func = b.local_function("id", &["v"], false, vec![ret]);
    b.doc(
        func,
        DocComment::default()
            .with_generic(TypeParamInfo::new("T"))
            .with_param("v", Ty::class("T"))
            .with_return(Ty::class("T")),
    );
    let id = b.name("id");
    let one = b.number("1");
    let call = b.call(id, vec![one]);
    let local = b.local(&["r"], vec![call]);
    b.add_file("generic.lua", vec![func, local]);
    let program = b.build();

    assert_eq!(infer(&program, call), Ty::NUMBER);
}

#[test]
fn overloads_with_matching_arity_are_unioned() {
    let mut b = ProgramBuilder::new();
    let func = b.function("pick", &["a"], false, vec![]);
    b.doc(
        func,
        DocComment::default()
            .with_param("a", Ty::NUMBER)
            .with_return(Ty::NUMBER)
            .with_overload(Signature::new([ParamInfo::new("s", Ty::STRING)], Ty::STRING))
            .with_overload(Signature::new([], Ty::BOOLEAN)),
    );
    let pick = b.name("pick");
    let arg = b.number("1");
    let one_arg = b.call(pick, vec![arg]);
    let pick = b.name("pick");
    let no_arg = b.call(pick, vec![]);
    let ret = b.ret(vec![one_arg, no_arg]);
    b.add_file("overload.lua", vec![func, ret]);
    let program = b.build();

    assert_eq!(infer(&program, one_arg), Ty::NUMBER.union(&Ty::STRING));
    assert_eq!(infer(&program, no_arg), Ty::BOOLEAN);
}

#[test]
fn multi_value_calls_pick_the_requested_position() {
    // ---@return number, string
    // local function two() end
    // local a, b = two()
    let mut b = ProgramBuilder::new();
    let func = b.local_function("two", &[], false, vec![]);
    b.doc(
        func,
        DocComment::default().with_return(Ty::NUMBER).with_return(Ty::STRING),
    );
    let two = b.name("two");
    let call = b.call(two, vec![]);
    let local = b.local(&["a", "b"], vec![call]);
    b.add_file("multi.lua", vec![func, local]);
    let program = b.build();

    let Some(NodeKind::LocalDef { names, .. }) = program.kind(local) else {
        panic!("expected local");
    };
    assert_eq!(infer(&program, names[0]), Ty::NUMBER);
    assert_eq!(infer(&program, names[1]), Ty::STRING);
}

#[test]
fn constructor_names_yield_the_prefix_type() {
    // ---@class Point
    // local Point = {}
    // function Point.new() return setmetatable({}, Point) end
    // local p = Point.new()
    let mut b = ProgramBuilder::new();
    let empty = b.table(vec![]);
    let local = b.local(&["Point"], vec![empty]);
    b.doc(local, DocComment::class("Point"));
    let setmetatable = b.name("setmetatable");
    let fresh = b.table(vec![]);
    let meta = b.name("Point");
    let wrap = b.call(setmetatable, vec![fresh, meta]);
    let ret = b.ret(vec![wrap]);
    let prefix = b.name("Point");
    let ctor = b.method(prefix, "new", false, &[], vec![ret]);
    let point = b.name("Point");
    let callee = b.index(point, "new");
    let call = b.call(callee, vec![]);
    let p = b.local(&["p"], vec![call]);
    b.add_file("point.lua", vec![local, ctor, p]);
    let program = b.build();

    assert_eq!(infer(&program, call), Ty::class("Point"));

    let no_constructors = Settings::from_json_str(r#"{"constructorNames": []}"#).unwrap();
    assert_eq!(infer_with(&program, &no_constructors, call), Ty::Unknown);
}

#[test]
fn require_resolves_the_module_export() {
    // util.lua: local M = {}; M.VERSION = "1"; return M
    // main.lua: local u = require("util"); return u.VERSION
    let mut b = ProgramBuilder::new();
    let empty = b.table(vec![]);
    let local = b.local(&["M"], vec![empty]);
    let m = b.name("M");
    let target = b.index(m, "VERSION");
    let one = b.string("1");
    let assign = b.assign(vec![target], vec![one]);
    let m = b.name("M");
    let export = b.ret(vec![m]);
    b.add_file("lib/util.lua", vec![local, assign, export]);

    let require = b.name("require");
    let path = b.string("util");
    let call = b.call(require, vec![path]);
    let local_u = b.local(&["u"], vec![call]);
    let u = b.name("u");
    let access = b.index(u, "VERSION");
    let ret = b.ret(vec![access]);
    b.add_file("main.lua", vec![local_u, ret]);
    let program = b.build();

    assert_eq!(infer(&program, call), table_ty(&program, empty));
    assert_eq!(infer(&program, access), Ty::STRING);
}

#[test]
fn unresolved_require_is_unknown() {
    let mut b = ProgramBuilder::new();
    let require = b.name("require");
    let path = b.string("missing");
    let call = b.call(require, vec![path]);
    let stmt = b.expr_stat(call);
    b.add_file("main.lua", vec![stmt]);
    let program = b.build();

    assert_eq!(infer(&program, call), Ty::Unknown);
}

// =============================================================================
// Globals
// =============================================================================

#[test]
fn primitive_globals_stay_primitive() {
    // VERSION = "1.0"; return VERSION, _G.VERSION
    let mut b = ProgramBuilder::new();
    let target = b.name("VERSION");
    let value = b.string("1.0");
    let assign = b.assign(vec![target], vec![value]);
    let read = b.name("VERSION");
    let g = b.name("_G");
    let through_g = b.index(g, "VERSION");
    let ret = b.ret(vec![read, through_g]);
    b.add_file("g.lua", vec![assign, ret]);
    let program = b.build();

    assert_eq!(infer(&program, read), Ty::STRING);
    assert_eq!(infer(&program, through_g), Ty::STRING);
}

#[test]
fn table_globals_carry_their_synthetic_class() {
    // Config = {}; return Config
    let mut b = ProgramBuilder::new();
    let target = b.name("Config");
    let empty = b.table(vec![]);
    let assign = b.assign(vec![target], vec![empty]);
    let read = b.name("Config");
    let ret = b.ret(vec![read]);
    b.add_file("g.lua", vec![assign, ret]);
    let program = b.build();

    let ty = infer(&program, read);
    assert!(has_class(&ty, "$Config"));
    assert!(has_class(&ty, "Config"));
    assert!(has_class(&ty, &table_type_name("g.lua", program.offset(empty))));

    let settings = Settings::default().with_global_name_as_type(false);
    let ty = infer_with(&program, &settings, read);
    assert!(has_class(&ty, "$Config"));
    assert!(!has_class(&ty, "Config"));
}

#[test]
fn nil_assignments_do_not_contribute() {
    // cache = {}; cache = nil
    let mut b = ProgramBuilder::new();
    let target = b.name("cache");
    let empty = b.table(vec![]);
    let first = b.assign(vec![target], vec![empty]);
    let target = b.name("cache");
    let nil = b.nil();
    let second = b.assign(vec![target], vec![nil]);
    let read = b.name("cache");
    let ret = b.ret(vec![read]);
    b.add_file("nil.lua", vec![first, second, ret]);
    let program = b.build();

    let ty = infer(&program, read);
    assert!(ty.each().all(|member| *member != Ty::NIL));
}

#[test]
fn mutually_assigned_globals_terminate() {
    // a = b; b = a
    let mut b = ProgramBuilder::new();
    let target = b.name("a");
    let value = b.name("b");
    let first = b.assign(vec![target], vec![value]);
    let target = b.name("b");
    let value = b.name("a");
    let second = b.assign(vec![target], vec![value]);
    let read = b.name("a");
    let ret = b.ret(vec![read]);
    b.add_file("cycle.lua", vec![first, second, ret]);
    let program = b.build();

    let ty = infer(&program, read);
    assert!(has_class(&ty, "$a"));
}

// =============================================================================
// Standard library and loops
// =============================================================================

#[test]
fn string_values_expose_string_library_methods() {
    // std: ---@class string  local string = {}  ---@return string  function string.upper(s) end
    // main: local s = "x"; return s:upper()
    let mut b = ProgramBuilder::new();
    let empty = b.table(vec![]);
    let lib = b.local(&["string"], vec![empty]);
    b.doc(lib, DocComment::class("string"));
    let prefix = b.name("string");
    let upper = b.method(prefix, "upper", false, &["s"], vec![]);
    b.doc(upper, DocComment::default().with_return(Ty::STRING));
    b.add_std_lib_file("std/string.lua", vec![lib, upper]);

    let value = b.string("x");
    let local = b.local(&["s"], vec![value]);
    let s = b.name("s");
    let callee = b.colon_index(s, "upper");
    let call = b.call(callee, vec![]);
    let ret = b.ret(vec![call]);
    b.add_file("main.lua", vec![local, ret]);
    let program = b.build();

    assert_eq!(infer(&program, call), Ty::STRING);
}

#[test]
fn loop_variables() {
    // ---@type fun(): number, string
    // local iter
    // for k, v in iter do end
    // for i = 1, 10 do end
    let mut b = ProgramBuilder::new();
    let local = b.local(&["iter"], vec![]);
    b.doc(
        local,
        DocComment::typed(Ty::function(Signature::new([], Ty::tuple([Ty::NUMBER, Ty::STRING])))),
    );
    let iter = b.name("iter");
    let generic_for = b.for_in(&["k", "v"], vec![iter], vec![]);
    let start = b.number("1");
    let end = b.number("10");
    let numeric_for = b.for_num("i", start, end, None, vec![]);
    b.add_file("loops.lua", vec![local, generic_for, numeric_for]);
    let program = b.build();

    let Some(NodeKind::ForIn { vars, .. }) = program.kind(generic_for) else {
        panic!("expected generic for");
    };
    assert_eq!(infer(&program, vars[0]), Ty::NUMBER);
    assert_eq!(infer(&program, vars[1]), Ty::STRING);
    let Some(NodeKind::ForNum { var, .. }) = program.kind(numeric_for) else {
        panic!("expected numeric for");
    };
    assert_eq!(infer(&program, *var), Ty::NUMBER);
}

#[test]
fn parameters_take_their_documented_type() {
    let mut b = ProgramBuilder::new();
    let p = b.name("p");
    let ret = b.ret(vec![p]);
    let func = b.local_function("f", &["p"], false, vec![ret]);
    b.doc(func, DocComment::default().with_param("p", Ty::class("Node")));
    b.add_file("params.lua", vec![func]);
    let program = b.build();

    let param = program.kind(func).and_then(NodeKind::func_body).unwrap().params[0];
    assert_eq!(infer(&program, param), Ty::class("Node"));
    assert_eq!(infer(&program, p), Ty::class("Node"));
}

#[test]
fn alias_doc_types_expand() {
    // ---@alias Id number
    // ---@type Id
    // local id
    let mut b = ProgramBuilder::new();
    let local = b.local(&["id"], vec![]);
    b.doc(
        local,
        DocComment::typed(Ty::class("Id")).with_alias("Id", Ty::NUMBER),
    );
    b.add_file("alias.lua", vec![local]);
    let program = b.build();

    let Some(NodeKind::LocalDef { names, .. }) = program.kind(local) else {
        panic!("expected local");
    };
    assert_eq!(infer(&program, names[0]), Ty::NUMBER.union(&Ty::class("Id")));
}

// =============================================================================
// Degraded collaborators
// =============================================================================

#[test]
fn cancelled_requests_yield_unknown() {
    let mut b = ProgramBuilder::new();
    let one = b.number("1");
    let stmt = b.ret(vec![one]);
    b.add_file("c.lua", vec![stmt]);
    let program = b.build();
    let index = ClassIndex::from_program(&program);
    let scopes = LexicalScopes::new(&program);
    let modules = PathModuleResolver::new(&program);
    let settings = Settings::default();

    let cancel = Arc::new(AtomicBool::new(true));
    let mut ctx = InferContext::new(&program, &scopes, &index, &modules, &settings)
        .with_cancel(Some(cancel));
    assert_eq!(ctx.infer(one), Ty::Unknown);
}

#[test]
fn not_ready_registry_degrades_member_lookups() {
    // ---@class A
    // local A = {x = 1}
    // return A.x, 2
    let mut b = ProgramBuilder::new();
    let one = b.number("1");
    let field = b.field("x", one);
    let table = b.table(vec![field]);
    let local = b.local(&["A"], vec![table]);
    b.doc(local, DocComment::class("A"));
    let a = b.name("A");
    let access = b.index(a, "x");
    let two = b.number("2");
    let ret = b.ret(vec![access, two]);
    b.add_file("degraded.lua", vec![local, ret]);
    let program = b.build();
    let index = ClassIndex::from_program(&program);
    index.set_ready(false);
    let scopes = LexicalScopes::new(&program);
    let modules = PathModuleResolver::new(&program);
    let settings = Settings::default();
    let mut ctx = InferContext::new(&program, &scopes, &index, &modules, &settings);

    assert_eq!(ctx.infer(access), Ty::Unknown);
    assert_eq!(ctx.infer(two), Ty::NUMBER);
}
