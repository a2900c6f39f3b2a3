use super::*;
use crate::builder::ProgramBuilder;

fn program_with(paths: &[&str]) -> Program {
    let mut b = ProgramBuilder::new();
    for path in paths {
        b.add_file(path, vec![]);
    }
    b.build()
}

#[test]
fn dotted_path_maps_to_file() {
    let program = program_with(&["src/main.lua", "src/net/http.lua"]);
    let modules = PathModuleResolver::new(&program);

    assert_eq!(modules.resolve_imported_file("net.http"), Some(FileId(1)));
    assert_eq!(modules.resolve_imported_file("net.http.lua"), Some(FileId(1)));
    assert_eq!(modules.resolve_imported_file("http"), Some(FileId(1)));
}

#[test]
fn package_falls_back_to_init() {
    let program = program_with(&["lib/json/init.lua"]);
    let modules = PathModuleResolver::new(&program);

    assert_eq!(modules.resolve_imported_file("json"), Some(FileId(0)));
}

#[test]
fn suffix_must_start_at_a_path_segment() {
    let program = program_with(&["src/myhttp.lua"]);
    let modules = PathModuleResolver::new(&program);

    assert_eq!(modules.resolve_imported_file("http"), None);
    assert_eq!(NoModules.resolve_imported_file("myhttp"), None);
}
