//! Reserved and well-known words of the scripting language.

/// Implicit receiver of colon-defined methods.
pub const WORD_SELF: &str = "self";

/// The global environment table.
pub const WORD_G: &str = "_G";

pub const WORD_NIL: &str = "nil";

/// Name of the universal table/object class.
pub const WORD_TABLE: &str = "table";

/// Name of the class holding standard-library string methods.
pub const WORD_STRING: &str = "string";

/// Key of the synthetic global type for a global variable.
///
/// `_G` keeps its own name; every other global `foo` is stored as `$foo`.
pub fn global_type_name(var: &str) -> String {
    if var == WORD_G {
        var.to_string()
    } else {
        format!("${var}")
    }
}
