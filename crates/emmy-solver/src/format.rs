//! Human-readable rendering of types, in doc-annotation syntax.

use crate::class::{ClassOrigin, ClassTy};
use crate::types::{FunctionTy, PrimitiveKind, Signature, Ty};
use std::fmt::{self, Display, Formatter, Write};

impl Display for Ty {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Unknown => f.write_str("any"),
            Ty::Invalid => f.write_str("invalid"),
            Ty::Primitive(kind) => f.write_str(kind.as_str()),
            Ty::Class(class) => class.fmt(f),
            Ty::Union(union) => write_joined(f, union.members(), "|"),
            Ty::Generic(generic) => {
                write!(f, "{}<", generic.base)?;
                write_joined(f, &generic.args, ", ")?;
                f.write_char('>')
            }
            Ty::Function(func) => func.fmt(f),
            Ty::Array(element) => match **element {
                Ty::Union(_) | Ty::Function(_) => write!(f, "({element})[]"),
                _ => write!(f, "{element}[]"),
            },
            Ty::Tuple(items) => {
                f.write_char('(')?;
                write_joined(f, items, ", ")?;
                f.write_char(')')
            }
        }
    }
}

impl Display for ClassTy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.origin() {
            ClassOrigin::Table { .. } => f.write_str("table"),
            ClassOrigin::DocTable { fields } => {
                f.write_str("{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.ty)?;
                }
                f.write_str(" }")
            }
            ClassOrigin::Named if self.is_global() || self.is_anonymous() => {
                f.write_str(self.var_name())
            }
            ClassOrigin::Named => f.write_str(self.name()),
        }
    }
}

impl Display for FunctionTy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.main.fmt(f)
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("fun(")?;
        let mut first = true;
        for param in &self.params {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}: {}", param.name, param.ty)?;
        }
        if let Some(vararg) = &self.vararg {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "...: {vararg}")?;
        }
        f.write_char(')')?;
        match &self.ret {
            Ty::Unknown | Ty::Primitive(PrimitiveKind::Void) => Ok(()),
            ret => write!(f, ": {ret}"),
        }
    }
}

fn write_joined(f: &mut Formatter<'_>, items: &[Ty], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../tests/format_tests.rs"]
mod tests;
