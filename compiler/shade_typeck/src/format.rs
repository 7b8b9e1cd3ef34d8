//! Human-readable renderings of types, values, and signatures for
//! diagnostics.

use shade_ast::DeclKind;
use shade_types::{DeclRef, IntVal, Type, Val};

use crate::checker::SemanticsVisitor;
use crate::overload::OverloadResolveContext;

impl SemanticsVisitor<'_> {
    pub(crate) fn type_string(&self, ty: &Type) -> String {
        match ty {
            Type::Scalar(s) => s.name().to_owned(),
            Type::Error => "error".to_owned(),
            Type::DeclRef(dr) => self.decl_ref_string(dr),
            Type::GenericDeclRef(dr) => self.decl_ref_string(dr),
            Type::Vector { elem, count } => format!(
                "vector<{}, {}>",
                self.type_string(elem),
                self.int_val_string(count)
            ),
            Type::Matrix { elem, rows, cols } => format!(
                "matrix<{}, {}, {}>",
                self.type_string(elem),
                self.int_val_string(rows),
                self.int_val_string(cols)
            ),
            Type::Array { elem, count } => match count {
                Some(count) => {
                    format!("{}[{}]", self.type_string(elem), self.int_val_string(count))
                }
                None => format!("{}[]", self.type_string(elem)),
            },
            Type::PtrLike { elem } => format!("ptr<{}>", self.type_string(elem)),
            Type::Func { params, ret } => {
                let params: Vec<String> =
                    params.iter().map(|p| self.type_string(&p.ty)).collect();
                format!("({}) -> {}", params.join(", "), self.type_string(ret))
            }
            Type::TypeType(inner) => format!("type<{}>", self.type_string(inner)),
            Type::Overloaded => "<overloaded>".to_owned(),
            Type::InitializerList => "{...}".to_owned(),
        }
    }

    pub(crate) fn int_val_string(&self, val: &IntVal) -> String {
        match val {
            IntVal::Const(v) => v.to_string(),
            IntVal::GenericParam(decl) => {
                self.interner.lookup(self.arena.decl(*decl).name).to_owned()
            }
        }
    }

    pub(crate) fn val_string(&self, val: &Val) -> String {
        match val {
            Val::Type(ty) => self.type_string(ty),
            Val::Int(v) => self.int_val_string(v),
        }
    }

    fn decl_ref_string(&self, dr: &DeclRef) -> String {
        let mut text = String::new();
        self.format_decl_path(&mut text, dr);
        text
    }

    fn format_decl_path(&self, out: &mut String, dr: &DeclRef) {
        let decl = self.arena.decl(dr.decl);

        // When the immediate parent is the generic wrapper, path through
        // to the declaration above it.
        let mut parent = decl.parent;
        let mut parent_generic = None;
        if let Some(p) = parent {
            if matches!(self.arena.decl(p).kind, DeclKind::Generic(_)) {
                parent_generic = Some(p);
                parent = self.arena.decl(p).parent;
            }
        }

        if let Some(p) = parent {
            if self.arena.decl(p).kind.as_agg().is_some() {
                self.format_decl_path(out, &DeclRef { decl: p, subst: dr.subst.clone() });
                out.push('.');
            }
        }

        out.push_str(self.interner.lookup(decl.name));

        // Print the generic arguments when the reference is specialized.
        if let (Some(generic), Some(subst)) = (parent_generic, dr.subst.as_deref()) {
            if subst.generic == generic {
                out.push('<');
                let mut first = true;
                for arg in &subst.args {
                    if !first {
                        out.push_str(", ");
                    }
                    out.push_str(&self.val_string(&arg.val));
                    first = false;
                }
                out.push('>');
            }
        }
    }

    /// `Name(T1, T2)` for callables, `Name<T, int N>` for generics.
    pub(crate) fn decl_signature_string(&self, dr: &DeclRef) -> String {
        let mut text = self.decl_ref_string(dr);
        match &self.arena.decl(dr.decl).kind {
            DeclKind::Func(_) | DeclKind::Constructor(_) | DeclKind::Subscript(_) => {
                let params = self.callable_params(dr.decl);
                text.push('(');
                let mut first = true;
                for param in params {
                    if !first {
                        text.push_str(", ");
                    }
                    let (ty, _, _) = self.param_info(param);
                    text.push_str(&self.type_string(&ty.apply_chain(dr.subst.as_ref())));
                    first = false;
                }
                text.push(')');
            }
            DeclKind::Generic(g) => {
                let inner = g.inner;
                text.push('<');
                let mut first = true;
                for &member in self.arena.members(dr.decl) {
                    match &self.arena.decl(member).kind {
                        DeclKind::GenericTypeParam(_) => {
                            if !first {
                                text.push_str(", ");
                            }
                            text.push_str(self.interner.lookup(self.arena.decl(member).name));
                            first = false;
                        }
                        DeclKind::GenericValueParam(v) => {
                            if !first {
                                text.push_str(", ");
                            }
                            text.push_str(&self.type_string(&v.ty.ty_or_error()));
                            text.push(' ');
                            text.push_str(self.interner.lookup(self.arena.decl(member).name));
                            first = false;
                        }
                        _ => {}
                    }
                }
                text.push('>');
                let inner_sig =
                    self.decl_signature_string(&DeclRef { decl: inner, subst: dr.subst.clone() });
                // Drop the path prefix the recursion re-prints.
                if let Some(paren) = inner_sig.find('(') {
                    text.push_str(&inner_sig[paren..]);
                }
            }
            _ => {}
        }
        text
    }

    /// The `(T1, T2, ...)` rendering of a call's argument types.
    pub(crate) fn call_signature_string(&self, ctx: &OverloadResolveContext) -> String {
        let mut text = String::from("(");
        for i in 0..ctx.arg_count() {
            if i != 0 {
                text.push_str(", ");
            }
            let ty = ctx.arg_type_with(self.arena, i);
            text.push_str(&self.type_string(&ty));
        }
        text.push(')');
        text
    }
}
