//! Generic parameter inference.
//!
//! Unification collects constraints pinning generic parameters to values;
//! solving walks the parameters in declaration order, combining type
//! constraints with a type join and requiring exact agreement for value
//! constraints. The error type unifies with anything so failures upstream
//! do not cascade into inference diagnostics.

use std::sync::Arc;

use shade_ast::DeclKind;
use shade_types::{DeclId, DeclRef, IntVal, Subst, SubstArg, Type, Val};

use crate::checker::SemanticsVisitor;
use crate::error::CheckResult;

/// One equation: `decl` (a generic parameter) must equal `val`.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub decl: DeclId,
    pub val: Val,
    pub satisfied: bool,
}

/// The set of equations collected while matching a generic against a use
/// site.
#[derive(Clone, Debug, Default)]
pub struct ConstraintSystem {
    pub constraints: Vec<Constraint>,
}

impl ConstraintSystem {
    pub fn new() -> Self {
        ConstraintSystem::default()
    }

    fn add(&mut self, decl: DeclId, val: Val) {
        self.constraints.push(Constraint { decl, val, satisfied: false });
    }
}

impl SemanticsVisitor<'_> {
    fn is_generic_type_param(&self, decl: DeclId) -> bool {
        matches!(self.arena.decl(decl).kind, DeclKind::GenericTypeParam(_))
    }

    fn is_generic_value_param(&self, decl: DeclId) -> bool {
        matches!(self.arena.decl(decl).kind, DeclKind::GenericValueParam(_))
    }

    /// Try to find a unification for two values.
    pub(crate) fn try_unify_vals(
        &mut self,
        system: &mut ConstraintSystem,
        first: &Val,
        second: &Val,
    ) -> CheckResult<bool> {
        match (first, second) {
            (Val::Type(a), Val::Type(b)) => self.try_unify_types(system, a, b),
            (Val::Int(a), Val::Int(b)) => {
                // Two known constants either agree or they don't.
                if let (Some(av), Some(bv)) = (a.as_const(), b.as_const()) {
                    return Ok(av == bv);
                }
                let mut symbolic = false;
                if let IntVal::GenericParam(decl) = a {
                    symbolic = true;
                    if self.is_generic_value_param(*decl) {
                        system.add(*decl, Val::Int(b.clone()));
                    }
                }
                if let IntVal::GenericParam(decl) = b {
                    symbolic = true;
                    if self.is_generic_value_param(*decl) {
                        system.add(*decl, Val::Int(a.clone()));
                    }
                }
                Ok(symbolic)
            }
            // A type against an integer never unifies.
            _ => Ok(false),
        }
    }

    fn try_unify_substs(
        &mut self,
        system: &mut ConstraintSystem,
        first: Option<&Arc<Subst>>,
        second: Option<&Arc<Subst>>,
    ) -> CheckResult<bool> {
        match (first, second) {
            (None, None) => Ok(true),
            (Some(a), Some(b)) => {
                if a.generic != b.generic {
                    return Ok(false);
                }
                // Same generic, so the argument lists are parallel.
                let (a, b) = (a.clone(), b.clone());
                for (arg_a, arg_b) in a.args.iter().zip(b.args.iter()) {
                    if !self.try_unify_vals(system, &arg_a.val, &arg_b.val)? {
                        return Ok(false);
                    }
                }
                self.try_unify_substs(system, a.outer.as_ref(), b.outer.as_ref())
            }
            _ => Ok(false),
        }
    }

    fn unify_type_param(
        &mut self,
        system: &mut ConstraintSystem,
        param: DeclId,
        ty: &Type,
    ) -> bool {
        system.add(param, Val::Type(ty.clone()));
        true
    }

    fn try_unify_structural(
        &mut self,
        system: &mut ConstraintSystem,
        first: &Type,
        second: &Type,
    ) -> CheckResult<bool> {
        match (first, second) {
            (Type::DeclRef(a), Type::DeclRef(b)) => {
                if a.decl != b.decl {
                    return Ok(false);
                }
                let (a, b) = (a.clone(), b.clone());
                self.try_unify_substs(system, a.subst.as_ref(), b.subst.as_ref())
            }
            (
                Type::Vector { elem: elem_a, count: count_a },
                Type::Vector { elem: elem_b, count: count_b },
            ) => {
                let (elem_a, elem_b) = (elem_a.clone(), elem_b.clone());
                let (count_a, count_b) = (count_a.clone(), count_b.clone());
                Ok(self.try_unify_types(system, &elem_a, &elem_b)?
                    && self.try_unify_vals(
                        system,
                        &Val::Int(count_a),
                        &Val::Int(count_b),
                    )?)
            }
            (
                Type::Matrix { elem: elem_a, rows: rows_a, cols: cols_a },
                Type::Matrix { elem: elem_b, rows: rows_b, cols: cols_b },
            ) => {
                let pairs = [
                    (rows_a.clone(), rows_b.clone()),
                    (cols_a.clone(), cols_b.clone()),
                ];
                let (elem_a, elem_b) = (elem_a.clone(), elem_b.clone());
                if !self.try_unify_types(system, &elem_a, &elem_b)? {
                    return Ok(false);
                }
                for (a, b) in pairs {
                    if !self.try_unify_vals(system, &Val::Int(a), &Val::Int(b))? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (
                Type::Array { elem: elem_a, count: count_a },
                Type::Array { elem: elem_b, count: count_b },
            ) => {
                let (elem_a, elem_b) = (elem_a.clone(), elem_b.clone());
                let counts = (count_a.clone(), count_b.clone());
                if !self.try_unify_types(system, &elem_a, &elem_b)? {
                    return Ok(false);
                }
                match counts {
                    (None, None) => Ok(true),
                    (Some(a), Some(b)) => {
                        self.try_unify_vals(system, &Val::Int(a), &Val::Int(b))
                    }
                    _ => Ok(false),
                }
            }
            _ => Ok(false),
        }
    }

    /// Try to find a unification for two types, collecting constraints.
    pub(crate) fn try_unify_types(
        &mut self,
        system: &mut ConstraintSystem,
        first: &Type,
        second: &Type,
    ) -> CheckResult<bool> {
        if first == second {
            return Ok(true);
        }

        // The error type unifies with anything, to avoid cascades.
        if first.is_error() || second.is_error() {
            return Ok(true);
        }

        // A generic type parameter unifies with anything.
        if let Type::DeclRef(dr) = first {
            if self.is_generic_type_param(dr.decl) {
                let param = dr.decl;
                return Ok(self.unify_type_param(system, param, second));
            }
        }
        if let Type::DeclRef(dr) = second {
            if self.is_generic_type_param(dr.decl) {
                let param = dr.decl;
                return Ok(self.unify_type_param(system, param, first));
            }
        }

        if self.try_unify_structural(system, first, second)? {
            return Ok(true);
        }

        // Ad-hoc scalar/vector matching: unify against the element type,
        // so `vector<T, N>` can meet a scalar argument.
        if let (Type::Vector { elem, .. }, Type::Scalar(_)) = (first, second) {
            let elem = elem.clone();
            return self.try_unify_types(system, &elem, second);
        }
        if let (Type::Scalar(_), Type::Vector { elem, .. }) = (first, second) {
            let elem = elem.clone();
            return self.try_unify_types(system, first, &elem);
        }

        Ok(false)
    }

    // ----- joins -----

    fn try_join_vector_and_scalar(
        &mut self,
        elem: &Type,
        count: &IntVal,
        scalar: &Type,
    ) -> CheckResult<Option<Type>> {
        // join(vector<T, N>, S) = vector<join(T, S), N>
        let Some(joined) = self.try_join_types(elem, scalar)? else {
            return Ok(None);
        };
        Ok(Some(Type::Vector { elem: Box::new(joined), count: count.clone() }))
    }

    fn interface_decl_ref(&self, ty: &Type) -> Option<DeclRef> {
        let dr = ty.as_decl_ref()?;
        matches!(self.arena.decl(dr.decl).kind, DeclKind::Interface(_)).then(|| dr.clone())
    }

    /// Does the source type's declaration carry an inheritance edge whose
    /// base resolves to the same interface declaration?
    pub(crate) fn does_type_conform_to_interface(
        &mut self,
        ty: &Type,
        interface: &DeclRef,
    ) -> CheckResult<bool> {
        let Some(dr) = ty.as_decl_ref() else {
            return Ok(false);
        };
        if self.arena.decl(dr.decl).kind.as_agg().is_none() {
            return Ok(false);
        }

        let inheritances = self
            .arena
            .members_where(dr.decl, |d| matches!(d.kind, DeclKind::Inheritance(_)));
        for member in inheritances {
            self.ensure_decl(member, shade_ast::CheckState::Checked)?;
            let base_ty = match &self.arena.decl(member).kind {
                DeclKind::Inheritance(inh) => inh.base.ty_or_error(),
                _ => continue,
            };
            let Some(base_ref) = base_ty.as_decl_ref() else {
                continue;
            };
            if base_ref == interface {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn try_join_type_with_interface(
        &mut self,
        ty: &Type,
        interface: &DeclRef,
    ) -> CheckResult<Option<Type>> {
        if self.does_type_conform_to_interface(ty, interface)? {
            return Ok(Some(ty.clone()));
        }
        Ok(None)
    }

    /// The least upper bound of two types under implicit conversion, or
    /// `None` when they have no join.
    pub(crate) fn try_join_types(
        &mut self,
        left: &Type,
        right: &Type,
    ) -> CheckResult<Option<Type>> {
        if left == right {
            return Ok(Some(left.clone()));
        }

        if let (Type::Scalar(l), Type::Scalar(r)) = (left, right) {
            // The higher-ranked scalar absorbs the other.
            return Ok(Some(if l.rank() > r.rank() { left.clone() } else { right.clone() }));
        }

        if let (Type::Vector { elem, count }, Type::Scalar(_)) = (left, right) {
            let (elem, count) = (elem.clone(), count.clone());
            return self.try_join_vector_and_scalar(&elem, &count, right);
        }
        if let (Type::Scalar(_), Type::Vector { elem, count }) = (left, right) {
            let (elem, count) = (elem.clone(), count.clone());
            return self.try_join_vector_and_scalar(&elem, &count, left);
        }

        if let (
            Type::Vector { elem: left_elem, count: left_count },
            Type::Vector { elem: right_elem, count: right_count },
        ) = (left, right)
        {
            // Vector joins require equal widths.
            if left_count != right_count {
                return Ok(None);
            }
            let (left_elem, right_elem) = (left_elem.clone(), right_elem.clone());
            let count = left_count.clone();
            let Some(joined) = self.try_join_types(&left_elem, &right_elem)? else {
                return Ok(None);
            };
            return Ok(Some(Type::Vector { elem: Box::new(joined), count }));
        }

        // An interface joins with anything that conforms to it.
        if let Some(interface) = self.interface_decl_ref(left) {
            return self.try_join_type_with_interface(right, &interface);
        }
        if let Some(interface) = self.interface_decl_ref(right) {
            return self.try_join_type_with_interface(left, &interface);
        }

        Ok(None)
    }

    // ----- solving -----

    /// Solve a constraint system for the parameters of `generic`,
    /// producing the substitution that satisfies every constraint.
    pub(crate) fn try_solve_constraint_system(
        &mut self,
        system: &mut ConstraintSystem,
        generic: &DeclRef,
    ) -> CheckResult<Option<Arc<Subst>>> {
        // The generic's own type constraints participate in the system.
        let constraint_decls = self
            .arena
            .members_where(generic.decl, |d| matches!(d.kind, DeclKind::GenericConstraint(_)));
        for member in constraint_decls {
            let (sub, sup) = match &self.arena.decl(member).kind {
                DeclKind::GenericConstraint(c) => (c.sub.ty_or_error(), c.sup.ty_or_error()),
                _ => continue,
            };
            let sub = sub.apply_chain(generic.subst.as_ref());
            let sup = sup.apply_chain(generic.subst.as_ref());
            if !self.try_unify_types(system, &sub, &sup)? {
                return Ok(None);
            }
        }

        let members = self.arena.members(generic.decl).to_vec();
        let mut args = Vec::new();
        for member in members {
            match &self.arena.decl(member).kind {
                DeclKind::GenericTypeParam(_) => {
                    let indices: Vec<usize> = system
                        .constraints
                        .iter()
                        .enumerate()
                        .filter(|(_, c)| c.decl == member)
                        .map(|(i, _)| i)
                        .collect();

                    let mut solution: Option<Type> = None;
                    for &index in &indices {
                        let Val::Type(candidate) = system.constraints[index].val.clone() else {
                            continue;
                        };
                        solution = match solution {
                            None => Some(candidate),
                            Some(running) => {
                                match self.try_join_types(&running, &candidate)? {
                                    Some(joined) => Some(joined),
                                    None => return Ok(None),
                                }
                            }
                        };
                    }
                    let Some(ty) = solution else {
                        return Ok(None);
                    };
                    for &index in &indices {
                        system.constraints[index].satisfied = true;
                    }
                    args.push(SubstArg { param: member, val: Val::Type(ty) });
                }
                DeclKind::GenericValueParam(_) => {
                    let mut solution: Option<IntVal> = None;
                    for constraint in system
                        .constraints
                        .iter_mut()
                        .filter(|c| c.decl == member)
                    {
                        let Val::Int(candidate) = &constraint.val else {
                            continue;
                        };
                        match &solution {
                            None => solution = Some(candidate.clone()),
                            // Value constraints require exact agreement.
                            Some(existing) if existing == candidate => {}
                            Some(_) => return Ok(None),
                        }
                        constraint.satisfied = true;
                    }
                    let Some(val) = solution else {
                        return Ok(None);
                    };
                    args.push(SubstArg { param: member, val: Val::Int(val) });
                }
                _ => {}
            }
        }

        // Spurious constraints we could not satisfy fail the system.
        if system.constraints.iter().any(|c| !c.satisfied) {
            return Ok(None);
        }

        Ok(Some(Arc::new(Subst::new(generic.decl, args, generic.subst.clone()))))
    }

    /// Is the candidate extension applicable to `ty`? Returns the
    /// (possibly specialized) reference to the extension when it is.
    pub(crate) fn apply_extension_to_type(
        &mut self,
        ext: DeclId,
        ty: &Type,
    ) -> CheckResult<Option<DeclRef>> {
        let target = match &self.arena.decl(ext).kind {
            DeclKind::Extension(data) => data.target.ty_or_error(),
            _ => return Ok(None),
        };

        let outer_generic = self.arena.decl(ext).parent.filter(|&parent| {
            matches!(self.arena.decl(parent).kind, DeclKind::Generic(_))
        });

        match outer_generic {
            Some(generic) => {
                let mut system = ConstraintSystem::new();
                if !self.try_unify_types(&mut system, &target, ty)? {
                    return Ok(None);
                }
                let generic_ref = DeclRef::new(generic);
                let Some(solution) = self.try_solve_constraint_system(&mut system, &generic_ref)?
                else {
                    return Ok(None);
                };
                // Unification solved for the target, so applying the
                // solution must reproduce the queried type.
                debug_assert_eq!(target.apply(&solution), *ty);
                Ok(Some(DeclRef::with_subst(ext, solution)))
            }
            None => {
                if target == *ty {
                    Ok(Some(DeclRef::new(ext)))
                } else {
                    Ok(None)
                }
            }
        }
    }
}
