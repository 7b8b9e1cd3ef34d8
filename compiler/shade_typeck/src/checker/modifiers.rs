//! The modifier-checking pass.
//!
//! Runs last, after everything is fully checked: each unchecked attribute
//! either rewrites into its typed form or stays as parsed.

use shade_ast::Modifier;
use shade_types::DeclId;

use crate::checker::SemanticsVisitor;
use crate::error::CheckResult;

impl SemanticsVisitor<'_> {
    /// Re-check a declaration's modifier list, replacing entries with
    /// their checked forms where applicable.
    pub(crate) fn check_modifiers(&mut self, decl: DeclId) -> CheckResult<()> {
        let modifiers = std::mem::take(&mut self.arena.decl_mut(decl).modifiers);
        let mut checked = Vec::with_capacity(modifiers.len());
        for modifier in modifiers {
            if let Some(modifier) = self.check_modifier(modifier, decl)? {
                checked.push(modifier);
            }
        }
        self.arena.decl_mut(decl).modifiers = checked;
        Ok(())
    }

    fn check_modifier(
        &mut self,
        modifier: Modifier,
        _decl: DeclId,
    ) -> CheckResult<Option<Modifier>> {
        let Modifier::UncheckedAttribute { name, ref args } = modifier else {
            // Most modifiers arrive already checked.
            return Ok(Some(modifier));
        };

        if self.interner.lookup(name) == "numthreads" {
            // `[numthreads(x, y, z)]` wants three integer constants.
            if args.len() != 3 {
                return Ok(Some(modifier));
            }
            let args = args.clone();
            let x = self.check_constant_int_val(args[0])?;
            let y = self.check_constant_int_val(args[1])?;
            let z = self.check_constant_int_val(args[2])?;
            let (Some(x), Some(y), Some(z)) = (x, y, z) else {
                return Ok(Some(modifier));
            };
            return Ok(Some(Modifier::NumThreads { x, y, z }));
        }

        Ok(Some(modifier))
    }
}
