//! Selecting exactly one binding from a catalog.

use crate::catalog::{ServiceBinding, ServiceBindingCatalog};
use crate::error::{BindingError, Result};

/// Select the binding with the given name.
///
/// A name shared by several bindings is rejected rather than resolved to
/// whichever comes first.
pub fn select_by_name<'a>(catalog: &'a ServiceBindingCatalog, name: &str) -> Result<&'a ServiceBinding> {
    let mut matches = catalog.bindings().filter(|binding| binding.name == name);

    let first = matches.next().ok_or_else(|| BindingError::BindingNotFound {
        name: name.to_string(),
    })?;

    let extra = matches.count();
    if extra > 0 {
        return Err(BindingError::DuplicateBindingName {
            name: name.to_string(),
            count: extra + 1,
        });
    }

    Ok(first)
}

/// Select the single binding accepted by `predicate`.
pub fn select_by_predicate<'a, P>(catalog: &'a ServiceBindingCatalog, predicate: P) -> Result<&'a ServiceBinding>
where
    P: Fn(&ServiceBinding) -> bool,
{
    let candidates: Vec<&ServiceBinding> = catalog.bindings().filter(|b| predicate(b)).collect();

    match candidates.as_slice() {
        [] => Err(BindingError::NoCompatibleBinding),
        [single] => Ok(*single),
        many => Err(BindingError::AmbiguousBinding {
            candidates: many.iter().map(|b| b.name.clone()).collect(),
        }),
    }
}

/// Predicate accepting bindings tagged with `tag`, ignoring case.
pub fn has_tag(tag: &str) -> impl Fn(&ServiceBinding) -> bool + Send + Sync + 'static {
    let tag = tag.to_string();
    move |binding| binding.has_tag(&tag)
}
