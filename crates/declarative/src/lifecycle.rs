//! Lifecycle driver
//!
//! Runs one reconciler operation and commits the outcome to a
//! [`ResourceData`]. On failure the record is left exactly as it was.

use crate::context::ApplyContext;
use crate::diagnostics::Diagnostics;
use crate::reconciler::{Observed, Reconciler, ResourceData};

/// Create the resource and record its identity
pub fn create<R: Reconciler>(
    reconciler: &R,
    ctx: &ApplyContext<'_, R::Client>,
    data: &mut ResourceData<R::State>,
    desired: &R::State,
) -> Diagnostics {
    match reconciler.create(ctx, desired) {
        Ok((id, state)) => {
            log::info!("Created {} {id}", reconciler.type_name());
            data.mark_present(id, state);
            Diagnostics::new()
        }
        Err(e) => Diagnostics::from_error(&e),
    }
}

/// Refresh the record from remote state
///
/// A resource found gone transitions to Absent without an error.
pub fn read<R: Reconciler>(
    reconciler: &R,
    ctx: &ApplyContext<'_, R::Client>,
    data: &mut ResourceData<R::State>,
) -> Diagnostics {
    let Some(id) = data.id().map(str::to_string) else {
        return Diagnostics::new();
    };

    match reconciler.read(ctx, &id, data.state()) {
        Ok(Observed::Present(state)) => {
            data.refresh(state);
            Diagnostics::new()
        }
        Ok(Observed::Absent) => {
            log::info!(
                "{} {id} no longer exists remotely",
                reconciler.type_name()
            );
            data.mark_absent();
            Diagnostics::new()
        }
        Err(e) => Diagnostics::from_error(&e),
    }
}

/// Update mutable attributes in place
pub fn update<R: Reconciler>(
    reconciler: &R,
    ctx: &ApplyContext<'_, R::Client>,
    data: &mut ResourceData<R::State>,
    desired: &R::State,
) -> Diagnostics {
    let Some(id) = data.id().map(str::to_string) else {
        return create(reconciler, ctx, data, desired);
    };

    match reconciler.update(ctx, &id, data.state(), desired) {
        Ok(state) => {
            log::info!("Updated {} {id}", reconciler.type_name());
            data.refresh(state);
            Diagnostics::new()
        }
        Err(e) => Diagnostics::from_error(&e),
    }
}

/// Delete the resource and clear its identity
pub fn delete<R: Reconciler>(
    reconciler: &R,
    ctx: &ApplyContext<'_, R::Client>,
    data: &mut ResourceData<R::State>,
) -> Diagnostics {
    let Some(id) = data.id().map(str::to_string) else {
        return Diagnostics::new();
    };

    match reconciler.delete(ctx, &id, data.state()) {
        Ok(()) => {
            log::info!("Deleted {} {id}", reconciler.type_name());
            data.mark_absent();
            Diagnostics::new()
        }
        Err(e) => Diagnostics::from_error(&e),
    }
}

/// Build a record from an external identity, then refresh it
pub fn import<R: Reconciler>(
    reconciler: &R,
    ctx: &ApplyContext<'_, R::Client>,
    id: &str,
) -> Result<ResourceData<R::State>, Diagnostics> {
    let state = reconciler.import(id).map_err(|e| Diagnostics::from_error(&e))?;
    let mut data = ResourceData::present(id, state);

    let diags = read(reconciler, ctx, &mut data);
    if diags.has_errors() {
        return Err(diags);
    }
    Ok(data)
}
