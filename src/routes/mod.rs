use serde::Serialize;

mod admin;
mod health_check;
mod subscribe_form;
mod subscriptions;

pub use admin::*;
pub use health_check::*;
pub use subscribe_form::*;
pub use subscriptions::*;

/// `{"success": ..., "data": ...}`, the shape every JSON endpoint answers
/// with
#[derive(Serialize, Debug)]
pub struct JsonEnvelope<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> JsonEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }

    pub fn err(data: T) -> Self {
        Self {
            success: false,
            data,
        }
    }
}

/// Walk the `source` chain of an error, one cause per line. Used for the
/// `Debug` impls of error types, which end up in the logs.
pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
