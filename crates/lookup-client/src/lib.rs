pub mod client;
pub mod error;

use std::future::Future;

use titlecast_core::{DisplayRecord, StatusKind};

pub use client::LookupClient;
pub use error::LookupError;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// External metadata lookup for one classified status key.
pub trait TitleLookup {
    fn lookup(
        &self,
        kind: StatusKind,
        key: &str,
    ) -> impl Future<Output = Result<DisplayRecord, LookupError>> + Send;
}
