pub mod activity;
pub mod link;
pub mod record;
pub mod status;

pub use activity::{ActivityButton, ActivityPayload};
pub use link::ConnectionState;
pub use record::{DisplayRecord, PLACEHOLDER_IMAGE_URL};
pub use status::{classify, StatusKind};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
