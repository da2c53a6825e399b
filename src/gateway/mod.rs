//! Session facade: builder, gateway and merged record sets.

mod builder;
mod record_set;
mod session;

pub use builder::{Paddock, PaddockBuilder};
pub use record_set::{DatasetSlot, SessionRecordSet};
pub use session::SessionGateway;
