pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod reference;
pub mod time;

pub use dispatch::{PublishError, UpdateReceiver, UpdateSender, update_channel};
pub use envelope::{TimestampSource, UpdateEnvelope};
pub use error::{CoreError, Result};
pub use extract::{ExtractionError, TimestampFallback, UpdateExtractor, WatchRule};
pub use reference::{RecordReference, UnresolvableReference, parse_reference};
pub use time::{EventInstant, now_utc};
