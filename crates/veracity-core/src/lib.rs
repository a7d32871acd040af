pub mod error;
pub mod grant;
pub mod id;
pub mod record;
pub mod time;
pub mod user;

pub use error::{CoreError, ErrorCategory, Result};
pub use grant::{AccessGrant, AccessLevel, GrantMetadata, GrantRequest, GrantStatus, RecordCategory};
pub use id::{GrantId, RecordId, UserId};
pub use record::{Attachment, MedicalRecord, Medication, RecordDraft, RecordMetadata, RecordPatch};
pub use time::{Timestamp, now_utc};
pub use user::{Role, User, UserPatch};
