//! SCIM reconciliation engine
//!
//! Converges a SCIM 2.0 target directory to an authoritative identity
//! source. A run populates the source, loads the target and then executes
//! three phases in order:
//!
//! 1. groups: correlate by `externalId`, then case-folded name, then
//!    positionally; patch, create or delete,
//! 2. users: correlate by case-folded email; patch, create or delete,
//! 3. membership: one combined add/remove patch per matched user.
//!
//! Deletions are governed by [`DestructiveMode`]. When the source reports
//! partial load errors the run is forced into safe mode.
//!
//! # Example
//!
//! ```no_run
//! use scimsync_core::{IdentitySource, ScimSync, SyncSettings, TargetDirectory};
//!
//! # async fn example<S: IdentitySource, T: TargetDirectory>(source: S, target: T)
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! let mut sync = ScimSync::new(source, target, SyncSettings::default());
//! let stat = sync.sync().await?;
//! print!("{stat}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fold;
pub mod model;
pub mod policy;
pub mod reconcile;
pub mod stat;
pub mod sync;
pub mod traits;

pub use error::{RequestError, SyncError, SyncResult};
pub use model::{
    GroupPatch, MembershipPatch, NewGroup, NewUser, ResourceKind, SourceGroup, SourceUser,
    TargetGroup, TargetRecord, TargetUser, UserPatch,
};
pub use policy::{DestructiveMode, SyncSettings};
pub use reconcile::TargetState;
pub use stat::{PhaseLog, SyncStat};
pub use sync::ScimSync;
pub use traits::{IdentitySource, TargetDirectory};
