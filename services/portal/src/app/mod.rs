//! services/portal/src/app/mod.rs
//!
//! The portal's application layer: the repositories that enforce the per-entity
//! rules, the session state machine, bulk intake and import, and the shared state
//! that wires them together.

pub mod accounts;
pub mod documents;
pub mod import;
pub mod intake;
pub mod preferences;
pub mod session;
pub mod state;

pub use accounts::AccountRepository;
pub use documents::{DocumentFacets, DocumentQuery, DocumentRepository};
pub use import::{AccountImport, ImportPlan, ImportRow, RowError, RowValidation};
pub use intake::{FileIntake, IncomingFile, IntakeJob, IntakeOutcome, IntakeProgress, IntakeReport};
pub use preferences::Preferences;
pub use session::SessionService;
pub use state::{PortalOverview, PortalState};
