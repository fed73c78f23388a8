pub mod domain;
pub mod filename;
pub mod ports;

pub use domain::{
    Account, AccountPatch, AccountProfile, AccountUpdate, Document, NewAccount, NewDocument,
    Role, SessionState,
};
pub use filename::{parse_filename, FilenameError, FilenameField, ParsedFilename};
pub use ports::{
    AccountStore, DocumentStore, InsertOutcome, PortError, PortResult, PreferenceStore,
    SecretHasher, SessionStore,
};
