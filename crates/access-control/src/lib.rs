//! access-control: role-gated operator login
//!
//! Every operator is assigned one verbosity tier and may only start a
//! session at that tier.

mod error;
pub use error::{CredentialError, LoginError};

mod store;
pub use store::{
    load_credentials_file, CredentialFile, CredentialStore, Session, UserRecord,
};
