//! Credential extraction for config server URIs
//!
//! A configured server URI may embed `user:password@` userinfo, and the client may
//! also carry explicit credentials. This module decides which ones win and returns
//! a credential-stripped URI suitable for logging and request construction.

mod resolver;

pub use resolver::{
    resolve, resolve_at, strip_userinfo, CredentialError, CredentialResult, Credentials,
    DEFAULT_USERNAME,
};
