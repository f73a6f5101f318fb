//! Capabilities consumed from an ACME protocol client.
//!
//! Nonce handling, request signing and the HTTP transport to the ACME provider live behind these
//! traits. [`Manager`](crate::Manager) only orchestrates them.

use async_trait::async_trait;

use crate::{acc::AccountKey, api, error::ClientError};

/// Creates an authenticated client session for an account key against an ACME directory.
pub trait AcmeConnector {
    type Client: AcmeClient;

    /// Sets up a client signing its requests with `key`, talking to the directory at
    /// `directory_url`.
    ///
    /// Must not register the account; that is done through [`AcmeClient::register()`].
    fn new_account(
        &self,
        key: &AccountKey,
        directory_url: &str,
    ) -> Result<Self::Client, ClientError>;
}

/// An authenticated session with an ACME provider.
///
/// A session is owned exclusively by one [`Manager`](crate::Manager); methods take `&mut self`
/// so that no two workflows drive the same session concurrently.
#[async_trait]
pub trait AcmeClient: Send {
    /// Posts a newAccount request.
    ///
    /// An account key that is already bound to an account is reported as a malformed problem with
    /// the detail "Registration key is already in use".
    async fn register(&mut self, account: &api::Account) -> Result<api::Account, ClientError>;

    /// Requests a fresh authorization for `domain`.
    async fn authorize(&mut self, domain: &str) -> Result<api::Authorization, ClientError>;

    /// Tells the ACME provider that the challenge at `challenge_url` is ready to be checked.
    async fn request_verification(&mut self, challenge_url: &str) -> Result<(), ClientError>;

    /// Fetches the current status of the challenge at `challenge_url`.
    async fn challenge_status(
        &mut self,
        challenge_url: &str,
    ) -> Result<api::ChallengeStatus, ClientError>;

    /// Submits a DER encoded CSR and returns the issued certificate chain as PEM, leaf first.
    async fn new_certificate(&mut self, csr_der: &[u8]) -> Result<String, ClientError>;
}
