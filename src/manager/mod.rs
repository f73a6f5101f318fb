//! Orchestration of an account's certificate workflow.
//!
//! 1. Register the account once, see [`Manager::register()`].
//! 2. Prove control over each domain, see [`Manager::authorize_for_domain()`].
//! 3. Request the certificate for the authorized domains, see [`Manager::issue_certificate()`].

use crate::{
    acc::{contact_for, Account},
    api,
    client::{AcmeClient, AcmeConnector},
    dns::{DnsResolver, DohResolver},
    error::{ClientError, Result},
};

mod authorize;
mod issue;

pub use self::authorize::{AuthorizeOptions, Authorized, DEFAULT_WEB_ROOT};
pub use self::issue::DEFAULT_SSL_PATH;

/// Outcome of a successful [`Manager::register()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new account was created for the key.
    Created,

    /// The key already belonged to an account.
    AlreadyExists,
}

impl Registration {
    pub fn is_created(&self) -> bool {
        matches!(self, Registration::Created)
    }
}

/// Drives domain authorization and certificate issuance for one [`Account`].
///
/// The manager exclusively owns the client session with the ACME provider. Workflows for several
/// domains through one manager are therefore serialized; use one manager per concurrent workflow.
pub struct Manager<C, R = DohResolver> {
    account: Account,
    client: C,
    resolver: R,
}

impl<C: AcmeClient> Manager<C> {
    /// Creates a manager over an already connected client, resolving `dns-01` records through
    /// [`DohResolver`].
    pub fn new(account: Account, client: C) -> Self {
        Manager {
            account,
            client,
            resolver: DohResolver::default(),
        }
    }

    /// Connects to the account's ACME directory and registers the account unless
    /// `skip_register` is set.
    pub async fn connect<K>(account: Account, connector: &K, skip_register: bool) -> Result<Self>
    where
        K: AcmeConnector<Client = C>,
    {
        let client = connector.new_account(account.key(), account.directory_url().to_url())?;
        let mut manager = Manager::new(account, client);

        if !skip_register {
            let email = manager.account.contact_email().to_owned();
            manager.register(&email).await?;
        }

        Ok(manager)
    }
}

impl<C, R> Manager<C, R> {
    /// Replaces the resolver used to wait for `dns-01` records.
    pub fn with_resolver<R2: DnsResolver>(self, resolver: R2) -> Manager<C, R2> {
        Manager {
            account: self.account,
            client: self.client,
            resolver,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }
}

impl<C: AcmeClient, R> Manager<C, R> {
    /// Registers the account key with `email` as contact, agreeing to the terms of service.
    ///
    /// Registering a key that already belongs to an account is not an error and yields
    /// [`Registration::AlreadyExists`]. Every other refusal is returned as is.
    pub async fn register(&mut self, email: &str) -> Result<Registration> {
        let payload = api::Account::registration(contact_for(email));

        log::debug!(
            "Register {email} with {}",
            self.account.directory_url().to_url()
        );

        match self.client.register(&payload).await {
            Ok(api_account) => {
                log::info!(
                    "Registered account for {email} (valid: {})",
                    api_account.is_status_valid()
                );
                Ok(Registration::Created)
            }

            Err(ClientError::Problem(problem)) if problem.is_account_key_in_use() => {
                log::debug!("Account key is already registered");
                Ok(Registration::AlreadyExists)
            }

            Err(err) => Err(err.into()),
        }
    }
}
