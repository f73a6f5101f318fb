use zeroize::Zeroizing;

use crate::{
    dir::DirectoryUrl,
    error::{Error, Result},
};

mod account_key;

pub use self::account_key::{AccountKey, KeyMaterial};

/// Account with an ACME provider.
///
/// An account consists of a contact email address, a private key for signing requests to the ACME
/// API and the directory of the provider. All of them are fixed at construction.
///
/// Whether the account is registered is state held by the ACME provider, not by this type. See
/// [`Manager::register()`].
///
/// This library uses elliptic curve P-256 for accessing the account.
///
/// [`Manager::register()`]: crate::Manager::register()
#[derive(Debug, Clone)]
pub struct Account {
    contact_email: String,
    key: AccountKey,
    directory_url: DirectoryUrl,
}

impl Account {
    /// Validates the account parameters.
    ///
    /// Fails with the first violated requirement, in order: a contact email must be given, the
    /// terms of service must be accepted and a valid private key must be supplied. No request is
    /// made to the ACME provider.
    pub fn new(
        contact_email: Option<&str>,
        agree_terms: bool,
        key: impl Into<KeyMaterial>,
        directory_url: DirectoryUrl,
    ) -> Result<Self> {
        let contact_email = contact_email
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or(Error::MissingContactEmail)?;

        if !agree_terms {
            return Err(Error::TermsNotAccepted);
        }

        let key = AccountKey::from_material(key.into())?.ok_or(Error::MissingPrivateKey)?;

        Ok(Account {
            contact_email: contact_email.to_owned(),
            key,
            directory_url,
        })
    }

    pub fn contact_email(&self) -> &str {
        &self.contact_email
    }

    /// The `mailto:` contact URLs sent on registration.
    pub fn contact(&self) -> Vec<String> {
        contact_for(&self.contact_email)
    }

    pub fn key(&self) -> &AccountKey {
        &self.key
    }

    /// Private key for this account.
    ///
    /// The key is an elliptic curve private key.
    pub fn private_key_pem(&self) -> eyre::Result<Zeroizing<String>> {
        self.key.to_pem()
    }

    pub fn directory_url(&self) -> &DirectoryUrl {
        &self.directory_url
    }
}

pub(crate) fn contact_for(email: &str) -> Vec<String> {
    vec![format!("mailto:{email}")]
}
