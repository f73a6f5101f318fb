use der::pem::LineEnding;
use pkcs8::{DecodePrivateKey as _, EncodePrivateKey as _};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Key material supplied when constructing an [`Account`](crate::Account).
#[derive(Debug, Clone)]
pub enum KeyMaterial {
    /// An already parsed P-256 signing key.
    Key(p256::ecdsa::SigningKey),

    /// A PEM encoded P-256 private key, either PKCS #8 (`PRIVATE KEY`) or SEC1
    /// (`EC PRIVATE KEY`).
    Pem(String),

    /// No key was supplied.
    Absent,
}

impl From<p256::ecdsa::SigningKey> for KeyMaterial {
    fn from(key: p256::ecdsa::SigningKey) -> Self {
        KeyMaterial::Key(key)
    }
}

impl From<String> for KeyMaterial {
    fn from(pem: String) -> Self {
        KeyMaterial::Pem(pem)
    }
}

impl From<&str> for KeyMaterial {
    fn from(pem: &str) -> Self {
        KeyMaterial::Pem(pem.to_owned())
    }
}

impl<T: Into<KeyMaterial>> From<Option<T>> for KeyMaterial {
    fn from(key: Option<T>) -> Self {
        key.map_or(KeyMaterial::Absent, Into::into)
    }
}

/// Private key identifying an account with the ACME provider.
#[derive(Clone, Debug)]
pub struct AccountKey {
    signing_key: p256::ecdsa::SigningKey,
}

impl AccountKey {
    /// Parses `material`, returning `None` when no key was supplied.
    pub(crate) fn from_material(material: KeyMaterial) -> Result<Option<AccountKey>> {
        match material {
            KeyMaterial::Key(signing_key) => Ok(Some(Self::from_key(signing_key))),
            KeyMaterial::Pem(pem) => Self::from_pem(&pem).map(Some),
            KeyMaterial::Absent => Ok(None),
        }
    }

    pub(crate) fn from_pem(pem: &str) -> Result<AccountKey> {
        let signing_key = p256::ecdsa::SigningKey::from_pkcs8_pem(pem)
            .ok()
            .or_else(|| {
                p256::SecretKey::from_sec1_pem(pem)
                    .ok()
                    .map(p256::ecdsa::SigningKey::from)
            })
            .ok_or(Error::InvalidPrivateKeyFormat)?;

        Ok(Self::from_key(signing_key))
    }

    fn from_key(signing_key: p256::ecdsa::SigningKey) -> AccountKey {
        AccountKey { signing_key }
    }

    /// The key as a PKCS #8 PEM document.
    pub fn to_pem(&self) -> eyre::Result<Zeroizing<String>> {
        self.signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|err| eyre::eyre!("private_key_to_pem: {err}"))
    }

    pub fn signing_key(&self) -> &p256::ecdsa::SigningKey {
        &self.signing_key
    }
}
