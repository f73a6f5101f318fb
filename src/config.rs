//! Account settings, optionally completed from the environment.

use serde::Deserialize;

use crate::{
    acc::{Account, KeyMaterial},
    dir::DirectoryUrl,
    error::Result,
};

/// Environment variable holding the contact email.
pub const CONTACT_EMAIL_ENV: &str = "ACME_CONTACT_EMAIL";

/// Environment variable holding the PEM encoded account key.
pub const PRIVATE_KEY_ENV: &str = "ACME_ACCOUNT_PRIVATE_KEY";

/// Alternative name of [`CONTACT_EMAIL_ENV`], read when that is unset.
pub const ALT_CONTACT_EMAIL_ENV: &str = "LESSL_CONTACT_EMAIL";

/// Alternative name of [`PRIVATE_KEY_ENV`], read when that is unset.
pub const ALT_PRIVATE_KEY_ENV: &str = "LESSL_CLIENT_PRIVATE_KEY";

/// Deprecated name of [`CONTACT_EMAIL_ENV`].
pub const DEPRECATED_CONTACT_EMAIL_ENV: &str = "CERT_ACCOUNT_EMAIL";

/// Deprecated name of [`PRIVATE_KEY_ENV`].
pub const DEPRECATED_PRIVATE_KEY_ENV: &str = "CERT_ACCOUNT_PRIVATE_KEY";

/// Parameters of an ACME account.
///
/// ```
/// let settings: acme_issuer::Settings = serde_json::from_str(r#"{
///     "email": "admin@example.com",
///     "agree_terms": true,
///     "endpoint": "production"
/// }"#).unwrap();
///
/// assert_eq!(settings.endpoint, acme_issuer::DirectoryUrl::LetsEncrypt);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub email: Option<String>,
    pub agree_terms: bool,
    /// PEM encoded P-256 account key.
    pub private_key: Option<String>,
    pub endpoint: DirectoryUrl,
    /// Do not register the account when connecting.
    pub skip_register: bool,
}

impl Settings {
    /// Fills unset values from the process environment.
    ///
    /// See [`Settings::with_env_from()`].
    pub fn with_env(self) -> Self {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    /// Fills unset values through `lookup`.
    ///
    /// Precedence, highest first: the value already set, [`CONTACT_EMAIL_ENV`] /
    /// [`PRIVATE_KEY_ENV`], [`ALT_CONTACT_EMAIL_ENV`] / [`ALT_PRIVATE_KEY_ENV`], then the
    /// deprecated [`DEPRECATED_CONTACT_EMAIL_ENV`] / [`DEPRECATED_PRIVATE_KEY_ENV`]. Empty values
    /// count as unset.
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.email.is_none() {
            self.email = resolve(
                &lookup,
                &[CONTACT_EMAIL_ENV, ALT_CONTACT_EMAIL_ENV],
                DEPRECATED_CONTACT_EMAIL_ENV,
            );
        }

        if self.private_key.is_none() {
            self.private_key = resolve(
                &lookup,
                &[PRIVATE_KEY_ENV, ALT_PRIVATE_KEY_ENV],
                DEPRECATED_PRIVATE_KEY_ENV,
            );
        }

        self
    }

    /// Validates the settings into an [`Account`].
    pub fn account(&self) -> Result<Account> {
        Account::new(
            self.email.as_deref(),
            self.agree_terms,
            KeyMaterial::from(self.private_key.clone()),
            self.endpoint.clone(),
        )
    }
}

fn resolve<F>(lookup: &F, names: &[&str], deprecated: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    let fallback = present(deprecated);
    if fallback.is_some() {
        log::warn!("{deprecated} is deprecated, use {} instead", names.join(" or "));
    }

    names.iter().find_map(|&name| present(name)).or(fallback)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::Error;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();

        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_explicit_value_wins() {
        let settings = Settings {
            email: Some("explicit@example.com".to_owned()),
            ..Default::default()
        }
        .with_env_from(env(&[(CONTACT_EMAIL_ENV, "env@example.com")]));

        assert_eq!(settings.email.as_deref(), Some("explicit@example.com"));
    }

    #[test]
    fn test_current_name_before_deprecated() {
        let settings = Settings::default().with_env_from(env(&[
            (CONTACT_EMAIL_ENV, "new@example.com"),
            (DEPRECATED_CONTACT_EMAIL_ENV, "old@example.com"),
        ]));
        assert_eq!(settings.email.as_deref(), Some("new@example.com"));

        let settings = Settings::default().with_env_from(env(&[
            (CONTACT_EMAIL_ENV, ""),
            (DEPRECATED_CONTACT_EMAIL_ENV, "old@example.com"),
            (DEPRECATED_PRIVATE_KEY_ENV, "PEM"),
        ]));
        assert_eq!(settings.email.as_deref(), Some("old@example.com"));
        assert_eq!(settings.private_key.as_deref(), Some("PEM"));
    }

    #[test]
    fn test_alternative_names() {
        let settings = Settings::default().with_env_from(env(&[
            (ALT_CONTACT_EMAIL_ENV, "alt@example.com"),
            (ALT_PRIVATE_KEY_ENV, "ALT PEM"),
            (DEPRECATED_CONTACT_EMAIL_ENV, "old@example.com"),
            (DEPRECATED_PRIVATE_KEY_ENV, "OLD PEM"),
        ]));
        assert_eq!(settings.email.as_deref(), Some("alt@example.com"));
        assert_eq!(settings.private_key.as_deref(), Some("ALT PEM"));

        let settings = Settings::default().with_env_from(env(&[
            (CONTACT_EMAIL_ENV, "new@example.com"),
            (ALT_CONTACT_EMAIL_ENV, "alt@example.com"),
        ]));
        assert_eq!(settings.email.as_deref(), Some("new@example.com"));
    }

    #[test]
    fn test_nothing_set() {
        let settings = Settings::default().with_env_from(env(&[]));
        assert!(settings.email.is_none());
        assert!(settings.private_key.is_none());
        assert!(matches!(settings.account(), Err(Error::MissingContactEmail)));
    }

    #[test]
    fn test_account_from_settings() {
        let key_pem = crate::test::account().private_key_pem().unwrap();

        let settings: Settings = serde_json::from_str(
            r#"{ "email": "admin@example.com", "agree_terms": true, "skip_register": true }"#,
        )
        .unwrap();
        let settings = settings.with_env_from(env(&[(PRIVATE_KEY_ENV, key_pem.as_str())]));

        assert!(settings.skip_register);
        assert_eq!(settings.endpoint, DirectoryUrl::LetsEncryptStaging);

        let acc = settings.account().unwrap();
        assert_eq!(acc.contact_email(), "admin@example.com");
        assert_eq!(&*acc.private_key_pem().unwrap(), &*key_pem);
    }

    #[test]
    fn test_terms_required() {
        let settings = Settings {
            email: Some("admin@example.com".to_owned()),
            private_key: Some("garbage".to_owned()),
            ..Default::default()
        };

        assert!(matches!(settings.account(), Err(Error::TermsNotAccepted)));
    }
}
