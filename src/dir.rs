use serde::Deserialize;

const LETSENCRYPT_URL: &str = "https://acme-v02.api.letsencrypt.org/directory";
const LETSENCRYPT_STAGING_URL: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

/// Enumeration of known ACME API directories.
///
/// Deserializes from `"production"`, `"staging"` or a directory URL. Any other value selects the
/// staging directory, so that only an explicit `"production"` reaches the rate limited API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum DirectoryUrl {
    /// The main Let's Encrypt directory.
    ///
    /// Not appropriate for testing / development.
    LetsEncrypt,

    /// The staging Let's Encrypt directory.
    ///
    /// Use for testing and development. Doesn't issue "valid" certificates. The root signing
    /// certificate is not supposed to be in any trust chains.
    #[default]
    LetsEncryptStaging,

    /// Provide an arbitrary directory URL to connect to.
    Other(String),
}

impl DirectoryUrl {
    pub fn to_url(&self) -> &str {
        match self {
            DirectoryUrl::LetsEncrypt => LETSENCRYPT_URL,
            DirectoryUrl::LetsEncryptStaging => LETSENCRYPT_STAGING_URL,
            DirectoryUrl::Other(url) => url,
        }
    }
}

impl From<String> for DirectoryUrl {
    fn from(name: String) -> Self {
        match name.trim() {
            "production" => DirectoryUrl::LetsEncrypt,
            url if url.starts_with("https://") || url.starts_with("http://") => {
                DirectoryUrl::Other(url.to_owned())
            }
            _ => DirectoryUrl::LetsEncryptStaging,
        }
    }
}
