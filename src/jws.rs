//! JSON Web Key thumbprints, used to build challenge key authorizations.
//!
//! See [RFC 7638](https://datatracker.ietf.org/doc/html/rfc7638).

use base64::prelude::*;
use serde::Serialize;
use sha2::{Digest as _, Sha256};

use crate::acc::AccountKey;

/// Required members of an EC public key JWK.
#[derive(Debug, Serialize, Clone)]
// LEXICAL ORDER OF FIELDS MATTER!
pub(crate) struct JwkThumb {
    crv: String,
    kty: String,
    x: String,
    y: String,
}

impl TryFrom<&AccountKey> for JwkThumb {
    type Error = eyre::Error;

    fn try_from(key: &AccountKey) -> eyre::Result<Self> {
        let point = key.signing_key().verifying_key().to_encoded_point(false);

        let x = point
            .x()
            .ok_or_else(|| eyre::eyre!("public key has no x coordinate"))?;
        let y = point
            .y()
            .ok_or_else(|| eyre::eyre!("public key has no y coordinate"))?;

        Ok(JwkThumb {
            crv: "P-256".to_owned(),
            kty: "EC".to_owned(),
            x: BASE64_URL_SAFE_NO_PAD.encode(x),
            y: BASE64_URL_SAFE_NO_PAD.encode(y),
        })
    }
}

impl JwkThumb {
    /// Base64url encoded SHA-256 of the canonical JSON form.
    pub(crate) fn thumbprint(&self) -> eyre::Result<String> {
        let json = serde_json::to_string(self)?;
        Ok(BASE64_URL_SAFE_NO_PAD.encode(Sha256::digest(json)))
    }
}
