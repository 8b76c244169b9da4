use std::fmt;

use crate::{MarvelError, Result};

/// Public/private key pair identifying the caller to the API.
///
/// Both keys are required and immutable once constructed. The private key
/// never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    public_key: String,
    private_key: String,
}

impl Credentials {
    /// Creates a key pair, trimming surrounding whitespace.
    ///
    /// Returns [`MarvelError::Config`] if either key is empty.
    pub fn new(public_key: impl AsRef<str>, private_key: impl AsRef<str>) -> Result<Self> {
        let public_key = public_key.as_ref().trim();
        let private_key = private_key.as_ref().trim();
        if public_key.is_empty() {
            return Err(MarvelError::Config("public key cannot be empty".to_owned()));
        }
        if private_key.is_empty() {
            return Err(MarvelError::Config(
                "private key cannot be empty".to_owned(),
            ));
        }
        Ok(Self {
            public_key: public_key.to_owned(),
            private_key: private_key.to_owned(),
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub(crate) fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}
