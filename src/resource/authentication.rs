//! Authentication mechanisms attached to device and module identities.

use serde::{Deserialize, Serialize};

/// How an identity authenticates against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthenticationType {
    /// Shared access keys
    #[default]
    Sas,
    /// Self-signed X.509 certificate identified by thumbprint
    SelfSigned,
    /// X.509 certificate chained to a registered certificate authority
    CertificateAuthority,
    /// No credentials (modules managed by an edge runtime)
    None,
}

/// Primary and secondary symmetric keys.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymmetricKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_key: Option<String>,
}

/// Primary and secondary certificate thumbprints.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X509Thumbprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_thumbprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_thumbprint: Option<String>,
}

/// Credentials of a device or module identity.
///
/// When an identity is created without keys, the service generates a
/// symmetric key pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationMechanism {
    #[serde(rename = "type", default)]
    pub authentication_type: AuthenticationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symmetric_key: Option<SymmetricKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x509_thumbprint: Option<X509Thumbprint>,
}

impl AuthenticationMechanism {
    /// Shared access authentication with explicit keys.
    pub fn symmetric_key(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            authentication_type: AuthenticationType::Sas,
            symmetric_key: Some(SymmetricKey {
                primary_key: Some(primary.into()),
                secondary_key: Some(secondary.into()),
            }),
            x509_thumbprint: None,
        }
    }

    /// Self-signed certificate authentication.
    pub fn self_signed(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            authentication_type: AuthenticationType::SelfSigned,
            symmetric_key: None,
            x509_thumbprint: Some(X509Thumbprint {
                primary_thumbprint: Some(primary.into()),
                secondary_thumbprint: Some(secondary.into()),
            }),
        }
    }

    /// Certificate authority signed authentication.
    pub fn certificate_authority() -> Self {
        Self {
            authentication_type: AuthenticationType::CertificateAuthority,
            symmetric_key: None,
            x509_thumbprint: None,
        }
    }

    /// Whether symmetric keys still need to be generated by the service.
    pub fn needs_generated_keys(&self) -> bool {
        self.authentication_type == AuthenticationType::Sas
            && self
                .symmetric_key
                .as_ref()
                .is_none_or(|key| key.primary_key.is_none() && key.secondary_key.is_none())
    }
}
