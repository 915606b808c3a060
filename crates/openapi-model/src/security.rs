//! Security scheme definitions and requirements

use crate::component_key::ComponentKey;
use crate::ordered_map::OrderedMap;
use serde::{Deserialize, Serialize};

/// Scheme names mapped to the scopes they require
///
/// Every key names an entry of `components.securitySchemes`.
pub type SecurityRequirement = OrderedMap<ComponentKey, Vec<String>>;

/// Security scheme definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum SecurityScheme {
    /// API key authentication
    #[serde(rename = "apiKey")]
    ApiKey {
        name: String,
        #[serde(rename = "in")]
        location: ApiKeyLocation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// HTTP authentication (bearer, basic)
    #[serde(rename = "http")]
    Http {
        scheme: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bearer_format: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// OAuth2 authentication
    #[serde(rename = "oauth2")]
    OAuth2 {
        flows: OAuthFlows,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// OpenID Connect
    #[serde(rename = "openIdConnect")]
    OpenIdConnect {
        open_id_connect_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// Mutual TLS
    #[serde(rename = "mutualTLS")]
    MutualTls {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

impl SecurityScheme {
    pub fn description(&self) -> Option<&str> {
        match self {
            SecurityScheme::ApiKey { description, .. }
            | SecurityScheme::Http { description, .. }
            | SecurityScheme::OAuth2 { description, .. }
            | SecurityScheme::OpenIdConnect { description, .. }
            | SecurityScheme::MutualTls { description } => description.as_deref(),
        }
    }
}

/// API key location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

/// OAuth2 flows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlows {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit: Option<OAuthFlow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<OAuthFlow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_credentials: Option<OAuthFlow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<OAuthFlow>,
}

/// OAuth2 flow details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthFlow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,
    #[serde(default)]
    pub scopes: OrderedMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_scheme_variants() {
        let bearer: SecurityScheme =
            serde_json::from_value(json!({"type": "http", "scheme": "bearer", "bearerFormat": "JWT"}))
                .unwrap();
        assert_eq!(
            bearer,
            SecurityScheme::Http {
                scheme: "bearer".to_string(),
                bearer_format: Some("JWT".to_string()),
                description: None,
            }
        );

        let oauth: SecurityScheme = serde_json::from_value(json!({
            "type": "oauth2",
            "flows": {
                "clientCredentials": {
                    "tokenUrl": "https://auth.example.com/token",
                    "scopes": {"read": "Read access", "write": "Write access"}
                }
            }
        }))
        .unwrap();
        match oauth {
            SecurityScheme::OAuth2 { flows, .. } => {
                let flow = flows.client_credentials.unwrap();
                assert_eq!(flow.scopes.keys().collect::<Vec<_>>(), vec!["read", "write"]);
            }
            other => panic!("unexpected scheme: {:?}", other),
        }

        let mtls: SecurityScheme = serde_json::from_value(json!({"type": "mutualTLS"})).unwrap();
        assert_eq!(mtls.description(), None);
    }

    #[test]
    fn test_requirement_keys_are_component_keys() {
        let requirement: SecurityRequirement =
            serde_json::from_value(json!({"oauth": ["read"], "apiKey": []})).unwrap();
        assert_eq!(
            requirement.keys().map(|k| k.as_str()).collect::<Vec<_>>(),
            vec!["oauth", "apiKey"]
        );

        assert!(serde_json::from_value::<SecurityRequirement>(json!({"not valid": []})).is_err());
    }
}
