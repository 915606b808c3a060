//! Reading documents from JSON or YAML text

use crate::error::{ParseError, ParseResult};
use crate::types::Document;
use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

static LARGE_BOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(\s*(?:minimum|maximum|exclusiveMinimum|exclusiveMaximum):\s*)(-?\d{16,})")
        .expect("large bound pattern compiles")
});

/// OpenAPI 3.x document parser
pub struct DocumentParser;

impl DocumentParser {
    /// Parse a document, detecting JSON by a leading `{`
    pub fn parse(content: &str) -> ParseResult<Document> {
        if content.trim_start().starts_with('{') {
            Self::parse_json(content)
        } else {
            Self::parse_yaml(content)
        }
    }

    pub fn parse_json(content: &str) -> ParseResult<Document> {
        let content = Self::sanitize_large_numbers(content);
        let value: Value = serde_json::from_str(&content)?;
        Self::from_value(value)
    }

    pub fn parse_yaml(content: &str) -> ParseResult<Document> {
        let content = Self::sanitize_large_numbers(content);
        let value: Value = serde_yaml::from_str(&content)?;
        Self::from_value(value)
    }

    /// Build a document from an already decoded tree
    ///
    /// Only 3.x documents are accepted; the version is checked before the
    /// rest of the tree is decoded.
    pub fn from_value(value: Value) -> ParseResult<Document> {
        let version = match value.get("openapi").and_then(Value::as_str) {
            Some(version) => version.to_string(),
            None => {
                let legacy = value
                    .get("swagger")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown");
                return Err(ParseError::UnsupportedVersion(legacy.to_string()));
            }
        };
        if !version.starts_with("3.") {
            return Err(ParseError::UnsupportedVersion(version));
        }

        let document: Document = serde_json::from_value(value)?;
        debug!(
            "Parsed OpenAPI {} document '{}' with {} paths",
            document.openapi,
            document.info.title,
            document.paths.len()
        );
        Ok(document)
    }

    /// Clamp integer bounds too large for a JSON number
    ///
    /// Some published documents use 64-bit sentinels for `minimum`/`maximum`
    /// that do not survive decoding; their exact value does not matter.
    fn sanitize_large_numbers(content: &str) -> String {
        LARGE_BOUND
            .replace_all(content, |caps: &Captures| {
                let prefix = &caps[1];
                if caps[2].starts_with('-') {
                    format!("{}-2147483648", prefix)
                } else {
                    format!("{}2147483647", prefix)
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpMethod;

    const SAMPLE_DOCUMENT: &str = r#"
openapi: "3.0.0"
info:
  title: Test API
  version: "1.0.0"
servers:
  - url: https://api.example.com/v1
paths:
  /users:
    get:
      operationId: listUsers
      summary: List all users
      responses:
        '200':
          description: A list of users
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/User'
  /users/{id}:
    parameters:
      - $ref: '#/components/parameters/UserId'
    get:
      operationId: getUser
      responses:
        '200':
          $ref: '#/components/responses/User'
components:
  schemas:
    User:
      type: object
      required: [name]
      properties:
        name:
          type: string
  parameters:
    UserId:
      name: id
      in: path
      required: true
      schema:
        type: string
  responses:
    User:
      description: A user
      content:
        application/json:
          schema:
            $ref: '#/components/schemas/User'
  securitySchemes:
    bearerAuth:
      type: http
      scheme: bearer
security:
  - bearerAuth: []
"#;

    #[test]
    fn test_parse_yaml() {
        let document = DocumentParser::parse_yaml(SAMPLE_DOCUMENT).unwrap();

        assert_eq!(document.info.title, "Test API");
        assert_eq!(document.info.version, "1.0.0");
        assert_eq!(document.servers.len(), 1);
        assert_eq!(document.servers[0].url, "https://api.example.com/v1");
        assert_eq!(document.paths.len(), 2);
        assert_eq!(document.components.schemas.len(), 1);
        assert_eq!(document.security.len(), 1);
    }

    #[test]
    fn test_parse_detects_json() {
        let json = r#"{"openapi": "3.1.0", "info": {"title": "J", "version": "2"}, "paths": {}}"#;
        let document = DocumentParser::parse(json).unwrap();
        assert_eq!(document.openapi, "3.1.0");
        assert!(document.paths.is_empty());
    }

    #[test]
    fn test_parse_keeps_references_until_dereferenced() {
        let document = DocumentParser::parse(SAMPLE_DOCUMENT).unwrap();
        let item = document.paths.get("/users/{id}").unwrap().value().unwrap();
        assert!(item.parameters[0].is_reference());

        let resolved = document.resolved().unwrap();
        let get_user = resolved.endpoint("/users/{id}", HttpMethod::Get).unwrap();
        assert_eq!(get_user.parameters.len(), 1);
        assert_eq!(get_user.parameters[0].name, "id");
        assert_eq!(get_user.responses.get("200").unwrap().description, "A user");
    }

    #[test]
    fn test_rejects_other_versions() {
        let swagger = r#"{"swagger": "2.0", "info": {"title": "Old", "version": "1"}}"#;
        match DocumentParser::parse(swagger) {
            Err(ParseError::UnsupportedVersion(version)) => assert_eq!(version, "2.0"),
            other => panic!("expected unsupported version, got {:?}", other),
        }

        let future = "openapi: '4.0.0'\ninfo:\n  title: Next\n  version: '1'\n";
        assert!(matches!(
            DocumentParser::parse(future),
            Err(ParseError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_sanitize_large_numbers() {
        let yaml_with_large_nums = r#"
openapi: "3.0.0"
info:
  title: Test API
  version: "1.0.0"
paths: {}
components:
  schemas:
    TestSchema:
      type: object
      properties:
        seed:
          type: integer
          minimum: -9223372036854776000
          maximum: 9223372036854776000
"#;

        let result = DocumentParser::parse_yaml(yaml_with_large_nums);
        assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
    }
}
