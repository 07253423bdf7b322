//! # Document Composer
//!
//! Applies delta patches to the internal document `{publicKeys?, services?}`.
//!
//! | Action | Properties |
//! |--------|------------|
//! | `replace` | `document: {publicKeys?, services?}` |
//! | `add-public-keys` | `publicKeys` |
//! | `remove-public-keys` | `ids` |
//! | `add-services` | `services` |
//! | `remove-services` | `ids` |
//!
//! A patch list is validated in full before any patch is applied.

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use shared_crypto::is_base64url_string;
use shared_types::{ErrorCode, SidetreeError};

const MAX_ID_LENGTH: usize = 50;
const MAX_SERVICE_TYPE_LENGTH: usize = 30;
const PUBLIC_KEYS: &str = "publicKeys";
const SERVICES: &str = "services";
const ALLOWED_PURPOSES: [&str; 5] = [
    "authentication",
    "assertionMethod",
    "capabilityInvocation",
    "capabilityDelegation",
    "keyAgreement",
];

pub struct DocumentComposer;

impl DocumentComposer {
    /// Apply `patches` to `document`, returning the new document.
    pub fn apply_patches(document: &Value, patches: &[Value]) -> Result<Value, SidetreeError> {
        for patch in patches {
            Self::validate_patch(patch)?;
        }

        let mut document = match document {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        for patch in patches {
            Self::apply_patch(&mut document, patch);
        }
        Ok(Value::Object(document))
    }

    /// Validate one patch without applying it.
    pub fn validate_patch(patch: &Value) -> Result<(), SidetreeError> {
        let object = patch.as_object().ok_or_else(|| {
            SidetreeError::new(
                ErrorCode::DocumentComposerPatchMissingOrUnknownAction,
                "patch is not an object",
            )
        })?;
        let action = object.get("action").and_then(Value::as_str).unwrap_or_default();

        match action {
            "replace" => {
                allow_only(object, &["action", "document"], BAD_PATCH_PROPERTY)?;
                let document = object
                    .get("document")
                    .and_then(Value::as_object)
                    .ok_or_else(|| patch_property_error("replace needs a 'document' object"))?;
                allow_only(
                    document,
                    &[PUBLIC_KEYS, SERVICES],
                    ErrorCode::DocumentComposerDocumentMissingOrUnknownProperty,
                )?;
                if let Some(keys) = document.get(PUBLIC_KEYS) {
                    validate_public_keys(keys)?;
                }
                if let Some(services) = document.get(SERVICES) {
                    validate_services(services)?;
                }
                Ok(())
            }
            "add-public-keys" => {
                allow_only(object, &["action", PUBLIC_KEYS], BAD_PATCH_PROPERTY)?;
                validate_public_keys(required(object, PUBLIC_KEYS)?)
            }
            "add-services" => {
                allow_only(object, &["action", SERVICES], BAD_PATCH_PROPERTY)?;
                validate_services(required(object, SERVICES)?)
            }
            "remove-public-keys" | "remove-services" => {
                allow_only(object, &["action", "ids"], BAD_PATCH_PROPERTY)?;
                let ids = required(object, "ids")?
                    .as_array()
                    .ok_or_else(|| patch_property_error("'ids' must be an array"))?;
                for id in ids {
                    validate_id(id)?;
                }
                Ok(())
            }
            other => Err(SidetreeError::new(
                ErrorCode::DocumentComposerPatchMissingOrUnknownAction,
                format!("unknown patch action '{other}'"),
            )),
        }
    }

    /// Apply an already validated patch.
    fn apply_patch(document: &mut Map<String, Value>, patch: &Value) {
        let action = patch.get("action").and_then(Value::as_str).unwrap_or_default();
        match action {
            "replace" => {
                *document = patch
                    .get("document")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
            }
            "add-public-keys" => add_entries(document, PUBLIC_KEYS, patch.get(PUBLIC_KEYS)),
            "add-services" => add_entries(document, SERVICES, patch.get(SERVICES)),
            "remove-public-keys" => remove_entries(document, PUBLIC_KEYS, patch.get("ids")),
            "remove-services" => remove_entries(document, SERVICES, patch.get("ids")),
            _ => {}
        }
    }
}

fn add_entries(document: &mut Map<String, Value>, property: &str, entries: Option<&Value>) {
    let additions = entries.and_then(Value::as_array).cloned().unwrap_or_default();
    let slot = document
        .entry(property.to_string())
        .or_insert_with(|| json!([]));
    if !slot.is_array() {
        *slot = json!([]);
    }
    if let Some(existing) = slot.as_array_mut() {
        for entry in additions {
            let id = entry.get("id").cloned();
            existing.retain(|e| e.get("id") != id.as_ref());
            existing.push(entry);
        }
    }
}

fn remove_entries(document: &mut Map<String, Value>, property: &str, ids: Option<&Value>) {
    let ids: Vec<Value> = ids.and_then(Value::as_array).cloned().unwrap_or_default();
    if let Some(existing) = document.get_mut(property).and_then(Value::as_array_mut) {
        existing.retain(|entry| entry.get("id").map_or(true, |id| !ids.contains(id)));
    }
}

fn required<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a Value, SidetreeError> {
    object
        .get(key)
        .ok_or_else(|| patch_property_error(&format!("missing '{key}'")))
}

const BAD_PATCH_PROPERTY: ErrorCode = ErrorCode::DocumentComposerPatchMissingOrUnknownProperty;

fn patch_property_error(message: &str) -> SidetreeError {
    SidetreeError::new(BAD_PATCH_PROPERTY, message)
}

fn allow_only(
    object: &Map<String, Value>,
    allowed: &[&str],
    code: ErrorCode,
) -> Result<(), SidetreeError> {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(SidetreeError::new(code, format!("unknown property '{key}'"))),
        None => Ok(()),
    }
}

fn validate_id(id: &Value) -> Result<&str, SidetreeError> {
    let id = id.as_str().ok_or_else(|| {
        SidetreeError::new(ErrorCode::DocumentComposerIdNotBase64Url, "id must be a string")
    })?;
    if id.len() > MAX_ID_LENGTH {
        return Err(SidetreeError::new(
            ErrorCode::DocumentComposerIdTooLong,
            format!("id exceeds {MAX_ID_LENGTH} characters"),
        ));
    }
    if id.is_empty() || !is_base64url_string(id) {
        return Err(SidetreeError::new(
            ErrorCode::DocumentComposerIdNotBase64Url,
            format!("id '{id}' is not base64url"),
        ));
    }
    Ok(id)
}

fn validate_unique_ids<'a>(ids: impl Iterator<Item = &'a str>) -> Result<(), SidetreeError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(SidetreeError::new(
                ErrorCode::DocumentComposerDuplicateId,
                format!("duplicate id '{id}'"),
            ));
        }
    }
    Ok(())
}

fn validate_public_keys(keys: &Value) -> Result<(), SidetreeError> {
    let invalid =
        |message: &str| SidetreeError::new(ErrorCode::DocumentComposerPublicKeyInvalid, message);
    let keys = keys.as_array().ok_or_else(|| invalid("publicKeys must be an array"))?;

    let mut ids = Vec::with_capacity(keys.len());
    for key in keys {
        let key = key.as_object().ok_or_else(|| invalid("public key entry is not an object"))?;
        allow_only(
            key,
            &["id", "type", "publicKeyJwk", "purposes"],
            ErrorCode::DocumentComposerPublicKeyInvalid,
        )?;
        ids.push(validate_id(key.get("id").unwrap_or(&Value::Null))?);

        if !key.get("type").map_or(false, Value::is_string) {
            return Err(invalid("public key 'type' must be a string"));
        }
        if !key.get("publicKeyJwk").map_or(false, Value::is_object) {
            return Err(invalid("'publicKeyJwk' must be an object"));
        }
        if let Some(purposes) = key.get("purposes") {
            validate_purposes(purposes)?;
        }
    }
    validate_unique_ids(ids.into_iter())
}

fn validate_purposes(purposes: &Value) -> Result<(), SidetreeError> {
    let invalid = |message: String| {
        SidetreeError::new(ErrorCode::DocumentComposerPublicKeyPurposesInvalid, message)
    };
    let purposes = purposes
        .as_array()
        .ok_or_else(|| invalid("purposes must be an array".to_string()))?;
    if purposes.is_empty() {
        return Err(invalid("purposes must not be empty".to_string()));
    }
    let mut seen = HashSet::new();
    for purpose in purposes {
        let purpose = purpose
            .as_str()
            .filter(|p| ALLOWED_PURPOSES.contains(p))
            .ok_or_else(|| invalid(format!("unknown purpose {purpose}")))?;
        if !seen.insert(purpose) {
            return Err(invalid(format!("duplicate purpose '{purpose}'")));
        }
    }
    Ok(())
}

fn validate_services(services: &Value) -> Result<(), SidetreeError> {
    let invalid = |code: ErrorCode, message: &str| SidetreeError::new(code, message);
    let malformed = |message: &str| invalid(ErrorCode::DocumentComposerServiceInvalid, message);
    let services = services
        .as_array()
        .ok_or_else(|| malformed("services must be an array"))?;

    let mut ids = Vec::with_capacity(services.len());
    for service in services {
        let service = service
            .as_object()
            .ok_or_else(|| malformed("service entry is not an object"))?;
        allow_only(
            service,
            &["id", "type", "serviceEndpoint"],
            ErrorCode::DocumentComposerServiceInvalid,
        )?;
        ids.push(validate_id(service.get("id").unwrap_or(&Value::Null))?);

        let service_type = service
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("service 'type' must be a string"))?;
        if service_type.len() > MAX_SERVICE_TYPE_LENGTH {
            return Err(invalid(
                ErrorCode::DocumentComposerServiceTypeTooLong,
                "service type exceeds 30 characters",
            ));
        }

        let endpoint_ok = match service.get("serviceEndpoint") {
            Some(Value::String(uri)) => is_uri(uri),
            Some(Value::Object(_)) => true,
            _ => false,
        };
        if !endpoint_ok {
            return Err(invalid(
                ErrorCode::DocumentComposerServiceEndpointInvalid,
                "serviceEndpoint must be a URI or an object",
            ));
        }
    }
    validate_unique_ids(ids.into_iter())
}

/// `scheme ":" rest` with an RFC 3986 scheme and a non-empty rest.
fn is_uri(input: &str) -> bool {
    let Some((scheme, rest)) = input.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let scheme_ok = chars.next().map_or(false, |c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    scheme_ok && !rest.is_empty() && !input.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str) -> Value {
        json!({
            "id": id,
            "type": "EcdsaSecp256k1VerificationKey2019",
            "publicKeyJwk": {"kty": "EC", "crv": "secp256k1", "x": "x", "y": "y"},
            "purposes": ["authentication"],
        })
    }

    fn service(id: &str) -> Value {
        json!({"id": id, "type": "LinkedDomains", "serviceEndpoint": "https://example.com"})
    }

    fn add_keys(keys: Vec<Value>) -> Result<(), SidetreeError> {
        DocumentComposer::validate_patch(&json!({"action": "add-public-keys", "publicKeys": keys}))
    }

    fn add_services(services: Vec<Value>) -> Result<(), SidetreeError> {
        DocumentComposer::validate_patch(&json!({"action": "add-services", "services": services}))
    }

    #[test]
    fn test_replace_then_add_and_remove() {
        let patches = vec![
            json!({
                "action": "replace",
                "document": {"publicKeys": [key("k1")], "services": [service("s1")]},
            }),
            json!({"action": "add-public-keys", "publicKeys": [key("k2")]}),
            json!({"action": "add-services", "services": [service("s2")]}),
            json!({"action": "remove-public-keys", "ids": ["k1"]}),
            json!({"action": "remove-services", "ids": ["s1", "missing"]}),
        ];

        let document = DocumentComposer::apply_patches(&json!({}), &patches).unwrap();
        assert_eq!(document["publicKeys"], json!([key("k2")]));
        assert_eq!(document["services"], json!([service("s2")]));
    }

    #[test]
    fn test_adding_existing_id_replaces_entry() {
        let base = json!({"publicKeys": [key("k1")]});
        let mut replacement = key("k1");
        replacement["purposes"] = json!(["keyAgreement"]);

        let document = DocumentComposer::apply_patches(
            &base,
            &[json!({"action": "add-public-keys", "publicKeys": [replacement.clone()]})],
        )
        .unwrap();
        assert_eq!(document["publicKeys"], json!([replacement]));
    }

    #[test]
    fn test_unknown_action() {
        let patches = [json!({"action": "ietf-json-patch"})];
        let err = DocumentComposer::apply_patches(&json!({}), &patches).unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentComposerPatchMissingOrUnknownAction);
    }

    #[test]
    fn test_invalid_patch_leaves_nothing_applied() {
        let base = json!({"services": [service("s1")]});
        let patches = vec![
            json!({"action": "remove-services", "ids": ["s1"]}),
            json!({"action": "add-services", "services": [{"id": "s2"}]}),
        ];
        assert!(DocumentComposer::apply_patches(&base, &patches).is_err());
    }

    #[test]
    fn test_id_rules() {
        let long_id = "a".repeat(51);
        let err = add_keys(vec![key(&long_id)]).unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentComposerIdTooLong);

        let err = add_keys(vec![key("not valid!")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentComposerIdNotBase64Url);

        let err = add_keys(vec![key("k"), key("k")]).unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentComposerDuplicateId);
    }

    #[test]
    fn test_purposes_rules() {
        let mut bad = key("k1");
        bad["purposes"] = json!(["authentication", "authentication"]);
        let err = add_keys(vec![bad]).unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentComposerPublicKeyPurposesInvalid);

        let mut unknown = key("k1");
        unknown["purposes"] = json!(["signing"]);
        assert!(add_keys(vec![unknown]).is_err());
    }

    #[test]
    fn test_service_rules() {
        let mut long_type = service("s1");
        long_type["type"] = json!("t".repeat(31));
        let err = add_services(vec![long_type]).unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentComposerServiceTypeTooLong);

        let mut bad_endpoint = service("s1");
        bad_endpoint["serviceEndpoint"] = json!("no scheme");
        let err = add_services(vec![bad_endpoint]).unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentComposerServiceEndpointInvalid);

        let mut object_endpoint = service("s1");
        object_endpoint["serviceEndpoint"] = json!({"origins": ["https://a.example"]});
        assert!(add_services(vec![object_endpoint]).is_ok());
    }

    #[test]
    fn test_replace_rejects_unknown_document_property() {
        let patch = json!({"action": "replace", "document": {"controller": "x"}});
        let err = DocumentComposer::validate_patch(&patch).unwrap_err();
        assert_eq!(err.code, ErrorCode::DocumentComposerDocumentMissingOrUnknownProperty);
    }
}
