//! Wire shapes for the Graph `message` resource.
//!
//! Each call gets its own body type, so a draft creation can never carry
//! `replyTo` and a reply-to update can never carry the content fields.

use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;
use reqwest::Url;
use serde::Serialize;

use crate::error::WorkflowError;

/// Email address -> display name.
pub type RecipientList = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email_address: EmailAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    pub address: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BodyType {
    #[serde(rename = "HTML")]
    Html,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub content_type: BodyType,
    pub content: String,
}

/// `POST /users/{user}/messages`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftBody {
    pub subject: String,
    pub importance: Importance,
    pub body: ItemBody,
    pub to_recipients: Vec<Recipient>,
}

impl CreateDraftBody {
    pub fn new(subject: &str, html_content: &str, to_recipients: &RecipientList) -> Self {
        Self {
            subject: subject.to_string(),
            importance: Importance::Low,
            body: ItemBody {
                content_type: BodyType::Html,
                content: html_content.to_string(),
            },
            to_recipients: recipients(to_recipients),
        }
    }
}

/// `PATCH /users/{user}/messages/{id}` touching only the reply-to list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReplyToBody {
    pub reply_to: Vec<Recipient>,
}

impl UpdateReplyToBody {
    pub fn new(reply_to: &RecipientList) -> Self {
        Self {
            reply_to: recipients(reply_to),
        }
    }
}

pub fn recipients(list: &RecipientList) -> Vec<Recipient> {
    list.iter()
        .map(|(address, name)| Recipient {
            email_address: EmailAddress {
                address: address.clone(),
                name: name.clone(),
            },
        })
        .collect()
}

/// Pull the message id out of a create response's `Location` header.
///
/// The last path segment must look like `messages('<id>')`; the resource name
/// is matched case-insensitively since Graph has been seen to emit
/// `Messages(...)`. Relative locations are accepted. The returned id is
/// percent-decoded.
pub fn message_id_from_location(location: &str) -> Result<String, WorkflowError> {
    let url = Url::parse(location)
        .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(location)))
        .map_err(|e| {
            WorkflowError::IdExtraction(format!("unparseable Location '{}': {}", location, e))
        })?;

    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .ok_or_else(|| WorkflowError::IdExtraction(format!("Location '{}' has no path", location)))?;

    let encoded = strip_prefix_ignore_case(segment, "messages('")
        .and_then(|rest| rest.strip_suffix("')"))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            WorkflowError::IdExtraction(format!(
                "Location '{}' does not end in messages('<id>')",
                location
            ))
        })?;

    // Decoded here; request URLs encode it again.
    percent_decode_str(encoded)
        .decode_utf8()
        .map(|id| id.into_owned())
        .map_err(|e| {
            WorkflowError::IdExtraction(format!("message id in '{}' is not UTF-8: {}", location, e))
        })
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn alice() -> RecipientList {
        RecipientList::from([("a@x.com".to_string(), "Alice".to_string())])
    }

    #[test]
    fn test_recipient_shape() {
        let body = CreateDraftBody::new("Hi", "<p>Hi</p>", &alice());
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(
            value["toRecipients"],
            json!([{"emailAddress": {"address": "a@x.com", "name": "Alice"}}])
        );
    }

    #[test]
    fn test_create_body() {
        let body = CreateDraftBody::new("Hello world", "<b>hey</b>", &alice());
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(
            value,
            json!({
                "subject": "Hello world",
                "importance": "low",
                "body": {"contentType": "HTML", "content": "<b>hey</b>"},
                "toRecipients": [{"emailAddress": {"address": "a@x.com", "name": "Alice"}}]
            })
        );
        assert!(value.get("replyTo").is_none());
    }

    #[test]
    fn test_update_body_only_reply_to() {
        let body = UpdateReplyToBody::new(&alice());
        let value = serde_json::to_value(&body).unwrap();

        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["replyTo"]);
        assert_eq!(
            value["replyTo"],
            json!([{"emailAddress": {"address": "a@x.com", "name": "Alice"}}])
        );
    }

    #[test]
    fn test_recipients_sorted_by_address() {
        let list = RecipientList::from([
            ("zed@x.com".to_string(), "Zed".to_string()),
            ("amy@x.com".to_string(), "Amy".to_string()),
        ]);

        let addresses: Vec<String> = recipients(&list)
            .into_iter()
            .map(|r| r.email_address.address)
            .collect();
        assert_eq!(addresses, vec!["amy@x.com", "zed@x.com"]);
    }

    #[test]
    fn test_id_from_location() {
        let id = message_id_from_location(
            "https://graph.microsoft.com/v1.0/users/me/messages('AAMkA123')",
        )
        .expect("Should extract id");
        assert_eq!(id, "AAMkA123");
    }

    #[test]
    fn test_id_from_capitalised_location() {
        let id = message_id_from_location(
            "https://graph.microsoft.com/v2.0/Users('abc')/Messages('AAMkAGI2=')",
        )
        .expect("Should extract id");
        assert_eq!(id, "AAMkAGI2=");
    }

    #[test]
    fn test_id_is_percent_decoded() {
        let id = message_id_from_location(
            "https://graph.microsoft.com/v1.0/Users('abc')/Messages('AAMk%2Fab%3D')",
        )
        .expect("Should extract id");
        assert_eq!(id, "AAMk/ab=");
    }

    #[test]
    fn test_id_with_invalid_utf8_escape() {
        let err = message_id_from_location("/v1.0/users/me/messages('AA%FF')").unwrap_err();
        assert!(matches!(err, WorkflowError::IdExtraction(_)));
    }

    #[test]
    fn test_id_from_relative_location() {
        let id = message_id_from_location("/v1.0/users/me/messages('AAMkA123')")
            .expect("Should extract id");
        assert_eq!(id, "AAMkA123");
    }

    #[test]
    fn test_malformed_locations() {
        for location in [
            "https://graph.microsoft.com/v1.0/users/me/messages",
            "https://graph.microsoft.com/v1.0/users/me/messages('')",
            "https://graph.microsoft.com/v1.0/users/me/messages('AAMkA123'",
            "https://graph.microsoft.com/",
            "",
        ] {
            let err = message_id_from_location(location).unwrap_err();
            assert!(
                matches!(err, WorkflowError::IdExtraction(_)),
                "unexpected error for {:?}: {:?}",
                location,
                err
            );
        }
    }
}
