//! Fragment encoding.
//!
//! A fragment is the stored form of one flattened node: either the bare JSON
//! primitive, or an object with the dot-prefixed `.priority` and `.value`
//! fields the database itself uses in its export format.

use ofb_types::Primitive;
use serde::{Deserialize, Serialize};

/// One flattened node, as stored in a `partial` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Fragment {
    /// A leaf without priority.
    Bare(Primitive),
    /// A node with a priority; `value` is set for leaves and absent for
    /// interior nodes, whose data lives in their descendants' fragments.
    Annotated {
        #[serde(rename = ".priority", default, skip_serializing_if = "Option::is_none")]
        priority: Option<Primitive>,
        #[serde(rename = ".value", default, skip_serializing_if = "Option::is_none")]
        value: Option<Primitive>,
    },
}

impl Fragment {
    /// A priority-only fragment for an interior node.
    pub fn priority_only(priority: Primitive) -> Self {
        Fragment::Annotated {
            priority: Some(priority),
            value: None,
        }
    }

    pub fn priority(&self) -> Option<&Primitive> {
        match self {
            Fragment::Bare(_) => None,
            Fragment::Annotated { priority, .. } => priority.as_ref(),
        }
    }

    pub fn value(&self) -> Option<&Primitive> {
        match self {
            Fragment::Bare(value) => Some(value),
            Fragment::Annotated { value, .. } => value.as_ref(),
        }
    }

    /// JSON text for storage.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse stored JSON text.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_encodes_as_primitive() {
        assert_eq!(Fragment::Bare(Primitive::from(1)).encode().unwrap(), "1");
        assert_eq!(Fragment::Bare(Primitive::from("hi")).encode().unwrap(), "\"hi\"");
    }

    #[test]
    fn annotated_uses_dot_keys() {
        let leaf = Fragment::Annotated {
            priority: Some(Primitive::from(2)),
            value: Some(Primitive::from(true)),
        };
        assert_eq!(leaf.encode().unwrap(), r#"{".priority":2,".value":true}"#);
        assert_eq!(
            Fragment::priority_only(Primitive::from(5)).encode().unwrap(),
            r#"{".priority":5}"#
        );
    }

    #[test]
    fn field_names_match_export_format() {
        let encoded = Fragment::Annotated {
            priority: Some(Primitive::from(1)),
            value: Some(Primitive::from(1)),
        }
        .encode()
        .unwrap();
        assert!(encoded.contains(ofb_types::PRIORITY_KEY));
        assert!(encoded.contains(ofb_types::VALUE_KEY));
    }

    #[test]
    fn decode_both_shapes() {
        assert_eq!(Fragment::decode("0").unwrap(), Fragment::Bare(Primitive::from(0)));
        let annotated = Fragment::decode(r#"{".priority":0,".value":""}"#).unwrap();
        assert_eq!(annotated.priority(), Some(&Primitive::from(0)));
        assert_eq!(annotated.value(), Some(&Primitive::from("")));
    }

    #[test]
    fn null_priority_decodes_as_absent() {
        let fragment = Fragment::decode(r#"{".priority":null,".value":3}"#).unwrap();
        assert_eq!(fragment.priority(), None);
        assert_eq!(fragment.value(), Some(&Primitive::from(3)));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(Fragment::decode("{not json").is_err());
        assert!(Fragment::decode("null").is_err());
    }
}
