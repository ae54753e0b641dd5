//! MBean ObjectName 파싱
//!
//! Helpers for the canonical `domain:key=value,key="quoted,value",attr=Name`
//! form every raw attribute result is named with.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CollectionError;

/// Key properties of one bean, in declaration order
pub type KeyProperties = IndexMap<String, String>;

/// Bean name: everything before the last `,attr=` marker
static BEAN_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*),attr=.*").expect("Invalid bean name regex"));

/// Attribute name: everything after the last `,attr=` marker
static ATTR_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.*,attr=(.*)$").expect("Invalid attribute name regex"));

/// Tokenize a key property list into an ordered map
///
/// Unquoted values run to the next `,` or the end of the input. Quoted
/// values run to the next `"` not preceded by a backslash; the escape
/// sequence is kept verbatim in the value. After a closing quote a single
/// `,` is skipped if present, any other character starts the next key.
///
/// A repeated key keeps its first position and takes the last value.
///
/// # Errors
/// Returns `CollectionError::MalformedKeyProperties` if the input ends
/// right after `=` or inside a quoted value.
///
/// # Example
///
/// ```ignore
/// let props = parse_key_properties(r#"type=Cache,name="a,b""#)?;
/// assert_eq!(props["name"], "a,b");
/// ```
pub fn parse_key_properties(key_properties: &str) -> Result<KeyProperties, CollectionError> {
    let malformed = || CollectionError::MalformedKeyProperties(key_properties.to_string());

    let bytes = key_properties.as_bytes();
    let mut properties = KeyProperties::new();
    let mut i = 0;
    let mut token_start = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            i += 1;
            continue;
        }

        let key = &key_properties[token_start..i];
        i += 1;

        match bytes.get(i) {
            None => return Err(malformed()),
            Some(b'"') => {
                i += 1;
                let value_start = i;
                loop {
                    match bytes.get(i) {
                        None => return Err(malformed()),
                        Some(b'"') if bytes[i - 1] != b'\\' => break,
                        Some(_) => i += 1,
                    }
                }
                properties.insert(key.to_string(), key_properties[value_start..i].to_string());
                // closing quote, then an optional separator
                i += 1;
                if bytes.get(i) == Some(&b',') {
                    i += 1;
                }
            }
            Some(_) => {
                let value_start = i;
                while i < bytes.len() && bytes[i] != b',' {
                    i += 1;
                }
                properties.insert(key.to_string(), key_properties[value_start..i].to_string());
                i += 1;
            }
        }

        token_start = i;
    }

    Ok(properties)
}

/// Split `domain:rest` on the first colon
///
/// # Errors
/// Returns `CollectionError::InvalidBeanName` if there is no colon.
pub fn split_bean_name(name: &str) -> Result<(&str, &str), CollectionError> {
    name.split_once(':')
        .ok_or_else(|| CollectionError::InvalidBeanName(name.to_string()))
}

/// Extract the bean part of `<props>,attr=<name>`
pub fn bean_name(bean_attr: &str) -> Result<&str, CollectionError> {
    BEAN_NAME_REGEX
        .captures(bean_attr)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| CollectionError::BeanNameExtraction(bean_attr.to_string()))
}

/// Extract the attribute part of `<props>,attr=<name>`
pub fn attr_name(bean_attr: &str) -> Result<&str, CollectionError> {
    ATTR_NAME_REGEX
        .captures(bean_attr)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| CollectionError::AttrNameExtraction(bean_attr.to_string()))
}
