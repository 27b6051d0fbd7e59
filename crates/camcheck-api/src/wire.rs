// Flat key-value wire format
//
// The device answers every webSetup.cgi call with `key1=value1&key2=value2`.
// Parsing is tolerant: segments without `=` are dropped, and the first
// occurrence of a repeated key wins. Values are taken verbatim -- no
// percent-decoding is applied, matching what the device firmware emits.

use indexmap::IndexMap;
use serde::Serialize;

/// Key carrying the device's outcome code on write/verify responses.
pub const RETURN_CODE: &str = "returnCode";

/// Ordered mapping parsed from one wire response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResponseRecord {
    fields: IndexMap<String, String>,
}

impl ResponseRecord {
    /// Parse a raw `key=value&...` body.
    pub fn parse(raw: &str) -> Self {
        let mut fields = IndexMap::new();
        for segment in raw.trim().split('&') {
            let Some((key, value)) = segment.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            fields
                .entry(key.to_owned())
                .or_insert_with(|| value.trim_end_matches(['\r', '\n']).to_owned());
        }
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The `returnCode` field, if the device sent one.
    pub fn return_code(&self) -> Option<&str> {
        self.get(RETURN_CODE)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn into_inner(self) -> IndexMap<String, String> {
        self.fields
    }
}

impl<'a> IntoIterator for &'a ResponseRecord {
    type Item = (&'a String, &'a String);
    type IntoIter = indexmap::map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
