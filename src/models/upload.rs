//! Incoming finalization request and the upload token read from it.

use serde_json::Value;
use std::collections::BTreeMap;

/// Read-only view over the input fields of one save request.
///
/// Nested JSON objects are flattened with `.`, so `{"avatar": {"uuid": "a1"}}`
/// is read back as `avatar.uuid`. `null` values are treated as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadRequest {
    inputs: BTreeMap<String, String>,
}

impl UploadRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(body: &Value) -> Self {
        let mut inputs = BTreeMap::new();
        flatten_into(&mut inputs, None, body);
        Self { inputs }
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    pub fn input(&self, name: &str) -> Option<&str> {
        self.inputs.get(name).map(String::as_str)
    }
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: Option<&str>, value: &Value) {
    let join = |key: &str| match prefix {
        Some(prefix) => format!("{prefix}.{key}"),
        None => key.to_string(),
    };

    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(out, Some(&join(key)), nested);
            }
        }
        Value::Array(items) => {
            for (idx, nested) in items.iter().enumerate() {
                flatten_into(out, Some(&join(&idx.to_string())), nested);
            }
        }
        Value::Null => {}
        Value::String(s) => {
            if let Some(prefix) = prefix {
                out.insert(prefix.to_string(), s.clone());
            }
        }
        scalar => {
            if let Some(prefix) = prefix {
                out.insert(prefix.to_string(), scalar.to_string());
            }
        }
    }
}

/// Descriptor of a completed direct-to-storage upload for one attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadToken {
    /// Client-generated id of the upload attempt.
    pub uuid: String,
    /// Staging key the object was uploaded to (`<attribute>key`).
    pub temporary_key: Option<String>,
    /// Key used to derive the destination (`<attribute>s3Key`).
    pub s3_key: Option<String>,
    /// Client-reported filename. Untrusted.
    pub original_name: Option<String>,
}

impl UploadToken {
    /// Read the token for `attribute`. `None` when no upload happened, i.e.
    /// `<attribute>.uuid` is missing, empty or `"0"`.
    pub fn from_request(request: &UploadRequest, attribute: &str) -> Option<Self> {
        let uuid = request
            .input(&format!("{attribute}.uuid"))
            .filter(|uuid| !matches!(*uuid, "" | "0"))?;

        let owned = |name: String| request.input(&name).map(str::to_string);
        Some(Self {
            uuid: uuid.to_string(),
            temporary_key: owned(format!("{attribute}key")),
            s3_key: owned(format!("{attribute}s3Key")),
            original_name: owned(format!("{attribute}.originalName")),
        })
    }

    /// Key of the staging object to copy from.
    pub fn staging_key(&self) -> Option<&str> {
        self.temporary_key.as_deref().or(self.s3_key.as_deref())
    }

    /// Key the destination path is derived from.
    pub fn destination_seed(&self) -> Option<&str> {
        self.s3_key.as_deref().or(self.temporary_key.as_deref())
    }
}
