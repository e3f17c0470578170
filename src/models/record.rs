use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Opaque repository identifier as understood by the Merico API.
pub type RepoId = String;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
            Severity::Other(s) => s,
        }
    }
}

impl From<&str> for Severity {
    // Only exact lowercase names map to a variant; anything else is kept
    // as sent so breakdown keys match what the API reported.
    fn from(s: &str) -> Self {
        match s.trim() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            "low" => Severity::Low,
            "info" => Severity::Info,
            other => Severity::Other(other.to_string()),
        }
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        Severity::from(s.as_str())
    }
}

impl From<Severity> for String {
    fn from(severity: Severity) -> Self {
        severity.as_str().to_string()
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Only the classification attributes are typed; everything else the API
// sends rides along in `extra` and is flattened back on serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionRecord {
    pub repo_id: RepoId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FunctionRecord {
    /// Build a record from one raw API object. `rule` falls back to `ruleId`
    /// when the object has no `rule` key at all.
    pub fn from_api_object(repo_id: &str, mut object: Map<String, Value>) -> Self {
        let severity = take_string(&mut object, "severity").map(Severity::from);
        let kind = take_string(&mut object, "type");
        // A non-string `rule` stays in extra; taking `ruleId` as well would
        // serialize two `rule` keys.
        let rule = if object.contains_key("rule") {
            take_string(&mut object, "rule")
        } else {
            take_string(&mut object, "ruleId")
        };
        // An upstream repo_id would collide with ours on serialization.
        object.remove("repo_id");

        Self {
            repo_id: repo_id.to_string(),
            severity,
            kind,
            rule,
            extra: object,
        }
    }
}

// Stored records go through the same split, so values kept in extra on the
// way in come back there instead of failing to parse as typed fields.
impl<'de> Deserialize<'de> for FunctionRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut object = Map::<String, Value>::deserialize(deserializer)?;
        let repo_id = match object.remove("repo_id") {
            Some(Value::String(id)) => id,
            _ => return Err(D::Error::missing_field("repo_id")),
        };
        Ok(Self::from_api_object(&repo_id, object))
    }
}

// Non-string and blank values stay in the extra bag untouched.
fn take_string(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    let value = match object.get(key)? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => return None,
    };
    object.remove(key);
    Some(value)
}
