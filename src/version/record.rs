use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of one deployed build, as published in `app-version.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub version: String,
    pub commit: Option<String>,
    pub commit_author: Option<String>,
    pub commit_message: Option<String>,
    pub build_time: String,
    /// The only field compared when deciding whether two records are the same build.
    pub build_id: String,
}

impl VersionRecord {
    pub fn new(version: impl Into<String>, build_id: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            build_id: build_id.into(),
            ..Self::default()
        }
    }

    pub fn with_build_time(mut self, build_time: impl Into<String>) -> Self {
        self.build_time = build_time.into();
        self
    }

    pub fn with_commit(
        mut self,
        commit: Option<String>,
        author: Option<String>,
        message: Option<String>,
    ) -> Self {
        self.commit = commit;
        self.commit_author = author;
        self.commit_message = message;
        self
    }

    /// Builds a record out of an arbitrary manifest body.
    ///
    /// Manifests written by older tooling may be partial or carry numbers where
    /// strings are expected, so every field is coerced rather than strictly
    /// deserialized. Returns `None` when the body is not a JSON object.
    pub fn from_manifest(value: &Value) -> Option<Self> {
        let object = value.as_object()?;

        Some(Self {
            version: string_field(object.get("version")),
            commit: optional_field(object.get("commit")),
            commit_author: optional_field(object.get("commitAuthor")),
            commit_message: optional_field(object.get("commitMessage")),
            build_time: string_field(object.get("buildTime")),
            build_id: string_field(object.get("buildId")),
        })
    }

    /// Short form of the build id used in prompts (`#abc1234`).
    pub fn short_build_id(&self) -> Option<String> {
        short_hash(&self.build_id)
    }
}

/// True iff `latest` names a real build that differs from `current`.
pub fn is_update(current: &VersionRecord, latest: &VersionRecord) -> bool {
    !latest.build_id.is_empty() && latest.build_id != current.build_id
}

pub(crate) fn short_hash(build_id: &str) -> Option<String> {
    if build_id.is_empty() {
        return None;
    }
    Some(format!("#{}", build_id.chars().take(7).collect::<String>()))
}

fn string_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn optional_field(value: Option<&Value>) -> Option<String> {
    let s = string_field(value);
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
