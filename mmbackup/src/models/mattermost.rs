use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub const DIRECT_CHANNEL: &str = "D";
pub const GROUP_CHANNEL: &str = "G";

/// Server fields that the crawler passes through without interpreting.
pub type Extra = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type", default)]
    pub channel_type: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Channel {
    pub fn is_direct_or_group(&self) -> bool {
        self.channel_type == DIRECT_CHANNEL || self.channel_type == GROUP_CHANNEL
    }

    pub fn display_name(&self) -> &str {
        self.extra
            .get("display_name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PostMetaData>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Post {
    /// Attachments declared in the post metadata, in server order.
    pub fn files(&self) -> &[PostMetaFile] {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.files.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMetaData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<PostMetaFile>>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostMetaFile {
    pub id: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One page of `GET /channels/{id}/posts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostList {
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub posts: HashMap<String, Post>,
}
