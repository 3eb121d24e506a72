use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use crate::models::{Channel, Post, Team, User};

/// Every post seen during a run, stored once and referenced by id from the
/// channel entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostTable(BTreeMap<String, Post>);

impl PostTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, post_id: String, post: Post) {
        match self.0.get(&post_id) {
            Some(previous) if *previous != post => {
                warn!("post {} was replaced by a different record", post_id);
            }
            _ => {}
        }
        self.0.insert(post_id, post);
    }

    pub fn get(&self, post_id: &str) -> Option<&Post> {
        self.0.get(post_id)
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.0.contains_key(post_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub channel: Channel,
    pub posts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamEntry {
    pub team: Team,
    pub channels: Vec<ChannelEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    pub id: String,
    pub user: User,
    pub teams: Vec<TeamEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub users: Vec<UserEntry>,
    pub posts: PostTable,
}

impl Archive {
    pub fn channel_count(&self) -> usize {
        self.users
            .iter()
            .flat_map(|user| &user.teams)
            .map(|team| team.channels.len())
            .sum()
    }
}

/// Name used for output files derived from the server address: the scheme is
/// dropped and path or port separators are flattened.
pub fn server_stem(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme
        .trim_end_matches('/')
        .replace(['/', ':'], "_")
}

pub fn archive_file_name(url: &str, date: NaiveDate) -> String {
    format!("{}-{}.json", server_stem(url), date.format("%Y-%m-%d"))
}

pub fn files_dir_name(url: &str) -> String {
    format!("{}_files", server_stem(url))
}

pub fn write_archive(archive: &Archive, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create archive {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, archive)
        .with_context(|| format!("Failed to write archive {}", path.display()))?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post(id: &str, message: &str) -> Post {
        serde_json::from_value(json!({"id": id, "message": message})).unwrap()
    }

    #[test]
    fn test_post_table_keeps_one_entry_per_id() {
        let mut posts = PostTable::new();
        posts.insert("p1".into(), post("p1", "hello"));
        posts.insert("p2".into(), post("p2", "world"));
        posts.insert("p1".into(), post("p1", "hello"));

        assert_eq!(posts.len(), 2);
        assert!(posts.contains("p2"));
        assert_eq!(posts.get("p1"), Some(&post("p1", "hello")));
    }

    #[test]
    fn test_post_table_last_write_wins() {
        let mut posts = PostTable::new();
        posts.insert("p1".into(), post("p1", "draft"));
        posts.insert("p1".into(), post("p1", "edited"));

        assert_eq!(posts.len(), 1);
        assert_eq!(posts.get("p1"), Some(&post("p1", "edited")));
    }

    #[test]
    fn test_file_names() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            archive_file_name("chat.example.com", date),
            "chat.example.com-2024-03-09.json"
        );
        assert_eq!(files_dir_name("chat.example.com"), "chat.example.com_files");
        assert_eq!(
            archive_file_name("http://127.0.0.1:8065/", date),
            "127.0.0.1_8065-2024-03-09.json"
        );
    }

    #[test]
    fn test_write_archive_layout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("archive.json");

        let mut posts = PostTable::new();
        posts.insert("p1".into(), post("p1", "hello"));
        let archive = Archive {
            users: vec![UserEntry {
                id: "me".into(),
                user: serde_json::from_value(json!({"id": "u1", "username": "alice"})).unwrap(),
                teams: vec![TeamEntry {
                    team: serde_json::from_value(json!({"id": "t1"})).unwrap(),
                    channels: vec![ChannelEntry {
                        channel: serde_json::from_value(json!({"id": "c1", "type": "O"}))
                            .unwrap(),
                        posts: vec!["p1".into()],
                    }],
                }],
            }],
            posts,
        };

        write_archive(&archive, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\n  \"users\""));
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(
            value,
            json!({
                "users": [{
                    "id": "me",
                    "user": {"id": "u1", "username": "alice"},
                    "teams": [{
                        "team": {"id": "t1"},
                        "channels": [{
                            "channel": {"id": "c1", "type": "O"},
                            "posts": ["p1"]
                        }]
                    }]
                }],
                "posts": {"p1": {"id": "p1", "message": "hello"}}
            })
        );
        assert_eq!(archive.channel_count(), 1);
    }
}
