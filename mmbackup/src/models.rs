pub mod mattermost;

pub use mattermost::{Channel, Post, PostList, PostMetaFile, Team, User};
