use anyhow::{Context, Result};
use futures::{Stream, TryStreamExt, stream};
use indicatif::ProgressBar;
use log::{debug, info};
use std::pin::pin;

use crate::api::mattermost::MattermostApi;
use crate::archive::{Archive, ChannelEntry, PostTable, TeamEntry, UserEntry};
use crate::cache::{AttachmentCache, CacheOutcome};
use crate::models::*;

#[derive(Debug, Clone, Copy, Default)]
pub struct CrawlOptions {
    /// Skip direct ("D") and group ("G") message channels.
    pub ignore_direct_messages: bool,
}

/// Pages of a channel's posts, starting at page 0. The stream ends at the
/// first page without posts; that page is requested but not yielded.
pub fn post_pages<'a, A: MattermostApi>(
    api: &'a A,
    channel_id: &'a str,
) -> impl Stream<Item = Result<PostList>> + 'a {
    stream::try_unfold(0u32, move |page| async move {
        debug!("channel {}, page {}", channel_id, page);
        let posts_page = api
            .get_posts_for_channel(channel_id, page)
            .await
            .with_context(|| format!("Failed to fetch page {} of channel {}", page, channel_id))?;

        let next = if posts_page.posts.is_empty() {
            None
        } else {
            Some((posts_page, page + 1))
        };
        Ok::<_, anyhow::Error>(next)
    })
}

pub struct Crawler<'a, A: MattermostApi> {
    api: &'a A,
    cache: &'a AttachmentCache,
    options: CrawlOptions,
    progress: ProgressBar,
}

impl<'a, A: MattermostApi> Crawler<'a, A> {
    pub fn new(api: &'a A, cache: &'a AttachmentCache, options: CrawlOptions) -> Self {
        Self {
            api,
            cache,
            options,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub async fn build_archive<S: AsRef<str>>(&self, user_ids: &[S]) -> Result<Archive> {
        let mut archive = Archive::default();

        for user_id in user_ids {
            let user_id = user_id.as_ref();
            info!("backing up user {}", user_id);

            let user = self
                .api
                .get_user(user_id)
                .await
                .with_context(|| format!("Failed to fetch user {}", user_id))?;
            let teams = self.walk_user(user_id, &mut archive.posts).await?;

            archive.users.push(UserEntry {
                id: user_id.to_string(),
                user,
                teams,
            });
        }

        info!(
            "collected {} posts from {} channels",
            archive.posts.len(),
            archive.channel_count()
        );

        Ok(archive)
    }

    pub async fn walk_user(&self, user_id: &str, posts: &mut PostTable) -> Result<Vec<TeamEntry>> {
        let teams = self
            .api
            .get_user_teams(user_id)
            .await
            .with_context(|| format!("Failed to fetch teams of user {}", user_id))?;

        let mut entries = Vec::with_capacity(teams.len());
        for team in teams {
            debug!("team {}", team.id);
            let channels = self.walk_team(user_id, &team, posts).await?;
            entries.push(TeamEntry { team, channels });
        }

        Ok(entries)
    }

    async fn walk_team(
        &self,
        user_id: &str,
        team: &Team,
        posts: &mut PostTable,
    ) -> Result<Vec<ChannelEntry>> {
        let channels = self
            .api
            .get_channels_for_user(user_id, &team.id)
            .await
            .with_context(|| format!("Failed to fetch channels of team {}", team.id))?;

        let mut entries = Vec::new();
        for channel in channels {
            if self.options.ignore_direct_messages && channel.is_direct_or_group() {
                debug!("skip direct message channel {}", channel.id);
                continue;
            }

            debug!("channel {}", channel.id);
            self.progress.set_message(channel.display_name().to_string());
            let order = self.walk_channel_posts(&channel.id, posts).await?;
            entries.push(ChannelEntry {
                channel,
                posts: order,
            });
        }

        Ok(entries)
    }

    /// Fetch every post of a channel into `posts`, caching attachments on the
    /// way, and return the channel's post ids in page order.
    pub async fn walk_channel_posts(
        &self,
        channel_id: &str,
        posts: &mut PostTable,
    ) -> Result<Vec<String>> {
        let mut order = Vec::new();
        let mut pages = pin!(post_pages(self.api, channel_id));

        while let Some(posts_page) = pages.try_next().await? {
            self.progress.tick();
            let PostList {
                order: page_order,
                posts: mut page_posts,
            } = posts_page;

            // Posts are visited in server order; any post missing from the
            // order list follows, sorted by id.
            let mut unordered: Vec<String> = page_posts
                .keys()
                .filter(|post_id| !page_order.contains(post_id))
                .cloned()
                .collect();
            unordered.sort();

            for post_id in page_order.iter().chain(&unordered) {
                if let Some(post) = page_posts.remove(post_id) {
                    self.cache_attachments(&post).await?;
                    posts.insert(post_id.clone(), post);
                }
            }

            order.extend(page_order);
        }

        Ok(order)
    }

    async fn cache_attachments(&self, post: &Post) -> Result<()> {
        for file in post.files() {
            let outcome = self
                .cache
                .ensure_cached(&file.id, |file_id| {
                    let file_id = file_id.to_string();
                    async move { self.api.get_file(&file_id).await }
                })
                .await
                .with_context(|| format!("Failed to cache file {} of post {}", file.id, post.id))?;

            if let CacheOutcome::Fetched(size) = outcome {
                debug!("stored file {} ({} bytes)", file.id, size);
            }
        }

        Ok(())
    }
}
