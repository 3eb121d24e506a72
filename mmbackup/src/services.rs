use crate::api::mattermost::{MattermostApi, MattermostClient};
use crate::archive::{archive_file_name, files_dir_name, write_archive};
use crate::cache::AttachmentCache;
use crate::cli::Args;
use crate::crawler::{CrawlOptions, Crawler};
use crate::credentials::Credentials;
use crate::settings;

use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub async fn run(args: Args) -> Result<()> {
    let args = settings::merge_settings_with_args(&args)?;
    let archive_path = backup(&args).await?;
    println!("Archive written to {}", archive_path.display());
    Ok(())
}

/// Log in, crawl every requested user and write the archive. Returns the path
/// of the archive file.
pub async fn backup(args: &Args) -> Result<PathBuf> {
    let url = args
        .url
        .clone()
        .context("Mattermost server URL is required, use --url or MATTERMOST_URL")?;

    // Credentials are checked before anything touches the network.
    let credentials = Credentials::from_file(&args.secrets())?;

    let base_url = MattermostClient::base_url_for(&args.scheme().to_string(), &url, args.port());
    let mut mm_client = MattermostClient::new(&base_url)?;
    mm_client
        .login(&credentials)
        .await
        .with_context(|| format!("Failed to log in to {}", base_url))?;
    info!("logged in to {}", base_url);

    let output_dir = args.output_dir();
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create directory {}", output_dir.display()))?;
    let cache = AttachmentCache::new(output_dir.join(files_dir_name(&url)));
    let options = CrawlOptions {
        ignore_direct_messages: args.ignore_direct_messages,
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let crawler = Crawler::new(&mm_client, &cache, options).with_progress(spinner.clone());
    let result = crawler.build_archive(args.users.as_slice()).await;
    spinner.finish_and_clear();

    let archive_path = output_dir.join(archive_file_name(&url, Local::now().date_naive()));
    let written = result.and_then(|archive| write_archive(&archive, &archive_path));

    if let Err(e) = written {
        if let Err(logout_error) = mm_client.logout().await {
            warn!("logout failed: {:#}", logout_error);
        }
        return Err(e);
    }
    info!("archive written to {}", archive_path.display());

    mm_client.logout().await.context("Failed to log out")?;

    Ok(archive_path)
}
