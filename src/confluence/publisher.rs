use crate::confluence::client::ConfluenceClient;
use crate::confluence::models::{PageUpdate, WikiPage};
use crate::error::Result;
use tracing::info;

/// Overwrite `page_id` with `new_body`, bumping the version by one.
///
/// The page is fetched first for its title and current version; the update
/// carries exactly that version plus one. A concurrent writer between the
/// two calls surfaces as a version conflict, which propagates unretried.
pub async fn publish(client: &ConfluenceClient, page_id: &str, new_body: &str) -> Result<WikiPage> {
    let page = client.get_page(page_id).await?;
    let next_version = page.version.number + 1;

    let update = PageUpdate::new(page.title, next_version, new_body);
    let updated = client.update_page(page_id, &update).await?;

    info!("Published page {} at version {}", page_id, next_version);
    Ok(updated)
}
