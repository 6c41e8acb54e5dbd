use std::future::Future;

use futures::{Stream, StreamExt, stream};
use tracing::debug;

use crate::{
    error::Result,
    types::{AccountDetails, PromptContentCollection, Section},
};

/// Turn a prompt content collection into a lazy, single-pass stream of sections.
///
/// Sections come out in collection order (videos, then sections within a video).
/// `embedding_cb` runs once per section, on that section's content, only when the
/// stream is polled for it. Videos without sections contribute nothing.
pub fn get_sections_generator<F, Fut>(
    collection: PromptContentCollection,
    account: AccountDetails,
    mut embedding_cb: F,
    embeddings_col_name: impl Into<String>,
) -> impl Stream<Item = Result<Section>>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Vec<f32>>>,
{
    let embeddings_col_name = embeddings_col_name.into();

    let drafts = collection.videos.into_iter().flat_map(move |mut video| {
        if video.is_empty() {
            debug!(video_id = %video.video_id, "no prompt content sections");
        }
        let sections = std::mem::take(&mut video.sections);
        sections
            .into_iter()
            .map(|section| Section::draft(&account, &video, section))
            .collect::<Vec<_>>()
    });

    stream::iter(drafts).then(move |draft| {
        let embeddings = embedding_cb(draft.content.clone());
        let field = embeddings_col_name.clone();
        async move {
            let embeddings = embeddings.await?;
            Ok(draft.with_embeddings(&field, embeddings))
        }
    })
}
