use std::sync::Arc;

use crate::{
    config::Configuration, ffmpeg::MediaTools, repo::ArcRepo, thumbnail::ThumbnailStore,
    tmp_file::ArcTmpDir,
};

#[derive(Clone)]
pub(crate) struct State<S> {
    pub(super) config: Configuration,
    pub(super) tmp_dir: ArcTmpDir,
    pub(super) repo: ArcRepo,
    pub(super) store: S,
    pub(super) tools: Arc<dyn MediaTools>,
    pub(super) thumbnails: ThumbnailStore,
}
