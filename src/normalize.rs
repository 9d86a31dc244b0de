use crate::{ffmpeg::MediaTools, process::ProcessError, tmp_file::TmpFile};

/// Remux `input` into its `.processing` sibling with the container index moved to the front
///
/// The input is left untouched. On failure the partial output is removed and the tool's error,
/// including its stderr, is returned as-is.
#[tracing::instrument(skip(tools))]
pub(crate) async fn normalize(
    tools: &dyn MediaTools,
    input: &TmpFile,
) -> Result<TmpFile, ProcessError> {
    let output = input.processing();

    match tools.remux_faststart(input, &output).await {
        Ok(()) => Ok(output),
        Err(e) => {
            output.release().await;
            Err(e)
        }
    }
}
