//! Poster frame extraction.

use std::path::Path;

use adreel_models::encoding::{THUMBNAIL_SCALE_WIDTH, THUMBNAIL_TIMESTAMP};

use crate::command::FfmpegCommand;
use crate::error::MediaResult;
use crate::pool::EncoderPool;

fn poster_filter() -> String {
    format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH)
}

/// Build the poster extraction command.
pub fn poster_command(video_path: &Path, output_path: &Path) -> FfmpegCommand {
    FfmpegCommand::new(video_path, output_path)
        .input_arg("-ss")
        .input_arg(THUMBNAIL_TIMESTAMP)
        .single_frame()
        .video_filter(poster_filter())
}

/// Extract a JPEG poster frame from the final video.
pub async fn generate_poster(
    pool: &EncoderPool,
    video_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let cmd = poster_command(video_path.as_ref(), output_path.as_ref());
    pool.run("thumbnail", &cmd).await
}
