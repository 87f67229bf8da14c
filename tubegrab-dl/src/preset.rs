//! Audio and video presets: format selectors and post-processor chains.
//!
//! **Audio:** best audio stream, converted by ffmpeg to [`AudioCodec`].
//! **Video:** best MP4 video + M4A audio merged into MP4, optionally capped by height.

use crate::dl::PostProcessor;

/// Target codec for audio extraction.
#[derive(clap::ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AudioCodec {
    #[default]
    Mp3,
    M4a,
    Aac,
    Opus,
    Vorbis,
    Wav,
    Flac,
}

impl AudioCodec {
    /// Codec name understood by `FFmpegExtractAudio`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Aac => "aac",
            Self::Opus => "opus",
            Self::Vorbis => "vorbis",
            Self::Wav => "wav",
            Self::Flac => "flac",
        }
    }
}

/// What to fetch for each URL.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Media {
    /// Audio only, converted to `codec`. `quality` is 0 (best) to 10 (worst) or a bitrate.
    Audio { codec: AudioCodec, quality: u32 },
    /// Video with audio, optionally limited to `max_height` pixels.
    Video { max_height: Option<u32> },
}

impl Default for Media {
    fn default() -> Self {
        Self::Video { max_height: None }
    }
}

impl Media {
    /// yt-dlp format selector.
    pub fn format(&self) -> String {
        match self {
            Self::Audio { .. } => "bestaudio/best".to_string(),
            Self::Video {
                max_height: Some(height),
            } => format!(
                "bestvideo[ext=mp4][height<={height}]+bestaudio[ext=m4a]/best[ext=mp4]/best"
            ),
            Self::Video { max_height: None } => {
                "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best".to_string()
            }
        }
    }

    /// Container used when separate video and audio streams are merged.
    pub fn merge_output_format(&self) -> Option<String> {
        match self {
            Self::Audio { .. } => None,
            Self::Video { .. } => Some("mp4".to_string()),
        }
    }

    /// Post-processors in execution order: extraction first, then tagging.
    pub fn postprocessors(&self, embed_metadata: bool, embed_thumbnail: bool) -> Vec<PostProcessor> {
        let mut chain = Vec::new();

        if let Self::Audio { codec, quality } = self {
            chain.push(PostProcessor::extract_audio(
                codec.as_str(),
                &quality.to_string(),
            ));
        }
        if embed_metadata {
            chain.push(PostProcessor::metadata());
        }
        if embed_thumbnail {
            chain.push(PostProcessor::embed_thumbnail());
        }

        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn audio_format_selector() {
        let media = Media::Audio {
            codec: AudioCodec::Opus,
            quality: 0,
        };

        assert_eq!(media.format(), "bestaudio/best");
        assert_eq!(media.merge_output_format(), None);
    }

    #[test]
    fn video_format_selector_uncapped() {
        let media = Media::default();

        assert_eq!(
            media.format(),
            "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best"
        );
        assert_eq!(media.merge_output_format().as_deref(), Some("mp4"));
    }

    #[test]
    fn video_format_selector_capped() {
        let media = Media::Video {
            max_height: Some(720),
        };

        assert_eq!(
            media.format(),
            "bestvideo[ext=mp4][height<=720]+bestaudio[ext=m4a]/best[ext=mp4]/best"
        );
    }

    #[test]
    fn audio_chain_extracts_before_tagging() {
        let media = Media::Audio {
            codec: AudioCodec::Flac,
            quality: 5,
        };
        let keys: Vec<_> = media
            .postprocessors(true, true)
            .into_iter()
            .map(|pp| pp.key)
            .collect();

        assert_eq!(keys, ["FFmpegExtractAudio", "FFmpegMetadata", "EmbedThumbnail"]);
    }

    #[test]
    fn audio_chain_carries_codec_and_quality() {
        let media = Media::Audio {
            codec: AudioCodec::M4a,
            quality: 192,
        };

        assert_eq!(
            media.postprocessors(false, false),
            [PostProcessor::extract_audio("m4a", "192")]
        );
    }

    #[test]
    fn video_chain_is_empty_without_embedding() {
        assert!(Media::default().postprocessors(false, false).is_empty());
        assert_eq!(
            Media::default().postprocessors(false, true),
            [PostProcessor::embed_thumbnail()]
        );
    }

    #[test]
    fn codec_names_match_value_names() {
        for codec in AudioCodec::value_variants() {
            let value = codec.to_possible_value().unwrap();
            assert_eq!(value.get_name(), codec.as_str());
        }
    }
}
