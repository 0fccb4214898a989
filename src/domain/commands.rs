//! Argument planning for every external probe/transcode invocation.
//!
//! Nothing here touches the filesystem or spawns processes; the planner only
//! decides which tool runs with which discrete arguments.

use super::rendition::{rendition_bitrate, Rendition};
use super::task::{ShortInputMetadata, Task};
use rand::Rng;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const HLS_SEGMENT_SECONDS: u32 = 4;
pub const POSTER_COUNT: usize = 3;
pub const IMAGE_FORMATS: [&str; 2] = ["jpg", "webp"];
pub const THUMBNAIL_SIZE: &str = "240x135";
const CRF: &str = "25";
const TARGET_AUDIO_CODEC: &str = "aac";
const TARGET_VIDEO_CODEC: &str = "h264";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Probe,
    Transcode,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Probe => write!(f, "probe"),
            Tool::Transcode => write!(f, "transcode"),
        }
    }
}

/// A single external invocation: which tool and its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub tool: Tool,
    pub args: Vec<String>,
}

impl CommandSpec {
    fn new(tool: Tool) -> Self {
        Self {
            tool,
            args: Vec::new(),
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Value following `flag`, if present.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Last argument; the output file for every transcode/capture spec.
    pub fn output(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tool, self.args.join(" "))
    }
}

/// Captures of one poster: the sampled offset and both encoded images.
#[derive(Debug, Clone)]
pub struct PosterCapture {
    pub index: usize,
    pub offset: Duration,
    pub commands: Vec<CommandSpec>,
}

#[derive(Debug, Clone)]
pub struct CommandPlanner {
    output_root: PathBuf,
}

impl CommandPlanner {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// `<root>/<task id>/`
    pub fn task_dir(&self, task: &Task) -> PathBuf {
        self.output_root.join(task.id.to_string())
    }

    pub fn plan_probe(&self, task: &Task) -> CommandSpec {
        CommandSpec::new(Tool::Probe)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(task.input.as_str())
    }

    /// One HLS transcode per rendition, in the order given.
    pub fn plan_transcode(
        &self,
        task: &Task,
        meta: &ShortInputMetadata,
        renditions: &[Rendition],
    ) -> Vec<CommandSpec> {
        let dir = self.task_dir(task);

        renditions
            .iter()
            .map(|rendition| {
                let mut spec = CommandSpec::new(Tool::Transcode)
                    .args(["-hide_banner", "-y", "-i"])
                    .arg(task.input.as_str());

                if meta.audio_codec != TARGET_AUDIO_CODEC {
                    spec = spec.args(["-c:a", TARGET_AUDIO_CODEC]);
                }
                if meta.video_codec != TARGET_VIDEO_CODEC {
                    spec = spec.args(["-c:v", TARGET_VIDEO_CODEC]);
                }

                spec.args(["-sn", "-profile:v", "main", "-crf", CRF, "-r"])
                    .arg(meta.fps.to_string())
                    .arg("-force_key_frames")
                    .arg(format!("expr:gte(t,n_forced*{})", HLS_SEGMENT_SECONDS))
                    .args(["-pix_fmt", "yuv420p", "-movflags", "+faststart"])
                    .args(["-sc_threshold", "0", "-vf"])
                    .arg(format!("scale={}:-2", rendition.width))
                    .arg("-b:v")
                    .arg(format!("{}k", rendition_bitrate(rendition, meta.fps)))
                    .args(["-f", "hls", "-hls_time"])
                    .arg(HLS_SEGMENT_SECONDS.to_string())
                    .args(["-hls_playlist_type", "vod", "-hls_segment_filename"])
                    .arg(path_arg(&dir.join(rendition.segment_pattern())))
                    .arg(path_arg(&dir.join(rendition.playlist_name())))
            })
            .collect()
    }

    /// Single-frame captures at random offsets away from the start and end.
    pub fn plan_posters<R: Rng + ?Sized>(
        &self,
        task: &Task,
        meta: &ShortInputMetadata,
        rng: &mut R,
    ) -> Vec<PosterCapture> {
        (1..=POSTER_COUNT)
            .map(|index| {
                let offset = sample_poster_offset(meta.duration, rng);
                let timestamp = format_timestamp(offset);

                let commands = IMAGE_FORMATS
                    .into_iter()
                    .map(|ext| {
                        CommandSpec::new(Tool::Transcode)
                            .args(["-hide_banner", "-y", "-ss"])
                            .arg(timestamp.as_str())
                            .arg("-i")
                            .arg(task.input.as_str())
                            .args(["-frames:v", "1"])
                            .arg(path_arg(&self.poster_path(task, index, ext)))
                    })
                    .collect();

                PosterCapture {
                    index,
                    offset,
                    commands,
                }
            })
            .collect()
    }

    /// Small re-encodes of the posters; the posters must exist first.
    pub fn plan_thumbnails(&self, task: &Task) -> Vec<CommandSpec> {
        let dir = self.task_dir(task);

        (1..=POSTER_COUNT)
            .flat_map(|index| IMAGE_FORMATS.into_iter().map(move |ext| (index, ext)))
            .map(|(index, ext)| {
                CommandSpec::new(Tool::Transcode)
                    .args(["-hide_banner", "-y", "-i"])
                    .arg(path_arg(&self.poster_path(task, index, ext)))
                    .args(["-s", THUMBNAIL_SIZE, "-frames:v", "1"])
                    .arg(path_arg(&dir.join(format!("thumbnail_{}.{}", index, ext))))
            })
            .collect()
    }

    fn poster_path(&self, task: &Task, index: usize, ext: &str) -> PathBuf {
        self.task_dir(task).join(format!("poster_{}.{}", index, ext))
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Uniform offset strictly inside (20%, 80%) of `duration_secs`, at
/// millisecond resolution. Falls back to the midpoint when that interval has
/// no interior millisecond.
pub fn sample_poster_offset<R: Rng + ?Sized>(duration_secs: u64, rng: &mut R) -> Duration {
    let total_ms = duration_secs.saturating_mul(1000);
    let lower = total_ms / 5 + 1;
    let upper = total_ms / 5 * 4;

    let ms = if lower < upper {
        rng.gen_range(lower..upper)
    } else {
        total_ms / 2
    };
    Duration::from_millis(ms)
}

/// `HH:MM:SS.mmm`
pub fn format_timestamp(offset: Duration) -> String {
    let total_ms = offset.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = total_ms / 60_000 % 60;
    let seconds = total_ms / 1000 % 60;
    let millis = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rendition::select_renditions;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn task() -> Task {
        Task {
            id: 42,
            input: "/media/in.mkv".to_string(),
            ..Default::default()
        }
    }

    fn meta(video_codec: &str, audio_codec: &str, fps: u32) -> ShortInputMetadata {
        ShortInputMetadata {
            format: "Matroska / WebM".to_string(),
            size: 1,
            video_codec: video_codec.to_string(),
            height: 1080,
            width: 1920,
            aspect_ratio: "16:9".to_string(),
            fps,
            audio_codec: audio_codec.to_string(),
            duration: 600,
        }
    }

    #[test]
    fn test_probe_spec() {
        let spec = CommandPlanner::new("/out").plan_probe(&task());
        assert_eq!(spec.tool, Tool::Probe);
        assert_eq!(
            spec.args,
            vec![
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "/media/in.mkv"
            ]
        );
    }

    #[test]
    fn test_transcode_spec_per_rendition() {
        let planner = CommandPlanner::new("/out");
        let meta = meta("hevc", "opus", 60);
        let renditions = select_renditions(meta.width, meta.height, &meta.aspect_ratio);
        let specs = planner.plan_transcode(&task(), &meta, &renditions);

        assert_eq!(specs.len(), 5);
        let first = &specs[0];
        assert_eq!(first.tool, Tool::Transcode);
        assert_eq!(first.value_of("-i"), Some("/media/in.mkv"));
        assert_eq!(first.value_of("-c:a"), Some("aac"));
        assert_eq!(first.value_of("-c:v"), Some("h264"));
        assert_eq!(first.value_of("-crf"), Some("25"));
        assert_eq!(first.value_of("-r"), Some("60"));
        assert_eq!(
            first.value_of("-force_key_frames"),
            Some("expr:gte(t,n_forced*4)")
        );
        assert_eq!(first.value_of("-pix_fmt"), Some("yuv420p"));
        assert_eq!(first.value_of("-movflags"), Some("+faststart"));
        assert_eq!(first.value_of("-vf"), Some("scale=1920:-2"));
        assert_eq!(first.value_of("-b:v"), Some("12288k"));
        assert_eq!(first.value_of("-hls_time"), Some("4"));
        assert_eq!(
            first.value_of("-hls_segment_filename"),
            Some("/out/42/1080_%03d.ts")
        );
        assert_eq!(first.output(), Some("/out/42/1080_playlist.m3u8"));

        let widths: Vec<_> = specs.iter().map(|s| s.value_of("-vf").unwrap()).collect();
        assert_eq!(
            widths,
            vec![
                "scale=1920:-2",
                "scale=1280:-2",
                "scale=854:-2",
                "scale=640:-2",
                "scale=426:-2"
            ]
        );
    }

    #[test]
    fn test_baseline_codecs_are_not_forced() {
        let planner = CommandPlanner::new("/out");
        let specs = planner.plan_transcode(
            &task(),
            &meta("h264", "aac", 30),
            &[Rendition::new(1280, 720)],
        );

        assert!(!specs[0].has_flag("-c:a"));
        assert!(!specs[0].has_flag("-c:v"));
        assert_eq!(specs[0].value_of("-b:v"), Some("5120k"));
    }

    #[test]
    fn test_no_renditions_no_transcodes() {
        let planner = CommandPlanner::new("/out");
        assert!(planner
            .plan_transcode(&task(), &meta("h264", "aac", 30), &[])
            .is_empty());
    }

    #[test]
    fn test_poster_specs() {
        let planner = CommandPlanner::new("/out");
        let mut rng = StdRng::seed_from_u64(7);
        let posters = planner.plan_posters(&task(), &meta("h264", "aac", 30), &mut rng);

        assert_eq!(posters.len(), POSTER_COUNT);
        for (i, poster) in posters.iter().enumerate() {
            assert_eq!(poster.index, i + 1);
            assert_eq!(poster.commands.len(), 2);

            let timestamp = format_timestamp(poster.offset);
            for (spec, ext) in poster.commands.iter().zip(IMAGE_FORMATS) {
                assert_eq!(spec.value_of("-ss"), Some(timestamp.as_str()));
                assert_eq!(spec.value_of("-frames:v"), Some("1"));
                assert_eq!(
                    spec.output(),
                    Some(format!("/out/42/poster_{}.{}", i + 1, ext).as_str())
                );
            }
        }
    }

    #[test]
    fn test_thumbnails_read_posters() {
        let planner = CommandPlanner::new("/out");
        let specs = planner.plan_thumbnails(&task());

        assert_eq!(specs.len(), POSTER_COUNT * IMAGE_FORMATS.len());
        assert_eq!(specs[0].value_of("-i"), Some("/out/42/poster_1.jpg"));
        assert_eq!(specs[0].output(), Some("/out/42/thumbnail_1.jpg"));
        assert_eq!(specs[5].value_of("-i"), Some("/out/42/poster_3.webp"));
        assert_eq!(specs[5].output(), Some("/out/42/thumbnail_3.webp"));
        assert!(specs.iter().all(|s| s.value_of("-s") == Some("240x135")));
    }

    #[test]
    fn test_poster_offsets_stay_inside_middle_sixty_percent() {
        let mut rng = StdRng::seed_from_u64(1);
        for duration in [10u64, 11, 37, 60, 599, 3600, 7 * 3600] {
            let lower = Duration::from_millis(duration * 200);
            let upper = Duration::from_millis(duration * 800);
            for _ in 0..500 {
                let offset = sample_poster_offset(duration, &mut rng);
                assert!(offset > lower && offset < upper, "{:?} of {}s", offset, duration);
            }
        }
    }

    #[test]
    fn test_zero_duration_samples_start() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sample_poster_offset(0, &mut rng), Duration::ZERO);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(Duration::from_millis(0)), "00:00:00.000");
        assert_eq!(
            format_timestamp(Duration::from_millis(3_723_045)),
            "01:02:03.045"
        );
    }
}
