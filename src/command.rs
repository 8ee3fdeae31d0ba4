//! ffmpeg argument assembly for the slideshow render.
//!
//! Pure functions only; nothing here spawns a process.

use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    /// Anything other than `portrait` renders landscape.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("portrait") {
            Self::Portrait
        } else {
            Self::Landscape
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
        }
    }

    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Landscape => (1920, 1080),
            Self::Portrait => (1080, 1920),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MixSettings {
    pub narration_gain: f64,
    pub background_gain: f64,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            narration_gain: 1.0,
            background_gain: 0.3,
        }
    }
}

/// Slow centered zoom per image plus a fade at both ends of the video.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSettings {
    pub enabled: bool,
    pub fps: u32,
    pub zoom_step: f64,
    pub max_zoom: f64,
    pub fade_seconds: f64,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            fps: 25,
            zoom_step: 0.0015,
            max_zoom: 1.5,
            fade_seconds: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub preset: String,
    pub profile: String,
    pub level: String,
    pub pix_fmt: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub mix: MixSettings,
    pub motion: MotionSettings,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            preset: "fast".to_string(),
            profile: "high".to_string(),
            level: "4.2".to_string(),
            pix_fmt: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            mix: MixSettings::default(),
            motion: MotionSettings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EncodePlan<'a> {
    pub manifest: &'a Path,
    pub narration: &'a Path,
    pub background: Option<&'a Path>,
    pub orientation: Orientation,
    pub output: &'a Path,
    pub seconds_per_image: f64,
    pub image_count: usize,
}

pub fn video_filter(
    orientation: Orientation,
    motion: &MotionSettings,
    seconds_per_image: f64,
    image_count: usize,
) -> String {
    let (w, h) = orientation.dimensions();
    let base = format!("scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}");
    if !motion.enabled {
        return base;
    }

    let frames = ((seconds_per_image * motion.fps as f64).round() as u64).max(1);
    let total = seconds_per_image * image_count.max(1) as f64;
    let fade_out_start = (total - motion.fade_seconds).max(0.0);

    format!(
        "{base},zoompan=z='min(zoom+{step},{max})':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d={frames}:s={w}x{h}:fps={fps},fade=t=in:st=0:d={fade},fade=t=out:st={fade_out_start:.3}:d={fade}",
        step = motion.zoom_step,
        max = motion.max_zoom,
        fps = motion.fps,
        fade = motion.fade_seconds,
    )
}

pub fn audio_mix_filter(mix: &MixSettings) -> String {
    // normalize=0: the configured gains are the final levels, amix must not rescale them
    format!(
        "[1:a]volume={}[narr];[2:a]volume={}[bg];\
         [narr][bg]amix=inputs=2:duration=first:dropout_transition=2:normalize=0[a]",
        mix.narration_gain, mix.background_gain
    )
}

/// Full ffmpeg argument list, program name excluded.
pub fn build_encode_args(plan: &EncodePlan<'_>, settings: &EncodeSettings) -> Vec<String> {
    let mut args: Vec<String> = [
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-f",
        "concat",
        "-safe",
        "0",
        "-i",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push(plan.manifest.display().to_string());
    args.push("-i".to_string());
    args.push(plan.narration.display().to_string());

    if let Some(background) = plan.background {
        args.extend(["-stream_loop", "-1", "-i"].map(String::from));
        args.push(background.display().to_string());
    }

    let vf = video_filter(
        plan.orientation,
        &settings.motion,
        plan.seconds_per_image,
        plan.image_count,
    );

    match plan.background {
        None => {
            args.extend(["-map", "0:v:0", "-map", "1:a:0", "-vf"].map(String::from));
            args.push(vf);
        }
        Some(_) => {
            args.extend(["-map", "0:v:0", "-map", "[a]", "-vf"].map(String::from));
            args.push(vf);
            args.push("-filter_complex".to_string());
            args.push(audio_mix_filter(&settings.mix));
        }
    }

    args.extend([
        "-c:v".to_string(),
        settings.video_codec.clone(),
        "-preset".to_string(),
        settings.preset.clone(),
        "-profile:v".to_string(),
        settings.profile.clone(),
        "-level".to_string(),
        settings.level.clone(),
        "-pix_fmt".to_string(),
        settings.pix_fmt.clone(),
        "-c:a".to_string(),
        settings.audio_codec.clone(),
        "-b:a".to_string(),
        settings.audio_bitrate.clone(),
        "-shortest".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        plan.output.display().to_string(),
    ]);

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Paths {
        manifest: PathBuf,
        narration: PathBuf,
        background: PathBuf,
        output: PathBuf,
    }

    fn paths() -> Paths {
        Paths {
            manifest: PathBuf::from("/tmp/images-1.txt"),
            narration: PathBuf::from("/tmp/narration-1.mp3"),
            background: PathBuf::from("/tmp/background-1.mp3"),
            output: PathBuf::from("/tmp/video-1.mp4"),
        }
    }

    fn plan<'a>(p: &'a Paths, background: bool, orientation: Orientation) -> EncodePlan<'a> {
        EncodePlan {
            manifest: &p.manifest,
            narration: &p.narration,
            background: background.then_some(p.background.as_path()),
            orientation,
            output: &p.output,
            seconds_per_image: 5.0,
            image_count: 2,
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn orientation_parse_defaults_to_landscape() {
        assert_eq!(Orientation::parse("portrait"), Orientation::Portrait);
        assert_eq!(Orientation::parse(" Portrait "), Orientation::Portrait);
        assert_eq!(Orientation::parse("landscape"), Orientation::Landscape);
        assert_eq!(Orientation::parse("square"), Orientation::Landscape);
        assert_eq!(Orientation::parse(""), Orientation::Landscape);
    }

    #[test]
    fn narration_only_maps_audio_directly() {
        let p = paths();
        let args = build_encode_args(
            &plan(&p, false, Orientation::Landscape),
            &EncodeSettings::default(),
        );

        assert!(!args.iter().any(|a| a == "-stream_loop"));
        assert!(!args.iter().any(|a| a == "-filter_complex"));
        assert!(!args.iter().any(|a| a.contains("amix")));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "1:a:0"));
        assert_eq!(
            value_after(&args, "-vf"),
            Some("scale=1920:1080:force_original_aspect_ratio=increase,crop=1920:1080")
        );
        assert_eq!(args.last().map(String::as_str), Some("/tmp/video-1.mp4"));
        assert!(args.iter().any(|a| a == "-shortest"));
    }

    #[test]
    fn background_is_looped_and_mixed() {
        let p = paths();
        let settings = EncodeSettings {
            mix: MixSettings {
                narration_gain: 1.0,
                background_gain: 0.8,
            },
            ..EncodeSettings::default()
        };
        let args = build_encode_args(&plan(&p, true, Orientation::Portrait), &settings);

        let loop_at = args
            .iter()
            .position(|a| a == "-stream_loop")
            .expect("loop flag present");
        assert_eq!(args[loop_at + 1], "-1");
        assert_eq!(args[loop_at + 2], "-i");
        assert_eq!(args[loop_at + 3], "/tmp/background-1.mp3");

        let mix = value_after(&args, "-filter_complex").expect("mix filter");
        assert!(mix.contains("[2:a]volume=0.8[bg]"));
        assert!(mix.contains("amix=inputs=2"));
        assert!(mix.ends_with(":normalize=0[a]"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "[a]"));
        assert!(!args.windows(2).any(|w| w[0] == "-map" && w[1] == "1:a:0"));
        assert_eq!(
            value_after(&args, "-vf"),
            Some("scale=1080:1920:force_original_aspect_ratio=increase,crop=1080:1920")
        );
    }

    #[test]
    fn fixed_codec_profile_is_applied() {
        let p = paths();
        let args = build_encode_args(
            &plan(&p, true, Orientation::Landscape),
            &EncodeSettings::default(),
        );
        assert_eq!(value_after(&args, "-c:v"), Some("libx264"));
        assert_eq!(value_after(&args, "-profile:v"), Some("high"));
        assert_eq!(value_after(&args, "-level"), Some("4.2"));
        assert_eq!(value_after(&args, "-pix_fmt"), Some("yuv420p"));
        assert_eq!(value_after(&args, "-c:a"), Some("aac"));
        assert_eq!(value_after(&args, "-b:a"), Some("192k"));
        assert!(args.iter().any(|a| a == "-shortest"));
    }

    #[test]
    fn mix_gains_are_not_rescaled_by_amix() {
        let mix = audio_mix_filter(&MixSettings::default());
        assert_eq!(
            mix,
            "[1:a]volume=1[narr];[2:a]volume=0.3[bg];\
             [narr][bg]amix=inputs=2:duration=first:dropout_transition=2:normalize=0[a]"
        );
    }

    #[test]
    fn motion_chain_is_timed_to_images() {
        let motion = MotionSettings {
            enabled: true,
            ..MotionSettings::default()
        };
        let vf = video_filter(Orientation::Landscape, &motion, 4.0, 3);
        assert!(vf.starts_with(
            "scale=1920:1080:force_original_aspect_ratio=increase,crop=1920:1080,"
        ));
        assert!(vf.contains("zoompan="));
        assert!(vf.contains(":d=100:s=1920x1080:fps=25"));
        assert!(vf.contains("fade=t=in:st=0:d=0.5"));
        assert!(vf.contains("fade=t=out:st=11.500:d=0.5"));
    }
}
