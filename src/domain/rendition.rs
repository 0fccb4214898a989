use serde::Serialize;

/// Frame rates above this are treated as high-framerate content.
pub const HIGH_FRAMERATE_FROM: u32 = 48;
/// Bitrate multiplier applied to high-framerate content.
pub const HIGH_FRAMERATE_FACTOR: f64 = 1.5;

/// One output quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rendition {
    pub height: u32,
    pub width: u32,
}

impl Rendition {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { height, width }
    }

    /// Base video bitrate in kbps, before any framerate scaling.
    pub fn base_bitrate(&self) -> Option<u32> {
        let kbps = match (self.width, self.height) {
            (2560, 1440) => 16 * 1024,
            (1920, 1080) => 8 * 1024,
            (1280, 720) => 5 * 1024,
            (854, 480) => 5 * 512,
            (640, 360) => 1024,
            (426, 240) => 512,
            _ => return None,
        };
        Some(kbps)
    }

    pub fn playlist_name(&self) -> String {
        format!("{}_playlist.m3u8", self.height)
    }

    pub fn segment_pattern(&self) -> String {
        format!("{}_%03d.ts", self.height)
    }
}

// Descending height; selection relies on this order.
const WIDESCREEN: &[Rendition] = &[
    Rendition::new(2560, 1440),
    Rendition::new(1920, 1080),
    Rendition::new(1280, 720),
    Rendition::new(854, 480),
    Rendition::new(640, 360),
    Rendition::new(426, 240),
];

fn renditions_for(aspect_ratio: &str) -> &'static [Rendition] {
    match aspect_ratio {
        "16:9" => WIDESCREEN,
        _ => &[],
    }
}

/// Renditions applicable to a source, never upscaling.
///
/// Unknown aspect ratios yield no renditions at all.
pub fn select_renditions(_width: u32, height: u32, aspect_ratio: &str) -> Vec<Rendition> {
    renditions_for(aspect_ratio)
        .iter()
        .filter(|r| r.height <= height)
        .copied()
        .collect()
}

/// Target video bitrate in kbps for a rendition at the given frame rate.
pub fn rendition_bitrate(rendition: &Rendition, fps: u32) -> u32 {
    let bitrate = rendition.base_bitrate().unwrap_or(0);

    if fps <= HIGH_FRAMERATE_FROM {
        return bitrate;
    }

    (f64::from(bitrate) * HIGH_FRAMERATE_FACTOR).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heights(renditions: &[Rendition]) -> Vec<u32> {
        renditions.iter().map(|r| r.height).collect()
    }

    #[test]
    fn test_full_hd_source_excludes_1440() {
        let renditions = select_renditions(1920, 1080, "16:9");
        assert_eq!(heights(&renditions), vec![1080, 720, 480, 360, 240]);
    }

    #[test]
    fn test_never_upscales() {
        for source_height in [100, 240, 500, 719, 720, 1439, 2160] {
            let renditions = select_renditions(0, source_height, "16:9");
            assert!(renditions.iter().all(|r| r.height <= source_height));
        }
        assert!(select_renditions(320, 180, "16:9").is_empty());
        assert_eq!(heights(&select_renditions(3840, 2160, "16:9")).len(), 6);
    }

    #[test]
    fn test_unknown_aspect_ratio_has_no_renditions() {
        assert!(select_renditions(1440, 1080, "4:3").is_empty());
        assert!(select_renditions(1920, 1080, "").is_empty());
    }

    #[test]
    fn test_bitrate_standard_and_high_framerate() {
        let full_hd = Rendition::new(1920, 1080);
        assert_eq!(rendition_bitrate(&full_hd, 24), 8192);
        assert_eq!(rendition_bitrate(&full_hd, 48), 8192);
        assert_eq!(rendition_bitrate(&full_hd, 60), 12288);
    }

    #[test]
    fn test_high_framerate_bitrate_is_rounded() {
        // 2560 * 1.5 = 3840, 512 * 1.5 = 768
        assert_eq!(rendition_bitrate(&Rendition::new(854, 480), 50), 3840);
        assert_eq!(rendition_bitrate(&Rendition::new(426, 240), 60), 768);
    }

    #[test]
    fn test_renditions_are_value_keys() {
        let a = Rendition::new(1280, 720);
        let b = Rendition { height: 720, width: 1280 };
        assert_eq!(a, b);
        assert_eq!(a.base_bitrate(), b.base_bitrate());
        assert_eq!(a.playlist_name(), "720_playlist.m3u8");
        assert_eq!(a.segment_pattern(), "720_%03d.ts");
    }
}
