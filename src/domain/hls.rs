use super::rendition::{rendition_bitrate, Rendition};
use std::fmt::Write as _;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub const MASTER_PLAYLIST_NAME: &str = "master_playlist.m3u8";

pub struct VariantStream {
    /// Peak bitrate in bits per second.
    pub bandwidth: u64,
    pub width: u32,
    pub height: u32,
    pub uri: String,
}

pub struct MasterPlaylist {
    pub version: u8,
    pub variants: Vec<VariantStream>,
}

impl MasterPlaylist {
    pub fn new() -> Self {
        Self {
            version: 5,
            variants: Vec::new(),
        }
    }

    /// One variant per rendition, in the order given.
    pub fn for_renditions(renditions: &[Rendition], fps: u32) -> Self {
        let mut playlist = Self::new();
        for rendition in renditions {
            playlist.add_variant(VariantStream {
                bandwidth: u64::from(rendition_bitrate(rendition, fps)) * 1000,
                width: rendition.width,
                height: rendition.height,
                uri: rendition.playlist_name(),
            });
        }
        playlist
    }

    pub fn add_variant(&mut self, variant: VariantStream) {
        self.variants.push(variant);
    }

    pub fn render(&self) -> String {
        let mut out = String::from("#EXTM3U\n");
        let _ = writeln!(out, "#EXT-X-VERSION:{}", self.version);
        out.push('\n');

        for variant in &self.variants {
            let _ = writeln!(
                out,
                "#EXT-X-STREAM-INF:BANDWIDTH={},RESOLUTION={}x{}",
                variant.bandwidth, variant.width, variant.height
            );
            out.push_str(&variant.uri);
            out.push('\n');
        }

        out
    }

    pub async fn write_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let mut file = File::create(path).await?;
        file.write_all(self.render().as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

impl Default for MasterPlaylist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::fs;

    #[test]
    fn test_master_playlist_lists_renditions_in_order() {
        let renditions = [Rendition::new(1920, 1080), Rendition::new(1280, 720)];
        let content = MasterPlaylist::for_renditions(&renditions, 30).render();

        assert_eq!(
            content,
            "#EXTM3U\n\
             #EXT-X-VERSION:5\n\
             \n\
             #EXT-X-STREAM-INF:BANDWIDTH=8192000,RESOLUTION=1920x1080\n\
             1080_playlist.m3u8\n\
             #EXT-X-STREAM-INF:BANDWIDTH=5120000,RESOLUTION=1280x720\n\
             720_playlist.m3u8\n"
        );
        assert_eq!(content.matches("#EXT-X-STREAM-INF").count(), 2);
    }

    #[test]
    fn test_empty_master_playlist_has_only_header() {
        let content = MasterPlaylist::for_renditions(&[], 30).render();
        assert_eq!(content, "#EXTM3U\n#EXT-X-VERSION:5\n\n");
    }

    #[tokio::test]
    async fn test_write_master_playlist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MASTER_PLAYLIST_NAME);

        let playlist = MasterPlaylist::for_renditions(&[Rendition::new(640, 360)], 60);
        playlist.write_to(&path).await.unwrap();

        let content = fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("BANDWIDTH=1536000,RESOLUTION=640x360"));
        assert!(content.ends_with("360_playlist.m3u8\n"));
    }
}
