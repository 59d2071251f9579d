//! Capture sources and frame encoding.
//!
//! A [`FrameSource`] hands out the most recent raw frame, or nothing if
//! no frame is available yet. [`encode_jpeg`] turns a raw frame into the
//! base64 JPEG carried by the outbound wire message.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use tokio::sync::watch;
use tracing::debug;
use wavegrid_types::FrameMessage;

/// Errors from capture sources and the encoder.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// The capture device (or directory) cannot be opened.
    #[error("capture source unavailable at {path}: {source}")]
    Unavailable {
        /// Where the source was expected.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A captured image could not be read or decoded.
    #[error("failed to load frame from {path}: {source}")]
    Load {
        /// File being loaded.
        path: PathBuf,
        /// The underlying image error.
        source: image::ImageError,
    },

    /// Pixel buffer does not match its declared dimensions.
    #[error("frame of {width}x{height} needs {expected} bytes, got {actual}")]
    Malformed {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Bytes an RGB8 buffer of that size needs.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },

    /// JPEG encoding failed.
    #[error("failed to encode frame: {source}")]
    Encode {
        /// The underlying image error.
        #[from]
        source: image::ImageError,
    },
}

/// One uncompressed RGB8 frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    captured_at: DateTime<Utc>,
}

impl RawFrame {
    /// Wrap an RGB8 buffer, checking its length against the dimensions.
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> Result<Self, CaptureError> {
        let expected = rgb_len(width, height).unwrap_or(usize::MAX);
        if rgb.len() != expected {
            return Err(CaptureError::Malformed {
                width,
                height,
                expected,
                actual: rgb.len(),
            });
        }
        Ok(Self {
            width,
            height,
            rgb,
            captured_at: Utc::now(),
        })
    }

    /// A frame filled with one colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let len = rgb_len(width, height).unwrap_or(0);
        Self {
            width,
            height,
            rgb: rgb.iter().copied().cycle().take(len).collect(),
            captured_at: Utc::now(),
        }
    }

    /// Width in pixels.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// When the frame was captured.
    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

fn rgb_len(width: u32, height: u32) -> Option<usize> {
    u64::from(width)
        .checked_mul(u64::from(height))?
        .checked_mul(3)
        .and_then(|n| usize::try_from(n).ok())
}

/// A frame ready for the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Base64 JPEG, no data-URL prefix.
    pub image_base64: String,
    /// Size of the JPEG before base64.
    pub jpeg_bytes: usize,
}

impl EncodedFrame {
    /// The outbound wire message for this frame.
    pub fn to_message(&self) -> FrameMessage {
        FrameMessage {
            image_base64: self.image_base64.clone(),
        }
    }
}

/// Re-encode a raw frame as JPEG at `quality` (1..=100) and base64 it.
pub fn encode_jpeg(frame: &RawFrame, quality: u8) -> Result<EncodedFrame, CaptureError> {
    let mut jpeg = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
        encoder.encode(&frame.rgb, frame.width, frame.height, ExtendedColorType::Rgb8)?;
    }
    Ok(EncodedFrame {
        jpeg_bytes: jpeg.len(),
        image_base64: STANDARD.encode(&jpeg),
    })
}

/// Something that can be asked for the most recent frame.
pub trait FrameSource: Send {
    /// The latest frame, or `None` if nothing has been captured yet.
    fn latest(&mut self) -> Result<Option<Arc<RawFrame>>, CaptureError>;
}

/// A source fed by a capture task through a `watch` channel, so readers
/// always see the newest frame and never a backlog.
#[derive(Debug, Clone)]
pub struct WatchSource {
    rx: watch::Receiver<Option<Arc<RawFrame>>>,
}

impl WatchSource {
    /// Create the source and the publishing half for the capture task.
    pub fn channel() -> (watch::Sender<Option<Arc<RawFrame>>>, Self) {
        let (tx, rx) = watch::channel(None);
        (tx, Self { rx })
    }
}

impl FrameSource for WatchSource {
    fn latest(&mut self) -> Result<Option<Arc<RawFrame>>, CaptureError> {
        Ok(self.rx.borrow_and_update().clone())
    }
}

/// Replays the JPEG files of a directory in name order, looping.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    files: Vec<PathBuf>,
    next: usize,
}

impl DirectorySource {
    /// Scan `dir` for `.jpg` / `.jpeg` files.
    pub fn open(dir: &Path) -> Result<Self, CaptureError> {
        let unavailable = |source| CaptureError::Unavailable {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(unavailable)? {
            let path = entry.map_err(unavailable)?.path();
            let is_jpeg = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"));
            if is_jpeg {
                files.push(path);
            }
        }
        files.sort();
        debug!(dir = %dir.display(), frames = files.len(), "directory capture source opened");
        Ok(Self { files, next: 0 })
    }

    /// Number of frames in the loop.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the directory held no frames.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for DirectorySource {
    fn latest(&mut self) -> Result<Option<Arc<RawFrame>>, CaptureError> {
        let Some(path) = self.files.get(self.next).cloned() else {
            return Ok(None);
        };
        self.next = self
            .next
            .saturating_add(1)
            .checked_rem(self.files.len())
            .unwrap_or(0);
        let image = image::open(&path)
            .map_err(|source| CaptureError::Load {
                path: path.clone(),
                source,
            })?
            .to_rgb8();
        let (width, height) = image.dimensions();
        RawFrame::new(width, height, image.into_raw()).map(|frame| Some(Arc::new(frame)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn raw_frame_checks_length() {
        assert!(RawFrame::new(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(
            RawFrame::new(2, 2, vec![0; 11]),
            Err(CaptureError::Malformed { expected: 12, actual: 11, .. })
        ));
    }

    #[test]
    fn encodes_to_base64_jpeg() {
        let frame = RawFrame::solid(16, 8, [200, 40, 40]);
        let encoded = encode_jpeg(&frame, 70).unwrap();
        let jpeg = STANDARD.decode(&encoded.image_base64).unwrap();
        assert_eq!(jpeg.len(), encoded.jpeg_bytes);
        // JPEG SOI marker.
        assert_eq!(jpeg.get(..2), Some(&[0xFF, 0xD8][..]));
    }

    #[test]
    fn lower_quality_is_not_larger() {
        let mut rgb = Vec::new();
        for i in 0..(64 * 64) {
            let v = u8::try_from(i % 251).unwrap();
            rgb.extend_from_slice(&[v, v.wrapping_mul(3), v.wrapping_mul(7)]);
        }
        let frame = RawFrame::new(64, 64, rgb).unwrap();
        let high = encode_jpeg(&frame, 95).unwrap();
        let low = encode_jpeg(&frame, 20).unwrap();
        assert!(low.jpeg_bytes <= high.jpeg_bytes);
    }

    #[test]
    fn watch_source_sees_newest_frame() {
        let (tx, mut source) = WatchSource::channel();
        assert!(source.latest().unwrap().is_none());
        tx.send_replace(Some(Arc::new(RawFrame::solid(1, 1, [1, 1, 1]))));
        tx.send_replace(Some(Arc::new(RawFrame::solid(2, 1, [2, 2, 2]))));
        let frame = source.latest().unwrap().unwrap();
        assert_eq!(frame.width(), 2);
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let result = DirectorySource::open(Path::new("/nonexistent/wavegrid/frames"));
        assert!(matches!(result, Err(CaptureError::Unavailable { .. })));
    }

    #[test]
    fn directory_source_loops_over_jpegs() {
        let dir = std::env::temp_dir().join(format!("wavegrid-capture-{}", uuid_like()));
        std::fs::create_dir_all(&dir).unwrap();
        let frame = RawFrame::solid(4, 4, [10, 20, 30]);
        for name in ["a.jpg", "b.jpeg"] {
            let encoded = encode_jpeg(&frame, 80).unwrap();
            let bytes = STANDARD.decode(encoded.image_base64).unwrap();
            std::fs::write(dir.join(name), bytes).unwrap();
        }
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let mut source = DirectorySource::open(&dir).unwrap();
        assert_eq!(source.len(), 2);
        for _ in 0..3 {
            let frame = source.latest().unwrap().unwrap();
            assert_eq!((frame.width(), frame.height()), (4, 4));
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }

    fn uuid_like() -> u128 {
        Utc::now().timestamp_nanos_opt().map_or(0, |n| n.unsigned_abs().into())
    }
}
