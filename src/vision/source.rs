//! Frame providers
//!
//! The capture device is outside this crate; the pipeline only needs something
//! it can pull frames from. `read_frame` returning `Ok(None)` is a transient
//! miss (no frame this cycle), any `Err` is fatal for the running pipeline.
//!
//! Sources release their device when dropped. The pipeline owns the source for
//! exactly as long as it runs, so dropping it is the release.

use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbImage;

/// Error raised by a frame source
#[derive(Debug)]
pub enum FrameSourceError {
    /// The device could not be opened
    Unavailable(String),
    /// The device disappeared or closed unexpectedly
    Disconnected(String),
    /// A finite source ran out of frames
    Exhausted,
    /// Reading a frame failed
    Io(std::io::Error),
    /// Decoding a frame failed
    Decode(image::ImageError),
}

impl fmt::Display for FrameSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSourceError::Unavailable(msg) => write!(f, "Frame source unavailable: {}", msg),
            FrameSourceError::Disconnected(msg) => {
                write!(f, "Frame source disconnected: {}", msg)
            }
            FrameSourceError::Exhausted => write!(f, "Frame source exhausted"),
            FrameSourceError::Io(e) => write!(f, "Frame read failed: {}", e),
            FrameSourceError::Decode(e) => write!(f, "Frame decode failed: {}", e),
        }
    }
}

impl std::error::Error for FrameSourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameSourceError::Io(e) => Some(e),
            FrameSourceError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FrameSourceError {
    fn from(e: std::io::Error) -> Self {
        FrameSourceError::Io(e)
    }
}

impl From<image::ImageError> for FrameSourceError {
    fn from(e: image::ImageError) -> Self {
        FrameSourceError::Decode(e)
    }
}

/// A pull-based video source
pub trait FrameSource: Send {
    /// Pull the next frame
    ///
    /// `Ok(None)` means no frame is available this cycle.
    fn read_frame(&mut self) -> Result<Option<RgbImage>, FrameSourceError>;

    /// Human-readable description for logs
    fn describe(&self) -> String {
        "frame source".to_string()
    }
}

/// Opens a frame source for a capture device index
pub trait FrameSourceOpener: Send + Sync + 'static {
    /// Open the device
    fn open(&self, device_index: u32) -> Result<Box<dyn FrameSource>, FrameSourceError>;
}

/// Opener backed by a closure
pub struct FnOpener<F>(pub F);

impl<F> FrameSourceOpener for FnOpener<F>
where
    F: Fn(u32) -> Result<Box<dyn FrameSource>, FrameSourceError> + Send + Sync + 'static,
{
    fn open(&self, device_index: u32) -> Result<Box<dyn FrameSource>, FrameSourceError> {
        (self.0)(device_index)
    }
}

/// Replays one frame forever
#[derive(Debug, Clone)]
pub struct StillFrameSource {
    frame: RgbImage,
}

impl StillFrameSource {
    /// Create a source that always yields `frame`
    pub fn new(frame: RgbImage) -> Self {
        Self { frame }
    }
}

impl FrameSource for StillFrameSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>, FrameSourceError> {
        Ok(Some(self.frame.clone()))
    }

    fn describe(&self) -> String {
        format!("still frame {}x{}", self.frame.width(), self.frame.height())
    }
}

/// Image file extensions picked up by [`ImageSequenceSource`]
const SEQUENCE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Reads image files from a directory in name order
///
/// Useful for replaying recorded footage without a camera. A file that fails
/// to decode is a transient miss; running out of files is fatal unless the
/// source loops.
#[derive(Debug)]
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
    looping: bool,
}

impl ImageSequenceSource {
    /// Scan a directory for frames
    pub fn open(dir: impl AsRef<Path>, looping: bool) -> Result<Self, FrameSourceError> {
        let dir = dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dir)
            .map_err(|e| FrameSourceError::Unavailable(format!("{}: {}", dir.display(), e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_ascii_lowercase())
                    .is_some_and(|e| SEQUENCE_EXTENSIONS.contains(&e.as_str()))
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(FrameSourceError::Unavailable(format!(
                "no frames in {}",
                dir.display()
            )));
        }

        Ok(Self {
            dir,
            files,
            position: 0,
            looping,
        })
    }

    /// Number of frames in the sequence
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the sequence is empty (never true for an opened source)
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>, FrameSourceError> {
        if self.position >= self.files.len() {
            if !self.looping {
                return Err(FrameSourceError::Exhausted);
            }
            self.position = 0;
        }

        let path = &self.files[self.position];
        self.position += 1;

        match image::open(path) {
            Ok(img) => Ok(Some(img.to_rgb8())),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable frame");
                Ok(None)
            }
        }
    }

    fn describe(&self) -> String {
        format!("image sequence {} ({} frames)", self.dir.display(), self.files.len())
    }
}

/// Opener that maps every device index to the same image directory
#[derive(Debug, Clone)]
pub struct ImageSequenceOpener {
    dir: PathBuf,
    looping: bool,
}

impl ImageSequenceOpener {
    /// Create an opener for `dir`
    pub fn new(dir: impl Into<PathBuf>, looping: bool) -> Self {
        Self {
            dir: dir.into(),
            looping,
        }
    }
}

impl FrameSourceOpener for ImageSequenceOpener {
    fn open(&self, device_index: u32) -> Result<Box<dyn FrameSource>, FrameSourceError> {
        tracing::debug!(device_index, dir = %self.dir.display(), "Opening image sequence");
        Ok(Box::new(ImageSequenceSource::open(&self.dir, self.looping)?))
    }
}
