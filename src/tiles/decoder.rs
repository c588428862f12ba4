// MZoom6 -- Tiled zoom, pan and rotate engine for very large images
//
// Copyright (c) 2024-2025 Martin van der Werff <github (at) newinnovations.nl>
//
// This file is part of MZoom6.
//
// MZoom6 is free software: you can redistribute it and/or modify it under the terms of
// the GNU Affero General Public License as published by the Free Software Foundation, either
// version 3 of the License, or (at your option) any later version.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR
// IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND
// FITNESS FOR A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE AUTHOR BE LIABLE FOR ANY
// DIRECT, INDIRECT, INCIDENTAL, SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR PROFITS; OR
// BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY, WHETHER IN CONTRACT,
// STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::{
    fmt,
    fs::File,
    io::{BufReader, Cursor, Read, Seek},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex, MutexGuard,
    },
};

use log::warn;

use crate::{
    error::{MzoomError, MzoomResult},
    rect::RectI,
    tiles::{tile::TileKey, ImageInfo, TileImage},
};

pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/// Supplies the raw bytes of one image. Opening may be repeated; every call
/// returns a fresh stream positioned at the start.
pub trait ImageSource: Send + Sync {
    /// Stable identity of the image, also the namespace for tile cache keys.
    fn key(&self) -> &str;

    fn open_stream(&self) -> MzoomResult<Box<dyn ReadSeek>>;
}

/// An image read from the file system.
pub struct FileImageSource {
    key: String,
    path: PathBuf,
}

impl FileImageSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        Self {
            key: path.to_string_lossy().to_string(),
            path,
        }
    }
}

impl ImageSource for FileImageSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn open_stream(&self) -> MzoomResult<Box<dyn ReadSeek>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// An image held in memory.
pub struct BytesImageSource {
    key: String,
    bytes: Arc<Vec<u8>>,
}

impl BytesImageSource {
    pub fn new(key: &str, bytes: Vec<u8>) -> Self {
        Self {
            key: key.to_string(),
            bytes: Arc::new(bytes),
        }
    }
}

impl ImageSource for BytesImageSource {
    fn key(&self) -> &str {
        &self.key
    }

    fn open_stream(&self) -> MzoomResult<Box<dyn ReadSeek>> {
        Ok(Box::new(Cursor::new(self.bytes.to_vec())))
    }
}

/// Decodes sub-rectangles of one image at a power-of-two sample size.
///
/// Implementations are not preemptible: a decode that was started runs to
/// completion and its result is discarded by the caller when the tile has
/// been evicted in the meantime.
pub trait RegionDecoder: Send {
    fn image_info(&self) -> &ImageInfo;

    /// Prepares the decoder for decoding. Idempotent; called before the
    /// first region decode and cheap afterwards.
    fn ready(&mut self) -> MzoomResult<()>;

    /// Decodes `src_rect` (original image pixels) at `sample_size` into a
    /// tile image of roughly `src_rect.size() / sample_size` pixels.
    fn decode_region(
        &mut self,
        key: &TileKey,
        src_rect: RectI,
        sample_size: u32,
    ) -> MzoomResult<TileImage>;

    /// Releases decoder resources. Further decode calls fail.
    fn close(&mut self);

    /// A second instance decoding the same image, used for bounded parallel
    /// decoding.
    fn try_clone(&self) -> MzoomResult<Box<dyn RegionDecoder>>;

    /// Whether independent clones of this decoder may run concurrently.
    fn parallel_safe(&self) -> bool {
        false
    }
}

/// Picks and constructs a region decoder for an image. The closed set of
/// factories a host wants to use is injected at construction time.
pub trait RegionDecoderFactory: Send {
    /// Whether this factory can handle the image at all.
    fn accept(&self, info: &ImageInfo) -> bool;

    /// Three-valued mime support check: `Some(true)` supported,
    /// `Some(false)` known unsupported, `None` unknown to this factory.
    fn check_support(&self, mime_type: &str) -> Option<bool>;

    fn create(
        &self,
        source: &dyn ImageSource,
        info: &ImageInfo,
    ) -> MzoomResult<Box<dyn RegionDecoder>>;
}

/// Wraps a region decoder in a leased pool so decode calls can run on
/// several worker threads while each underlying decoder instance only ever
/// executes one decode at a time.
pub struct TileDecoder {
    info: ImageInfo,
    pool: Mutex<Vec<Box<dyn RegionDecoder>>>,
    available: Condvar,
    closed: AtomicBool,
    pool_size: usize,
}

impl TileDecoder {
    /// Builds the pool from a primary decoder. Decoders that do not declare
    /// themselves parallel-safe get a pool of one, serializing all decodes;
    /// otherwise up to `pool_size` clones are created via
    /// [`RegionDecoder::try_clone`].
    pub fn new(primary: Box<dyn RegionDecoder>, pool_size: usize) -> Self {
        let info = primary.image_info().clone();
        let wanted = if primary.parallel_safe() {
            pool_size.max(1)
        } else {
            1
        };
        let mut pool = vec![primary];
        while pool.len() < wanted {
            match pool[0].try_clone() {
                Ok(clone) => pool.push(clone),
                Err(error) => {
                    warn!("region decoder clone failed, continuing with {}: {error}", pool.len());
                    break;
                }
            }
        }
        let pool_size = pool.len();
        Self {
            info,
            pool: Mutex::new(pool),
            available: Condvar::new(),
            closed: AtomicBool::new(false),
            pool_size,
        }
    }

    pub fn image_info(&self) -> &ImageInfo {
        &self.info
    }

    /// Number of underlying decoder instances, which is also the useful
    /// number of decode worker threads.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    fn lock_pool(&self) -> MutexGuard<'_, Vec<Box<dyn RegionDecoder>>> {
        match self.pool.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Decodes one tile, blocking the calling worker thread. Leases a
    /// decoder instance from the pool for the duration of the call.
    pub fn decode(
        &self,
        key: &TileKey,
        src_rect: RectI,
        sample_size: u32,
    ) -> MzoomResult<TileImage> {
        let mut decoder = {
            let mut guard = self.lock_pool();
            loop {
                if self.closed.load(Ordering::SeqCst) {
                    return Err(MzoomError::Decode("tile decoder is closed".to_string()));
                }
                if let Some(decoder) = guard.pop() {
                    break decoder;
                }
                guard = match self.available.wait(guard) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
            }
        };

        let result = decoder
            .ready()
            .and_then(|_| decoder.decode_region(key, src_rect, sample_size));

        if self.closed.load(Ordering::SeqCst) {
            decoder.close();
        } else {
            self.lock_pool().push(decoder);
            self.available.notify_one();
        }
        result
    }

    /// Closes every pooled decoder. In-flight decodes run to completion;
    /// their instances are closed as they return to the pool.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut guard = self.lock_pool();
        for mut decoder in guard.drain(..) {
            decoder.close();
        }
        self.available.notify_all();
    }
}

impl fmt::Debug for TileDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileDecoder")
            .field("info", &self.info)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

/// Reads the image dimensions and mime type without decoding the pixel
/// data.
pub fn read_image_info(source: &dyn ImageSource) -> MzoomResult<ImageInfo> {
    let mut stream = source.open_stream()?;
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes)?;
    let reader = image::ImageReader::new(Cursor::new(&bytes)).with_guessed_format()?;
    let format = reader.format().ok_or(MzoomError::UnsupportedImage {
        mime_type: "unknown".to_string(),
    })?;
    let (width, height) = reader.into_dimensions()?;
    if width == 0 || height == 0 {
        return Err(MzoomError::Geometry(format!(
            "image has degenerate dimensions {width}x{height}"
        )));
    }
    Ok(ImageInfo::new(width, height, format.to_mime_type()))
}

/// Built-in region decoder for formats without native region decoding:
/// decodes the whole source once through the `image` crate and serves
/// regions by cropping and box-filter downsampling. Clones share the
/// decoded pixels, so the pool costs one full decode regardless of size.
pub struct ImageReaderDecoder {
    info: ImageInfo,
    source_bytes: Arc<Vec<u8>>,
    full: Option<Arc<image::RgbaImage>>,
}

impl ImageReaderDecoder {
    pub fn new(info: ImageInfo, source_bytes: Vec<u8>) -> Self {
        Self {
            info,
            source_bytes: Arc::new(source_bytes),
            full: None,
        }
    }
}

impl RegionDecoder for ImageReaderDecoder {
    fn image_info(&self) -> &ImageInfo {
        &self.info
    }

    fn ready(&mut self) -> MzoomResult<()> {
        if self.full.is_none() {
            let decoded = image::load_from_memory(&self.source_bytes)?;
            self.full = Some(Arc::new(decoded.to_rgba8()));
        }
        Ok(())
    }

    fn decode_region(
        &mut self,
        _key: &TileKey,
        src_rect: RectI,
        sample_size: u32,
    ) -> MzoomResult<TileImage> {
        self.ready()?;
        let full = self
            .full
            .as_ref()
            .ok_or_else(|| MzoomError::Decode("decoder is closed".to_string()))?;

        let bounds = RectI::new(0, 0, full.width() as i32, full.height() as i32);
        let rect = src_rect.intersect(&bounds);
        if rect.is_empty() || sample_size == 0 {
            return Err(MzoomError::Decode(format!(
                "region {src_rect:?} outside image {bounds:?}"
            )));
        }

        let sample = sample_size as i32;
        let out_w = (rect.width() + sample - 1) / sample;
        let out_h = (rect.height() + sample - 1) / sample;
        let mut pixels = Vec::with_capacity((out_w * out_h * 4) as usize);

        for out_y in 0..out_h {
            for out_x in 0..out_w {
                // Average the sample x sample block, clipped to the region
                let x0 = rect.x0 + out_x * sample;
                let y0 = rect.y0 + out_y * sample;
                let x1 = (x0 + sample).min(rect.x1);
                let y1 = (y0 + sample).min(rect.y1);
                let mut sum = [0u32; 4];
                let count = ((x1 - x0) * (y1 - y0)) as u32;
                for y in y0..y1 {
                    for x in x0..x1 {
                        let pixel = full.get_pixel(x as u32, y as u32);
                        for channel in 0..4 {
                            sum[channel] += pixel.0[channel] as u32;
                        }
                    }
                }
                for channel_sum in sum {
                    pixels.push((channel_sum / count) as u8);
                }
            }
        }

        Ok(TileImage::from_rgba8(out_w as u32, out_h as u32, pixels))
    }

    fn close(&mut self) {
        self.full = None;
    }

    fn try_clone(&self) -> MzoomResult<Box<dyn RegionDecoder>> {
        Ok(Box::new(Self {
            info: self.info.clone(),
            source_bytes: self.source_bytes.clone(),
            full: self.full.clone(),
        }))
    }

    fn parallel_safe(&self) -> bool {
        true
    }
}

/// Factory for [`ImageReaderDecoder`].
#[derive(Default)]
pub struct ImageReaderDecoderFactory;

impl RegionDecoderFactory for ImageReaderDecoderFactory {
    fn accept(&self, info: &ImageInfo) -> bool {
        info.width > 0 && info.height > 0 && self.check_support(&info.mime_type) != Some(false)
    }

    fn check_support(&self, mime_type: &str) -> Option<bool> {
        match mime_type {
            "image/jpeg" | "image/png" | "image/webp" | "image/bmp" | "image/tiff" => Some(true),
            // animated or vector content cannot be region-decoded here
            "image/gif" | "image/svg+xml" => Some(false),
            _ => None,
        }
    }

    fn create(
        &self,
        source: &dyn ImageSource,
        info: &ImageInfo,
    ) -> MzoomResult<Box<dyn RegionDecoder>> {
        if !self.accept(info) {
            return Err(MzoomError::UnsupportedImage {
                mime_type: info.mime_type.clone(),
            });
        }
        let mut stream = source.open_stream()?;
        let mut bytes = Vec::new();
        stream.read_to_end(&mut bytes)?;
        Ok(Box::new(ImageReaderDecoder::new(info.clone(), bytes)))
    }
}
