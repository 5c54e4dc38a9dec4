// io.rs - Image input and output for worlds
//
// Worlds are stored as binary PGM (`P5`) greyscale images named after a key
// such as `"512x512"` for an input or `"512x512x100"` for the world after
// turn 100. Alive cells are `255`, dead cells `0`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use conway::World;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a usable PGM image: {message}", .path.display())]
    Format { path: PathBuf, message: String },

    #[error("no image stored under {0}")]
    Missing(String),
}

#[async_trait]
pub trait ImageIo: Send + Sync {
    async fn load(&self, key: &str) -> Result<World, ImageError>;

    async fn save(&self, key: &str, world: &World) -> Result<(), ImageError>;
}

/// Reads `<input_dir>/<key>.pgm`, writes `<output_dir>/<key>.pgm`.
#[derive(Debug, Clone)]
pub struct PgmIo {
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl PgmIo {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn input_path(&self, key: &str) -> PathBuf {
        self.input_dir.join(format!("{key}.pgm"))
    }

    pub fn output_path(&self, key: &str) -> PathBuf {
        self.output_dir.join(format!("{key}.pgm"))
    }
}

#[async_trait]
impl ImageIo for PgmIo {
    async fn load(&self, key: &str) -> Result<World, ImageError> {
        let path = self.input_path(key);
        let data = tokio::fs::read(&path).await.map_err(|source| ImageError::Read {
            path: path.clone(),
            source,
        })?;
        let world = decode_pgm(&data).map_err(|message| ImageError::Format { path: path.clone(), message })?;
        debug!(path = %path.display(), width = world.width(), height = world.height(), "image loaded");
        Ok(world)
    }

    async fn save(&self, key: &str, world: &World) -> Result<(), ImageError> {
        let path = self.output_path(key);
        let write_err = |source| ImageError::Write { path: path.clone(), source };
        tokio::fs::create_dir_all(&self.output_dir).await.map_err(write_err)?;
        tokio::fs::write(&path, encode_pgm(world)).await.map_err(write_err)?;
        debug!(path = %path.display(), "image written");
        Ok(())
    }
}

/// Keeps images in memory, keyed like files.
#[derive(Debug, Default)]
pub struct MemoryIo {
    images: Mutex<HashMap<String, World>>,
}

impl MemoryIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: impl Into<String>, world: World) {
        self.images.lock().insert(key.into(), world);
    }

    pub fn get(&self, key: &str) -> Option<World> {
        self.images.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.images.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ImageIo for MemoryIo {
    async fn load(&self, key: &str) -> Result<World, ImageError> {
        self.get(key).ok_or_else(|| ImageError::Missing(key.to_string()))
    }

    async fn save(&self, key: &str, world: &World) -> Result<(), ImageError> {
        self.insert(key, world.clone());
        Ok(())
    }
}

/// Loads a fixed world whatever the key and hands saves to `inner`.
#[derive(Debug)]
pub struct SeededIo<I> {
    seed: World,
    inner: I,
}

impl<I: ImageIo> SeededIo<I> {
    pub fn new(seed: World, inner: I) -> Self {
        Self { seed, inner }
    }
}

#[async_trait]
impl<I: ImageIo> ImageIo for SeededIo<I> {
    async fn load(&self, _key: &str) -> Result<World, ImageError> {
        Ok(self.seed.clone())
    }

    async fn save(&self, key: &str, world: &World) -> Result<(), ImageError> {
        self.inner.save(key, world).await
    }
}

pub fn encode_pgm(world: &World) -> Vec<u8> {
    let mut out = format!("P5\n{} {}\n255\n", world.width(), world.height()).into_bytes();
    out.extend(world.to_pixels());
    out
}

pub fn decode_pgm(data: &[u8]) -> Result<World, String> {
    let mut pos = 0;
    let magic = next_token(data, &mut pos).ok_or("missing magic number")?;
    if magic != b"P5" {
        return Err(format!("expected P5, found {}", String::from_utf8_lossy(magic)));
    }

    let mut header = [0usize; 3];
    for (value, name) in header.iter_mut().zip(["width", "height", "maxval"]) {
        let token = next_token(data, &mut pos).ok_or_else(|| format!("missing {name}"))?;
        *value = std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| format!("invalid {name}"))?;
    }
    let [width, height, maxval] = header;
    if maxval == 0 || maxval > 255 {
        return Err(format!("maxval {maxval} is not an 8-bit image"));
    }

    // Exactly one whitespace byte separates the header from the pixels.
    let start = pos + 1;
    let size = width
        .checked_mul(height)
        .ok_or_else(|| format!("{width}x{height} image is too large"))?;
    let pixels = start
        .checked_add(size)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| format!("expected {size} pixels"))?;
    World::from_pixels(width, height, pixels).map_err(|e| e.to_string())
}

fn next_token<'a>(data: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    loop {
        match data.get(*pos).copied()? {
            b'#' => {
                while data.get(*pos).is_some_and(|&b| b != b'\n') {
                    *pos += 1;
                }
            }
            b if b.is_ascii_whitespace() => *pos += 1,
            _ => break,
        }
    }
    let start = *pos;
    while data.get(*pos).is_some_and(|b| !b.is_ascii_whitespace()) {
        *pos += 1;
    }
    Some(&data[start..*pos])
}

/// True when `dir` holds an input image for `key`.
pub fn has_input(dir: &Path, key: &str) -> bool {
    dir.join(format!("{key}.pgm")).is_file()
}
