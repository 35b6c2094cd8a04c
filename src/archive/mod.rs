//! The CBZ archive builder (§4.8, §6's "CBZ archive" output contract). Given
//! a gallery folder and an exclusion set of boilerplate hashes, produces a
//! `.cbz` (a plain ZIP of re-encoded images) under the configured output
//! tree. Image re-encoding uses the `image` crate's Lanczos3 resize (added
//! dependency, grounded the same way `chehlo-gemkeep` and
//! `eklemis-port_blog_cms` reach for `image` for their own resize/re-encode
//! pipelines); the container is the teacher's existing `zip` dependency.

use crate::errors::Result;
use chrono::NaiveDateTime;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use sha2::{Digest, Sha512};
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::FileOptions;
use zip::ZipWriter;

/// How archives are grouped under `output_dir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbzGrouping {
    Flat,
    DateYear,
    DateYearMonth,
    DateYearMonthDay,
}

impl CbzGrouping {
    pub fn subpath(self, upload_time: NaiveDateTime) -> PathBuf {
        match self {
            CbzGrouping::Flat => PathBuf::new(),
            CbzGrouping::DateYear => PathBuf::from(upload_time.format("%Y").to_string()),
            CbzGrouping::DateYearMonth => PathBuf::from(upload_time.format("%Y-%m").to_string()),
            CbzGrouping::DateYearMonthDay => {
                PathBuf::from(upload_time.format("%Y-%m-%d").to_string())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub output_dir: PathBuf,
    pub tmp_dir: PathBuf,
    /// Pixels; `< 1` disables resizing entirely.
    pub max_pixel: i64,
    pub grouping: CbzGrouping,
}

const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];
const PRESERVE_FORMAT_EXTENSIONS: &[&str] = &["gif", "tiff", "tif", "ico"];

/// Left-trim `name` one character at a time until its UTF-8 byte length
/// plus the 4-byte `.cbz` suffix fits in 255 bytes.
pub fn sanitize_gallery_name(name: &str) -> String {
    let mut chars: Vec<char> = name.chars().collect();
    while chars.iter().collect::<String>().len() + 4 > 255 && !chars.is_empty() {
        chars.remove(0);
    }
    chars.into_iter().collect()
}

/// Build (or rebuild) `{sanitized_gallery_name}.cbz` under
/// `options.output_dir/{grouping_subpath}/`, skipping any file whose sha512
/// digest is in `exclude`. Returns `true` iff a new or changed archive was
/// written.
pub fn compress_gallery_to_cbz(
    source_folder: &Path,
    gallery_name: &str,
    upload_time: NaiveDateTime,
    options: &ArchiveOptions,
    exclude: &HashSet<Vec<u8>>,
) -> Result<bool> {
    let subdir = options.output_dir.join(options.grouping.subpath(upload_time));
    std::fs::create_dir_all(&subdir)?;
    let archive_name = format!("{}.cbz", sanitize_gallery_name(gallery_name));
    let output_path = subdir.join(&archive_name);

    let current_info_digest = {
        let bytes = std::fs::read(source_folder.join("galleryinfo.txt"))?;
        Sha512::digest(&bytes).to_vec()
    };

    if output_path.exists() && !should_rebuild(&output_path, &current_info_digest)? {
        return Ok(false);
    }

    let gallery_tmp_dir = options.tmp_dir.join(sanitize_gallery_name(gallery_name));
    std::fs::create_dir_all(&gallery_tmp_dir)?;

    for entry in std::fs::read_dir(source_folder)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let bytes = std::fs::read(&path)?;
        let digest = Sha512::digest(&bytes).to_vec();
        if exclude.contains(&digest) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        let processed = process_image_bytes(&file_name, &bytes, options.max_pixel)?;
        std::fs::write(gallery_tmp_dir.join(&processed.0), &processed.1)?;
    }

    let write_result = zip_directory(&gallery_tmp_dir, &output_path);
    let _ = std::fs::remove_dir_all(&gallery_tmp_dir);
    write_result?;

    info!(gallery = %gallery_name, path = %output_path.display(), "wrote cbz archive");
    Ok(true)
}

/// Whether `existing_cbz`'s embedded `galleryinfo.txt` digest differs from
/// `current_info_digest` — i.e. whether the archive is stale.
fn should_rebuild(existing_cbz: &Path, current_info_digest: &[u8]) -> Result<bool> {
    let file = std::fs::File::open(existing_cbz)?;
    let mut zip = match zip::ZipArchive::new(file) {
        Ok(zip) => zip,
        Err(_) => return Ok(true),
    };
    let mut entry = match zip.by_name("galleryinfo.txt") {
        Ok(entry) => entry,
        Err(_) => return Ok(true),
    };
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    let stored_digest = Sha512::digest(&bytes).to_vec();
    Ok(stored_digest != current_info_digest)
}

/// Resize/re-encode `bytes` per §4.8: raster images are fit to
/// `max_pixel`×`max_pixel` with Lanczos3, composited onto white if the
/// source had alpha, and re-encoded as JPEG — except GIF/TIFF/ICO, which
/// are resized but re-saved in their original format. Anything else is
/// passed through verbatim. Returns the (possibly renamed) file name and
/// its processed bytes.
fn process_image_bytes(file_name: &str, bytes: &[u8], max_pixel: i64) -> Result<(String, Vec<u8>)> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if !RASTER_EXTENSIONS.contains(&extension.as_str())
        && !PRESERVE_FORMAT_EXTENSIONS.contains(&extension.as_str())
    {
        return Ok((file_name.to_string(), bytes.to_vec()));
    }

    let image = match image::load_from_memory(bytes) {
        Ok(image) => image,
        Err(err) => {
            warn!(file = file_name, error = %err, "failed to decode image, copying verbatim");
            return Ok((file_name.to_string(), bytes.to_vec()));
        }
    };

    let resized = if max_pixel >= 1 {
        image.resize(max_pixel as u32, max_pixel as u32, FilterType::Lanczos3)
    } else {
        image
    };

    if PRESERVE_FORMAT_EXTENSIONS.contains(&extension.as_str()) {
        let format = match extension.as_str() {
            "gif" => ImageFormat::Gif,
            "tiff" | "tif" => ImageFormat::Tiff,
            "ico" => ImageFormat::Ico,
            _ => unreachable!(),
        };
        let mut out = Vec::new();
        resized.write_to(&mut std::io::Cursor::new(&mut out), format)?;
        return Ok((file_name.to_string(), out));
    }

    let composited = composite_onto_white(resized);
    let mut out = Vec::new();
    composited.write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Jpeg)?;
    let new_name = format!(
        "{}.jpg",
        Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name)
    );
    Ok((new_name, out))
}

fn composite_onto_white(image: DynamicImage) -> DynamicImage {
    if !image.color().has_alpha() {
        return image;
    }
    let rgba = image.to_rgba8();
    let (width, height) = (rgba.width(), rgba.height());
    let mut canvas = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut canvas, &rgba, 0, 0);
    DynamicImage::ImageRgba8(canvas)
}

fn zip_directory(source_dir: &Path, output_path: &Path) -> Result<()> {
    let file = std::fs::File::create(output_path)?;
    let mut writer = ZipWriter::new(file);
    let options: FileOptions<()> =
        FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut entries: Vec<_> = std::fs::read_dir(source_dir)?
        .filter_map(|e| e.ok())
        .collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let bytes = std::fs::read(entry.path())?;
        writer.start_file(name, options)?;
        writer.write_all(&bytes)?;
    }
    writer.finish()?;
    Ok(())
}

impl From<zip::result::ZipError> for crate::errors::H2hDbError {
    fn from(err: zip::result::ZipError) -> Self {
        crate::errors::H2hDbError::Io(std::io::Error::new(std::io::ErrorKind::Other, err))
    }
}

impl From<image::ImageError> for crate::errors::H2hDbError {
    fn from(err: image::ImageError) -> Self {
        crate::errors::H2hDbError::Io(std::io::Error::new(std::io::ErrorKind::Other, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn sanitize_trims_to_fit_251_bytes() {
        let long_name = "a".repeat(300);
        let sanitized = sanitize_gallery_name(&long_name);
        assert!(sanitized.len() + 4 <= 255);
    }

    #[test]
    fn short_names_are_untouched() {
        assert_eq!(sanitize_gallery_name("Short [1]"), "Short [1]");
    }

    #[test]
    fn compress_gallery_skips_excluded_pages_and_writes_others() {
        let src = tempdir().unwrap();
        fs::write(src.path().join("galleryinfo.txt"), b"info").unwrap();
        fs::write(src.path().join("note.txt"), b"kept").unwrap();
        let excluded_bytes = b"excluded";
        fs::write(src.path().join("ad.txt"), excluded_bytes).unwrap();

        let out = tempdir().unwrap();
        let tmp = tempdir().unwrap();
        let options = ArchiveOptions {
            output_dir: out.path().to_path_buf(),
            tmp_dir: tmp.path().to_path_buf(),
            max_pixel: 0,
            grouping: CbzGrouping::Flat,
        };

        let mut exclude = HashSet::new();
        exclude.insert(Sha512::digest(excluded_bytes).to_vec());

        let upload_time =
            NaiveDateTime::parse_from_str("2024-01-02 03:04:05", "%Y-%m-%d %H:%M:%S").unwrap();
        let wrote = compress_gallery_to_cbz(
            src.path(),
            "Gallery [1]",
            upload_time,
            &options,
            &exclude,
        )
        .unwrap();
        assert!(wrote);

        let archive_path = out.path().join("Gallery [1].cbz");
        assert!(archive_path.exists());
        let file = fs::File::open(&archive_path).unwrap();
        let mut zip = zip::ZipArchive::new(file).unwrap();
        assert!(zip.by_name("note.txt").is_ok());
        assert!(zip.by_name("ad.txt").is_err());
    }

    #[test]
    fn unchanged_gallery_is_not_rewritten() {
        let src = tempdir().unwrap();
        fs::write(src.path().join("galleryinfo.txt"), b"info").unwrap();

        let out = tempdir().unwrap();
        let tmp = tempdir().unwrap();
        let options = ArchiveOptions {
            output_dir: out.path().to_path_buf(),
            tmp_dir: tmp.path().to_path_buf(),
            max_pixel: 0,
            grouping: CbzGrouping::Flat,
        };
        let upload_time =
            NaiveDateTime::parse_from_str("2024-01-02 03:04:05", "%Y-%m-%d %H:%M:%S").unwrap();

        assert!(compress_gallery_to_cbz(
            src.path(),
            "Gallery [1]",
            upload_time,
            &options,
            &HashSet::new()
        )
        .unwrap());
        assert!(!compress_gallery_to_cbz(
            src.path(),
            "Gallery [1]",
            upload_time,
            &options,
            &HashSet::new()
        )
        .unwrap());
    }
}
