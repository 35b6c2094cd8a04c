//! Parser for the `galleryinfo.txt` sidecar, grounded on
//! `original_source/src/h2hdb/gallery_info_parser.py`. Pure function:
//! folder in, value out — `spec.md` scopes its correctness out of the
//! core's test surface, but the ingestor still needs a working one.

use crate::errors::{H2hDbError, Result};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryInfo {
    pub gallery_folder: PathBuf,
    pub gallery_name: String,
    pub gid: i64,
    pub file_names: Vec<String>,
    pub modified_time: NaiveDateTime,
    pub title: String,
    pub upload_time: NaiveDateTime,
    pub comment: String,
    pub upload_account: String,
    pub download_time: NaiveDateTime,
    /// Insertion-ordered; a tag name seen twice has its value overwritten by
    /// the later occurrence (faithful to the source's `dict[str, str]`).
    pub tags: Vec<(String, String)>,
}

/// Parse `gallery_folder/galleryinfo.txt` plus the folder's own file listing
/// and mtime into a [`GalleryInfo`] value.
pub fn parse_gallery_info(gallery_folder: &Path) -> Result<GalleryInfo> {
    let info_path = gallery_folder.join("galleryinfo.txt");
    let raw = std::fs::read_to_string(&info_path)?;
    let lines: Vec<&str> = raw.trim_matches('\n').split('\n').collect();

    let gallery_name = gallery_folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| H2hDbError::Config("gallery folder has no name component".into()))?;
    let gid = parse_gid_from_name(&gallery_name)?;

    let mut file_names: Vec<String> = std::fs::read_dir(gallery_folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    file_names.sort();

    let modified_time = {
        let metadata = std::fs::metadata(&info_path)?;
        let modified = metadata.modified()?;
        let datetime: chrono::DateTime<chrono::Local> = modified.into();
        datetime.naive_local()
    };

    let mut title = None;
    let mut upload_time = None;
    let mut upload_account = None;
    let mut download_time = None;
    let mut tags: Vec<(String, String)> = Vec::new();

    let mut in_comments = false;
    let mut comment_lines: Vec<&str> = Vec::new();

    for line in &lines {
        if line.contains("Uploader's Comments") {
            in_comments = true;
        } else if in_comments {
            comment_lines.push(line.trim());
        } else if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            let value = value.trim();
            match key {
                "Tags" => {
                    for tag in value.split(',') {
                        let (tag_key, tag_value) = match tag.split_once(':') {
                            Some((k, v)) if !k.trim().is_empty() => (k.trim(), v.trim()),
                            Some((_, v)) => ("untagged", v.trim()),
                            None => ("untagged", tag.trim()),
                        };
                        if let Some(existing) = tags.iter_mut().find(|(k, _)| k == tag_key) {
                            existing.1 = tag_value.to_string();
                        } else {
                            tags.push((tag_key.to_string(), tag_value.to_string()));
                        }
                    }
                }
                "Title" => title = Some(value.to_string()),
                "Upload Time" => upload_time = Some(parse_datetime(value)?),
                "Uploaded By" => upload_account = Some(value.to_string()),
                "Downloaded" => download_time = Some(parse_datetime(value)?),
                _ => {}
            }
        }
    }

    let comment = comment_lines.join("\n").trim_matches('\n').to_string();

    Ok(GalleryInfo {
        gallery_folder: gallery_folder.to_path_buf(),
        gallery_name,
        gid,
        file_names,
        modified_time,
        title: title.ok_or_else(|| missing_key("Title"))?,
        upload_time: upload_time.ok_or_else(|| missing_key("Upload Time"))?,
        comment,
        upload_account: upload_account.ok_or_else(|| missing_key("Uploaded By"))?,
        download_time: download_time.ok_or_else(|| missing_key("Downloaded"))?,
        tags,
    })
}

fn missing_key(key: &str) -> H2hDbError {
    H2hDbError::Config(format!("galleryinfo.txt missing required key '{key}'"))
}

fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, DATETIME_FORMAT)
        .map_err(|_| H2hDbError::Config(format!("unparseable datetime '{value}'")))
}

/// The gallery's gid is the decimal integer inside the trailing `[...]` of
/// the folder name, or the whole name if it carries no brackets.
fn parse_gid_from_name(gallery_name: &str) -> Result<i64> {
    let digits = if gallery_name.contains('[') && gallery_name.contains(']') {
        gallery_name
            .rsplit('[')
            .next()
            .unwrap_or(gallery_name)
            .trim_end_matches(']')
    } else {
        gallery_name
    };
    digits
        .parse::<i64>()
        .map_err(|_| H2hDbError::Config(format!("folder name '{gallery_name}' has no gid")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_gallery(dir: &Path, gallery_info: &str, files: &[&str]) -> PathBuf {
        let folder = dir.join("MyGallery [12345]");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("galleryinfo.txt"), gallery_info).unwrap();
        for f in files {
            fs::write(folder.join(f), b"x").unwrap();
        }
        folder
    }

    #[test]
    fn parses_a_well_formed_gallery() {
        let dir = tempdir().unwrap();
        let folder = write_gallery(
            &dir,
            "Title: Alpha\n\
             Upload Time: 2024-01-02 03:04:05\n\
             Uploaded By: alice\n\
             Downloaded: 2024-06-07 08:09:10\n\
             Tags: artist:bob, group:g1\n\
             Uploader's Comments\n\
             hello\n",
            &["1.jpg", "2.jpg"],
        );

        let info = parse_gallery_info(&folder).unwrap();
        assert_eq!(info.gid, 12345);
        assert_eq!(info.title, "Alpha");
        assert_eq!(info.upload_account, "alice");
        assert_eq!(info.comment, "hello");
        assert_eq!(
            info.tags,
            vec![
                ("artist".to_string(), "bob".to_string()),
                ("group".to_string(), "g1".to_string())
            ]
        );
        assert!(info.file_names.contains(&"1.jpg".to_string()));
        assert!(info.file_names.contains(&"galleryinfo.txt".to_string()));
    }

    #[test]
    fn gid_falls_back_to_whole_name_without_brackets() {
        assert_eq!(parse_gid_from_name("99999").unwrap(), 99999);
    }

    #[test]
    fn missing_tag_name_becomes_untagged() {
        let dir = tempdir().unwrap();
        let folder = write_gallery(
            &dir,
            "Title: Alpha\n\
             Upload Time: 2024-01-02 03:04:05\n\
             Uploaded By: alice\n\
             Downloaded: 2024-06-07 08:09:10\n\
             Tags: loli\n",
            &[],
        );
        let info = parse_gallery_info(&folder).unwrap();
        assert_eq!(info.tags, vec![("untagged".to_string(), "loli".to_string())]);
    }

    #[test]
    fn repeated_tag_name_keeps_the_latest_value() {
        let dir = tempdir().unwrap();
        let folder = write_gallery(
            &dir,
            "Title: Alpha\n\
             Upload Time: 2024-01-02 03:04:05\n\
             Uploaded By: alice\n\
             Downloaded: 2024-06-07 08:09:10\n\
             Tags: language:japanese, language:translated\n",
            &[],
        );
        let info = parse_gallery_info(&folder).unwrap();
        assert_eq!(
            info.tags,
            vec![("language".to_string(), "translated".to_string())]
        );
    }
}
