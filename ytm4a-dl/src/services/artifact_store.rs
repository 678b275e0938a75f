//! Artifact Store
//!
//! Persists a finished artifact as one file in the output folder. Files are
//! written to a `.part` sibling and renamed into place, so a crash never
//! leaves a truncated `.m4a` behind.
//!
//! Locally produced artifacts get the edited title/artist written into their
//! tags (best effort: the pass-through payload is often not a taggable file).
//! Remote artifacts are already tagged by the backend.

use lofty::config::WriteOptions;
use lofty::prelude::{Accessor, TagExt, TaggedFileExt};
use lofty::read_from_path;
use lofty::tag::Tag;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::models::{AcquisitionPath, AudioArtifact, EditableTrackTags, SavedArtifact};
use crate::services::orchestrator::{sanitize_filename, with_target_extension};

pub struct ArtifactStore {
    output_folder: PathBuf,
}

impl ArtifactStore {
    pub fn new(output_folder: impl Into<PathBuf>) -> Self {
        Self {
            output_folder: output_folder.into(),
        }
    }

    /// Write `artifact` under `suggested_filename`
    ///
    /// A name that could escape the output folder is replaced by its
    /// sanitized form.
    pub async fn save(
        &self,
        artifact: &AudioArtifact,
        suggested_filename: &str,
        via: AcquisitionPath,
        tags: &EditableTrackTags,
    ) -> ytm4a_common::Result<SavedArtifact> {
        let file_name = safe_file_name(suggested_filename);
        if file_name != suggested_filename {
            warn!(
                suggested = %suggested_filename,
                saved_as = %file_name,
                "Suggested file name not usable on disk, sanitized"
            );
        }

        tokio::fs::create_dir_all(&self.output_folder).await?;

        let file_path = self.output_folder.join(&file_name);
        let part_path = self.output_folder.join(format!("{}.part", file_name));
        tokio::fs::write(&part_path, &artifact.bytes).await?;
        tokio::fs::rename(&part_path, &file_path).await?;

        let tagged = match via {
            AcquisitionPath::Local => {
                let path = file_path.clone();
                let tags = tags.clone();
                match tokio::task::spawn_blocking(move || write_tags(&path, &tags)).await {
                    Ok(Ok(())) => true,
                    Ok(Err(e)) => {
                        warn!(file = %file_path.display(), "Could not tag file: {}", e);
                        false
                    }
                    Err(e) => {
                        warn!(file = %file_path.display(), "Tagging task failed: {}", e);
                        false
                    }
                }
            }
            AcquisitionPath::Remote => false,
        };

        info!(
            file = %file_path.display(),
            bytes = artifact.bytes.len(),
            ?via,
            tagged,
            "Saved artifact"
        );

        Ok(SavedArtifact {
            file_name,
            file_path,
            bytes: artifact.bytes.len(),
            media_type: artifact.media_type.clone(),
            via,
            tagged,
        })
    }
}

fn safe_file_name(suggested: &str) -> String {
    with_target_extension(&sanitize_filename(suggested))
}

fn write_tags(path: &Path, tags: &EditableTrackTags) -> Result<(), String> {
    let mut tagged_file =
        read_from_path(path).map_err(|error| format!("Failed to read tags: {error}"))?;

    let tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        tagged_file.insert_tag(Tag::new(tag_type));
    }
    let tag = tagged_file
        .tag_mut(tag_type)
        .ok_or_else(|| "No writable tag".to_string())?;

    tag.set_title(tags.title.trim().to_string());
    tag.set_artist(tags.artist.trim().to_string());
    tag.save_to_path(path, WriteOptions::default())
        .map_err(|error| format!("Failed to write tags: {error}"))?;

    debug!(file = %path.display(), "Wrote title/artist tags");
    Ok(())
}
