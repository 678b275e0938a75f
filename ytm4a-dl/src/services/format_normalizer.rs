//! Format Normalizer
//!
//! Labels retrieved bytes as `audio/mp4`. No transcoding is performed: the
//! payload passes through unchanged. The sniffed container type is kept for
//! diagnostics only. Total function.

use tracing::{debug, warn};

use crate::models::{AudioArtifact, TARGET_MEDIA_TYPE};

/// Containers that already hold M4A-compatible audio
const MP4_FAMILY: [&str; 3] = ["audio/mp4", "video/mp4", "audio/m4a"];

pub fn normalize(bytes: Vec<u8>) -> AudioArtifact {
    let detected_type = infer::get(&bytes).map(|kind| kind.mime_type().to_string());

    match detected_type.as_deref() {
        Some(mime) if MP4_FAMILY.contains(&mime) => {
            debug!(mime, bytes = bytes.len(), "Payload already in MP4 container");
        }
        Some(mime) => {
            warn!(mime, bytes = bytes.len(), "Relabeling non-MP4 payload as audio/mp4");
        }
        None => {
            warn!(bytes = bytes.len(), "Unrecognized payload, relabeling as audio/mp4");
        }
    }

    AudioArtifact {
        bytes,
        media_type: TARGET_MEDIA_TYPE.to_string(),
        detected_type,
        transcoded: false,
    }
}
