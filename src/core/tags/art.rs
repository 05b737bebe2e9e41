//! core/tags/art.rs
//! Embedded cover art (APIC / PIC frames).

use id3::Tag;
use id3::frame::Content;

/// Returns (image_bytes, mime) for the first embedded picture.
pub(crate) fn embedded_art(tag: &Tag) -> Option<(Vec<u8>, String)> {
    tag.frames()
        .filter(|f| f.id() == "APIC" || f.id() == "PIC")
        .find_map(|f| match f.content() {
            // id3 crate stores mime like "image/jpeg" etc
            Content::Picture(p) => Some((p.data.clone(), p.mime_type.clone())),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use id3::TagLike;
    use id3::frame::{Picture, PictureType};

    #[test]
    fn picks_first_picture() {
        let mut tag = Tag::new();
        assert!(embedded_art(&tag).is_none());

        tag.add_frame(Picture {
            mime_type: "image/png".into(),
            picture_type: PictureType::CoverFront,
            description: String::new(),
            data: vec![0x89, b'P', b'N', b'G'],
        });

        let (data, mime) = embedded_art(&tag).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(data.len(), 4);
    }
}
