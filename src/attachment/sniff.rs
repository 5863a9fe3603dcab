//! File type detection from leading magic bytes.

use serde::{Deserialize, Serialize};

/// A file type recognized from its signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedType {
    /// MIME type, e.g. `application/pdf`.
    pub mime: String,
    /// Extension without the dot, e.g. `pdf`.
    pub extension: String,
}

impl DetectedType {
    /// Top-level media type (`image` for `image/png`).
    #[must_use]
    pub fn media_type(&self) -> &str {
        self.mime.split('/').next().unwrap_or_default()
    }
}

struct Signature {
    offset: usize,
    magic: &'static [u8],
}

struct Matcher {
    mime: &'static str,
    extension: &'static str,
    signatures: &'static [Signature],
}

const fn sig(offset: usize, magic: &'static [u8]) -> Signature {
    Signature { offset, magic }
}

// Order matters: container formats sharing a prefix (RIFF, ftyp) are listed
// with their full discriminating signatures.
static MATCHERS: &[Matcher] = &[
    // Documents
    Matcher { mime: "application/pdf", extension: "pdf", signatures: &[sig(0, b"%PDF-")] },
    Matcher { mime: "application/rtf", extension: "rtf", signatures: &[sig(0, b"{\\rtf")] },
    Matcher { mime: "application/postscript", extension: "ps", signatures: &[sig(0, b"%!")] },
    Matcher {
        mime: "application/x-ole-storage",
        extension: "doc",
        signatures: &[sig(0, &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])],
    },
    // Images
    Matcher {
        mime: "image/png",
        extension: "png",
        signatures: &[sig(0, &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])],
    },
    Matcher { mime: "image/jpeg", extension: "jpg", signatures: &[sig(0, &[0xFF, 0xD8, 0xFF])] },
    Matcher { mime: "image/gif", extension: "gif", signatures: &[sig(0, b"GIF8")] },
    Matcher {
        mime: "image/webp",
        extension: "webp",
        signatures: &[sig(0, b"RIFF"), sig(8, b"WEBP")],
    },
    Matcher { mime: "image/bmp", extension: "bmp", signatures: &[sig(0, b"BM")] },
    Matcher { mime: "image/tiff", extension: "tif", signatures: &[sig(0, b"II*\0")] },
    Matcher { mime: "image/tiff", extension: "tif", signatures: &[sig(0, b"MM\0*")] },
    Matcher {
        mime: "image/vnd.microsoft.icon",
        extension: "ico",
        signatures: &[sig(0, &[0x00, 0x00, 0x01, 0x00])],
    },
    Matcher { mime: "image/vnd.adobe.photoshop", extension: "psd", signatures: &[sig(0, b"8BPS")] },
    Matcher { mime: "image/avif", extension: "avif", signatures: &[sig(4, b"ftypavif")] },
    Matcher { mime: "image/heif", extension: "heif", signatures: &[sig(4, b"ftypheic")] },
    // Audio / video
    Matcher { mime: "audio/mpeg", extension: "mp3", signatures: &[sig(0, b"ID3")] },
    Matcher { mime: "audio/mpeg", extension: "mp3", signatures: &[sig(0, &[0xFF, 0xFB])] },
    Matcher { mime: "audio/flac", extension: "flac", signatures: &[sig(0, b"fLaC")] },
    Matcher { mime: "audio/ogg", extension: "ogg", signatures: &[sig(0, b"OggS")] },
    Matcher {
        mime: "audio/x-wav",
        extension: "wav",
        signatures: &[sig(0, b"RIFF"), sig(8, b"WAVE")],
    },
    Matcher {
        mime: "video/x-msvideo",
        extension: "avi",
        signatures: &[sig(0, b"RIFF"), sig(8, b"AVI ")],
    },
    Matcher { mime: "video/quicktime", extension: "mov", signatures: &[sig(4, b"ftypqt")] },
    Matcher { mime: "audio/mp4", extension: "m4a", signatures: &[sig(4, b"ftypM4A")] },
    Matcher { mime: "video/mp4", extension: "mp4", signatures: &[sig(4, b"ftyp")] },
    Matcher {
        mime: "video/webm",
        extension: "webm",
        signatures: &[sig(0, &[0x1A, 0x45, 0xDF, 0xA3]), sig(31, b"webm")],
    },
    Matcher {
        mime: "video/x-matroska",
        extension: "mkv",
        signatures: &[sig(0, &[0x1A, 0x45, 0xDF, 0xA3])],
    },
    // Archives
    Matcher {
        mime: "application/epub+zip",
        extension: "epub",
        signatures: &[sig(0, b"PK\x03\x04"), sig(30, b"mimetypeapplication/epub+zip")],
    },
    Matcher { mime: "application/zip", extension: "zip", signatures: &[sig(0, b"PK\x03\x04")] },
    Matcher { mime: "application/gzip", extension: "gz", signatures: &[sig(0, &[0x1F, 0x8B, 0x08])] },
    Matcher { mime: "application/x-bzip2", extension: "bz2", signatures: &[sig(0, b"BZh")] },
    Matcher {
        mime: "application/x-7z-compressed",
        extension: "7z",
        signatures: &[sig(0, &[b'7', b'z', 0xBC, 0xAF, 0x27, 0x1C])],
    },
    Matcher {
        mime: "application/vnd.rar",
        extension: "rar",
        signatures: &[sig(0, &[b'R', b'a', b'r', b'!', 0x1A, 0x07])],
    },
    Matcher {
        mime: "application/x-xz",
        extension: "xz",
        signatures: &[sig(0, &[0xFD, b'7', b'z', b'X', b'Z', 0x00])],
    },
    // `ustar` at 257, truncated to what fits in the sniffed header
    Matcher { mime: "application/x-tar", extension: "tar", signatures: &[sig(257, b"usta")] },
    // Binaries and data
    Matcher { mime: "application/wasm", extension: "wasm", signatures: &[sig(0, b"\0asm")] },
    Matcher { mime: "application/x-executable", extension: "elf", signatures: &[sig(0, b"\x7FELF")] },
    Matcher { mime: "application/vnd.microsoft.portable-executable", extension: "exe", signatures: &[sig(0, b"MZ")] },
    Matcher { mime: "application/vnd.sqlite3", extension: "sqlite", signatures: &[sig(0, b"SQLite format 3\0")] },
    // Fonts
    Matcher { mime: "font/woff", extension: "woff", signatures: &[sig(0, b"wOFF")] },
    Matcher { mime: "font/woff2", extension: "woff2", signatures: &[sig(0, b"wOF2")] },
    Matcher { mime: "font/otf", extension: "otf", signatures: &[sig(0, b"OTTO")] },
];

impl Matcher {
    fn matches(&self, header: &[u8]) -> bool {
        self.signatures.iter().all(|s| {
            header
                .get(s.offset..s.offset + s.magic.len())
                .is_some_and(|window| window == s.magic)
        })
    }
}

/// Detect a file type from the first bytes of a file.
///
/// Needs at most [`crate::constants::SNIFF_HEADER_LEN`] bytes; the tar
/// signature sits at offset 257. Returns `None` for unrecognized data.
#[must_use]
pub fn detect(header: &[u8]) -> Option<DetectedType> {
    MATCHERS.iter().find(|m| m.matches(header)).map(|m| DetectedType {
        mime: m.mime.to_string(),
        extension: m.extension.to_string(),
    })
}
