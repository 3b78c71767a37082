//! Container parts and the part-store contract.
//!
//! Binary container decoding is an external concern: a decoder hands this
//! crate an ordered sequence of already-decoded [`Part`]s, each addressable
//! by a stable zero-based index. [`MemoryStore`] is the plain in-memory
//! implementation of that contract.

use std::ops::ControlFlow;

use bstr::ByteSlice;

use crate::error::{Error, Result};
use crate::util::detect_media_format;

/// Classification of a container part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// HTML/XHTML markup fragment.
    Markup,
    /// CSS stylesheet.
    Style,
    /// Raster or vector image.
    Image,
    /// Embedded font.
    Font,
    /// Anything else (PDF attachments, audio, unknown blobs).
    Other,
}

/// One decoded resource belonging to a container.
///
/// Produced once during container decode and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Part {
    /// Stable zero-based index within the container.
    pub index: usize,
    /// Mime type reported by the decoder.
    pub mime: String,
    /// Raw bytes.
    pub data: Vec<u8>,
}

impl Part {
    pub fn new(index: usize, mime: &str, data: Vec<u8>) -> Part {
        Part {
            index,
            mime: mime.to_string(),
            data,
        }
    }

    /// Raw data size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Classify this part from its mime type, with magic-byte fallback for
    /// decoders that report everything as octet-stream.
    pub fn kind(&self) -> PartKind {
        match self.mime.to_ascii_lowercase().as_str() {
            "text/html" | "application/xhtml+xml" | "application/xml" => return PartKind::Markup,
            "text/css" => return PartKind::Style,
            _ => {}
        }

        let format = detect_media_format(&self.mime, &self.data);
        if format.is_image() {
            PartKind::Image
        } else if format.is_font() {
            PartKind::Font
        } else if self.looks_like_markup() {
            PartKind::Markup
        } else {
            PartKind::Other
        }
    }

    pub fn is_markup(&self) -> bool {
        self.kind() == PartKind::Markup
    }

    pub fn is_style(&self) -> bool {
        self.kind() == PartKind::Style
    }

    /// True for image and font parts, which resolve to external resources
    /// rather than tree-mergeable content.
    pub fn is_binary_resource(&self) -> bool {
        matches!(self.kind(), PartKind::Image | PartKind::Font)
    }

    fn looks_like_markup(&self) -> bool {
        let head = &self.data[..self.data.len().min(1024)];
        head.find(b"<html").is_some()
            || head.find(b"<HTML").is_some()
            || head.find(b"<body").is_some()
            || head.find(b"<?xml").is_some()
    }
}

/// Contract consumed from the external container decoder.
///
/// All reads are in-memory lookups; implementations never block on I/O.
pub trait PartStore {
    /// Number of parts in the container.
    fn part_count(&self) -> usize;

    /// Part at `index`, or `None` past the end.
    fn part_at(&self, index: usize) -> Option<&Part>;

    /// Part at `index`, for callers that treat a missing part as a hard
    /// [`Error::PartNotFound`] rather than a soft skip.
    fn require_part(&self, index: usize) -> Result<&Part> {
        self.part_at(index).ok_or(Error::PartNotFound(index))
    }

    /// Whether the container uses the KF8 structural variant of link
    /// syntax and flow layout.
    fn is_kf8(&self) -> bool;

    /// Container title, when the decoder surfaced one.
    fn title(&self) -> Option<&str> {
        None
    }

    /// Container author, when the decoder surfaced one.
    fn author(&self) -> Option<&str> {
        None
    }

    /// Cover image part, when the decoder identified one.
    fn cover(&self) -> Option<&Part> {
        None
    }

    /// Visit markup parts in container order. The callback returns
    /// [`ControlFlow::Break`] to stop early.
    fn for_each_markup<F>(&self, mut f: F)
    where
        Self: Sized,
        F: FnMut(&Part) -> ControlFlow<()>,
    {
        for index in 0..self.part_count() {
            let Some(part) = self.part_at(index) else {
                continue;
            };
            if part.is_markup() && f(part).is_break() {
                return;
            }
        }
    }

    /// Visit flow parts in their declared order.
    ///
    /// The default treats markup-classified parts, in container order, as
    /// the flow sequence; stores that track a separate flow table override
    /// this.
    fn for_each_flow<F>(&self, f: F)
    where
        Self: Sized,
        F: FnMut(&Part) -> ControlFlow<()>,
    {
        self.for_each_markup(f);
    }
}

/// In-memory part store backed by a `Vec<Part>`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    parts: Vec<Part>,
    kf8: bool,
    title: Option<String>,
    author: Option<String>,
    cover: Option<usize>,
}

impl MemoryStore {
    pub fn new(parts: Vec<Part>) -> MemoryStore {
        MemoryStore {
            parts,
            kf8: false,
            title: None,
            author: None,
            cover: None,
        }
    }

    pub fn with_kf8(mut self, kf8: bool) -> MemoryStore {
        self.kf8 = kf8;
        self
    }

    pub fn with_title(mut self, title: &str) -> MemoryStore {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_author(mut self, author: &str) -> MemoryStore {
        self.author = Some(author.to_string());
        self
    }

    /// Mark the part at `index` as the container's cover image.
    pub fn with_cover(mut self, index: usize) -> MemoryStore {
        self.cover = Some(index);
        self
    }

    /// Append a part, assigning the next index.
    pub fn push(&mut self, mime: &str, data: Vec<u8>) -> usize {
        let index = self.parts.len();
        self.parts.push(Part::new(index, mime, data));
        index
    }
}

impl PartStore for MemoryStore {
    fn part_count(&self) -> usize {
        self.parts.len()
    }

    fn part_at(&self, index: usize) -> Option<&Part> {
        self.parts.get(index)
    }

    fn is_kf8(&self) -> bool {
        self.kf8
    }

    fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    fn cover(&self) -> Option<&Part> {
        self.cover.and_then(|index| self.parts.get(index))
    }
}
