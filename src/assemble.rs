//! Embedded-resource reference resolution and preview assembly.
//!
//! An [`Assembler`] walks a container's markup parts, scans each part's body
//! for reference-bearing attributes, resolves `kindle:embed:NNNN` targets
//! against the part store, and accumulates everything into one output
//! [`Document`]. A single bad reference never fails the whole assembly:
//! anything that cannot be resolved is unlinked and the rest of the
//! document survives.

use std::ops::ControlFlow;

use memchr::memmem;
use tracing::debug;

use crate::container::{Part, PartKind, PartStore};
use crate::dom::Document;
use crate::error::Result;
use crate::util::detect_media_format;

/// Literal scheme prefix of an embedded-resource reference.
pub const EMBED_PREFIX: &str = "kindle:embed:";

/// Width of the fixed decimal index field following the prefix.
pub const EMBED_INDEX_WIDTH: usize = 4;

/// Query selecting the reference-bearing attributes of a part body:
/// hyperlinks, image sources, and stylesheet references.
pub const REFERENCE_QUERY: &str = "//@href | //@src";

/// A parsed embedded-resource reference: `kindle:embed:` followed by
/// exactly four decimal digits encoding the zero-based target part index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedRef {
    /// Zero-based part index.
    pub index: usize,
}

impl EmbedRef {
    /// Find a reference anywhere in `text`.
    ///
    /// A wrong-width or non-digit payload is not a reference; the text is
    /// plain content then (most links are ordinary anchors), never an
    /// error.
    pub fn parse(text: &str) -> Option<EmbedRef> {
        let start = memmem::find(text.as_bytes(), EMBED_PREFIX.as_bytes())?;
        let payload = &text.as_bytes()[start + EMBED_PREFIX.len()..];

        let digits = payload
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits != EMBED_INDEX_WIDTH {
            return None;
        }

        // Fixed width keeps the index comfortably inside usize.
        let index = std::str::from_utf8(&payload[..EMBED_INDEX_WIDTH])
            .ok()?
            .parse()
            .ok()?;
        Some(EmbedRef { index })
    }
}

/// Assembly knobs supplied by the calling context.
#[derive(Debug, Clone, Copy)]
pub struct AssembleOptions {
    /// Whether binary resources (images, fonts) may be embedded as external
    /// resources. When false, their references are removed instead of left
    /// dangling.
    pub embed_resources: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        AssembleOptions {
            embed_resources: true,
        }
    }
}

/// A binary part resolved to an external representation.
#[derive(Debug, Clone)]
pub struct ResolvedResource {
    /// Index of the source part.
    pub part_index: usize,
    /// Resolver-assigned name the document now refers to.
    pub name: String,
    /// Raw bytes, ready for the bundling layer to write out.
    pub data: Vec<u8>,
}

/// The assembled preview: serialized document plus its resource manifest.
#[derive(Debug)]
pub struct Assembled {
    /// Fully re-encoded document bytes.
    pub html: Vec<u8>,
    /// Resources referenced by the document, in first-use order.
    pub resources: Vec<ResolvedResource>,
    /// Container title, when the store carries one.
    pub title: Option<String>,
    /// Cover image, when the store identifies one. Not part of the
    /// document body; the bundling layer uses it as a thumbnail.
    pub cover: Option<ResolvedResource>,
}

/// Accumulates container content into one output document.
pub struct Assembler<'s, S: PartStore> {
    store: &'s S,
    options: AssembleOptions,
    output: Document,
    resources: Vec<ResolvedResource>,
    /// Markup parts already inlined as embed targets. They must not be
    /// appended again when the markup enumeration reaches them.
    inlined_parts: Vec<usize>,
}

impl<'s, S: PartStore> Assembler<'s, S> {
    pub fn new(store: &'s S) -> Assembler<'s, S> {
        Assembler::with_options(store, AssembleOptions::default())
    }

    pub fn with_options(store: &'s S, options: AssembleOptions) -> Assembler<'s, S> {
        Assembler {
            store,
            options,
            output: Document::new(),
            resources: Vec::new(),
            inlined_parts: Vec::new(),
        }
    }

    /// The accumulating output document.
    pub fn output(&self) -> &Document {
        &self.output
    }

    /// Resolve every embedded-resource reference inside `doc`'s body.
    ///
    /// Binary targets rewrite the reference to a resolver-assigned name (or
    /// unlink it when embedding is disallowed); markup targets inline their
    /// body into the output document and drop the reference; everything
    /// else, including out-of-range and unparsable targets, unlinks softly.
    pub fn resolve_links(&mut self, doc: &mut Document) -> Result<()> {
        let body = doc.body();
        let mut matches = doc.query(REFERENCE_QUERY, body)?;

        for i in 0..matches.count() {
            if matches.is_namespace_at(i)? {
                continue;
            }
            let content = matches.child_content_at(i)?;
            let Some(embed) = EmbedRef::parse(&content) else {
                continue;
            };

            let Some(part) = self.store.part_at(embed.index) else {
                debug!(index = embed.index, "embed target out of range, unlinking");
                matches.unlink_at(i)?;
                continue;
            };

            match part.kind() {
                PartKind::Image | PartKind::Font if self.options.embed_resources => {
                    let name = self.record_resource(part);
                    matches.set_child_content_at(i, &name)?;
                }
                PartKind::Image | PartKind::Font => {
                    matches.unlink_at(i)?;
                }
                PartKind::Markup => match Document::parse(&part.data) {
                    Ok(fragment) => {
                        let fragment_body = fragment.body();
                        self.output.append_body_copy(&fragment, fragment_body, true)?;
                        if !self.inlined_parts.contains(&embed.index) {
                            self.inlined_parts.push(embed.index);
                        }
                        matches.unlink_at(i)?;
                    }
                    Err(err) => {
                        debug!(index = embed.index, error = %err, "embed target unparsable, unlinking");
                        matches.unlink_at(i)?;
                    }
                },
                PartKind::Style | PartKind::Other => {
                    debug!(index = embed.index, "unsupported embed target, unlinking");
                    matches.unlink_at(i)?;
                }
            }
        }
        Ok(())
    }

    /// Append each flow part's body content to the output document, in
    /// container order, producing one linear reading order.
    pub fn merge_flows(&mut self) -> Result<()> {
        let store = self.store;
        let mut failure = None;

        store.for_each_flow(|part| {
            match Document::parse(&part.data) {
                Ok(fragment) => {
                    let body = fragment.body();
                    if let Err(err) = self.output.append_body_copy(&fragment, body, true) {
                        failure = Some(err);
                        return ControlFlow::Break(());
                    }
                }
                Err(err) => {
                    debug!(index = part.index, error = %err, "skipping unparsable flow part");
                }
            }
            ControlFlow::Continue(())
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Assemble the whole container into a previewable document.
    ///
    /// KF8 containers enumerate skeleton markup parts and resolve embeds
    /// per part; pre-KF8 containers carry one markup flow with no embed
    /// syntax, so they take the plain flow merge.
    pub fn assemble(mut self) -> Result<Assembled> {
        if let Some(title) = self.store.title() {
            self.output.append_head_element("title", title);
        }

        if self.store.is_kf8() {
            self.merge_markup_parts()?;
        } else {
            self.merge_flows()?;
        }

        let cover = self.store.cover().map(|part| {
            let format = detect_media_format(&part.mime, &part.data);
            ResolvedResource {
                part_index: part.index,
                name: format!("cover.{}", format.extension()),
                data: part.data.clone(),
            }
        });

        let html = self.output.serialize()?;
        Ok(Assembled {
            html,
            resources: self.resources,
            title: self.store.title().map(str::to_string),
            cover,
        })
    }

    fn merge_markup_parts(&mut self) -> Result<()> {
        let store = self.store;
        let mut failure = None;

        store.for_each_markup(|part| {
            // Inlined embed targets already live in the output body.
            if self.inlined_parts.contains(&part.index) {
                return ControlFlow::Continue(());
            }
            match Document::parse(&part.data) {
                Ok(mut doc) => {
                    if let Err(err) = self.resolve_links(&mut doc).and_then(|_| {
                        let body = doc.body();
                        self.output.append_body_copy(&doc, body, true).map(|_| ())
                    }) {
                        failure = Some(err);
                        return ControlFlow::Break(());
                    }
                }
                Err(err) => {
                    debug!(index = part.index, error = %err, "skipping unparsable markup part");
                }
            }
            ControlFlow::Continue(())
        });

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Record a binary part in the resource manifest, deduplicating by part
    /// index, and return its assigned name.
    fn record_resource(&mut self, part: &Part) -> String {
        if let Some(existing) = self
            .resources
            .iter()
            .find(|r| r.part_index == part.index)
        {
            return existing.name.clone();
        }
        let format = detect_media_format(&part.mime, &part.data);
        let name = format!("resource{:04}.{}", part.index, format.extension());
        debug!(index = part.index, name = %name, "resolved binary resource");
        self.resources.push(ResolvedResource {
            part_index: part.index,
            name: name.clone(),
            data: part.data.clone(),
        });
        name
    }
}

/// Assemble a container with default options.
pub fn assemble<S: PartStore>(store: &S) -> Result<Assembled> {
    Assembler::new(store).assemble()
}
