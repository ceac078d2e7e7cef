//! docsync core - section-aware diffing and heading maps for translated docs
//!
//! This crate holds the logic for keeping a translated documentation tree in
//! step with its source, independent of any CLI or translation service:
//! - Block and section structure of Markdown/MyST documents
//! - Heading map storage in the document's YAML header
//! - Heading map reconciliation between source and target trees
//! - Section-level change detection between document versions
//! - Section-scoped synchronisation through a pluggable translator

pub mod block;
pub mod config;
pub mod diff;
pub mod doc;
pub mod front_matter;
pub mod heading;
pub mod heading_map;
pub mod locate;
pub mod reconcile;
pub mod section;
pub mod sync;

// Re-export commonly used types
pub use block::{parse, reconstruct, Block, BlockKind, ParsedDocument};
pub use config::Config;
pub use diff::{identify_changed_sections, ChangeType, ChangedSection};
pub use doc::Document;
pub use heading_map::HeadingMap;
pub use locate::locate;
pub use reconcile::update_heading_map;
pub use section::{Section, SectionTree};
pub use sync::{sync_document, SectionTranslator, SyncOutcome, TranslationContext};
