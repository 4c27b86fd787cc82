//! # quote-forge – quotation PDFs from HTML templates
//!
//! A [`Quotation`] is validated, given its logo and watermark, rendered
//! through a Tera template ([`templates`]) and turned into PDF bytes by a
//! two-tier [`Compositor`]:
//!
//! 1. **Layout backend** – parse ([`dom`], [`stylesheet`]), style
//!    ([`style`]), flexbox layout with Taffy ([`layout`]), paginate
//!    ([`pagination`]) and draw with printpdf ([`render`]).
//! 2. **Flow backend** – when the first one fails, the sanitized document
//!    is flattened into text blocks and tables ([`flow`]).
//!
//! Supporting pieces: company presets ([`company`]), the item list of a
//! quotation being assembled ([`session`]) and the client/product
//! [`catalog`].

pub mod assets;
pub mod backend;
pub mod catalog;
pub mod company;
pub mod compositor;
pub mod config;
pub mod dom;
pub mod error;
pub mod flow;
pub mod fonts;
pub mod generator;
pub mod images;
pub mod layout;
pub mod layout_config;
pub mod pagination;
pub mod pipeline;
pub mod quotation;
pub mod render;
pub mod sanitize;
pub mod session;
pub mod style;
pub mod stylesheet;
pub mod templates;

pub use compositor::Compositor;
pub use config::QuoteConfig;
pub use error::{QuoteError, Result};
pub use generator::QuoteGenerator;
pub use pipeline::{generate_pdf, generate_pdf_from_html, PageOrientation, PipelineConfig};
pub use quotation::{QuoteRequest, Quotation};
