#![deny(missing_docs)]

//! GJF Editor - Keyword editor core for Gaussian input files
//!
//! This crate edits the *route section* keywords of Gaussian input files
//! (`.gjf`), a line-oriented format split into calculation sections by
//! `--LinkN--` separators, each section carrying at most one `#p` directive
//! line:
//!
//! ```text
//! %chk=job.chk
//! #p opt freq b3lyp/6-31g* empiricaldispersion=gd3
//!
//! benzene optimization
//!
//! 0 1
//! C  0.0  0.0  0.0
//! --Link1--
//! #p td=(nstates=50,root=1) b3lyp/6-31g*
//! ...
//! ```
//!
//! # Overview
//!
//! Two subsystems carry the interesting logic:
//!
//! - the **section/keyword parser** ([`parser`] with [`tokenizer`]), which
//!   splits a file into sections, decodes the directive line into a
//!   round-trippable model, and regenerates exactly that one line after an
//!   edit while passing every other byte through untouched; and
//! - the **keyword knowledge base** ([`keywords`]), which loads a JSON
//!   taxonomy of keywords, parameter templates and compatibility rules,
//!   and answers the validity/compatibility/template questions that drive
//!   edits.
//!
//! Around them sit thin collaborators: line-level file I/O ([`io`]),
//! copy-based backups ([`backup`]) and INI configuration ([`settings`]).
//!
//! # Quick Start
//!
//! ```no_run
//! use gjfed::keywords::KeywordManager;
//! use gjfed::parser;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = KeywordManager::builtin()?;
//!     let mut sections = parser::parse_file(Path::new("job.gjf"))?;
//!
//!     if let Some(ks) = &sections[0].keyword_section {
//!         let (ok, warnings) = manager.check_compatibility(&ks.keywords, "freq");
//!         for warning in &warnings {
//!             eprintln!("{}", warning);
//!         }
//!         if ok {
//!             let mut keywords = ks.keywords.clone();
//!             keywords.push("freq".to_string());
//!             parser::update_keyword_section(&mut sections[0], &keywords);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! A missing keyword taxonomy is fatal
//! ([`keywords::KeywordError::MissingDataSource`]); a missing input file is
//! recoverable per operation. Malformed directive text never raises: the
//! codec degrades to a documented best-effort fallback parse.

/// Copy-based backup and restore for .gjf files
pub mod backup;
/// Line-level file I/O
pub mod io;
/// Keyword knowledge base and compatibility engine
pub mod keywords;
/// Section parsing and directive mutation
pub mod parser;
/// Configuration management
pub mod settings;
/// Keyword-fragment codec
pub mod tokenizer;

pub use keywords::KeywordManager;
pub use parser::{GjfSection, KeywordSection, SectionType};
