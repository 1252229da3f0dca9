//! Realization Engine — multilingual surface realization of abstract
//! semantic frames.
//!
//! A [`Frame`] (a biography or an event) is planned into clauses, each
//! clause is built from a construction, and a family engine realizes it
//! against a merged family matrix and a lexicon. A [`DiscourseState`]
//! threaded through successive renders decides between full names, short
//! names, pronouns and dropped subjects.
//!
//! ```no_run
//! use realization_engine::{Frame, RenderOptions, Router};
//!
//! let router = Router::builder().data_dir("lang_data").build()?;
//! let frame: Frame = ron::from_str(&std::fs::read_to_string("lang_data/frames/marie_curie.ron")?)?;
//! let text = router.render(&frame, "it", None, &RenderOptions::default())?;
//! println!("{}", text.text);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod schema;

pub use crate::core::discourse::{DiscourseState, ReferenceForm, Register};
pub use crate::core::router::{RenderError, RenderOptions, RenderSession, RenderedText, Router};
pub use crate::schema::frame::Frame;
