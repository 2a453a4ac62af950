//! autoprice: vehicle price estimation from a pre-trained pipeline.
//!
//! This crate serves price estimates for used vehicles. The trained
//! regression pipeline and the ordered feature-name list it was fit on are
//! loaded once at startup; each request then reshapes an arbitrary, possibly
//! incomplete attribute record into the exact feature vector the pipeline
//! expects and invokes it.
//!
//! # Key Types
//!
//! - [`Estimator`] - Process-wide serving state with `estimate_price`
//! - [`align`] / [`AlignedRow`] - Schema alignment of raw records
//! - [`Pipeline`] - The loaded encoder stages + tree ensemble
//! - [`FeatureSchema`] / [`RawRecord`] - The two request-side inputs
//!
//! # Serving
//!
//! ```no_run
//! use autoprice::{Estimator, RawRecord};
//!
//! let estimator = Estimator::load("car_price_pipeline.vppl", "feature_names.json")?;
//!
//! let record = RawRecord::new()
//!     .with("vehicle_year", 2018i64)
//!     .with("current_mileage", 50_000i64)
//!     .with("vehicle_manufacturer", "TOYOTA");
//!
//! let price = estimator.estimate_price(&record)?;
//! println!("estimated price: {price:.2}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Alignment Contract
//!
//! The aligner guarantees the row handed to the pipeline has exactly the
//! schema's columns, in the schema's order: gaps become an explicit missing
//! sentinel, extraneous names are dropped, and nothing is fuzzy-matched.
//! See the [`align`] module for why this is the load-bearing invariant.

pub mod align;
pub mod artifact;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod serve;

// High-level serving types
pub use serve::{Estimator, InferenceError};

// Request-side inputs
pub use record::{AttrValue, RawRecord};
pub use schema::{FeatureSchema, SchemaError};

// Alignment (the core contract)
pub use align::{align, AlignError, AlignedRow};

// Pipeline and artifacts
pub use artifact::{load_pipeline, load_schema, save_pipeline, save_schema, ArtifactError};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineMeta};
