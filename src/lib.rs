//! # webpify
//!
//! Incremental batch conversion of PNG and JPEG images to lossy WebP.
//!
//! Point it at a few directories and it converts every image directly inside
//! them to a `.webp` sibling with the same stem. An output is only rewritten
//! when it is missing or older than its input, so repeat runs are cheap.
//!
//! # Pipeline
//!
//! Each file goes through the same three steps, and every file yields
//! exactly one [`ConversionOutcome`](types::ConversionOutcome):
//!
//! ```text
//! classify   extension png/jpg/jpeg?        no  → Skipped(not-an-image)
//! staleness  output missing or older?       no  → Skipped(already-up-to-date)
//! transcode  decode → RGB/RGBA → WebP q85   err → Failed(message)
//!                                           ok  → Converted(sizes, savings)
//! ```
//!
//! Outcomes are collected into a [`BatchSummary`](summary::BatchSummary)
//! which reports counts, byte totals and the first few failures.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`classify`] | Accepted-extension table and output path derivation |
//! | [`staleness`] | Modification-time comparison between input and output |
//! | [`imaging`] | Codec seam: `ImageBackend` trait and the libwebp-backed implementation |
//! | [`transcode`] | Per-file fault boundary: encode, atomic write, size measurement |
//! | [`scan`] | Non-recursive listing of eligible files in one directory |
//! | [`process`] | Batch driver: parallel walk, progress events, cancellation, dry run |
//! | [`summary`] | Batch aggregation and the serializable report |
//! | [`output`] | CLI output formatting |
//! | [`config`] | `webpify.toml` loading and validation |
//! | [`types`] | Shared data types (`InputFile`, `ConversionOutcome`) |
//! | [`markup`] | Standalone `<img>` rewriter pointing HTML at the `.webp` files |
//!
//! # Design Decisions
//!
//! ## Failures Are Values
//!
//! Decode, encode and write errors never propagate past
//! [`transcode::Transcoder::transcode`]. They become `Failed` outcomes, so
//! one corrupt file cannot stop a batch of thousands. Only run-level problems
//! (an existing directory that cannot be listed, or no directory at all) are
//! errors.
//!
//! ## Timestamps, Not Hashes
//!
//! An output whose mtime is greater than or equal to its input's is current.
//! Equal timestamps count as current, which can miss an edit saved within the
//! same second as the previous output on coarse-grained filesystems.
//!
//! ## libwebp for Encoding
//!
//! The `image` crate decodes PNG and JPEG but its WebP encoder is
//! lossless-only. Lossy encoding at a chosen quality goes through the `webp`
//! crate's libwebp bindings.

pub mod classify;
pub mod config;
pub mod imaging;
pub mod markup;
pub mod output;
pub mod process;
pub mod scan;
pub mod staleness;
pub mod summary;
pub mod transcode;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
