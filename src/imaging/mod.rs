//! Codec layer — decode PNG/JPEG, normalize the color mode, encode WebP.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` (PNG, JPEG) |
//! | **Mode** | [`ColorMode`] from the decoded color type |
//! | **Encode → WebP** | libwebp via the `webp` crate, lossy, fixed quality + method |
//!
//! The module is split into:
//! - **Parameters**: [`Quality`], [`Effort`], [`EncodeParams`]
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ColorMode, Encoded, ImageBackend};
pub use params::{EncodeParams, Effort, Quality};
pub use rust_backend::RustBackend;
