//! Core data models for the media service.
//!
//! `MediaRecord` maps to the `media_files` table via `sqlx::FromRow`;
//! `MediaKind` is the closed classification every route dispatches on.

pub mod media_file;
pub mod media_kind;
