//! Core XML parsing primitives
//!
//! This module contains the fundamental building blocks for XML parsing:
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Encoding: source encoding detection and UTF-8 conversion both ways
//! - Entities: XML entity decoding with Cow (zero-copy when possible)

pub mod encoding;
pub mod entities;
pub mod scanner;
