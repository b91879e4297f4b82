//! Planning rules that need no oracle: decision decoding and the fallback
//! rule table.

pub mod fallback;
pub mod parsing;
