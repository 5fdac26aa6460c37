//! Turns raw model output into what the client renders.

pub mod code;

pub use code::CodeSanitizer;

/// Q&A answers are markdown and go out as produced.
pub fn pass_through(text: String) -> String {
    text
}
