//! Input side: the token stream and the character mapping document.

pub mod characters;
pub mod reader;

pub use characters::CharacterMap;
pub use reader::{TokenReader, TokenRecord};
