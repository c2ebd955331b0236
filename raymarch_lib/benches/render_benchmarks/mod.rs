pub mod dense;
pub mod streamed;
