//! Well-known attribute names shared across commands.
//!
//! Decoding commands find their raw byte input under [`ATTACHMENT_BODY`] and
//! publish each decoded container under the same attribute on the outbound
//! record, with [`ATTACHMENT_MIME_TYPE`] tagging the in-memory
//! representation.

/// Attribute carrying the attachment payload: the raw byte input on the way
/// into a decoding command, the decoded container on the way out.
pub const ATTACHMENT_BODY: &str = "_attachment_body";

/// Attribute carrying the MIME-like tag that identifies the in-memory
/// representation of [`ATTACHMENT_BODY`].
pub const ATTACHMENT_MIME_TYPE: &str = "_attachment_mimetype";
