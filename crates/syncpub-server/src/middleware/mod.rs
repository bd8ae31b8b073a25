//! Request and response middleware.

pub(crate) mod readonly;
pub(crate) mod security;
