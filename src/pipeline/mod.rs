//! Request pipeline running stages around a handler.

mod chain;
mod context;
mod stage;

pub use chain::Pipeline;
pub use context::{empty_response, response, RequestContext, Response};
pub use stage::{Rejection, Stage};
