pub mod envelope;
pub mod model;
pub mod parser;

pub use envelope::{Envelope, Format};
pub use model::{HostCommand, Source, Spec};
pub use parser::{extract_deployment_id, parse};
