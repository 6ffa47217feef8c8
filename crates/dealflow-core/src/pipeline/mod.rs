mod lead;
mod stage;

pub use lead::Lead;
pub use stage::Stage;
