pub mod console;
pub mod dispatch;
pub mod wiring;

pub use dispatch::dispatch;
