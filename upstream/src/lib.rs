pub mod client;
pub mod envelope;

pub use client::DiyanetClient;
pub use envelope::Call;
