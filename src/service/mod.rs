//! Request-independent operations shared by the HTTP handlers and the CLI.
//! Every function takes its collaborators explicitly.

pub mod admin;
pub mod attendance;
pub mod capture;
pub mod engine;
pub mod students;
pub mod trainer;

pub use engine::FaceEngine;
pub use trainer::RecognizerTrainer;
