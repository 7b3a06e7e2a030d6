//! Thin ownership wrapper over one spawned child process.

mod handle;

pub use handle::ProcessHandle;

#[cfg(test)]
mod tests;
