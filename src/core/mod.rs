mod reconciler;
mod signals;
mod supervisor;
mod wrapper;

pub use supervisor::Supervisor;
