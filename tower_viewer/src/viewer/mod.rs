mod gpu;
mod layout;
mod shaders;
mod state;

pub use gpu::GpuTower;
pub use state::ViewerState;
