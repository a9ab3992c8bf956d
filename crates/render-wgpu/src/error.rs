/// Failures of the wgpu backend.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("render pipeline creation failed: {0}")]
    Pipeline(String),
    #[error("GPU device lost")]
    DeviceLost,
}
