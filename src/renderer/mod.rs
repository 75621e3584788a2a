pub mod chart;
pub mod plot;

#[derive(Debug)]
pub enum RenderError {
    NoAdapter,
    RequestDevice(wgpu::RequestDeviceError),
    CreateSurface(wgpu::CreateSurfaceError),
    UnsupportedSurface,
    CreateWindow(winit::error::OsError),
    EventLoop(winit::error::EventLoopError),
    EmptyImage { width: u32, height: u32 },
    Plot(Box<dyn std::error::Error>),
    Io(std::io::Error),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::NoAdapter => write!(f, "Failed to find a suitable GPU adapter"),
            RenderError::RequestDevice(e) => write!(f, "Failed to create device: {}", e),
            RenderError::CreateSurface(e) => write!(f, "Failed to create surface: {}", e),
            RenderError::UnsupportedSurface => {
                write!(f, "Surface is not supported by the selected adapter")
            }
            RenderError::CreateWindow(e) => write!(f, "Failed to create window: {}", e),
            RenderError::EventLoop(e) => write!(f, "Event loop error: {}", e),
            RenderError::EmptyImage { width, height } => {
                write!(f, "Cannot render a {}x{} image", width, height)
            }
            RenderError::Plot(e) => write!(f, "Failed to draw plot: {}", e),
            RenderError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<wgpu::RequestDeviceError> for RenderError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        RenderError::RequestDevice(e)
    }
}

impl From<wgpu::CreateSurfaceError> for RenderError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        RenderError::CreateSurface(e)
    }
}

impl From<winit::error::OsError> for RenderError {
    fn from(e: winit::error::OsError) -> Self {
        RenderError::CreateWindow(e)
    }
}

impl From<winit::error::EventLoopError> for RenderError {
    fn from(e: winit::error::EventLoopError) -> Self {
        RenderError::EventLoop(e)
    }
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Io(e)
    }
}
