/// SceneDevice trait and the handle/descriptor types it works with

use std::time::Duration;
use crate::error::Result;

// ===== HANDLES =====

/// Command buffer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandBufferId(pub u64);

/// Command pool handle. A pool is only ever used from one thread at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandPoolId(pub u64);

/// Semaphore handle (GPU-GPU ordering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SemaphoreId(pub u64);

/// Fence handle (GPU-CPU signaling)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FenceId(pub u64);

/// Framebuffer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(pub u64);

/// Render pass handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderPassId(pub u64);

// ===== DESCRIPTORS =====

/// Command buffer level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandBufferLevel {
    /// Submitted to a queue, may execute secondaries
    Primary,
    /// Executed from a primary inside a render pass
    Secondary,
}

/// Fence state as reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FenceStatus {
    Signaled,
    NotReady,
    /// A bounded wait expired before the fence signaled
    Timeout,
}

/// Pipeline stage a submission waits at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    TopOfPipe,
    Transfer,
    EarlyFragmentTests,
    ColorAttachmentOutput,
    BottomOfPipe,
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}

/// Where the scene renders: render pass, framebuffer and extent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    pub render_pass: RenderPassId,
    pub framebuffer: FramebufferId,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    /// Full-extent render area
    pub fn render_area(&self) -> Rect2D {
        Rect2D { x: 0, y: 0, width: self.width, height: self.height }
    }
}

/// Parameters for beginning the render pass in a primary command buffer
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassBeginInfo {
    pub render_pass: RenderPassId,
    pub framebuffer: FramebufferId,
    pub render_area: Rect2D,
    pub clear_values: Vec<ClearValue>,
}

/// One queue submission
#[derive(Debug, Clone, Copy)]
pub struct SubmitInfo<'a> {
    pub command_buffers: &'a [CommandBufferId],
    /// Semaphores to wait on, each at the given stage
    pub wait_semaphores: &'a [(SemaphoreId, PipelineStage)],
    pub signal_semaphores: &'a [SemaphoreId],
    /// Fence signaled when the submission completes
    pub fence: Option<FenceId>,
}

// ===== DEVICE TRAIT =====

/// GPU device as seen by the scene
///
/// Methods take `&self`: workers record into their own pools concurrently,
/// so implementations synchronize internally where the API requires it.
pub trait SceneDevice: Send + Sync {
    fn create_command_pool(&self) -> Result<CommandPoolId>;

    fn destroy_command_pool(&self, pool: CommandPoolId);

    fn allocate_command_buffer(
        &self,
        pool: CommandPoolId,
        level: CommandBufferLevel,
    ) -> Result<CommandBufferId>;

    /// Return command buffers to `pool`. None of them may still be in use by the GPU.
    fn free_command_buffers(&self, pool: CommandPoolId, command_buffers: &[CommandBufferId]);

    /// Record a primary: begin the render pass, execute `secondaries` in order, end the pass.
    fn record_primary(
        &self,
        command_buffer: CommandBufferId,
        begin_info: &RenderPassBeginInfo,
        secondaries: &[CommandBufferId],
    ) -> Result<()>;

    fn create_semaphore(&self) -> Result<SemaphoreId>;

    fn destroy_semaphore(&self, semaphore: SemaphoreId);

    fn create_fence(&self) -> Result<FenceId>;

    fn destroy_fence(&self, fence: FenceId);

    /// Non-blocking fence query
    fn fence_status(&self, fence: FenceId) -> Result<FenceStatus>;

    /// Wait up to `timeout` for `fence`
    ///
    /// # Errors
    ///
    /// `Error::DeviceLost` if the device stopped responding.
    fn wait_for_fence(&self, fence: FenceId, timeout: Duration) -> Result<FenceStatus>;

    fn reset_fence(&self, fence: FenceId) -> Result<()>;

    fn submit(&self, info: &SubmitInfo<'_>) -> Result<()>;
}
