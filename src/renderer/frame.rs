use bitflags::bitflags;
use winit::keyboard::KeyCode;

use crate::error::RendererError;

/// Per-frame bookkeeping threaded through the draw lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameState {
    pub back_buffer_index: u32,
    pub back_buffer_count: u32,
    pub frame_index: u64,
}

impl FrameState {
    pub fn new(back_buffer_count: u32) -> Self {
        assert!(back_buffer_count > 0, "need at least one back buffer");
        Self {
            back_buffer_index: 0,
            back_buffer_count,
            frame_index: 0,
        }
    }

    /// State for the next frame.
    pub fn advance(self) -> Self {
        Self {
            back_buffer_index: (self.back_buffer_index + 1) % self.back_buffer_count,
            back_buffer_count: self.back_buffer_count,
            frame_index: self.frame_index + 1,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MouseButtons: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const MIDDLE = 1 << 2;
    }
}

/// Hooks the window shell drives. `draw_begin`, `draw` and `draw_end` run in
/// that order once per frame, after `update`.
pub trait RenderApp {
    fn initialize(&mut self) -> Result<(), RendererError>;

    fn on_resize(&mut self, width: u32, height: u32);

    fn update(&mut self, dt: f32);

    fn draw_begin(&mut self, frame: FrameState) -> FrameState {
        frame
    }

    fn draw(&mut self, frame: &mut FrameState);

    fn draw_end(&mut self, frame: FrameState) -> Result<FrameState, RendererError>;

    fn on_mouse_down(&mut self, _buttons: MouseButtons, _x: f32, _y: f32) {}

    fn on_mouse_up(&mut self, _buttons: MouseButtons, _x: f32, _y: f32) {}

    fn on_mouse_move(&mut self, _buttons: MouseButtons, _x: f32, _y: f32) {}

    fn on_key(&mut self, _key: KeyCode, _pressed: bool) {}

    /// Waits for the GPU before resources are dropped.
    fn shutdown(&mut self) -> Result<(), RendererError> {
        Ok(())
    }
}

/// One pass through the lifecycle: update, then the three draw hooks.
pub fn run_frame<A: RenderApp>(
    app: &mut A,
    frame: FrameState,
    dt: f32,
) -> Result<FrameState, RendererError> {
    app.update(dt);
    let mut frame = app.draw_begin(frame);
    app.draw(&mut frame);
    app.draw_end(frame)
}
