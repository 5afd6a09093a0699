use crate::protocol::{self, IR_FRAME_SIZE, IR_HEIGHT, IR_WIDTH};

/// Receiver of rendered infrared images, typically a texture upload.
pub trait RenderTarget {
    /// `pixels` holds `width * height` packed grayscale pixels, row-major.
    fn upload(&mut self, width: usize, height: usize, pixels: &[u32]);
}

impl RenderTarget for Vec<u32> {
    fn upload(&mut self, _width: usize, _height: usize, pixels: &[u32]) {
        self.clear();
        self.extend_from_slice(pixels);
    }
}

/// Staging for raw infrared samples and their display form.
pub struct InfraredProcessor {
    raw: Vec<u16>,
    pixels: Vec<u32>,
    fresh: bool,
}

impl InfraredProcessor {
    pub fn new() -> Self {
        Self {
            raw: vec![0; IR_FRAME_SIZE],
            pixels: vec![0; IR_FRAME_SIZE],
            fresh: false,
        }
    }

    /// Copy one frame of samples into the staging buffer.
    ///
    /// A missing buffer or one shorter than a full frame is ignored; extra
    /// samples past the frame size are dropped.
    pub fn ingest(&mut self, buffer: Option<&[u16]>) -> bool {
        let Some(samples) = buffer else {
            log::debug!("IR frame has no data");
            return false;
        };
        if samples.len() < IR_FRAME_SIZE {
            log::debug!(
                "IR frame too short ({} of {} samples), ignoring",
                samples.len(),
                IR_FRAME_SIZE
            );
            return false;
        }
        self.raw.copy_from_slice(&samples[..IR_FRAME_SIZE]);
        self.fresh = true;
        true
    }

    pub fn mark_stale(&mut self) {
        self.fresh = false;
    }

    pub fn has_fresh_data(&self) -> bool {
        self.fresh
    }

    /// Normalize the staged frame and hand it to `target`.
    ///
    /// Only runs when an unconsumed frame is staged; consumes it on success.
    pub fn render_to<T: RenderTarget + ?Sized>(&mut self, target: &mut T) -> bool {
        if !self.fresh {
            return false;
        }
        for (pixel, &sample) in self.pixels.iter_mut().zip(self.raw.iter()) {
            *pixel = protocol::pack_gray(protocol::ir_channel(sample));
        }
        target.upload(IR_WIDTH, IR_HEIGHT, &self.pixels);
        self.fresh = false;
        true
    }

    /// Last staged raw frame.
    pub fn raw(&self) -> &[u16] {
        &self.raw
    }
}

impl Default for InfraredProcessor {
    fn default() -> Self {
        Self::new()
    }
}
