use image::{RgbaImage, imageops::FilterType};

use crate::{
    codec::ImageCodec,
    foundation::{
        core::Dimensions,
        error::{DeviceError, StudioError, StudioResult},
    },
    model::Frame,
};

/// Stream constraints requested when opening a camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CaptureConstraints {
    pub ideal: Dimensions,
    pub min: Dimensions,
    pub ideal_fps: u32,
    pub min_fps: u32,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            ideal: Dimensions::new(1280, 720),
            min: Dimensions::new(640, 480),
            ideal_fps: 30,
            min_fps: 15,
        }
    }
}

/// Answer to a bitmap request on an open stream.
#[derive(Debug)]
pub enum BitmapRequest {
    Ready(RgbaImage),
    /// The stream will deliver later; the host hands the bitmap back through the session.
    Pending,
    NotReady,
}

/// Something that can be opened into a live camera stream.
pub trait CaptureDevice {
    fn open(
        &mut self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, DeviceError>;
}

/// An open camera stream. Holding one means holding the device.
pub trait CaptureStream {
    /// Native resolution, once the stream has reported its metadata.
    fn native_size(&self) -> Option<Dimensions>;

    fn request_bitmap(&mut self) -> BitmapRequest;

    /// Release the device handle.
    fn close(self: Box<Self>);
}

/// Device stand-in for hosts without a camera (CLI, headless tooling).
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCamera;

impl CaptureDevice for NoCamera {
    fn open(
        &mut self,
        _constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, DeviceError> {
        Err(DeviceError::NotFound)
    }
}

/// Exclusive owner of the camera stream for the capture view.
pub struct CameraSession {
    device: Box<dyn CaptureDevice>,
    stream: Option<Box<dyn CaptureStream>>,
    status: Option<DeviceError>,
}

impl CameraSession {
    pub fn new(device: Box<dyn CaptureDevice>) -> Self {
        Self {
            device,
            stream: None,
            status: None,
        }
    }

    /// (Re)open the device. Any previous stream is closed before the new open is attempted.
    pub fn open(&mut self, constraints: &CaptureConstraints) -> Result<(), DeviceError> {
        self.release();
        match self.device.open(constraints) {
            Ok(stream) => {
                tracing::info!("camera opened");
                self.stream = Some(stream);
                self.status = None;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%err, "camera open failed");
                self.status = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.close();
            tracing::info!("camera released");
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stream_mut(&mut self) -> Option<&mut (dyn CaptureStream + 'static)> {
        self.stream.as_deref_mut()
    }

    pub fn status(&self) -> Option<&DeviceError> {
        self.status.as_ref()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    InFlight { target: Dimensions },
}

/// Turns camera bitmaps into frames, one capture at a time.
#[derive(Debug)]
pub struct CapturePipeline {
    state: CaptureState,
}

impl Default for CapturePipeline {
    fn default() -> Self {
        Self {
            state: CaptureState::Idle,
        }
    }
}

impl CapturePipeline {
    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, CaptureState::InFlight { .. })
    }

    /// `Idle -> InFlight`. Returns `false` if a capture is already running.
    pub fn try_begin(&mut self, target: Dimensions) -> bool {
        match self.state {
            CaptureState::InFlight { .. } => false,
            CaptureState::Idle => {
                self.state = CaptureState::InFlight { target };
                true
            }
        }
    }

    pub fn abort(&mut self) {
        self.state = CaptureState::Idle;
    }

    /// `InFlight -> Idle`, then build a frame from `bitmap` at the capture's target size.
    ///
    /// The state is back to `Idle` before any fallible step runs.
    pub fn complete(
        &mut self,
        bitmap: StudioResult<RgbaImage>,
        codec: &ImageCodec,
    ) -> StudioResult<Frame> {
        let CaptureState::InFlight { target } =
            std::mem::replace(&mut self.state, CaptureState::Idle)
        else {
            return Err(StudioError::validation("no capture in flight"));
        };

        let bitmap = bitmap?;
        if bitmap.width() == 0 || bitmap.height() == 0 {
            return Err(StudioError::codec("camera delivered an empty bitmap"));
        }
        let bitmap = if bitmap.dimensions() == (target.width, target.height) {
            bitmap
        } else {
            image::imageops::resize(&bitmap, target.width, target.height, FilterType::Triangle)
        };
        let encoded = codec.encode(&bitmap, target)?;
        Ok(Frame::new(encoded, false))
    }
}
