use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use webcam_core::{
    CameraCaps, CameraInfo, Recorder, RecorderError, RecorderOptions, Rotation, StopOnce,
};

/// Argument errors become `ValueError`, everything else `RuntimeError`.
fn to_py_err(err: RecorderError) -> PyErr {
    if err.is_invalid_argument() {
        PyValueError::new_err(err.to_string())
    } else {
        PyRuntimeError::new_err(err.to_string())
    }
}

fn recorder_options(
    display: bool,
    rotate: u32,
    bitrate: Option<u32>,
    source: Option<String>,
) -> PyResult<RecorderOptions> {
    Ok(RecorderOptions {
        display,
        rotation: Rotation::from_degrees(rotate).map_err(to_py_err)?,
        bitrate_kbps: bitrate,
        source,
        ..Default::default()
    })
}

/// Requested capture mode: resolution, framerate and pixel format.
#[pyclass(name = "CameraCaps", module = "webcam_py")]
struct PyCameraCaps {
    #[pyo3(get, set)]
    width: i32,
    #[pyo3(get, set)]
    height: i32,
    #[pyo3(get, set)]
    framerate_numerator: i32,
    #[pyo3(get, set)]
    framerate_denominator: i32,
    #[pyo3(get, set)]
    format: String,
}

impl PyCameraCaps {
    fn to_core(&self) -> CameraCaps {
        CameraCaps::new(
            self.width,
            self.height,
            self.framerate_numerator,
            self.framerate_denominator,
            self.format.clone(),
        )
    }

    fn from_core(caps: &CameraCaps) -> Self {
        PyCameraCaps {
            width: caps.width,
            height: caps.height,
            framerate_numerator: caps.framerate_numerator,
            framerate_denominator: caps.framerate_denominator,
            format: caps.format.clone(),
        }
    }
}

#[pymethods]
impl PyCameraCaps {
    #[new]
    fn new(
        width: i32,
        height: i32,
        framerate_numerator: i32,
        framerate_denominator: i32,
        format: String,
    ) -> Self {
        PyCameraCaps {
            width,
            height,
            framerate_numerator,
            framerate_denominator,
            format,
        }
    }

    /// Raise `ValueError` if the caps cannot be recorded.
    fn validate(&self) -> PyResult<()> {
        self.to_core().validate().map_err(to_py_err)
    }

    /// Frames per second.
    #[getter]
    fn framerate(&self) -> f64 {
        self.to_core().framerate()
    }

    fn __repr__(&self) -> String {
        format!(
            "CameraCaps(width={}, height={}, framerate_numerator={}, framerate_denominator={}, format={:?})",
            self.width, self.height, self.framerate_numerator, self.framerate_denominator, self.format
        )
    }
}

/// A running recording. Stop it with `stop()`, `stop_recording()` or by
/// leaving a `with` block.
#[pyclass(name = "Recorder", module = "webcam_py")]
struct PyRecorder {
    handle: StopOnce<Recorder>,
    output_path: String,
}

impl PyRecorder {
    fn start(
        py: Python<'_>,
        caps: CameraCaps,
        output_path: String,
        options: RecorderOptions,
    ) -> PyResult<Self> {
        let path = output_path.clone();
        let recorder = py
            .detach(move || Recorder::start(caps, path, &options))
            .map_err(to_py_err)?;
        Ok(PyRecorder {
            handle: StopOnce::new(recorder),
            output_path,
        })
    }
}

#[pymethods]
impl PyRecorder {
    #[new]
    #[pyo3(signature = (caps, filename, display = false, rotate = 0, bitrate = None, source = None))]
    fn new(
        py: Python<'_>,
        caps: PyRef<'_, PyCameraCaps>,
        filename: String,
        display: bool,
        rotate: u32,
        bitrate: Option<u32>,
        source: Option<String>,
    ) -> PyResult<Self> {
        let options = recorder_options(display, rotate, bitrate, source)?;
        let caps = caps.to_core();
        PyRecorder::start(py, caps, filename, options)
    }

    /// Stop recording and finalize the file. Raises `RuntimeError` when
    /// called on a recorder that is already stopped.
    fn stop(&mut self, py: Python<'_>) -> PyResult<()> {
        self.handle
            .stop_with(|recorder| py.detach(move || recorder.stop()))
            .map_err(to_py_err)?;
        Ok(())
    }

    #[getter]
    fn is_recording(&self) -> bool {
        self.handle.running().is_some_and(|r| r.is_recording())
    }

    /// Frames captured so far, or in total once stopped.
    #[getter]
    fn frame_count(&self) -> u64 {
        self.handle.frame_count()
    }

    /// Presentation time of the latest frame in seconds, -1.0 before the
    /// first frame. Kept after stop.
    #[getter]
    fn last_frame_time(&self) -> f64 {
        self.handle.last_frame_time()
    }

    #[getter]
    fn output_path(&self) -> &str {
        &self.output_path
    }

    /// Recording length in milliseconds, available after stop.
    #[getter]
    fn duration_ms(&self) -> Option<f64> {
        self.handle.summary().map(|s| s.duration_ms)
    }

    fn __enter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __exit__(
        &mut self,
        py: Python<'_>,
        _exc_type: &Bound<'_, PyAny>,
        _exc_value: &Bound<'_, PyAny>,
        _traceback: &Bound<'_, PyAny>,
    ) -> PyResult<bool> {
        self.handle
            .finish_with(|recorder| py.detach(move || recorder.stop()))
            .map_err(to_py_err)?;
        Ok(false)
    }

    fn __repr__(&self) -> String {
        let state = if !self.handle.is_stopped() {
            "recording"
        } else {
            "stopped"
        };
        format!("Recorder({:?}, {})", self.output_path, state)
    }
}

/// A camera found by `list_cameras()`.
#[pyclass(name = "CameraInfo", module = "webcam_py")]
struct PyCameraInfo {
    inner: CameraInfo,
}

#[pymethods]
impl PyCameraInfo {
    #[getter]
    fn name(&self) -> &str {
        &self.inner.name
    }

    #[getter]
    fn device_class(&self) -> &str {
        &self.inner.device_class
    }

    /// Fixed capture modes the camera advertises.
    #[getter]
    fn modes(&self) -> Vec<PyCameraCaps> {
        self.inner.modes.iter().map(PyCameraCaps::from_core).collect()
    }

    fn __repr__(&self) -> String {
        format!(
            "CameraInfo(name={:?}, modes={})",
            self.inner.name,
            self.inner.modes.len()
        )
    }
}

/// Start recording `caps` into `output_path`; returns the recorder handle.
#[pyfunction]
#[pyo3(signature = (caps, output_path, display = false, rotate = 0, bitrate = None, source = None))]
fn start_recording(
    py: Python<'_>,
    caps: PyRef<'_, PyCameraCaps>,
    output_path: String,
    display: bool,
    rotate: u32,
    bitrate: Option<u32>,
    source: Option<String>,
) -> PyResult<PyRecorder> {
    let options = recorder_options(display, rotate, bitrate, source)?;
    let caps = caps.to_core();
    PyRecorder::start(py, caps, output_path, options)
}

/// Stop a recorder returned by `start_recording`.
#[pyfunction]
fn stop_recording(py: Python<'_>, mut recorder: PyRefMut<'_, PyRecorder>) -> PyResult<()> {
    recorder.stop(py)
}

/// List attached cameras.
#[pyfunction]
fn list_cameras(py: Python<'_>) -> PyResult<Vec<PyCameraInfo>> {
    let cameras = py
        .detach(webcam_core::list_cameras)
        .map_err(to_py_err)?;
    Ok(cameras
        .into_iter()
        .map(|inner| PyCameraInfo { inner })
        .collect())
}

/// Python module definition.
#[pymodule]
fn webcam_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    webcam_core::logging::init();
    tracing::debug!("webcam_py loaded");

    m.add_class::<PyCameraCaps>()?;
    m.add_class::<PyRecorder>()?;
    m.add_class::<PyCameraInfo>()?;
    m.add_function(wrap_pyfunction!(start_recording, m)?)?;
    m.add_function(wrap_pyfunction!(stop_recording, m)?)?;
    m.add_function(wrap_pyfunction!(list_cameras, m)?)?;
    Ok(())
}
