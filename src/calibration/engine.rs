// SPDX-License-Identifier: GPL-3.0-only

//! Two-point wavelength calibration state machine
//!
//! The operator stages up to two reference points on the live spectrum,
//! confirms each one and enters its wavelength. Wavelength entry is an
//! explicit request/response exchange with the presenter: the engine emits a
//! [`WavelengthRequest`] and the presenter answers through
//! [`CalibrationEngine::submit_wavelength`].

use super::types::{
    CalibrationEvent, CalibrationMode, CalibrationParameters, CalibrationPoint, CalibrationState,
    WavelengthRequest, WavelengthResponse,
};
use crate::constants::{
    CALIBRATION_MIN_PIXEL_DELTA, DEFAULT_FIRST_WAVELENGTH, DEFAULT_SECOND_WAVELENGTH,
};
use crate::errors::CalibrationError;
use futures::channel::mpsc;
use tracing::{debug, info, warn};

pub struct CalibrationEngine {
    state: CalibrationState,
    mode: CalibrationMode,
    points: Vec<CalibrationPoint>,
    parameters: Option<CalibrationParameters>,
    pending: Option<WavelengthRequest>,
    subscribers: Vec<mpsc::UnboundedSender<CalibrationEvent>>,
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new(CalibrationMode::default())
    }
}

impl CalibrationEngine {
    pub fn new(mode: CalibrationMode) -> Self {
        Self {
            state: CalibrationState::Uncalibrated,
            mode,
            points: Vec::new(),
            parameters: None,
            pending: None,
            subscribers: Vec::new(),
        }
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<CalibrationEvent> {
        let (sender, receiver) = mpsc::unbounded();
        self.subscribers.push(sender);
        receiver
    }

    fn emit(&mut self, event: CalibrationEvent) {
        debug!(?event, "Calibration event");
        self.subscribers
            .retain(|sender| sender.unbounded_send(event.clone()).is_ok());
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn mode(&self) -> CalibrationMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CalibrationMode) {
        self.mode = mode;
    }

    pub fn is_calibrated(&self) -> bool {
        self.state == CalibrationState::Calibrated && self.parameters.is_some()
    }

    pub fn needs_second_point(&self) -> bool {
        self.state == CalibrationState::FirstPointSelected
    }

    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// Replace the staged points
    ///
    /// A calibrated engine falls back to `Start`, since the new list no
    /// longer backs the published parameters.
    pub fn set_points(&mut self, points: Vec<CalibrationPoint>) {
        self.points = points;
        if self.state == CalibrationState::Calibrated {
            self.transition(CalibrationState::Start);
        }
    }

    pub fn parameters(&self) -> Option<CalibrationParameters> {
        self.parameters
    }

    /// Outstanding wavelength request, if any
    pub fn pending_request(&self) -> Option<&WavelengthRequest> {
        self.pending.as_ref()
    }

    /// Recalibrate from a saved pair of labeled points
    ///
    /// Anything other than exactly two labeled points is refused and leaves
    /// the engine untouched.
    pub fn restore(
        &mut self,
        points: Vec<CalibrationPoint>,
    ) -> Result<CalibrationParameters, CalibrationError> {
        let labeled = points.iter().filter(|p| p.wavelength.is_some()).count();
        if points.len() != 2 || labeled != 2 {
            warn!(
                points = points.len(),
                labeled, "Saved calibration points rejected"
            );
            return Err(CalibrationError::NotReady);
        }

        info!("Restoring calibration from saved points");
        self.points = points;
        self.pending = None;
        self.perform_calibration()
    }

    /// Move to `state`, dropping parameters outside `Calibrated`
    fn transition(&mut self, state: CalibrationState) {
        if state != CalibrationState::Calibrated {
            self.parameters = None;
        }
        self.state = state;
    }

    /// Begin collecting points, discarding anything in flight
    pub fn start_calibration(&mut self) {
        self.points.clear();
        self.pending = None;
        self.transition(CalibrationState::Start);
        self.emit(CalibrationEvent::Started);
    }

    /// Switch to passive mode
    ///
    /// Staged points are kept, parameters are dropped.
    pub fn set_uncalibrated_mode(&mut self) {
        self.transition(CalibrationState::Uncalibrated);
        self.pending = None;
        self.emit(CalibrationEvent::Uncalibrated);
    }

    /// Stage a provisional marker at `pixel`
    ///
    /// At most two markers are kept. With two staged, the new marker
    /// replaces the second; the first is always kept.
    pub fn add_reference_point(&mut self, pixel: f64) {
        let point = CalibrationPoint::new(pixel);
        match self.points.len() {
            0 | 1 => self.points.push(point),
            2 => self.points[1] = point,
            // Restored lists may be longer; trim back towards two
            _ => {
                self.points.pop();
            }
        }
        debug!(pixel, staged = self.points.len(), "Reference point staged");
    }

    /// Confirm a staged point and ask for its wavelength
    ///
    /// With one staged point this labels the first point, with two or more
    /// the second. Nothing happens while no point is staged.
    pub fn request_to_add_calibrated_point(&mut self, pixel: f64) -> Option<WavelengthRequest> {
        let (state, point_index, suggested_wavelength) = match self.points.len() {
            0 => {
                warn!(pixel, "No reference point staged, ignoring wavelength request");
                return None;
            }
            1 => (
                CalibrationState::FirstPointSelected,
                0,
                DEFAULT_FIRST_WAVELENGTH,
            ),
            _ => (
                CalibrationState::SecondPointSelected,
                1,
                DEFAULT_SECOND_WAVELENGTH,
            ),
        };

        self.transition(state);
        let request = WavelengthRequest {
            point_index,
            pixel_position: pixel,
            suggested_wavelength,
        };
        self.pending = Some(request);
        self.emit(CalibrationEvent::WavelengthRequested(request));
        Some(request)
    }

    /// Resolve the outstanding wavelength request
    ///
    /// Cancelled or non-numeric input steps the state back one level and
    /// dismisses the request. A valid number labels the point and, once both
    /// points are labeled, runs the calibration.
    pub fn submit_wavelength(&mut self, response: WavelengthResponse) -> Result<(), CalibrationError> {
        let request = self.pending.take().ok_or(CalibrationError::NoPendingRequest)?;

        let wavelength = match response {
            WavelengthResponse::Entered(text) => match text.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => Some(value),
                _ => {
                    warn!(input = %text, "Rejected non-numeric wavelength");
                    None
                }
            },
            WavelengthResponse::Cancelled => None,
        };

        let Some(wavelength) = wavelength else {
            self.step_back();
            self.emit(CalibrationEvent::Dismissed);
            return Ok(());
        };

        let Some(point) = self.points.get_mut(request.point_index) else {
            return Ok(());
        };
        point.wavelength = Some(wavelength);

        self.emit(CalibrationEvent::PointsUpdated {
            points: self.points.clone(),
            state: self.state,
        });

        let labeled = self.points.iter().filter(|p| p.wavelength.is_some()).count();
        if self.points.len() == 2 && labeled == 2 {
            self.perform_calibration()?;
        }
        Ok(())
    }

    fn step_back(&mut self) {
        let previous = match self.state {
            CalibrationState::FirstPointSelected => CalibrationState::Start,
            CalibrationState::SecondPointSelected => CalibrationState::FirstPointSelected,
            other => other,
        };
        self.transition(previous);
    }

    /// Fit the line through the two labeled points
    ///
    /// Points closer than the pixel epsilon reset the calibration and fail.
    pub fn perform_calibration(&mut self) -> Result<CalibrationParameters, CalibrationError> {
        let (p1, p2) = match self.points.as_slice() {
            [a, b] => (*a, *b),
            _ => return Err(CalibrationError::NotReady),
        };
        let (Some(w1), Some(w2)) = (p1.wavelength, p2.wavelength) else {
            return Err(CalibrationError::NotReady);
        };

        let delta_pixel = p2.pixel_position - p1.pixel_position;
        if delta_pixel.abs() <= CALIBRATION_MIN_PIXEL_DELTA {
            let error = CalibrationError::PointsTooClose { delta: delta_pixel };
            warn!(delta = delta_pixel, "Calibration rejected");
            self.reset_calibration();
            self.emit(CalibrationEvent::Failed(error.to_string()));
            return Err(error);
        }

        let slope = (w2 - w1) / delta_pixel;
        let intercept = w1 - slope * p1.pixel_position;
        let parameters = CalibrationParameters { slope, intercept };

        self.parameters = Some(parameters);
        self.transition(CalibrationState::Calibrated);
        info!(slope, intercept, "Calibration complete");
        self.emit(CalibrationEvent::Completed { slope, intercept });
        Ok(parameters)
    }

    /// Drop points and parameters and start over
    pub fn reset_calibration(&mut self) {
        self.points.clear();
        self.pending = None;
        self.transition(CalibrationState::Start);
        self.emit(CalibrationEvent::Reset);
    }

    /// Status line, e.g. `Calibrated: a- 0.65,  b- 355.00`
    pub fn calibration_info(&self) -> Option<String> {
        let params = self.parameters?;
        Some(format!(
            "Calibrated: a- {},  b- {}",
            format_coefficient(params.slope),
            format_coefficient(params.intercept)
        ))
    }
}

/// Between two and four fraction digits, trailing zeros dropped
fn format_coefficient(value: f64) -> String {
    let mut text = format!("{:.4}", value);
    let min_len = text.find('.').map_or(text.len(), |dot| dot + 3);
    while text.len() > min_len && text.ends_with('0') {
        text.pop();
    }
    text
}
