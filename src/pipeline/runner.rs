// Picking pipeline
// WindowPlan -> (normalize -> model) per window -> aggregate -> extract -> project

use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::inference::aggregate::{Aggregator, ConfidenceCurves};
use crate::inference::normalize::normalize_window;
use crate::inference::window::WindowPlan;
use crate::model::backend::{InferenceError, SharedModel, WindowTensor};
use crate::picks::extract::{extract_events, ExtractionConfig};
use crate::picks::projection::{project, PickResult, ProjectionError};
use crate::picks::types::{has_detections, ArrivalEvent};
use crate::pipeline::config::{ConfigError, PickerConfig};
use crate::pipeline::trace::{emit, Stage, TraceBuilder, TraceWriter};
use crate::waveform::stream::{InputShapeError, Trace, Waveform};

/// Windows between progress reports
const PROGRESS_INTERVAL: usize = 10;

/// Errors that abort a picking run; no partial result accompanies them
#[derive(Debug, Error)]
pub enum PickerError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid input waveform: {0}")]
    InputShape(#[from] InputShapeError),

    #[error("{0}")]
    Inference(#[from] InferenceError),

    #[error("Failed to project picks: {0}")]
    Projection(#[from] ProjectionError),
}

/// Everything one run produces before projection
#[derive(Debug, Clone)]
pub struct PickerOutput {
    pub run_id: Uuid,
    pub plan: WindowPlan,
    pub curves: ConfidenceCurves,
    /// Extracted events; a single sentinel when nothing was detected
    pub events: Vec<ArrivalEvent>,
}

impl PickerOutput {
    pub fn has_detections(&self) -> bool {
        has_detections(&self.events)
    }

    /// Project onto the portable result using the waveform's timing
    pub fn project(&self, waveform: &Waveform) -> Result<PickResult, ProjectionError> {
        project(
            self.run_id,
            &self.events,
            waveform.sampling_rate(),
            waveform.start_time(),
        )
    }
}

/// Runs a shared phase model over whole waveforms
///
/// The model handle is read-only and may be shared with other pickers; all
/// buffers live for the duration of one `run` call.
pub struct PhasePicker {
    model: SharedModel,
    config: PickerConfig,
}

impl PhasePicker {
    /// Create a picker; the configuration is validated here so bad parameters
    /// never reach the windowing stage
    pub fn new(model: SharedModel, config: PickerConfig) -> Result<Self, PickerError> {
        config.validate()?;
        Ok(PhasePicker { model, config })
    }

    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Run the pipeline and project the result in one go
    pub fn pick(&self, waveform: &Waveform) -> Result<PickResult, PickerError> {
        let output = self.run(waveform)?;
        Ok(output.project(waveform)?)
    }

    /// Assemble a waveform from raw traces, then pick
    pub fn pick_traces(&self, traces: &[Trace]) -> Result<PickResult, PickerError> {
        let waveform = Waveform::from_traces(traces)?;
        self.pick(&waveform)
    }

    pub fn run(&self, waveform: &Waveform) -> Result<PickerOutput, PickerError> {
        self.run_traced(waveform, None)
    }

    /// Run the pipeline, appending progress to `trace` when given
    pub fn run_traced(
        &self,
        waveform: &Waveform,
        trace: Option<&TraceWriter>,
    ) -> Result<PickerOutput, PickerError> {
        let run_id = Uuid::new_v4();
        let plan = WindowPlan::new(
            waveform.len(),
            self.config.window_length,
            self.config.step_size,
        )?;

        log::info!(
            "Picking {} samples at {} Hz with {}: {} windows (L={}, S={})",
            waveform.len(),
            waveform.sampling_rate(),
            self.model.name(),
            plan.len(),
            plan.window_length,
            plan.step_size
        );
        emit(trace, || {
            TraceBuilder::new(run_id, Stage::Windowing)
                .complete(format!("Planned {} windows", plan.len()))
                .with_data(json!({
                    "samples": waveform.len(),
                    "windows": plan.len(),
                    "window_length": plan.window_length,
                    "step_size": plan.step_size,
                    "buffer_length": plan.buffer_length,
                    "model": self.model.name(),
                }))
        });

        let mut aggregator = Aggregator::new(plan.buffer_length, plan.window_length);
        self.infer_all(waveform, &plan, &mut aggregator, run_id, trace)?;

        let uncovered = aggregator.uncovered();
        let curves = aggregator.finish();
        log::debug!(
            "Aggregated {} windows, {} samples uncovered",
            plan.len(),
            uncovered
        );
        emit(trace, || {
            TraceBuilder::new(run_id, Stage::Aggregation)
                .complete("Averaged overlapping windows")
                .with_data(json!({ "uncovered_samples": uncovered }))
        });

        let events = extract_events(&curves, &ExtractionConfig::from(&self.config));
        let detected = has_detections(&events);
        let count = if detected { events.len() } else { 0 };
        if detected {
            log::info!("Extracted {} events", count);
        } else {
            log::info!("No events detected");
        }
        emit(trace, || {
            TraceBuilder::new(run_id, Stage::Extraction)
                .complete(format!("Extracted {} events", count))
                .with_data(json!({ "events": count, "detected": detected }))
        });

        Ok(PickerOutput {
            run_id,
            plan,
            curves,
            events,
        })
    }

    /// Normalize one window, run the model and check what comes back
    fn infer_window(
        &self,
        waveform: &Waveform,
        offset: usize,
        window_length: usize,
    ) -> Result<WindowTensor, InferenceError> {
        let input = normalize_window(waveform.window(offset, window_length), window_length);
        self.model
            .predict(&input)
            .and_then(|output| output.check_output(window_length).map(|_| output))
            .map_err(|e| InferenceError::Window {
                offset,
                source: Box::new(e),
            })
    }

    #[cfg(not(feature = "parallel"))]
    fn infer_all(
        &self,
        waveform: &Waveform,
        plan: &WindowPlan,
        aggregator: &mut Aggregator,
        run_id: Uuid,
        trace: Option<&TraceWriter>,
    ) -> Result<(), InferenceError> {
        for (i, &offset) in plan.offsets.iter().enumerate() {
            if i % PROGRESS_INTERVAL == 0 {
                report_progress(run_id, trace, i, plan.len());
            }
            let output = self.infer_window(waveform, offset, plan.window_length)?;
            aggregator.accumulate(offset, &output);
        }
        Ok(())
    }

    /// Infer batches of windows on the rayon pool, then accumulate each batch
    /// serially in offset order so the sums match the serial path exactly
    #[cfg(feature = "parallel")]
    fn infer_all(
        &self,
        waveform: &Waveform,
        plan: &WindowPlan,
        aggregator: &mut Aggregator,
        run_id: Uuid,
        trace: Option<&TraceWriter>,
    ) -> Result<(), InferenceError> {
        use rayon::prelude::*;

        let batch_size = (rayon::current_num_threads() * 4).max(PROGRESS_INTERVAL);

        for (b, batch) in plan.offsets.chunks(batch_size).enumerate() {
            report_progress(run_id, trace, b * batch_size, plan.len());

            let outputs: Vec<Result<WindowTensor, InferenceError>> = batch
                .par_iter()
                .map(|&offset| self.infer_window(waveform, offset, plan.window_length))
                .collect();

            for (&offset, output) in batch.iter().zip(outputs) {
                aggregator.accumulate(offset, &output?);
            }
        }
        Ok(())
    }
}

fn report_progress(run_id: Uuid, trace: Option<&TraceWriter>, done: usize, total: usize) {
    log::debug!("Processing window {}/{}", done + 1, total);
    emit(trace, || {
        TraceBuilder::new(run_id, Stage::Inference).progress(
            done as f32 / total.max(1) as f32,
            format!("Processing window {}/{}", done + 1, total),
        )
    });
}
