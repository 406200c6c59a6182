use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::circular::{distance, span};
use crate::classify::PatternClassifier;
use crate::config::{
    ClassifierConfig, CriterionWeights, GroupingConfig, DEFAULT_DOMINANT_FRACTION,
    DEFAULT_GENOME_LENGTH, DEFAULT_HIGH_HET, DEFAULT_MULTIPLE_THRESHOLD, DEFAULT_NOISE,
    DEFAULT_RADIUS,
};
use crate::error::Error;
use crate::grouping::SpatialGrouper;
use crate::rusalt_structs::{EventKind, TypedEvent};

fn value_error(e: Error) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn check_lengths(lens: &[usize]) -> PyResult<()> {
    if lens.windows(2).any(|w| w[0] != w[1]) {
        return Err(PyValueError::new_err("input arrays must have equal length"));
    }
    Ok(())
}

/// Builds bare events from coordinate/heteroplasmy arrays, validating
/// and orienting positions the same way the event caller does.
fn build_events(
    starts: &[i64],
    ends: &[i64],
    heteroplasmy: &[f64],
    genome_length: i64,
) -> PyResult<Vec<TypedEvent>> {
    let mut events = Vec::with_capacity(starts.len());
    for i in 0..starts.len() {
        span(starts[i], ends[i], genome_length).map_err(value_error)?;
        let (final_start, final_end) = if starts[i] > ends[i] {
            (ends[i], starts[i])
        } else {
            (starts[i], ends[i])
        };
        let size = span(final_start, final_end, genome_length).map_err(value_error)?;
        events.push(TypedEvent {
            sample: String::new(),
            cluster_id: i.to_string(),
            alt_reads: 0,
            ref_reads: 0,
            heteroplasmy: heteroplasmy[i],
            raw_start: starts[i],
            raw_end: ends[i],
            size,
            kind: EventKind::Deletion,
            final_start,
            final_end,
            dloop: false,
            blacklist_crossing: None,
            flanks: None,
        });
    }
    Ok(events)
}

#[pyfunction]
#[pyo3(signature = (starts, ends, genome_length = DEFAULT_GENOME_LENGTH))]
pub fn span_numpy(
    starts: PyReadonlyArray1<i64>,
    ends: PyReadonlyArray1<i64>,
    genome_length: i64,
    py: Python,
) -> PyResult<Py<PyArray1<i64>>> {
    let starts = starts.as_slice()?;
    let ends = ends.as_slice()?;
    check_lengths(&[starts.len(), ends.len()])?;

    let spans = starts
        .iter()
        .zip(ends)
        .map(|(&a, &b)| span(a, b, genome_length))
        .collect::<Result<Vec<i64>, Error>>()
        .map_err(value_error)?;
    Ok(spans.into_pyarray(py).unbind())
}

#[pyfunction]
#[pyo3(signature = (a, b, genome_length = DEFAULT_GENOME_LENGTH))]
pub fn circular_distance_numpy(
    a: PyReadonlyArray1<i64>,
    b: PyReadonlyArray1<i64>,
    genome_length: i64,
    py: Python,
) -> PyResult<Py<PyArray1<i64>>> {
    let a = a.as_slice()?;
    let b = b.as_slice()?;
    check_lengths(&[a.len(), b.len()])?;

    let distances = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| distance(x, y, genome_length))
        .collect::<Result<Vec<i64>, Error>>()
        .map_err(value_error)?;
    Ok(distances.into_pyarray(py).unbind())
}

/// Returns the group index of every event and the group labels.
#[pyfunction]
#[pyo3(signature = (starts, ends, genome_length = DEFAULT_GENOME_LENGTH, radius = DEFAULT_RADIUS))]
pub fn spatial_groups_numpy(
    starts: PyReadonlyArray1<i64>,
    ends: PyReadonlyArray1<i64>,
    genome_length: i64,
    radius: i64,
    py: Python,
) -> PyResult<(Py<PyArray1<i64>>, Vec<String>)> {
    let starts = starts.as_slice()?;
    let ends = ends.as_slice()?;
    check_lengths(&[starts.len(), ends.len()])?;

    let hets = vec![0.0; starts.len()];
    let events = build_events(starts, ends, &hets, genome_length)?;
    let grouping = SpatialGrouper::new(&GroupingConfig { radius }, genome_length).group(&events);

    let assignment: Vec<i64> = grouping.assignment.iter().map(|&g| g as i64).collect();
    let labels = grouping.groups.into_iter().map(|g| g.id).collect();
    Ok((assignment.into_pyarray(py).unbind(), labels))
}

/// Groups and classifies one sample.
///
/// Returns `(pattern, ambiguous, n, h_max, f_dom, dominant_group)`.
#[pyfunction]
#[pyo3(signature = (
    starts,
    ends,
    heteroplasmy,
    genome_length = DEFAULT_GENOME_LENGTH,
    radius = DEFAULT_RADIUS,
    high_het = DEFAULT_HIGH_HET,
    noise = DEFAULT_NOISE,
    multiple_threshold = DEFAULT_MULTIPLE_THRESHOLD,
    dominant_fraction = DEFAULT_DOMINANT_FRACTION,
))]
#[allow(clippy::too_many_arguments)]
pub fn classify_numpy(
    starts: PyReadonlyArray1<i64>,
    ends: PyReadonlyArray1<i64>,
    heteroplasmy: PyReadonlyArray1<f64>,
    genome_length: i64,
    radius: i64,
    high_het: f64,
    noise: f64,
    multiple_threshold: usize,
    dominant_fraction: f64,
) -> PyResult<(String, bool, usize, f64, f64, Option<String>)> {
    let starts = starts.as_slice()?;
    let ends = ends.as_slice()?;
    let heteroplasmy = heteroplasmy.as_slice()?;
    check_lengths(&[starts.len(), ends.len(), heteroplasmy.len()])?;

    let config = ClassifierConfig {
        high_het,
        noise,
        multiple_threshold,
        dominant_fraction,
        weights: CriterionWeights::default(),
    };
    let classifier = PatternClassifier::new(config).map_err(value_error)?;
    let events = build_events(starts, ends, heteroplasmy, genome_length)?;
    let grouping = SpatialGrouper::new(&GroupingConfig { radius }, genome_length).group(&events);
    let verdict = classifier
        .classify("numpy", &events, &grouping)
        .map_err(value_error)?;

    Ok((
        verdict.pattern.to_string(),
        verdict.ambiguous,
        verdict.criteria.n,
        verdict.criteria.h_max,
        verdict.criteria.f_dom,
        verdict.criteria.dominant_group,
    ))
}

#[pymodule]
fn rusalt(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(span_numpy, m)?)?;
    m.add_function(wrap_pyfunction!(circular_distance_numpy, m)?)?;
    m.add_function(wrap_pyfunction!(spatial_groups_numpy, m)?)?;
    m.add_function(wrap_pyfunction!(classify_numpy, m)?)?;
    Ok(())
}
