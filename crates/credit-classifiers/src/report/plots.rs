use plotly::layout::{Axis, BarMode, Layout};
use plotly::{Histogram, Plot};

/// Overlaid histograms of one column in the reference and current data.
pub fn plot_distribution_comparison(reference: &[f64], current: &[f64], column: &str) -> Plot {
    let present = |values: &[f64]| values.iter().copied().filter(|v| !v.is_nan()).collect::<Vec<f64>>();

    let trace_reference = Histogram::new(present(reference))
        .name("Reference")
        .opacity(0.6)
        .hist_norm(plotly::histogram::HistNorm::Probability);
    let trace_current = Histogram::new(present(current))
        .name("Current")
        .opacity(0.6)
        .hist_norm(plotly::histogram::HistNorm::Probability);

    let layout = Layout::new()
        .title(column)
        .bar_mode(BarMode::Overlay)
        .x_axis(Axis::new().title(column))
        .y_axis(Axis::new().title("Share"));

    let mut plot = Plot::new();
    plot.add_trace(trace_reference);
    plot.add_trace(trace_current);
    plot.set_layout(layout);
    plot
}

/// Histogram of predicted default probabilities.
pub fn plot_score_histogram(scores: &[f64], title: &str) -> Plot {
    let trace = Histogram::new(scores.to_vec()).name("Preds_Prob");

    let layout = Layout::new()
        .title(title)
        .x_axis(Axis::new().title("Probability of default"))
        .y_axis(Axis::new().title("Count"));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}
