//! Hand-built SVG scatter plots of 2-D embeddings.

/// Colour scheme of a scatter plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotStyle {
    /// One colour per class; the forget class is drawn with a dark outline.
    ByClass,
    /// Forget class in red, everything else grey.
    ForgetVsRest,
}

const PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
    "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
];

fn class_colour(class: usize) -> &'static str {
    PALETTE[class % PALETTE.len()]
}

pub fn render_scatter(points: &[[f64; 2]], labels: &[usize], forget_class: usize, style: PlotStyle) -> String {
    let w = 640.0f64;
    let h = 480.0f64;
    let pad_l = 40.0f64;
    let pad_r = 140.0f64;
    let pad_t = 36.0f64;
    let pad_b = 30.0f64;

    let (min_x, max_x) = bounds(points.iter().map(|p| p[0]));
    let (min_y, max_y) = bounds(points.iter().map(|p| p[1]));

    let px = |p: &[f64; 2]| -> (f64, f64) {
        let x = pad_l + (p[0] - min_x) / (max_x - min_x + 1e-12) * (w - pad_l - pad_r);
        let y = pad_t + (max_y - p[1]) / (max_y - min_y + 1e-12) * (h - pad_t - pad_b);
        (x, y)
    };

    // Forget-class points last so they sit on top.
    let mut order: Vec<usize> = (0..points.len().min(labels.len())).collect();
    order.sort_by_key(|&i| labels[i] == forget_class);

    let dots: String = order.iter().map(|&i| {
        let (x, y) = px(&points[i]);
        let forgotten = labels[i] == forget_class;
        let (fill, stroke, r) = match (style, forgotten) {
            (PlotStyle::ByClass, true) => (class_colour(labels[i]), "#111", 3.5),
            (PlotStyle::ByClass, false) => (class_colour(labels[i]), "none", 2.5),
            (PlotStyle::ForgetVsRest, true) => ("#dc2626", "none", 3.5),
            (PlotStyle::ForgetVsRest, false) => ("#c8ccd2", "none", 2.5),
        };
        format!(
            "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{}\" fill=\"{}\" stroke=\"{}\" fill-opacity=\"0.8\"/>",
            x, y, r, fill, stroke
        )
    }).collect::<Vec<_>>().join("\n");

    let mut classes: Vec<usize> = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();

    let legend_x = w - pad_r + 16.0;
    let legend: String = match style {
        PlotStyle::ByClass => classes.iter().enumerate().map(|(row, &c)| {
            let y = pad_t + 8.0 + row as f64 * 18.0;
            let label = if c == forget_class { format!("class {} (forgotten)", c) } else { format!("class {}", c) };
            legend_row(legend_x, y, class_colour(c), &label)
        }).collect::<Vec<_>>().join("\n"),
        PlotStyle::ForgetVsRest => [
            legend_row(legend_x, pad_t + 8.0, "#dc2626", &format!("class {}", forget_class)),
            legend_row(legend_x, pad_t + 26.0, "#c8ccd2", "retained"),
        ].join("\n"),
    };

    let title = match style {
        PlotStyle::ByClass => "Embedding by class".to_owned(),
        PlotStyle::ForgetVsRest => format!("Forget class {} vs. retained", forget_class),
    };
    let grey_grid = "#e5e7eb";
    let dark_text = "#333";

    format!(
        "<svg width=\"{w}\" height=\"{h}\" xmlns=\"http://www.w3.org/2000/svg\">\n\
         <rect width=\"100%\" height=\"100%\" fill=\"#fff\"/>\n\
         <text x=\"{tx}\" y=\"22\" text-anchor=\"middle\" fill=\"{dark_text}\" font-size=\"14\">{title}</text>\n\
         <rect x=\"{pad_l}\" y=\"{pad_t}\" width=\"{pw}\" height=\"{ph}\" fill=\"none\" stroke=\"{grey_grid}\"/>\n\
         {dots}\n\
         {legend}\n\
         </svg>\n",
        tx = (w - pad_r + pad_l) / 2.0,
        pw = w - pad_l - pad_r,
        ph = h - pad_t - pad_b,
    )
}

fn legend_row(x: f64, y: f64, colour: &str, label: &str) -> String {
    format!(
        "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"4\" fill=\"{}\"/>\n\
         <text x=\"{:.1}\" y=\"{:.1}\" fill=\"#333\" font-size=\"11\">{}</text>",
        x, y, colour, x + 10.0, y + 4.0, label
    )
}

/// `(min, max)` of the values; a unit span around 0 when there are none.
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo.is_finite() && hi.is_finite() { (lo, hi) } else { (-0.5, 0.5) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_circle_per_point_plus_legend() {
        let points = [[0.0, 0.0], [1.0, 2.0], [-1.0, 0.5]];
        let svg = render_scatter(&points, &[0, 1, 1], 1, PlotStyle::ByClass);
        // 3 points + 2 legend rows.
        assert_eq!(svg.matches("<circle").count(), 5);
        assert!(svg.contains("class 1 (forgotten)"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn forget_plot_highlights_forgotten_points() {
        let svg = render_scatter(&[[0.0, 0.0], [1.0, 1.0]], &[3, 4], 3, PlotStyle::ForgetVsRest);
        assert_eq!(svg.matches("fill=\"#dc2626\" stroke").count(), 1);
        assert!(svg.contains("retained"));
    }

    #[test]
    fn empty_input_still_renders() {
        let svg = render_scatter(&[], &[], 0, PlotStyle::ByClass);
        assert!(svg.starts_with("<svg"));
    }
}
