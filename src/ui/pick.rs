use eframe::egui::Pos2;

/// Rows whose marker lies within `radius` pixels of `click`, nearest first.
///
/// `points` pairs each dataset row with its plot coordinates and must only
/// contain the points currently drawn, so a click never resolves to a row
/// of another variable or a hidden day. Ties keep the input order.
pub fn rows_near(
    points: &[(usize, [f64; 2])],
    to_screen: impl Fn([f64; 2]) -> Pos2,
    click: Pos2,
    radius: f32,
) -> Vec<usize> {
    let mut hits: Vec<(f32, usize)> = points
        .iter()
        .filter_map(|&(row, p)| {
            let d = to_screen(p).distance(click);
            (d <= radius).then_some((d, row))
        })
        .collect();
    hits.sort_by(|a, b| a.0.total_cmp(&b.0));
    hits.into_iter().map(|(_, row)| row).collect()
}
