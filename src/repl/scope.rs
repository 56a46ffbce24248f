//! ASCII oscilloscope for the synth's waveform tap

/// Plot `samples` into a `width` x `height` character grid.
///
/// Each column shows the peak of its slice of samples, so short transients
/// survive downsampling. Samples are expected in `[-1, 1]` and clipped.
pub fn render(samples: &[f32], width: usize, height: usize) -> String {
    if samples.is_empty() || width == 0 || height == 0 {
        return "(no signal)".to_string();
    }

    let mut grid = vec![vec![' '; width]; height];
    let mid = (height - 1) as f32 / 2.0;
    for row in grid.iter_mut() {
        if let Some(cell) = row.first_mut() {
            *cell = '|';
        }
    }

    let chunk = samples.len().div_ceil(width).max(1);
    for (x, slice) in samples.chunks(chunk).enumerate().take(width) {
        let peak = slice
            .iter()
            .copied()
            .filter(|s| s.is_finite())
            .fold(0.0f32, |acc, s| if s.abs() > acc.abs() { s } else { acc })
            .clamp(-1.0, 1.0);
        let y = (mid - peak * mid).round() as usize;
        grid[y.min(height - 1)][x] = '*';
    }

    grid.into_iter()
        .map(|row| row.into_iter().collect::<String>().trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_signal() {
        assert_eq!(render(&[], 10, 5), "(no signal)");
        assert_eq!(render(&[0.5], 0, 5), "(no signal)");
    }

    #[test]
    fn test_silence_is_a_flat_line() {
        let out = render(&[0.0; 100], 10, 5);
        let rows: Vec<&str> = out.lines().collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[2].matches('*').count(), 10);
    }

    #[test]
    fn test_extremes_hit_top_and_bottom() {
        let out = render(&[1.0, -1.0], 2, 5);
        let rows: Vec<&str> = out.lines().collect();
        assert_eq!(rows[0], "*");
        assert_eq!(rows[4], "|*");
    }
}
