//! Stored box format: YOLO text, one `class_id x y w h` line per box with
//! six decimals, plus the dataset's `classes.txt`.

use crate::backend::error::BackendError;
use crate::model::{Category, NormalizedBox};

/// Encode boxes as YOLO text lines.
pub fn format_yolo(boxes: &[NormalizedBox]) -> String {
    boxes
        .iter()
        .map(|b| format!("{} {:.6} {:.6} {:.6} {:.6}", b.class_id, b.x, b.y, b.w, b.h))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse YOLO text lines. Blank lines are skipped.
pub fn parse_yolo(content: &str) -> Result<Vec<NormalizedBox>, BackendError> {
    let mut boxes = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 5 {
            return Err(BackendError::invalid_format(format!(
                "line {}: expected 'class_id x y w h', got '{}'",
                line_num + 1,
                line
            )));
        }
        if parts.len() > 5 {
            log::warn!(
                "Line {}: ignoring {} extra field(s)",
                line_num + 1,
                parts.len() - 5
            );
        }

        let class_id = parts[0].parse::<u32>().map_err(|_| {
            BackendError::invalid_format(format!(
                "line {}: invalid class id '{}'",
                line_num + 1,
                parts[0]
            ))
        })?;

        let mut values = [0.0f64; 4];
        for (slot, raw) in values.iter_mut().zip(&parts[1..5]) {
            *slot = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    BackendError::invalid_format(format!(
                        "line {}: invalid coordinate '{}'",
                        line_num + 1,
                        raw
                    ))
                })?;
        }

        let [x, y, w, h] = values;
        boxes.push(NormalizedBox::new(class_id, x, y, w, h));
    }

    Ok(boxes)
}

/// Parse a `classes.txt` listing: one name per line, id = line position.
pub fn parse_classes(content: &str) -> Vec<Category> {
    content
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .enumerate()
        .map(|(idx, name)| Category::new(idx as u32, name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_yolo_six_decimals() {
        let boxes = vec![
            NormalizedBox::new(2, 0.2, 0.3, 0.2, 0.2),
            NormalizedBox::new(0, 0.5, 0.5, 1.0, 1.0),
        ];
        assert_eq!(
            format_yolo(&boxes),
            "2 0.200000 0.300000 0.200000 0.200000\n0 0.500000 0.500000 1.000000 1.000000"
        );
    }

    #[test]
    fn test_parse_yolo() {
        let content = "0 0.5 0.5 0.25 0.25\n\n  1 0.1 0.2 0.05 0.1  \n";
        let boxes = parse_yolo(content).expect("valid");
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[1], NormalizedBox::new(1, 0.1, 0.2, 0.05, 0.1));
    }

    #[test]
    fn test_parse_yolo_errors_name_line() {
        let err = parse_yolo("0 0.5 0.5 0.2 0.2\n0 0.5 abc 0.2 0.2").expect_err("invalid");
        assert!(err.to_string().contains("line 2"), "{err}");

        assert!(parse_yolo("0 0.5 0.5").is_err());
        assert!(parse_yolo("-1 0.5 0.5 0.2 0.2").is_err());
        assert!(parse_yolo("0 NaN 0.5 0.2 0.2").is_err());
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_yolo("").expect("valid").is_empty());
    }

    #[test]
    fn test_parse_classes() {
        let classes = parse_classes("person\ncar\n\n");
        assert_eq!(classes, vec![Category::new(0, "person"), Category::new(1, "car")]);
    }
}
